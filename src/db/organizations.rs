use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Organization, OrganizationType};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    name: &str,
    org_type: OrganizationType,
    address: Option<&str>,
) -> Result<Organization, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (name, type, address) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(org_type.as_str())
    .bind(address)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
