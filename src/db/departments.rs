use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Department;

pub async fn create(
    pool: &PgPool,
    organization_id: Uuid,
    name: &str,
    config: &serde_json::Value,
) -> Result<Department, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "INSERT INTO departments (organization_id, name, config) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(organization_id)
    .bind(name)
    .bind(config)
    .fetch_one(pool)
    .await
}

pub async fn list_by_organization(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "SELECT * FROM departments WHERE organization_id = $1 ORDER BY name ASC",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

pub async fn find_in_organization(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "SELECT * FROM departments WHERE id = $1 AND organization_id = $2",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}
