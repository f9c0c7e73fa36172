use sqlx::PgPool;
use uuid::Uuid;

use crate::models::SocialAccount;

pub async fn find(
    pool: &PgPool,
    provider: &str,
    subject: &str,
) -> Result<Option<SocialAccount>, sqlx::Error> {
    sqlx::query_as::<_, SocialAccount>(
        "SELECT * FROM social_accounts WHERE provider = $1 AND subject = $2",
    )
    .bind(provider)
    .bind(subject)
    .fetch_optional(pool)
    .await
}

/// Links `user_id` to the provider subject. Idempotent.
pub async fn link<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    provider: &str,
    subject: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO social_accounts (user_id, provider, subject) VALUES ($1, $2, $3)
         ON CONFLICT (provider, subject) DO NOTHING",
    )
    .bind(user_id)
    .bind(provider)
    .bind(subject)
    .execute(executor)
    .await?;
    Ok(())
}
