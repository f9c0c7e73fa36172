use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordResetToken;

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordResetToken, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Atomically consumes an unused, unexpired token belonging to `user_id`.
pub async fn consume(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "UPDATE password_reset_tokens SET used = true
         WHERE user_id = $1 AND token_hash = $2 AND used = false AND expires_at > now()
         RETURNING *",
    )
    .bind(user_id)
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Invalidates every outstanding token for the user.
pub async fn invalidate_for_user(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE password_reset_tokens SET used = true WHERE user_id = $1 AND used = false")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
