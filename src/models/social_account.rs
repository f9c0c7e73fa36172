use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link between a local user and an external identity provider subject.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SocialAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}
