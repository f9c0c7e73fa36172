use sqlx::PgPool;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::UserProfile;

impl AuthUser {
    /// Loads the caller's profile and requires an admin role.
    ///
    /// Callers without a profile are treated like non-admins.
    pub async fn require_admin(&self, pool: &PgPool) -> Result<UserProfile, AppError> {
        match db::profiles::find_by_user(pool, self.user_id).await? {
            Some(profile) if profile.is_admin() => Ok(profile),
            _ => Err(AppError::Forbidden(
                "Access Denied: Admins only.".to_string(),
            )),
        }
    }
}
