//! Read-only projections of the authenticated user for client UIs.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{User, UserProfile};

/// Placeholder shown when a profile is not attached to an organization.
pub const NO_ORGANIZATION: &str = "No Campus";

/// User details returned with every auth response and by `GET /api/auth/user/`.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub organization_name: Option<String>,
    pub is_setup_complete: Option<bool>,
    pub permissions: Option<serde_json::Value>,
}

impl UserDetails {
    /// Builds the details, looking the profile up when the caller doesn't have it.
    pub async fn load(
        pool: &PgPool,
        user: &User,
        profile: Option<&UserProfile>,
    ) -> Result<Self, sqlx::Error> {
        let fetched;
        let profile = match profile {
            Some(p) => Some(p),
            None => {
                fetched = db::profiles::find_by_user(pool, user.id).await?;
                fetched.as_ref()
            }
        };

        let organization_name = match profile.and_then(|p| p.organization_id) {
            Some(org_id) => db::organizations::find_by_id(pool, org_id)
                .await?
                .map(|org| org.name),
            None => None,
        };

        Ok(UserDetails {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: profile.map(|p| p.role().as_str().to_string()),
            organization_name,
            is_setup_complete: profile.map(|p| p.is_setup_complete),
            permissions: profile.map(|p| p.permissions.clone()),
        })
    }
}

/// Compact projection for the top bar and sidebar (`GET /api/user/me/`).
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub role_code: String,
    pub organization: String,
    pub is_setup_complete: bool,
}

impl CurrentUser {
    pub fn new(user: &User, profile: &UserProfile, organization_name: Option<String>) -> Self {
        let role = profile.role();
        CurrentUser {
            id: user.id,
            name: user.display_name(),
            email: user.email.clone(),
            role: role.display_name().to_string(),
            role_code: role.as_str().to_string(),
            organization: organization_name.unwrap_or_else(|| NO_ORGANIZATION.to_string()),
            is_setup_complete: profile.is_setup_complete,
        }
    }
}
