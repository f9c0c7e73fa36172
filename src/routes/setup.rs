use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::audit;
use crate::models::OrganizationType;
use crate::state::SharedState;
use crate::validation::non_blank;

#[derive(Deserialize)]
pub struct SetupOrganizationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<String>,
    pub address: Option<String>,
    pub designation: Option<String>,
}

#[derive(Serialize)]
pub struct SetupOrganizationResponse {
    pub message: String,
    pub org_id: Uuid,
    pub redirect: String,
}

/// `POST /api/setup-organization/`: first-time onboarding of a new admin.
///
/// Creates the organization and promotes the caller to ORG_ADMIN in one
/// transaction. The caller's profile row stays locked until commit, so a
/// second concurrent setup waits and then sees the organization.
pub async fn setup_organization(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<SetupOrganizationRequest>,
) -> Result<Json<SetupOrganizationResponse>, AppError> {
    db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let mut tx = state.pool.begin().await?;

    db::profiles::ensure_for_user(&mut *tx, auth.user_id).await?;
    let profile = db::profiles::lock_by_user(&mut *tx, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Internal("Profile vanished during setup".to_string()))?;

    if profile.organization_id.is_some() {
        return Err(AppError::bad_request("Organization already exists."));
    }

    let name = non_blank(req.name.as_deref())
        .ok_or_else(|| AppError::bad_request("Organization name is required"))?;

    let org_type = match non_blank(req.org_type.as_deref()) {
        None => OrganizationType::default(),
        Some(value) => OrganizationType::parse(value).ok_or_else(|| {
            AppError::bad_request(format!(
                "Invalid organization type '{value}'. Expected School, College, University or Coaching."
            ))
        })?,
    };

    let organization = db::organizations::create(
        &mut *tx,
        name,
        org_type,
        non_blank(req.address.as_deref()),
    )
    .await?;

    db::profiles::complete_setup(
        &mut *tx,
        auth.user_id,
        organization.id,
        non_blank(req.designation.as_deref()),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        organization_id = %organization.id,
        user_id = %auth.user_id,
        "Organization set up"
    );

    audit::log_event(
        &state.pool,
        Some(organization.id),
        Some(auth.user_id),
        "organization.created",
        "organization",
        Some(organization.id),
        Some(serde_json::json!({ "name": organization.name, "type": organization.org_type })),
    )
    .await;

    Ok(Json(SetupOrganizationResponse {
        message: "Setup Complete".to_string(),
        org_id: organization.id,
        redirect: "/".to_string(),
    }))
}
