use axum::extract::{Query, State};
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::email::templates::InvitationEmail;
use crate::error::{is_unique_violation, AppError};
use crate::extract::parse_json;
use crate::middleware::audit;
use crate::models::{display_name, Role, StaffMemberRow};
use crate::state::SharedState;
use crate::validation::{is_valid_email, normalize_email, non_blank};

pub const STATUS_INVITED: &str = "Invited";
pub const STATUS_ACTIVE: &str = "Active";
const NO_DEPARTMENT: &str = "-";

#[derive(Serialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub role_code: String,
    pub department: String,
    pub status: String,
    pub last_login: Option<DateTime<Utc>>,
    pub permissions: serde_json::Value,
}

impl From<StaffMemberRow> for StaffMember {
    fn from(row: StaffMemberRow) -> Self {
        let role = Role::parse(&row.role).unwrap_or_default();
        // Never logged in means the invite hasn't been accepted yet
        let status = if row.last_login.is_none() {
            STATUS_INVITED
        } else {
            STATUS_ACTIVE
        };
        let permissions = if row.permissions.is_null() {
            json!({})
        } else {
            row.permissions
        };

        StaffMember {
            id: row.user_id,
            name: display_name(&row.first_name, &row.last_name, &row.email),
            email: row.email,
            role: role.display_name().to_string(),
            role_code: role.as_str().to_string(),
            department: row
                .department_name
                .unwrap_or_else(|| NO_DEPARTMENT.to_string()),
            status: status.to_string(),
            last_login: row.last_login,
            permissions,
        }
    }
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePermissionsRequest {
    pub user_id: Option<String>,
    pub permissions: Option<serde_json::Value>,
    /// Absent leaves the department alone, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub department_id: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Default)]
pub struct DeleteParams {
    pub id: Option<String>,
}

/// `GET /api/staff/`
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<StaffMember>>, AppError> {
    let admin = auth.require_admin(&state.pool).await?;

    let Some(organization_id) = admin.organization_id else {
        return Ok(Json(Vec::new()));
    };

    let members = db::profiles::list_staff(&state.pool, organization_id)
        .await?
        .into_iter()
        .map(StaffMember::from)
        .collect();

    Ok(Json(members))
}

/// `POST /api/staff/`: invites a new member into the caller's organization.
pub async fn invite(
    auth: AuthUser,
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = auth.require_admin(&state.pool).await?;
    let req: InviteRequest = parse_json(&body)?;

    let email = non_blank(req.email.as_deref())
        .map(normalize_email)
        .ok_or_else(|| AppError::bad_request("Email is required"))?;

    if !is_valid_email(&email) {
        return Err(AppError::bad_request(
            "Please enter a valid email address (e.g., user@example.com)",
        ));
    }

    let role = match non_blank(req.role.as_deref()) {
        None => Role::Staff,
        Some(code) => Role::parse(code)
            .ok_or_else(|| AppError::bad_request(format!("Invalid role '{code}'")))?,
    };

    let already_exists = || AppError::bad_request("User with this email already exists!");

    if db::users::email_exists(&state.pool, &email).await? {
        return Err(already_exists());
    }

    let organization_id = admin
        .organization_id
        .ok_or_else(|| AppError::bad_request("You are not part of an organization!"))?;
    let organization = db::organizations::find_by_id(&state.pool, organization_id)
        .await?
        .ok_or_else(|| AppError::bad_request("You are not part of an organization!"))?;

    // Everything up to commit rolls back together, so a failure never
    // leaves a half-created account behind.
    let mut tx = state.pool.begin().await?;

    let new_user = db::users::create(&mut *tx, &email, None, "", "")
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already_exists()
            } else {
                AppError::Database(e)
            }
        })?;
    db::profiles::ensure_for_user(&mut *tx, new_user.id).await?;
    db::profiles::join_organization(&mut *tx, new_user.id, organization.id, role).await?;

    tx.commit().await?;

    tracing::info!(
        organization_id = %organization.id,
        user_id = %new_user.id,
        role = role.as_str(),
        "Staff member invited"
    );

    if let Some(mailer) = &state.system_mailer {
        let sender_name = match db::users::find_by_id(&state.pool, auth.user_id).await.ok().flatten() {
            Some(inviter) if !inviter.full_name().is_empty() => inviter.full_name(),
            _ => "The Administrator".to_string(),
        };
        let login_url = state.login_url();
        let invitation = InvitationEmail {
            sender_name: &sender_name,
            organization_name: &organization.name,
            role: role.as_str(),
            login_url: &login_url,
        };
        match mailer.send_invitation(&email, &invitation).await {
            Ok(()) => tracing::info!("Invitation email sent to {email}"),
            Err(e) => tracing::warn!("Failed to send invitation email to {email}: {e}"),
        }
    } else {
        tracing::warn!("System SMTP not configured, invitation email to {email} not sent");
    }

    audit::log_event(
        &state.pool,
        Some(organization.id),
        Some(auth.user_id),
        "staff.invited",
        "user",
        Some(new_user.id),
        Some(json!({ "email": email, "role": role.as_str() })),
    )
    .await;

    Ok(Json(json!({
        "message": format!("Invite sent to {email}"),
        "user": {
            "id": new_user.id,
            "email": new_user.email,
            "status": STATUS_INVITED,
        }
    })))
}

/// `PATCH /api/staff/`: replaces a member's permissions document and
/// optionally moves them into (or out of) a department.
pub async fn update_permissions(
    auth: AuthUser,
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = auth.require_admin(&state.pool).await?;
    let req: UpdatePermissionsRequest = parse_json(&body)?;

    let raw_id = non_blank(req.user_id.as_deref())
        .ok_or_else(|| AppError::bad_request("user_id is required"))?;
    let user_id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::bad_request(format!("Invalid user id '{raw_id}'")))?;
    let permissions = req
        .permissions
        .ok_or_else(|| AppError::bad_request("permissions is required"))?;
    if !permissions.is_object() {
        return Err(AppError::bad_request("permissions must be a JSON object"));
    }

    let not_found = || AppError::not_found("User not found");
    let organization_id = admin.organization_id.ok_or_else(not_found)?;

    let department = match req.department_id {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => {
            let department_id = Uuid::parse_str(raw.trim())
                .map_err(|_| AppError::bad_request(format!("Invalid department id '{raw}'")))?;
            db::departments::find_in_organization(&state.pool, department_id, organization_id)
                .await?
                .ok_or_else(|| AppError::bad_request("Department not found"))?;
            Some(Some(department_id))
        }
    };

    let mut tx = state.pool.begin().await?;

    if !db::profiles::update_permissions(&mut *tx, user_id, organization_id, &permissions).await? {
        return Err(not_found());
    }
    if let Some(department_id) = department {
        db::profiles::assign_department(&mut *tx, user_id, organization_id, department_id).await?;
    }

    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(organization_id),
        Some(auth.user_id),
        "staff.permissions_updated",
        "user",
        Some(user_id),
        Some(json!({ "permissions": permissions, "department_id": department })),
    )
    .await;

    Ok(Json(json!({ "message": "Permissions updated" })))
}

/// `DELETE /api/staff/?id=<user id>` (the id may also come in a JSON body).
///
/// Users whose profile is missing or has no organization can be removed by
/// any admin; they are leftovers that belong to nobody.
pub async fn remove(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<DeleteParams>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = auth.require_admin(&state.pool).await?;

    let raw_id = match non_blank(params.id.as_deref()) {
        Some(id) => id.to_string(),
        None => id_from_body(&body)?,
    };
    let target_id = Uuid::parse_str(&raw_id)
        .map_err(|_| AppError::bad_request(format!("Invalid user id '{raw_id}'")))?;

    if target_id == auth.user_id {
        return Err(AppError::bad_request("You cannot delete yourself."));
    }

    let target = db::users::find_by_id(&state.pool, target_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let target_profile = db::profiles::find_by_user(&state.pool, target.id).await?;
    match target_profile.as_ref().and_then(|p| p.organization_id) {
        Some(org_id) if Some(org_id) != admin.organization_id => {
            return Err(AppError::Forbidden(
                "User belongs to another organization".to_string(),
            ));
        }
        Some(_) => {}
        None => tracing::info!(
            user_id = %target.id,
            has_profile = target_profile.is_some(),
            "Removing user outside any organization"
        ),
    }

    // Someone else may have removed the user since the lookup
    if !db::users::delete(&state.pool, target.id).await? {
        return Err(AppError::not_found("User not found"));
    }

    audit::log_event(
        &state.pool,
        admin.organization_id,
        Some(auth.user_id),
        "staff.removed",
        "user",
        Some(target.id),
        Some(json!({ "email": target.email })),
    )
    .await;

    Ok(Json(json!({ "message": "User removed successfully" })))
}

fn id_from_body(body: &Bytes) -> Result<String, AppError> {
    let missing = || AppError::bad_request("User id is required");
    if body.is_empty() {
        return Err(missing());
    }
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("Invalid JSON body: {e}")))?;
    match value.get("id") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(missing()),
    }
}
