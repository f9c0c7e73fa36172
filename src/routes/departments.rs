use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::parse_json;
use crate::middleware::audit;
use crate::models::Department;
use crate::state::SharedState;
use crate::validation::non_blank;

#[derive(Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: Option<String>,
    pub config: Option<serde_json::Value>,
}

/// `GET /api/departments/`
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Department>>, AppError> {
    let admin = auth.require_admin(&state.pool).await?;

    let Some(organization_id) = admin.organization_id else {
        return Ok(Json(Vec::new()));
    };

    let departments = db::departments::list_by_organization(&state.pool, organization_id).await?;
    Ok(Json(departments))
}

/// `POST /api/departments/`
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<Department>, AppError> {
    let admin = auth.require_admin(&state.pool).await?;
    let req: CreateDepartmentRequest = parse_json(&body)?;

    let organization_id = admin
        .organization_id
        .ok_or_else(|| AppError::bad_request("You are not part of an organization!"))?;

    let name = non_blank(req.name.as_deref())
        .ok_or_else(|| AppError::bad_request("Department name is required"))?;

    let config = match req.config {
        None | Some(serde_json::Value::Null) => json!({}),
        Some(value) if value.is_object() => value,
        Some(_) => return Err(AppError::bad_request("config must be a JSON object")),
    };

    let department = db::departments::create(&state.pool, organization_id, name, &config).await?;

    audit::log_event(
        &state.pool,
        Some(organization_id),
        Some(auth.user_id),
        "department.created",
        "department",
        Some(department.id),
        Some(json!({ "name": department.name })),
    )
    .await;

    Ok(Json(department))
}
