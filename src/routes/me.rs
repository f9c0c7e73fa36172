use axum::extract::State;
use axum::Json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::identity::CurrentUser;
use crate::state::SharedState;

/// `GET /api/user/me/`
pub async fn current_user(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<CurrentUser>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let profile = db::profiles::find_by_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

    let organization_name = match profile.organization_id {
        Some(org_id) => db::organizations::find_by_id(&state.pool, org_id)
            .await?
            .map(|org| org.name),
        None => None,
    };

    Ok(Json(CurrentUser::new(&user, &profile, organization_name)))
}
