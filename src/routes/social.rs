use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::session::{self, AuthResponse};
use crate::db;
use crate::error::{is_unique_violation, AppError};
use crate::extract::ApiJson;
use crate::google::{GoogleUserInfo, OAuthError};
use crate::middleware::audit;
use crate::models::User;
use crate::routes::auth::spawn_welcome_email;
use crate::state::SharedState;
use crate::validation::{non_blank, normalize_email};

const GOOGLE_PROVIDER: &str = "google";

#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    pub access_token: Option<String>,
    pub code: Option<String>,
}

fn oauth_error(err: OAuthError) -> AppError {
    match err {
        OAuthError::NotConfigured => {
            AppError::bad_request("Google login is not configured on this server.")
        }
        other => {
            tracing::warn!("Google login failed: {other}");
            AppError::bad_request("Failed to authenticate with Google.")
        }
    }
}

/// `POST /api/auth/google/`: logs in (or signs up) with a Google account.
pub async fn google_login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let access_token = match (
        non_blank(req.code.as_deref()),
        non_blank(req.access_token.as_deref()),
    ) {
        (Some(code), _) => state.google.exchange_code(code).await.map_err(oauth_error)?.access_token,
        (None, Some(token)) => token.to_string(),
        (None, None) => {
            return Err(AppError::bad_request("access_token or code is required"));
        }
    };

    let info = state
        .google
        .get_user_info(&access_token)
        .await
        .map_err(oauth_error)?;

    if !info.email_verified {
        return Err(AppError::bad_request("Google account email is not verified."));
    }

    let (user, created) = resolve_user(&state, &info).await?;

    if !user.is_active {
        return Err(AppError::Unauthorized("User account is disabled.".to_string()));
    }

    let user = db::users::record_login(&state.pool, user.id).await?;

    if created {
        tracing::info!(user_id = %user.id, "User signed up with Google");
        audit::log_event(
            &state.pool,
            None,
            Some(user.id),
            "user.registered",
            "user",
            Some(user.id),
            Some(serde_json::json!({ "provider": GOOGLE_PROVIDER })),
        )
        .await;
        spawn_welcome_email(&state, &user);
    }

    audit::log_event(
        &state.pool,
        None,
        Some(user.id),
        "user.login",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "provider": GOOGLE_PROVIDER })),
    )
    .await;

    session::start(&state, &user).await
}

/// Finds the local user for a Google identity, linking by email when the
/// account already exists (invited staff) and creating it otherwise.
async fn resolve_user(state: &SharedState, info: &GoogleUserInfo) -> Result<(User, bool), AppError> {
    if let Some(link) = db::social_accounts::find(&state.pool, GOOGLE_PROVIDER, &info.sub).await? {
        if let Some(user) = db::users::find_by_id(&state.pool, link.user_id).await? {
            return Ok((user, false));
        }
    }

    let email = normalize_email(&info.email);

    if let Some(user) = db::users::find_by_email(&state.pool, &email).await? {
        db::social_accounts::link(&state.pool, user.id, GOOGLE_PROVIDER, &info.sub).await?;
        return Ok((user, false));
    }

    let mut tx = state.pool.begin().await?;
    let user = db::users::create(
        &mut *tx,
        &email,
        None,
        info.given_name.as_deref().unwrap_or_default(),
        info.family_name.as_deref().unwrap_or_default(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::bad_request("A user is already registered with this e-mail address.")
        } else {
            AppError::Database(e)
        }
    })?;
    db::profiles::ensure_for_user(&mut *tx, user.id).await?;
    db::social_accounts::link(&mut *tx, user.id, GOOGLE_PROVIDER, &info.sub).await?;
    tx.commit().await?;

    Ok((user, true))
}
