use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use bytes::Bytes;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::auth::session::{self, AuthResponse, REFRESH_COOKIE};
use crate::config::RegistrationMode;
use crate::db;
use crate::email::templates::PasswordResetEmail;
use crate::error::{is_unique_violation, AppError};
use crate::extract::{parse_json, ApiJson};
use crate::identity::UserDetails;
use crate::middleware::audit;
use crate::models::User;
use crate::state::SharedState;
use crate::validation::{is_valid_email, normalize_email};

const PASSWORD_RESET_HOURS: i64 = 1;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirmRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(MessageResponse {
            message: message.into(),
        })
    }
}

pub async fn register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.config.registration == RegistrationMode::Closed {
        return Err(AppError::Forbidden(
            "Registration is disabled. Ask your administrator for an invite.".to_string(),
        ));
    }

    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Enter a valid email address."));
    }
    password::validate_new(&req.password1, &req.password2).map_err(AppError::BadRequest)?;

    let pw_hash = password::hash(&req.password1).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;

    if db::users::email_exists(&mut *tx, &email).await? {
        return Err(AppError::bad_request(
            "A user is already registered with this e-mail address.",
        ));
    }

    let user = db::users::create(
        &mut *tx,
        &email,
        Some(&pw_hash),
        req.first_name.trim(),
        req.last_name.trim(),
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

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "User registered");

    audit::log_event(
        &state.pool,
        None,
        Some(user.id),
        "user.registered",
        "user",
        Some(user.id),
        None,
    )
    .await;

    spawn_welcome_email(&state, &user);

    let user = db::users::record_login(&state.pool, user.id).await?;
    session::start(&state, &user).await
}

pub async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = normalize_email(&req.email);

    if state.login_limiter.check(&email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Unable to log in with provided credentials.".to_string());

    let Some(user) = db::users::find_by_email(&state.pool, &email)
        .await?
        .filter(|u| u.is_active)
    else {
        state.login_limiter.record_failure(&email);
        return Err(invalid());
    };

    let valid = password::verify(&req.password, user.password_hash.as_deref())
        .map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&email);
        return Err(invalid());
    }

    state.login_limiter.reset(&email);

    let user = db::users::record_login(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        None,
        Some(user.id),
        "user.login",
        "user",
        Some(user.id),
        None,
    )
    .await;

    session::start(&state, &user).await
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let req: RefreshRequest = if body.is_empty() {
        RefreshRequest::default()
    } else {
        parse_json(&body)?
    };

    let refresh_value = req
        .refresh
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::find_by_hash(&state.pool, &session::hash_token(&refresh_value))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.used || !db::refresh_tokens::mark_used(&state.pool, stored.id).await? {
        tracing::warn!(
            user_id = %stored.user_id,
            "Refresh token reuse detected. Revoking all sessions."
        );
        db::refresh_tokens::delete_all_for_user(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    session::start(&state, &user).await
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        db::refresh_tokens::delete_by_hash(&state.pool, &session::hash_token(cookie.value()))
            .await?;
    }

    Ok((
        session::clear_auth_cookies(),
        MessageResponse::new("Successfully logged out."),
    ))
}

pub async fn user_details(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<UserDetails>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    Ok(Json(UserDetails::load(&state.pool, &user, None).await?))
}

pub async fn password_change(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<PasswordChangeRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    password::validate_new(&req.new_password1, &req.new_password2)
        .map_err(AppError::BadRequest)?;

    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let pw_hash = password::hash(&req.new_password1).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    // Other devices must log in again
    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        None,
        Some(user.id),
        "user.password_changed",
        "user",
        Some(user.id),
        None,
    )
    .await;

    session::start(&state, &user).await
}

pub async fn password_reset(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // Same answer whether or not the email exists
    let response = MessageResponse::new("Password reset e-mail has been sent.");

    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }

    let state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = send_password_reset(&state, &email).await {
            tracing::error!("Password reset for {email} failed: {e}");
        }
    });

    Ok(response)
}

async fn send_password_reset(state: &SharedState, email: &str) -> Result<(), String> {
    let Some(user) = db::users::find_by_email(&state.pool, email)
        .await
        .map_err(|e| e.to_string())?
        .filter(|u| u.is_active)
    else {
        return Ok(());
    };

    let token = session::generate_token();
    db::password_reset_tokens::create(
        &state.pool,
        user.id,
        &session::hash_token(&token),
        Utc::now() + Duration::hours(PASSWORD_RESET_HOURS),
    )
    .await
    .map_err(|e| e.to_string())?;

    let Some(mailer) = &state.system_mailer else {
        tracing::warn!(user_id = %user.id, "System SMTP not configured, password reset email not sent");
        return Ok(());
    };

    let uid = user.id.simple().to_string();
    let reset_url = format!(
        "{}/password-reset/confirm/{uid}/{token}",
        state.config.frontend_url
    );
    let name = user.display_name();
    let reset = PasswordResetEmail {
        name: &name,
        uid: &uid,
        token: &token,
        reset_url: &reset_url,
    };
    mailer.send_password_reset(&user.email, &reset).await
}

pub async fn password_reset_confirm(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let invalid_link = || AppError::bad_request("Invalid or expired reset link.");

    let user_id = Uuid::parse_str(req.uid.trim()).map_err(|_| invalid_link())?;
    password::validate_new(&req.new_password1, &req.new_password2)
        .map_err(AppError::BadRequest)?;

    db::password_reset_tokens::consume(&state.pool, user_id, &session::hash_token(req.token.trim()))
        .await?
        .ok_or_else(invalid_link)?;

    let pw_hash = password::hash(&req.new_password1).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user_id, &pw_hash).await?;
    db::profiles::ensure_for_user(&state.pool, user_id).await?;

    db::password_reset_tokens::invalidate_for_user(&state.pool, user_id).await?;
    db::refresh_tokens::delete_all_for_user(&state.pool, user_id).await?;

    audit::log_event(
        &state.pool,
        None,
        Some(user_id),
        "user.password_reset",
        "user",
        Some(user_id),
        None,
    )
    .await;

    Ok(MessageResponse::new(
        "Password has been reset with the new password.",
    ))
}

/// Sends the signup welcome email in the background. Failures are only logged.
pub(crate) fn spawn_welcome_email(state: &SharedState, user: &User) {
    let Some(mailer) = state.system_mailer.clone() else {
        return;
    };
    let login_url = state.login_url();
    let email = user.email.clone();
    let name = user.display_name();

    tokio::spawn(async move {
        match mailer.send_welcome(&email, &name, &login_url).await {
            Ok(()) => tracing::info!("Welcome email sent to {email}"),
            Err(e) => tracing::warn!("Failed to send welcome email to {email}: {e}"),
        }
    });
}
