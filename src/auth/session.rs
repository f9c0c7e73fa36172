use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::auth::jwt::{self, Claims, ACCESS_TOKEN_MINUTES};
use crate::db;
use crate::error::AppError;
use crate::identity::UserDetails;
use crate::models::User;
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "edusphere-auth";
pub const REFRESH_COOKIE: &str = "edusphere-refresh";
pub const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Serialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserDetails,
}

pub fn auth_cookies(access_token: &str, refresh_token: &str, secure: bool) -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ACCESS_TOKEN_MINUTES))
        .build();

    let refresh = Cookie::build((REFRESH_COOKIE, refresh_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(REFRESH_TOKEN_DAYS))
        .build();

    CookieJar::new().add(access).add(refresh)
}

pub fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build((REFRESH_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

/// 32 random bytes, hex encoded. Used for refresh and password reset tokens.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issues an access/refresh pair for `user` and builds the login response.
pub async fn start(
    state: &AppState,
    user: &User,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let profile = db::profiles::ensure_for_user(&state.pool, user.id).await?;

    let claims = Claims::new(user.id, &user.email);
    let access = jwt::encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    let refresh = generate_token();
    db::refresh_tokens::create(
        &state.pool,
        user.id,
        &hash_token(&refresh),
        Utc::now() + Duration::days(REFRESH_TOKEN_DAYS),
    )
    .await?;

    let details = UserDetails::load(&state.pool, user, Some(&profile)).await?;

    let jar = auth_cookies(&access, &refresh, state.config.cookie_secure);
    Ok((
        jar,
        Json(AuthResponse {
            access,
            refresh,
            user: details,
        }),
    ))
}
