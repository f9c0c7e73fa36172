pub mod auth;
pub mod departments;
pub mod me;
pub mod setup;
pub mod social;
pub mod staff;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/auth/registration/", post(auth::register))
        .route("/api/auth/login/", post(auth::login))
        .route("/api/auth/logout/", post(auth::logout))
        .route("/api/auth/token/refresh/", post(auth::refresh))
        .route("/api/auth/user/", get(auth::user_details))
        .route("/api/auth/password/change/", post(auth::password_change))
        .route("/api/auth/password/reset/", post(auth::password_reset))
        .route(
            "/api/auth/password/reset/confirm/",
            post(auth::password_reset_confirm),
        )
        .route("/api/auth/google/", post(social::google_login))
        // Onboarding
        .route("/api/setup-organization/", post(setup::setup_organization))
        // Staff
        .route(
            "/api/staff/",
            get(staff::list)
                .post(staff::invite)
                .patch(staff::update_permissions)
                .delete(staff::remove),
        )
        .route("/api/user/me/", get(me::current_user))
        // Departments
        .route(
            "/api/departments/",
            get(departments::list).post(departments::create),
        )
}
