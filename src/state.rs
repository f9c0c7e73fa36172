use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::google::GoogleOAuthClient;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub system_mailer: Option<Arc<SystemMailer>>,
    pub google: GoogleOAuthClient,
    pub login_limiter: LoginRateLimiter,
}

impl AppState {
    pub fn login_url(&self) -> String {
        format!("{}/login", self.config.frontend_url)
    }
}
