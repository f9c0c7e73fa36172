use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    /// Where the single-page frontend lives. Email links point here.
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub registration: RegistrationMode,
    pub max_body_size: usize,
    pub cookie_secure: bool,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
    pub google: GoogleConfig,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    Open,
    Closed,
}

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("EDUSPHERE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid EDUSPHERE_HOST: {e}"))?;

        let port: u16 = env_or("EDUSPHERE_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid EDUSPHERE_PORT: {e}"))?;

        let frontend_url = env_or("EDUSPHERE_FRONTEND_URL", "http://localhost:5173")
            .trim_end_matches('/')
            .to_string();

        let cors_origins = parse_list(&env_or(
            "EDUSPHERE_CORS_ORIGINS",
            "http://localhost:5173,http://127.0.0.1:5173",
        ));

        let registration = match env_or("EDUSPHERE_REGISTRATION", "open").as_str() {
            "closed" => RegistrationMode::Closed,
            _ => RegistrationMode::Open,
        };

        let max_body_size: usize = env_or("EDUSPHERE_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid EDUSPHERE_MAX_BODY_SIZE: {e}"))?;

        let cookie_secure = env_or("EDUSPHERE_COOKIE_SECURE", "true") != "false";

        let log_level = env_or("EDUSPHERE_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("EDUSPHERE_SMTP_HOST").ok(),
            std::env::var("EDUSPHERE_SMTP_PORT").ok(),
            std::env::var("EDUSPHERE_SMTP_USER").ok(),
            std::env::var("EDUSPHERE_SMTP_PASS").ok(),
            std::env::var("EDUSPHERE_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid EDUSPHERE_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        let google = GoogleConfig {
            client_id: env_optional("GOOGLE_CLIENT_ID"),
            client_secret: env_optional("GOOGLE_CLIENT_SECRET"),
            redirect_uri: env_or("GOOGLE_REDIRECT_URI", &frontend_url),
            token_url: env_or("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
            userinfo_url: env_or("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            frontend_url,
            cors_origins,
            registration,
            max_body_size,
            cookie_secure,
            log_level,
            smtp,
            google,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_trims_and_drops_empty_entries() {
        let origins = parse_list(" http://a.test/ ,, http://b.test");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn google_config_debug_hides_secret() {
        let config = GoogleConfig {
            client_id: Some("client".to_string()),
            client_secret: Some("hunter2".to_string()),
            redirect_uri: "http://localhost:5173".to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
