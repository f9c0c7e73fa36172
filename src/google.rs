//! Minimal Google OAuth 2.0 client: authorization-code exchange and userinfo.

use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;

#[derive(Debug)]
pub enum OAuthError {
    NotConfigured,
    Http(reqwest::Error),
    Google(String),
    Parse(String),
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OAuthError::NotConfigured => write!(f, "Google OAuth client is not configured"),
            OAuthError::Http(e) => write!(f, "HTTP request failed: {e}"),
            OAuthError::Google(msg) => write!(f, "Google rejected the request: {msg}"),
            OAuthError::Parse(msg) => write!(f, "Unexpected response: {msg}"),
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        OAuthError::Http(err)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
}

/// Profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorResponse {
    error: String,
    error_description: Option<String>,
}

pub struct GoogleOAuthClient {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { config, http }
    }

    /// Exchanges an authorization code for tokens. Needs client credentials.
    #[tracing::instrument(skip(self, code), name = "GoogleOAuthClient::exchange_code")]
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokenResponse, OAuthError> {
        let (Some(client_id), Some(client_secret)) =
            (&self.config.client_id, &self.config.client_secret)
        else {
            return Err(OAuthError::NotConfigured);
        };

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let body = response.text().await?;

        if let Ok(error) = serde_json::from_str::<GoogleErrorResponse>(&body) {
            if !error.error.is_empty() {
                return Err(OAuthError::Google(
                    error.error_description.unwrap_or(error.error),
                ));
            }
        }

        serde_json::from_str(&body)
            .map_err(|e| OAuthError::Parse(format!("failed to parse token response: {e}")))
    }

    #[tracing::instrument(skip(self, access_token), name = "GoogleOAuthClient::get_user_info")]
    pub async fn get_user_info(&self, access_token: &str) -> Result<GoogleUserInfo, OAuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Google(format!("failed to get user info: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::Parse(format!("failed to parse user info response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_info_deserializes_with_missing_optional_fields() {
        let json = r#"{"sub": "1234", "email": "teacher@x.com", "email_verified": true}"#;
        let info: GoogleUserInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.sub, "1234");
        assert!(info.email_verified);
        assert!(info.given_name.is_none());
    }

    #[test]
    fn token_response_ignores_extra_fields() {
        let json = r#"{"access_token": "ya29.x", "expires_in": 3599, "token_type": "Bearer"}"#;
        let token: GoogleTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.x");
    }

    #[tokio::test]
    async fn exchange_code_requires_client_credentials() {
        let client = GoogleOAuthClient::new(GoogleConfig {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:5173".to_string(),
            token_url: "http://127.0.0.1:9/token".to_string(),
            userinfo_url: "http://127.0.0.1:9/userinfo".to_string(),
        });
        assert!(matches!(
            client.exchange_code("code").await,
            Err(OAuthError::NotConfigured)
        ));
    }
}
