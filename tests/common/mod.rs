use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use edusphere::config::{Config, GoogleConfig, RegistrationMode};
use edusphere::email::{MailTransport, SystemMailer};

pub const PASSWORD: &str = "password123";

/// Keeps every message instead of talking to an SMTP server.
#[derive(Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<lettre::Message>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, message: lettre::Message) -> Result<(), String> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// A recorded message, reduced to what tests look at.
pub struct SentMail {
    pub subject: String,
    /// Raw message with quoted-printable soft breaks undone.
    pub body: String,
}

impl RecordingTransport {
    /// Envelope recipients of every recorded message, in send order.
    pub fn recipients(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .flat_map(|m| m.envelope().to().iter().map(|a| a.to_string()))
            .collect()
    }

    pub fn sent_to(&self, email: &str) -> Vec<SentMail> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.envelope().to().iter().any(|a| a.to_string() == email))
            .map(|m| SentMail {
                subject: m.headers().get_raw("Subject").unwrap_or_default().to_string(),
                body: String::from_utf8_lossy(&m.formatted())
                    .replace("=\r\n", "")
                    .replace("=3D", "="),
            })
            .collect()
    }

    /// Waits for a background email whose subject starts with `subject`.
    pub async fn wait_for(&self, email: &str, subject: &str) -> SentMail {
        for _ in 0..100 {
            if let Some(mail) = self
                .sent_to(email)
                .into_iter()
                .find(|m| m.subject.starts_with(subject))
            {
                return mail;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("no '{subject}' email sent to {email}");
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub mail: Arc<RecordingTransport>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post(
            "/api/auth/registration/",
            &json!({
                "email": email,
                "password1": password,
                "password2": password,
                "first_name": "",
                "last_name": "",
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post(
            "/api/auth/login/",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register a user and return its access token.
    pub async fn register_and_login(&self, email: &str) -> String {
        let (body, status) = self.register(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["access"].as_str().unwrap().to_string()
    }

    /// Register a user, set up an organization for it and return the
    /// admin's access token plus the organization id.
    pub async fn setup_org(&self, email: &str, org_name: &str) -> (String, String) {
        let token = self.register_and_login(email).await;
        let (body, status) = self
            .post_auth(
                "/api/setup-organization/",
                &token,
                &json!({ "name": org_name, "type": "School", "designation": "Principal" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "setup failed: {body}");
        (token, body["org_id"].as_str().unwrap().to_string())
    }

    pub async fn user_id(&self, email: &str) -> Uuid {
        sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .expect("user not found")
    }

    pub async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PATCH request with JSON body.
    pub async fn patch_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("patch request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Stands in for Google's userinfo endpoint. The bearer token is the email
/// to report; tokens starting with `unverified` report an unverified email.
async fn fake_userinfo(headers: HeaderMap) -> Result<Json<Value>, AxumStatus> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AxumStatus::UNAUTHORIZED)?;

    Ok(Json(json!({
        "sub": format!("google-{token}"),
        "email": token,
        "email_verified": !token.starts_with("unverified"),
        "given_name": "Google",
        "family_name": "User",
    })))
}

/// Stands in for Google's token endpoint. The code is handed back as the
/// access token, so `code` plays the same role as `access_token`.
async fn fake_token(Form(form): Form<HashMap<String, String>>) -> Result<Json<Value>, AxumStatus> {
    if form.get("grant_type").map(String::as_str) != Some("authorization_code")
        || form.get("client_id").map(String::as_str) != Some("test-client")
    {
        return Err(AxumStatus::BAD_REQUEST);
    }
    let code = form.get("code").ok_or(AxumStatus::BAD_REQUEST)?;
    if code == "expired" {
        return Ok(Json(json!({
            "error": "invalid_grant",
            "error_description": "Bad Request",
        })));
    }
    Ok(Json(json!({ "access_token": code, "expires_in": 3599, "token_type": "Bearer" })))
}

async fn spawn_fake_google() -> SocketAddr {
    let app = Router::new()
        .route("/token", post(fake_token))
        .route("/userinfo", get(fake_userinfo));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake google");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake google failed");
    });
    addr
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("edusphere_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let google_addr = spawn_fake_google().await;

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        frontend_url: "http://localhost:5173".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        registration: RegistrationMode::Open,
        max_body_size: 1_048_576,
        cookie_secure: false,
        log_level: "warn".to_string(),
        smtp: None,
        google: GoogleConfig {
            client_id: Some("test-client".to_string()),
            client_secret: Some("test-secret".to_string()),
            redirect_uri: "http://localhost:5173".to_string(),
            token_url: format!("http://{google_addr}/token"),
            userinfo_url: format!("http://{google_addr}/userinfo"),
        },
    };

    let mail = Arc::new(RecordingTransport::default());
    let mailer = SystemMailer::with_transport(mail.clone(), "EduSphere <no-reply@edusphere.test>")
        .expect("valid from address");

    let (app, _state) =
        edusphere::build_app_with_mailer(pool.clone(), config, Some(Arc::new(mailer)));

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        mail,
    }
}

/// Drop stale test databases (useful after test crashes).
#[allow(dead_code)]
pub async fn cleanup_stale_test_dbs() {
    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    if let Ok(admin_pool) = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
    {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datname LIKE 'edusphere_test_%'",
        )
        .fetch_all(&admin_pool)
        .await
        .unwrap_or_default();

        for db_name in rows {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
                .execute(&admin_pool)
                .await;
        }
        admin_pool.close().await;
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
