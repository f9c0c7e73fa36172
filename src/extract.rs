use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `axum::Json` whose rejections render as `{"error": ...}` with status 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Parses a raw JSON body. Handlers that authorize the caller before looking
/// at the payload take `Bytes` and call this afterwards.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("Request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("Invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        email: Option<String>,
    }

    #[test]
    fn parse_json_reads_valid_body() {
        let payload: Payload = parse_json(&Bytes::from_static(br#"{"email": "a@x.com"}"#)).unwrap();
        assert_eq!(payload.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn parse_json_rejects_empty_and_malformed_bodies() {
        assert!(matches!(
            parse_json::<Payload>(&Bytes::new()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_json::<Payload>(&Bytes::from_static(b"not json")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_json::<Payload>(&Bytes::from_static(br#"{"email": 5}"#)),
            Err(AppError::BadRequest(_))
        ));
    }
}
