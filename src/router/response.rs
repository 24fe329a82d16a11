//! Response envelope
//!
//! Every answer, success or failure, carries the JSON content type and the
//! permissive CORS headers.

use axum::http::StatusCode;
use serde_json::{json, Value};

/// Methods advertised on ordinary responses
pub const ALLOW_METHODS: &str = "GET, POST, DELETE, OPTIONS";

/// Methods advertised on the upgrade answer
pub const UPGRADE_ALLOW_METHODS: &str = "POST, DELETE";

/// Transport-neutral response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// `Some(true)` asks the proxy to resubmit on the update channel
    pub upgrade: Option<bool>,
}

fn envelope_headers(allow_methods: &str) -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Methods".to_string(),
            allow_methods.to_string(),
        ),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        ),
    ]
}

impl HttpResponse {
    pub fn json(status: StatusCode, body: &Value) -> Self {
        HttpResponse {
            status_code: status.as_u16(),
            headers: envelope_headers(ALLOW_METHODS),
            body: body.to_string().into_bytes(),
            upgrade: None,
        }
    }

    /// 200 with `{"data": payload}`
    pub fn data(payload: Value) -> Self {
        Self::json(StatusCode::OK, &json!({ "data": payload }))
    }

    /// `{"msg": msg}` with the given status
    pub fn message(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::json(status, &json!({ "msg": msg.into() }))
    }

    /// Query-channel answer for a mutating call: empty body, upgrade flag set.
    pub fn upgrade() -> Self {
        HttpResponse {
            status_code: StatusCode::OK.as_u16(),
            headers: envelope_headers(UPGRADE_ALLOW_METHODS),
            body: Vec::new(),
            upgrade: Some(true),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_upgrade(&self) -> bool {
        self.upgrade == Some(true)
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON. `None` for an empty or non-JSON body.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_envelope() {
        let response = HttpResponse::data(json!({"noOfDocs": "2"}));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.upgrade, None);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"data": {"noOfDocs": "2"}})
        );
    }

    #[test]
    fn test_cors_headers() {
        let response = HttpResponse::message(StatusCode::NOT_FOUND, "nope");
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(
            response.header("Access-Control-Allow-Methods"),
            Some("GET, POST, DELETE, OPTIONS")
        );
        assert_eq!(
            response.header("Access-Control-Allow-Headers"),
            Some("Content-Type")
        );
    }

    #[test]
    fn test_upgrade_envelope() {
        let response = HttpResponse::upgrade();
        assert!(response.is_upgrade());
        assert_eq!(response.status_code, 200);
        assert!(response.body.is_empty());
        assert_eq!(
            response.header("Access-Control-Allow-Methods"),
            Some("POST, DELETE")
        );
    }
}
