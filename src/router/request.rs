//! Typed requests
//!
//! The transport hands over an untyped [`HttpRequest`]. Matching a route
//! turns it into a [`RouteRequest`] whose [`PathVariables`] variant is fixed
//! by the route's [`VariableShape`], so handlers never probe for fields.

use std::fmt;

use serde::Deserialize;

use crate::registry::{ContentHash, DocumentId, OwnerId};

use super::errors::{RouteError, RouteResult};
use super::pattern::Captures;

/// HTTP verb as far as the registry cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Other(raw) => raw,
        }
    }

    /// POST and DELETE must go through the update channel
    pub fn is_mutating(&self) -> bool {
        matches!(self, Method::Post | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two call paths offered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Served without ordering or durability; read-only
    Query,
    /// Ordered, committed; the only path that mutates
    Update,
}

impl Channel {
    /// Label used in client-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Query => "get",
            Channel::Update => "update",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Untyped request as received from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Path plus query string, e.g. `/noOfDocs?canisterId=x`
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        HttpRequest {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> Method {
        Method::parse(&self.method)
    }
}

/// Body of `POST /submit-document`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitPayload {
    pub name: String,
    pub hash: String,
}

impl SubmitPayload {
    pub(crate) fn decode(body: &[u8]) -> RouteResult<Self> {
        let payload: SubmitPayload =
            serde_json::from_slice(body).map_err(|e| RouteError::InvalidBody(e.to_string()))?;
        if payload.hash.is_empty() {
            return Err(RouteError::InvalidBody("hash must not be empty".to_string()));
        }
        Ok(payload)
    }
}

/// Which variables a route binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableShape {
    Empty,
    ByOwner,
    ById,
    ByHash,
}

/// Variables extracted by a matched route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathVariables {
    Empty,
    ByOwner { caller: OwnerId },
    ById { caller: OwnerId, id: DocumentId },
    ByHash { hash: ContentHash },
}

fn capture<'a>(captures: &'a Captures, name: &'static str) -> RouteResult<&'a str> {
    captures
        .get(name)
        .map(String::as_str)
        .ok_or(RouteError::MissingVariable(name))
}

impl VariableShape {
    /// Builds the variables from pattern captures named `caller`, `id`, `hash`.
    pub(crate) fn bind(&self, captures: &Captures) -> RouteResult<PathVariables> {
        match self {
            VariableShape::Empty => Ok(PathVariables::Empty),
            VariableShape::ByOwner => Ok(PathVariables::ByOwner {
                caller: OwnerId::new(capture(captures, "caller")?),
            }),
            VariableShape::ById => {
                let caller = OwnerId::new(capture(captures, "caller")?);
                let raw = capture(captures, "id")?;
                let id = raw.parse().map_err(|_| RouteError::InvalidParameter {
                    name: "documentId".to_string(),
                    value: raw.to_string(),
                })?;
                Ok(PathVariables::ById { caller, id })
            }
            VariableShape::ByHash => Ok(PathVariables::ByHash {
                hash: ContentHash::from_text(capture(captures, "hash")?),
            }),
        }
    }
}

impl PathVariables {
    pub fn caller(&self) -> RouteResult<&OwnerId> {
        match self {
            PathVariables::ByOwner { caller } | PathVariables::ById { caller, .. } => Ok(caller),
            _ => Err(RouteError::MissingVariable("caller")),
        }
    }

    pub fn id(&self) -> RouteResult<DocumentId> {
        match self {
            PathVariables::ById { id, .. } => Ok(*id),
            _ => Err(RouteError::MissingVariable("id")),
        }
    }

    pub fn hash(&self) -> RouteResult<&ContentHash> {
        match self {
            PathVariables::ByHash { hash } => Ok(hash),
            _ => Err(RouteError::MissingVariable("hash")),
        }
    }
}

/// A matched, typed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub variables: PathVariables,
    /// Opaque `canisterId` query value, only logged
    pub canister: Option<String>,
    pub payload: Option<SubmitPayload>,
}

impl RouteRequest {
    pub fn payload(&self) -> RouteResult<&SubmitPayload> {
        self.payload
            .as_ref()
            .ok_or(RouteError::MissingVariable("payload"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captures(pairs: &[(&str, &str)]) -> Captures {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_method_classification() {
        assert_eq!(Method::parse("GET"), Method::Get);
        assert!(Method::parse("POST").is_mutating());
        assert!(Method::parse("DELETE").is_mutating());
        assert!(!Method::parse("GET").is_mutating());
        assert_eq!(Method::parse("PUT"), Method::Other("PUT".to_string()));
        assert!(!Method::parse("PUT").is_mutating());
    }

    #[test]
    fn test_bind_by_id() {
        let vars = VariableShape::ById
            .bind(&captures(&[("caller", "U1"), ("id", "7")]))
            .unwrap();
        assert_eq!(vars.caller().unwrap(), &OwnerId::new("U1"));
        assert_eq!(vars.id().unwrap(), DocumentId(7));
        assert!(vars.hash().is_err());
    }

    #[test]
    fn test_bind_rejects_bad_id() {
        let err = VariableShape::ById
            .bind(&captures(&[("caller", "U1"), ("id", "seven")]))
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidParameter { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bind_missing_capture_is_server_error() {
        let err = VariableShape::ByHash.bind(&captures(&[])).unwrap_err();
        assert!(matches!(err, RouteError::MissingVariable("hash")));
        assert!(err.status_code().is_server_error());
    }

    #[test]
    fn test_submit_payload_decode() {
        let payload = SubmitPayload::decode(br#"{"name":"a.pdf","hash":"H1"}"#).unwrap();
        assert_eq!(payload.name, "a.pdf");
        assert_eq!(payload.hash, "H1");

        assert!(SubmitPayload::decode(b"not json").is_err());
        assert!(SubmitPayload::decode(br#"{"name":"a.pdf"}"#).is_err());
        assert!(SubmitPayload::decode(br#"{"name":"a.pdf","hash":""}"#).is_err());
    }
}
