//! Router errors
//!
//! Client mistakes map to 400 with the error text as `msg`. Everything else
//! is a 500 whose body never carries internal detail.

use axum::http::StatusCode;
use thiserror::Error;

use crate::registry::RegistryError;

use super::request::Channel;
use super::response::HttpResponse;

/// Result type for routing and handler execution
pub type RouteResult<T> = Result<T, RouteError>;

#[derive(Debug, Error)]
pub enum RouteError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// No route matched method and url
    #[error("{channel} handler not found")]
    RouteNotFound { channel: Channel },

    /// Method not accepted on this channel
    #[error("invalid {channel} method")]
    InvalidMethod { channel: Channel },

    /// POST body is not `{name, hash}` JSON
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// A captured parameter has the wrong shape
    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: String, value: String },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// A handler asked for a variable its route does not bind
    #[error("route does not bind {0}")]
    MissingVariable(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl RouteError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouteError::RouteNotFound { .. }
            | RouteError::InvalidMethod { .. }
            | RouteError::InvalidBody(_)
            | RouteError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,

            RouteError::MissingVariable(_)
            | RouteError::Registry(_)
            | RouteError::LockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code string, for logs
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::RouteNotFound { .. } => "REG_ROUTE_NOT_FOUND",
            RouteError::InvalidMethod { .. } => "REG_INVALID_METHOD",
            RouteError::InvalidBody(_) => "REG_INVALID_BODY",
            RouteError::InvalidParameter { .. } => "REG_INVALID_PARAMETER",
            RouteError::MissingVariable(_) => "REG_MISSING_VARIABLE",
            RouteError::Registry(e) => e.code(),
            RouteError::LockPoisoned => "REG_LOCK_POISONED",
        }
    }

    /// True when the indices were found to disagree
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, RouteError::Registry(e) if e.is_inconsistency())
    }

    /// Envelope with a `msg` body
    pub fn into_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            HttpResponse::message(status, "internal error")
        } else {
            HttpResponse::message(status, self.to_string())
        }
    }
}
