//! Request router
//!
//! Turns an untyped [`HttpRequest`] into a typed [`RouteRequest`] by walking
//! an ordered [`RouteTable`], then runs the bound handler and wraps its
//! result in the [`HttpResponse`] envelope.
//!
//! Successful handler output is `{"data": ...}`. Failures carry `{"msg": ...}`
//! and a status code: 400 for client mistakes, 403 Forbidden, 404 NotFound,
//! 500 for anything internal.

mod errors;
mod handlers;
mod pattern;
mod request;
mod response;
mod table;

pub use errors::{RouteError, RouteResult};
pub use handlers::{query_routes, update_routes, QueryHandler, UpdateHandler};
pub use pattern::{Captures, PatternError, RoutePattern};
pub use request::{
    Channel, HttpRequest, Method, PathVariables, RouteRequest, SubmitPayload, VariableShape,
};
pub use response::{HttpResponse, ALLOW_METHODS, UPGRADE_ALLOW_METHODS};
pub use table::RouteTable;
