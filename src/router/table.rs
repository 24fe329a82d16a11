//! Ordered route tables
//!
//! Patterns are not guaranteed disjoint, so lookup walks the table in
//! insertion order and the first route whose method and pattern both match
//! wins.

use axum::http::Uri;

use super::errors::{RouteError, RouteResult};
use super::pattern::{PatternError, RoutePattern};
use super::request::{Channel, HttpRequest, Method, RouteRequest, SubmitPayload, VariableShape};

struct Route<H> {
    method: Method,
    pattern: RoutePattern,
    shape: VariableShape,
    /// Decode the body as [`SubmitPayload`]
    payload: bool,
    handler: H,
}

/// Routes of one channel
pub struct RouteTable<H> {
    channel: Channel,
    routes: Vec<Route<H>>,
}

impl<H: Copy> RouteTable<H> {
    pub fn new(channel: Channel) -> Self {
        RouteTable {
            channel,
            routes: Vec::new(),
        }
    }

    /// Appends a route without a body.
    pub fn route(
        self,
        method: Method,
        template: &str,
        shape: VariableShape,
        handler: H,
    ) -> Result<Self, PatternError> {
        self.push(method, template, shape, false, handler)
    }

    /// Appends a route whose body must decode as `{name, hash}`.
    pub fn route_with_payload(
        self,
        method: Method,
        template: &str,
        shape: VariableShape,
        handler: H,
    ) -> Result<Self, PatternError> {
        self.push(method, template, shape, true, handler)
    }

    fn push(
        mut self,
        method: Method,
        template: &str,
        shape: VariableShape,
        payload: bool,
        handler: H,
    ) -> Result<Self, PatternError> {
        self.routes.push(Route {
            method,
            pattern: RoutePattern::compile(template)?,
            shape,
            payload,
            handler,
        });
        Ok(self)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the first matching route and builds its typed request.
    pub fn resolve(&self, req: &HttpRequest) -> RouteResult<(H, RouteRequest)> {
        let not_found = || RouteError::RouteNotFound {
            channel: self.channel,
        };

        let uri: Uri = req.url.parse().map_err(|_| not_found())?;
        let method = req.method();

        for route in &self.routes {
            if route.method != method {
                continue;
            }
            let Some(mut captures) = route.pattern.match_uri(&uri) else {
                continue;
            };

            let variables = route.shape.bind(&captures)?;
            let payload = if route.payload {
                Some(SubmitPayload::decode(&req.body)?)
            } else {
                None
            };

            return Ok((
                route.handler,
                RouteRequest {
                    variables,
                    canister: captures.remove("canister"),
                    payload,
                },
            ));
        }

        Err(not_found())
    }
}
