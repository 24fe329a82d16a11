//! Gateway: the two channel entry points over one shared store
//!
//! Query calls hold the read lock for the whole handler, update calls the
//! write lock, so no query observes a half-applied update.

use std::sync::{Arc, RwLock};

use crate::observability::{Event, MetricsRegistry};
use crate::registry::{Clock, DocumentStore, SystemClock};
use crate::router::{
    query_routes, update_routes, Channel, HttpRequest, HttpResponse, Method, PatternError,
    QueryHandler, RouteError, RouteResult, RouteTable, UpdateHandler,
};

use super::phase::{Call, CallPhase};

pub struct Gateway {
    store: RwLock<DocumentStore>,
    query_routes: RouteTable<QueryHandler>,
    update_routes: RouteTable<UpdateHandler>,
    clock: Box<dyn Clock>,
    metrics: Arc<MetricsRegistry>,
}

impl Gateway {
    /// Gateway over `store`, stamping documents with wall-clock time.
    pub fn new(store: DocumentStore) -> Result<Self, PatternError> {
        Self::with_clock(store, Box::new(SystemClock::new()))
    }

    pub fn with_clock(store: DocumentStore, clock: Box<dyn Clock>) -> Result<Self, PatternError> {
        Ok(Gateway {
            store: RwLock::new(store),
            query_routes: query_routes()?,
            update_routes: update_routes()?,
            clock,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Runs `f` against the store under the read lock.
    pub fn with_store<T>(&self, f: impl FnOnce(&DocumentStore) -> T) -> RouteResult<T> {
        let store = self.store.read().map_err(|_| RouteError::LockPoisoned)?;
        Ok(f(&*store))
    }

    /// Query channel. Never mutates; POST/DELETE are answered with the
    /// upgrade envelope and no handler runs.
    pub fn http_request(&self, req: &HttpRequest) -> HttpResponse {
        let mut call = Call::receive(Channel::Query, req);

        match call.classify() {
            CallPhase::Upgraded => {
                self.metrics.increment_calls_upgraded();
                let response = HttpResponse::upgrade();
                call.log(Event::CallUpgraded, &response, None);
                response
            }
            CallPhase::Served => {
                let result = self.serve_query(&mut call, req);
                self.finish(&call, result)
            }
            _ => self.reject(&call),
        }
    }

    /// Update channel. POST/DELETE only; runs the mutation exactly once.
    pub fn http_request_update(&self, req: &HttpRequest) -> HttpResponse {
        let mut call = Call::receive(Channel::Update, req);

        match call.classify() {
            CallPhase::Served => {
                let result = self.serve_update(&mut call, req);
                self.finish(&call, result)
            }
            _ => self.reject(&call),
        }
    }

    /// Full proxy sequence: query channel first, resubmitted on the update
    /// channel when the answer carries the upgrade flag.
    pub fn handle(&self, req: &HttpRequest) -> HttpResponse {
        let response = self.http_request(req);
        if response.is_upgrade() {
            self.http_request_update(req)
        } else {
            response
        }
    }

    fn serve_query(&self, call: &mut Call, req: &HttpRequest) -> RouteResult<HttpResponse> {
        let (handler, route_req) = self.query_routes.resolve(req)?;
        call.set_canister(route_req.canister.clone());

        let store = self.store.read().map_err(|_| RouteError::LockPoisoned)?;
        handler(&*store, &route_req)
    }

    fn serve_update(&self, call: &mut Call, req: &HttpRequest) -> RouteResult<HttpResponse> {
        // Body is decoded before the write lock is taken
        let (handler, route_req) = self.update_routes.resolve(req)?;
        call.set_canister(route_req.canister.clone());

        let mut store = self.store.write().map_err(|_| RouteError::LockPoisoned)?;
        handler(&mut *store, &route_req, self.clock.as_ref())
    }

    fn reject(&self, call: &Call) -> HttpResponse {
        self.metrics.increment_calls_rejected();
        let err = RouteError::InvalidMethod {
            channel: call.channel(),
        };
        let response = err.into_response();
        call.log(Event::CallRejected, &response, Some(err.code()));
        response
    }

    fn finish(&self, call: &Call, result: RouteResult<HttpResponse>) -> HttpResponse {
        match result {
            Ok(response) => {
                match call.channel() {
                    Channel::Query => self.metrics.increment_queries_served(),
                    Channel::Update => {
                        self.metrics.increment_updates_applied();
                        if response.status_code == 200 {
                            match call.method() {
                                Method::Post => self.metrics.increment_documents_added(),
                                Method::Delete => self.metrics.increment_documents_deleted(),
                                _ => {}
                            }
                        }
                    }
                }
                call.log(Event::CallServed, &response, None);
                response
            }
            Err(err) => {
                let response = err.into_response();
                let event = match &err {
                    RouteError::RouteNotFound { .. } => {
                        self.metrics.increment_routes_not_found();
                        Event::RouteNotFound
                    }
                    e if e.status_code().is_server_error() => {
                        if e.is_inconsistency() {
                            self.metrics.increment_invariant_violations();
                        }
                        Event::CallFailed
                    }
                    _ => Event::CallServed,
                };
                call.log(event, &response, Some(err.code()));
                response
            }
        }
    }
}
