//! Gateway routes
//!
//! `/health` is answered by axum directly and CORS preflight by the
//! `CorsLayer`. Every other request is converted into an [`HttpRequest`] and
//! driven through [`Gateway::handle`], which plays both the query and the
//! update channel.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::protocol::Gateway;
use crate::router::{HttpRequest, HttpResponse};

/// Router serving the registry through `gateway`
pub fn gateway_routes(gateway: Arc<Gateway>, max_body_bytes: usize) -> Router {
    // Same policy as the envelope headers every gateway answer carries
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            HttpMethod::GET,
            HttpMethod::POST,
            HttpMethod::DELETE,
            HttpMethod::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .fallback(forward_handler)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(gateway)
}

async fn health_handler(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    let documents = gateway.with_store(|store| store.count()).ok();
    let status = if documents.is_some() { "ok" } else { "degraded" };
    let body = json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "documents": documents,
        "metrics": gateway.metrics().to_json(),
    });
    (StatusCode::OK, Json(body))
}

async fn forward_handler(
    State(gateway): State<Arc<Gateway>>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = HttpRequest {
        method: method.as_str().to_string(),
        url: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: body.to_vec(),
    };

    // Update calls fsync under the write lock
    let response = tokio::task::spawn_blocking(move || gateway.handle(&req))
        .await
        .unwrap_or_else(|_| HttpResponse::message(StatusCode::INTERNAL_SERVER_ERROR, "internal error"));

    into_axum(response)
}

fn into_axum(response: HttpResponse) -> Response {
    let mut builder = Response::builder().status(response.status());
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
