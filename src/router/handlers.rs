//! Route handlers and the two route tables
//!
//! Query handlers get a shared borrow of the store and cannot mutate it.
//! Only update handlers, reachable from the update channel, get `&mut`.

use axum::http::StatusCode;
use serde_json::json;

use crate::registry::{
    Clock, ContentHash, DeleteOutcome, DocumentStore, OwnerId, VerifyOutcome, ViewOutcome,
};

use super::errors::RouteResult;
use super::pattern::PatternError;
use super::request::{Channel, Method, RouteRequest, VariableShape};
use super::response::HttpResponse;
use super::table::RouteTable;

pub type QueryHandler = fn(&DocumentStore, &RouteRequest) -> RouteResult<HttpResponse>;
pub type UpdateHandler =
    fn(&mut DocumentStore, &RouteRequest, &dyn Clock) -> RouteResult<HttpResponse>;

/// GET routes served on the query channel.
pub fn query_routes() -> Result<RouteTable<QueryHandler>, PatternError> {
    RouteTable::new(Channel::Query)
        .route(
            Method::Get,
            "/noOfDocs?canisterId=(:canister)",
            VariableShape::Empty,
            count as QueryHandler,
        )?
        .route(
            Method::Get,
            "/your-documents/get-docs?canisterId=(:canister)&callerId=:caller",
            VariableShape::ByOwner,
            list_owned,
        )?
        .route(
            Method::Get,
            "/your-documents/view-doc?canisterId=(:canister)&callerId=:caller&documentId=:id",
            VariableShape::ById,
            view_by_id,
        )?
        .route(
            Method::Get,
            "/verify-document?canisterId=(:canister)&docHash=:hash",
            VariableShape::ByHash,
            verify_by_hash,
        )
}

/// POST/DELETE routes served on the update channel.
pub fn update_routes() -> Result<RouteTable<UpdateHandler>, PatternError> {
    RouteTable::new(Channel::Update)
        .route_with_payload(
            Method::Post,
            "/submit-document?canisterId=(:canister)&callerId=:caller",
            VariableShape::ByOwner,
            add as UpdateHandler,
        )?
        .route(
            Method::Delete,
            "/your-documents/delete-doc?canisterId=(:canister)&callerId=:caller&documentId=:id",
            VariableShape::ById,
            delete_by_id,
        )
}

fn count(store: &DocumentStore, _req: &RouteRequest) -> RouteResult<HttpResponse> {
    Ok(HttpResponse::data(
        json!({ "noOfDocs": store.count().to_string() }),
    ))
}

fn list_owned(store: &DocumentStore, req: &RouteRequest) -> RouteResult<HttpResponse> {
    let docs: Vec<String> = store
        .list_owned(req.variables.caller()?)
        .iter()
        .map(|id| id.to_string())
        .collect();
    Ok(HttpResponse::data(json!({ "docs": docs })))
}

fn view_by_id(store: &DocumentStore, req: &RouteRequest) -> RouteResult<HttpResponse> {
    let id = req.variables.id()?;
    let response = match store.view_by_id(req.variables.caller()?, id)? {
        ViewOutcome::Found {
            id,
            name,
            created_at,
        } => HttpResponse::data(json!({
            "id": id.to_string(),
            "name": name,
            "createdAt": created_at.to_string(),
        })),
        ViewOutcome::Forbidden => HttpResponse::message(
            StatusCode::FORBIDDEN,
            format!("you do not have access to document with id={}", id),
        ),
        ViewOutcome::NotFound => HttpResponse::message(
            StatusCode::NOT_FOUND,
            format!("document with id={} not found", id),
        ),
    };
    Ok(response)
}

fn verify_by_hash(store: &DocumentStore, req: &RouteRequest) -> RouteResult<HttpResponse> {
    let hash = req.variables.hash()?;
    let response = match store.verify_by_hash(hash) {
        VerifyOutcome::Found {
            name,
            owner,
            created_at,
        } => HttpResponse::data(json!({
            "name": name,
            "owner": owner.as_str(),
            "createdAt": created_at.to_string(),
        })),
        VerifyOutcome::NotFound => HttpResponse::message(
            StatusCode::NOT_FOUND,
            format!("document with hash={} not found", hash),
        ),
    };
    Ok(response)
}

fn add(store: &mut DocumentStore, req: &RouteRequest, clock: &dyn Clock) -> RouteResult<HttpResponse> {
    let owner: OwnerId = req.variables.caller()?.clone();
    let payload = req.payload()?;

    let document = store.add(
        owner,
        payload.name.clone(),
        ContentHash::from_text(&payload.hash),
        clock.now_nanos(),
    )?;

    Ok(HttpResponse::data(json!({
        "id": document.id.to_string(),
        "product": {
            "name": document.name,
            "hash": document.hash.to_text(),
        },
    })))
}

fn delete_by_id(
    store: &mut DocumentStore,
    req: &RouteRequest,
    _clock: &dyn Clock,
) -> RouteResult<HttpResponse> {
    let id = req.variables.id()?;
    let response = match store.delete_by_id(req.variables.caller()?, id)? {
        DeleteOutcome::Deleted { name, hash } => HttpResponse::data(json!({
            "doc": name,
            "hash": hash.to_text(),
            "deleted": true,
        })),
        DeleteOutcome::Forbidden => HttpResponse::message(
            StatusCode::FORBIDDEN,
            format!("cannot delete doc with id={} as you do not have access", id),
        ),
        DeleteOutcome::NotFound => HttpResponse::message(
            StatusCode::NOT_FOUND,
            format!("couldn't delete doc with id={}. there is no such document", id),
        ),
    };
    Ok(response)
}
