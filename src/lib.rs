//! docregistry - a content-hash document registry
//!
//! Owners register document hashes; anyone can verify a hash; only owners
//! can list, view, or delete their own documents.
//!
//! Layers, leaves first:
//!
//! - [`kv`]: ordered key-value regions (in-memory and append-only log)
//! - [`registry`]: the three indices, ownership checks, crash repair
//! - [`router`]: route patterns, ordered route tables, response envelope
//! - [`protocol`]: query/update call phases and the gateway
//! - [`http_server`]: axum adapter driving the gateway
//! - [`cli`]: `init`, `serve`, `call`, `check`

pub mod cli;
pub mod http_server;
pub mod kv;
pub mod observability;
pub mod protocol;
pub mod registry;
pub mod router;
