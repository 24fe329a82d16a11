//! Document registry core
//!
//! Three indices kept mutually consistent by [`DocumentStore`]:
//!
//! - `id_to_hash`: owner-private, the only index queried by id
//! - `hash_to_document`: globally readable, content addressed
//! - `owner_to_ids`: per-owner id list in insertion order
//!
//! plus a `meta` region holding the persisted id counter.
//!
//! # Invariants
//!
//! - Every id in an owner list has an `id_to_hash` entry
//! - Every hash in `id_to_hash` has a document
//! - No id is listed under two owners
//! - Ids are never reused, across restarts included
//! - A delete is observed all-or-nothing by later calls
//! - A failed add or delete leaves every region as it found it
//!
//! A second `add` with an already registered hash replaces the earlier
//! document record. The earlier id keeps its `id_to_hash` entry and now
//! resolves to the newer record.

mod access;
mod clock;
mod document;
mod errors;
mod journal;
mod reconcile;
mod store;

pub use access::AccessControl;
pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{ContentHash, Document, DocumentId, OwnerId};
pub use errors::{RegistryError, RegistryResult};
pub use reconcile::{ReconcileReport, Reconciler};
pub use store::{
    DeleteOutcome, DocumentStore, StoreStats, VerifyOutcome, ViewOutcome, HASH_TO_DOCUMENT,
    ID_TO_HASH, META, NEXT_ID_KEY, OWNER_TO_IDS, REGIONS_DIR,
};
