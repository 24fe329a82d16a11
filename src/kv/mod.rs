//! Ordered key-value regions for docregistry
//!
//! The registry never talks to a file or a page store directly. It consumes
//! the [`OrderedMap`] trait, which offers get/insert/remove/len/iterate over
//! a durable, ordered map.
//!
//! # Backends
//!
//! - [`MemoryMap`]: `BTreeMap`-backed, used by tests and ephemeral stores
//! - [`LogMap`]: `BTreeMap` cache in front of an append-only, checksummed,
//!   fsynced log file (one file per region)
//!
//! # Invariants
//!
//! - Iteration is always in ascending key order
//! - A mutation is durable before it becomes visible to readers
//! - Checksum failures on replay are fatal, torn tails are truncated

mod errors;
mod log_map;
mod map;
mod memory;
mod record;

pub use errors::{KvError, KvResult};
pub use log_map::LogMap;
pub use map::OrderedMap;
pub use memory::MemoryMap;
pub use record::{compute_checksum, LogEntry};
