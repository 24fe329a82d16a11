//! Registry errors
//!
//! Normal misses (`NotFound`, `Forbidden`) are outcome variants, not errors.
//! Everything here aborts the call.

use thiserror::Error;

use crate::kv::KvError;
use crate::observability::{log_event_with_fields, Event};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The region backend failed to make a change durable
    #[error("storage failure: {0}")]
    Storage(#[from] KvError),

    /// An owned id resolved to no hash, or a hash to no document
    #[error("internal inconsistency: {detail}")]
    InternalInconsistency { detail: String },
}

impl RegistryError {
    /// Builds an inconsistency error and records the violation.
    pub(crate) fn inconsistency(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        log_event_with_fields(Event::InvariantViolation, &[("detail", &detail)]);
        RegistryError::InternalInconsistency { detail }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Storage(e) => e.code(),
            RegistryError::InternalInconsistency { .. } => "REG_INTERNAL_INCONSISTENCY",
        }
    }

    pub fn is_inconsistency(&self) -> bool {
        matches!(self, RegistryError::InternalInconsistency { .. })
    }
}
