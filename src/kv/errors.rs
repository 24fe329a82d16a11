//! Error types for the key-value regions
//!
//! Every storage failure aborts the call that triggered it. Corruption is
//! additionally FATAL: the process must not keep serving from a region whose
//! log failed checksum verification.

use std::io;

use thiserror::Error;

/// Result type for region operations
pub type KvResult<T> = Result<T, KvError>;

/// Region storage errors
#[derive(Debug, Error)]
pub enum KvError {
    /// Disk I/O failure (open, append, fsync, rename)
    #[error("I/O error in region {region}: {context}")]
    Io {
        region: String,
        context: String,
        #[source]
        source: io::Error,
    },

    /// A complete log record failed verification
    #[error("corruption in region {region} at offset {offset}: {reason}")]
    Corruption {
        region: String,
        offset: u64,
        reason: String,
    },

    /// A key or value could not be encoded or decoded
    #[error("codec error in region {region}: {reason}")]
    Codec { region: String, reason: String },
}

impl KvError {
    pub(crate) fn io(region: &str, context: impl Into<String>, source: io::Error) -> Self {
        KvError::Io {
            region: region.to_string(),
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corruption(region: &str, offset: u64, reason: impl Into<String>) -> Self {
        KvError::Corruption {
            region: region.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn codec(region: &str, reason: impl ToString) -> Self {
        KvError::Codec {
            region: region.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            KvError::Io { .. } => "REG_KV_IO_ERROR",
            KvError::Corruption { .. } => "REG_KV_CORRUPTION",
            KvError::Codec { .. } => "REG_KV_CODEC_ERROR",
        }
    }

    /// Corruption means the region can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KvError::Corruption { .. })
    }
}
