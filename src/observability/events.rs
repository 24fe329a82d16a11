//! Observable events for docregistry
//!
//! Events are explicit and typed. Each event carries its own severity so
//! call sites never pick one ad hoc.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Process startup begins
    BootStart,
    /// Startup complete, ready to serve
    BootComplete,
    /// Configuration loaded
    ConfigLoaded,
    /// HTTP listener bound
    ServerListening,
    /// Clean shutdown finished
    ShutdownComplete,

    // Regions
    /// All registry regions opened and replayed
    StoreOpened,
    /// Reconciler repaired an interrupted write
    StoreReconciled,
    /// A torn record was cut from the end of a region log
    LogTailTruncated,
    /// A region log was rewritten without dead records
    LogCompacted,

    // Documents
    /// Document registered
    DocumentAdded,
    /// Document removed from all indices
    DocumentDeleted,
    /// A new document replaced an existing record with the same hash
    HashOverwritten,
    /// A failed write could not be fully undone
    RollbackFailed,

    // Calls
    /// Call answered on its channel
    CallServed,
    /// Mutating call redirected to the update channel
    CallUpgraded,
    /// Call refused before routing (method not allowed on channel)
    CallRejected,
    /// Call aborted by an internal error
    CallFailed,
    /// No route matched
    RouteNotFound,
    /// Indices disagree with each other (FATAL)
    InvariantViolation,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "REGISTRY_STARTUP_BEGIN",
            Event::BootComplete => "REGISTRY_STARTUP_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ServerListening => "SERVER_LISTENING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::StoreOpened => "STORE_OPENED",
            Event::StoreReconciled => "STORE_RECONCILED",
            Event::LogTailTruncated => "LOG_TAIL_TRUNCATED",
            Event::LogCompacted => "LOG_COMPACTED",

            Event::DocumentAdded => "DOCUMENT_ADDED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::HashOverwritten => "HASH_OVERWRITTEN",
            Event::RollbackFailed => "ROLLBACK_FAILED",

            Event::CallServed => "CALL_SERVED",
            Event::CallUpgraded => "CALL_UPGRADED",
            Event::CallRejected => "CALL_REJECTED",
            Event::CallFailed => "CALL_FAILED",
            Event::RouteNotFound => "ROUTE_NOT_FOUND",
            Event::InvariantViolation => "INVARIANT_VIOLATION",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::InvariantViolation => Severity::Fatal,
            Event::CallFailed | Event::RollbackFailed => Severity::Error,
            Event::StoreReconciled
            | Event::LogTailTruncated
            | Event::HashOverwritten
            | Event::CallRejected
            | Event::RouteNotFound => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
