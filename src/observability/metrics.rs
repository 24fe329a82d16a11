//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the registry process.
///
/// All counters use Relaxed ordering; a snapshot is not a consistent cut
/// across counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_served: AtomicU64,
    updates_applied: AtomicU64,
    calls_upgraded: AtomicU64,
    calls_rejected: AtomicU64,
    routes_not_found: AtomicU64,
    documents_added: AtomicU64,
    documents_deleted: AtomicU64,
    invariant_violations: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only call answered on the query channel
    pub fn increment_queries_served(&self) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
    }

    /// A call answered on the update channel
    pub fn increment_updates_applied(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_calls_upgraded(&self) {
        self.calls_upgraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_calls_rejected(&self) {
        self.calls_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_routes_not_found(&self) {
        self.routes_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_added(&self) {
        self.documents_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_invariant_violations(&self) {
        self.invariant_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_served: self.queries_served.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            calls_upgraded: self.calls_upgraded.load(Ordering::Relaxed),
            calls_rejected: self.calls_rejected.load(Ordering::Relaxed),
            routes_not_found: self.routes_not_found.load(Ordering::Relaxed),
            documents_added: self.documents_added.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            invariant_violations: self.invariant_violations.load(Ordering::Relaxed),
        }
    }

    /// Export all metrics as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_served: u64,
    pub updates_applied: u64,
    pub calls_upgraded: u64,
    pub calls_rejected: u64,
    pub routes_not_found: u64,
    pub documents_added: u64,
    pub documents_deleted: u64,
    pub invariant_violations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.queries_served, 0);
        assert_eq!(snapshot.updates_applied, 0);
        assert_eq!(snapshot.invariant_violations, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_queries_served();
        registry.increment_queries_served();
        registry.increment_updates_applied();
        registry.increment_calls_upgraded();
        registry.increment_calls_rejected();
        registry.increment_routes_not_found();
        registry.increment_documents_added();
        registry.increment_documents_deleted();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.queries_served, 2);
        assert_eq!(snapshot.updates_applied, 1);
        assert_eq!(snapshot.calls_upgraded, 1);
        assert_eq!(snapshot.calls_rejected, 1);
        assert_eq!(snapshot.routes_not_found, 1);
        assert_eq!(snapshot.documents_added, 1);
        assert_eq!(snapshot.documents_deleted, 1);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_documents_added();

        let json = registry.to_json();
        assert_eq!(json["documents_added"], 1);
        assert_eq!(json["queries_served"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_queries_served();
                    reg.increment_calls_upgraded();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.queries_served, 1000);
        assert_eq!(snapshot.calls_upgraded, 1000);
    }
}
