//! Reconciler: restores index consistency after an interrupted write
//!
//! Each region is its own log, so a crash between two region writes leaves
//! the indices disagreeing. Repairs, applied in passes until a pass changes
//! nothing:
//!
//! 1. owner lists drop ids with no `id_to_hash` entry, and ids already
//!    listed under another owner
//! 2. `id_to_hash` drops entries whose hash has no document
//! 3. `id_to_hash` drops entries no owner lists
//! 4. `hash_to_document` drops records whose own id no longer maps to them
//!
//! Finally the counter is raised above every id any region referenced,
//! including ids the repairs just removed.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::observability::{log_event_with_fields, Event};

use super::document::DocumentId;
use super::errors::RegistryResult;
use super::store::{DocumentStore, NEXT_ID_KEY};

/// Upper bound on repair passes. Every productive pass removes at least one
/// entry, so this is only reached on a store too large to have been written
/// by this process.
const MAX_PASSES: u32 = 64;

/// What the reconciler changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Owner-list ids with no `id_to_hash` entry
    pub dangling_owner_ids: u64,
    /// Ids listed under more than one owner (later listings dropped)
    pub duplicate_owner_ids: u64,
    /// `id_to_hash` entries whose hash had no document
    pub orphaned_ids: u64,
    /// `id_to_hash` entries no owner listed
    pub unowned_ids: u64,
    /// Documents whose id no longer mapped to their hash
    pub stale_documents: u64,
    /// Counter value before repair, if it had to be raised
    pub counter_raised_from: Option<u64>,
    pub passes: u32,
}

impl ReconcileReport {
    /// Total number of entries removed
    pub fn repairs(&self) -> u64 {
        self.dangling_owner_ids
            + self.duplicate_owner_ids
            + self.orphaned_ids
            + self.unowned_ids
            + self.stale_documents
    }

    pub fn is_clean(&self) -> bool {
        self.repairs() == 0 && self.counter_raised_from.is_none()
    }
}

pub struct Reconciler;

impl Reconciler {
    /// Repairs `store` in place.
    pub fn run(store: &mut DocumentStore) -> RegistryResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let highest_seen = Self::highest_id(store);

        while report.passes < MAX_PASSES {
            report.passes += 1;
            let before = report.repairs();

            Self::repair_owner_lists(store, &mut report)?;
            Self::repair_orphaned_ids(store, &mut report)?;
            Self::repair_unowned_ids(store, &mut report)?;
            Self::repair_stale_documents(store, &mut report)?;

            if report.repairs() == before {
                break;
            }
        }

        Self::repair_counter(store, highest_seen, &mut report)?;

        if !report.is_clean() {
            log_event_with_fields(
                Event::StoreReconciled,
                &[
                    ("dangling_owner_ids", &report.dangling_owner_ids.to_string()),
                    ("duplicate_owner_ids", &report.duplicate_owner_ids.to_string()),
                    ("orphaned_ids", &report.orphaned_ids.to_string()),
                    ("unowned_ids", &report.unowned_ids.to_string()),
                    ("stale_documents", &report.stale_documents.to_string()),
                    ("next_id", &store.next_id.to_string()),
                ],
            );
        }

        Ok(report)
    }

    fn repair_owner_lists(
        store: &mut DocumentStore,
        report: &mut ReconcileReport,
    ) -> RegistryResult<()> {
        let mut claimed: BTreeSet<DocumentId> = BTreeSet::new();
        let mut rewrites = Vec::new();

        for (owner, ids) in store.owner_to_ids.iter() {
            let mut kept = Vec::with_capacity(ids.len());
            for id in ids {
                if !store.id_to_hash.contains_key(id) {
                    report.dangling_owner_ids += 1;
                } else if !claimed.insert(*id) {
                    report.duplicate_owner_ids += 1;
                } else {
                    kept.push(*id);
                }
            }
            if kept.len() != ids.len() {
                rewrites.push((owner.clone(), kept));
            }
        }

        for (owner, kept) in rewrites {
            if kept.is_empty() {
                store.owner_to_ids.remove(&owner)?;
            } else {
                store.owner_to_ids.insert(owner, kept)?;
            }
        }
        Ok(())
    }

    fn repair_orphaned_ids(
        store: &mut DocumentStore,
        report: &mut ReconcileReport,
    ) -> RegistryResult<()> {
        let orphaned: Vec<DocumentId> = store
            .id_to_hash
            .iter()
            .filter(|(_, hash)| !store.hash_to_document.contains_key(hash))
            .map(|(id, _)| *id)
            .collect();

        for id in orphaned {
            store.id_to_hash.remove(&id)?;
            report.orphaned_ids += 1;
        }
        Ok(())
    }

    fn repair_unowned_ids(
        store: &mut DocumentStore,
        report: &mut ReconcileReport,
    ) -> RegistryResult<()> {
        let owned: BTreeSet<DocumentId> = store
            .owner_to_ids
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();

        let unowned: Vec<DocumentId> = store
            .id_to_hash
            .iter()
            .filter(|(id, _)| !owned.contains(*id))
            .map(|(id, _)| *id)
            .collect();

        for id in unowned {
            store.id_to_hash.remove(&id)?;
            report.unowned_ids += 1;
        }
        Ok(())
    }

    fn repair_stale_documents(
        store: &mut DocumentStore,
        report: &mut ReconcileReport,
    ) -> RegistryResult<()> {
        let stale: Vec<_> = store
            .hash_to_document
            .iter()
            .filter(|(hash, doc)| store.id_to_hash.get(&doc.id).as_ref() != Some(*hash))
            .map(|(hash, _)| hash.clone())
            .collect();

        for hash in stale {
            store.hash_to_document.remove(&hash)?;
            report.stale_documents += 1;
        }
        Ok(())
    }

    /// Largest id referenced by any region, before repairs discard it.
    fn highest_id(store: &DocumentStore) -> Option<u64> {
        store
            .id_to_hash
            .iter()
            .map(|(id, _)| id.value())
            .chain(store.hash_to_document.iter().map(|(_, doc)| doc.id.value()))
            .chain(
                store
                    .owner_to_ids
                    .iter()
                    .flat_map(|(_, ids)| ids.iter().map(|id| id.value())),
            )
            .max()
    }

    fn repair_counter(
        store: &mut DocumentStore,
        highest_seen: Option<u64>,
        report: &mut ReconcileReport,
    ) -> RegistryResult<()> {
        if let Some(highest) = highest_seen {
            if store.next_id <= highest {
                report.counter_raised_from = Some(store.next_id);
                store.next_id = highest.saturating_add(1);
            }
        }

        if store.meta.get(&NEXT_ID_KEY.to_string()) != Some(store.next_id) && store.next_id > 0 {
            store.meta.insert(NEXT_ID_KEY.to_string(), store.next_id)?;
        }
        Ok(())
    }
}
