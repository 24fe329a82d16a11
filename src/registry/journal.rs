//! Undo journal for multi-region writes
//!
//! Every region write made by one `add` or `delete` records the value it
//! replaced. If a later write fails, the journal is replayed backwards so
//! the caches show exactly what they showed before the call.
//!
//! A rollback write can fail too. The remaining entries are still applied
//! and the failure is logged; the reconciler repairs the regions on the
//! next open.

use crate::kv::OrderedMap;
use crate::observability::{log_event_with_fields, Event};

use super::document::{ContentHash, Document, DocumentId, OwnerId};
use super::store::{DocumentStore, NEXT_ID_KEY};

/// Prior state of one region entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Undo {
    Counter { meta: Option<u64>, next_id: u64 },
    IdToHash(DocumentId, Option<ContentHash>),
    HashToDocument(ContentHash, Option<Document>),
    OwnerToIds(OwnerId, Option<Vec<DocumentId>>),
}

impl Undo {
    fn region(&self) -> &'static str {
        match self {
            Undo::Counter { .. } => super::store::META,
            Undo::IdToHash(..) => super::store::ID_TO_HASH,
            Undo::HashToDocument(..) => super::store::HASH_TO_DOCUMENT,
            Undo::OwnerToIds(..) => super::store::OWNER_TO_IDS,
        }
    }
}

/// Writes applied so far by the current operation
#[derive(Debug, Default)]
pub(super) struct Journal {
    entries: Vec<Undo>,
}

impl Journal {
    pub(super) fn record(&mut self, undo: Undo) {
        self.entries.push(undo);
    }

    /// Restores every recorded entry, newest first. Returns the number of
    /// entries that could not be restored.
    pub(super) fn rollback(self, store: &mut DocumentStore, operation: &str) -> usize {
        let mut failed = 0;

        for undo in self.entries.into_iter().rev() {
            let region = undo.region();
            if let Err(e) = restore(store, undo) {
                failed += 1;
                log_event_with_fields(
                    Event::RollbackFailed,
                    &[
                        ("operation", operation),
                        ("region", region),
                        ("error", &e.to_string()),
                    ],
                );
            }
        }

        failed
    }
}

fn put_back<K, V>(map: &mut dyn OrderedMap<K, V>, key: K, prior: Option<V>) -> crate::kv::KvResult<()> {
    match prior {
        Some(value) => map.insert(key, value).map(|_| ()),
        None => map.remove(&key).map(|_| ()),
    }
}

fn restore(store: &mut DocumentStore, undo: Undo) -> crate::kv::KvResult<()> {
    match undo {
        Undo::Counter { meta, next_id } => {
            put_back(store.meta.as_mut(), NEXT_ID_KEY.to_string(), meta)?;
            // Only a restored counter may be handed out again
            store.next_id = next_id;
            Ok(())
        }
        Undo::IdToHash(id, prior) => put_back(store.id_to_hash.as_mut(), id, prior),
        Undo::HashToDocument(hash, prior) => put_back(store.hash_to_document.as_mut(), hash, prior),
        Undo::OwnerToIds(owner, prior) => put_back(store.owner_to_ids.as_mut(), owner, prior),
    }
}
