//! DocumentStore: the three indices and the id counter
//!
//! # Write ordering
//!
//! Regions are independent logs, so a multi-region write can be cut short by
//! a crash. The orders below let the reconciler roll an interrupted `add`
//! back and an interrupted `delete` forward:
//!
//! - add: `meta` counter, `hash_to_document`, `id_to_hash`, `owner_to_ids`
//! - delete: `owner_to_ids`, `id_to_hash`, `hash_to_document`

use std::path::Path;

use serde::Serialize;

use crate::kv::{LogMap, MemoryMap, OrderedMap};
use crate::observability::{log_event_with_fields, Event};

use super::access::AccessControl;
use super::document::{ContentHash, Document, DocumentId, OwnerId};
use super::errors::{RegistryError, RegistryResult};
use super::journal::{Journal, Undo};
use super::reconcile::{ReconcileReport, Reconciler};

/// Subdirectory of the data directory holding the region logs
pub const REGIONS_DIR: &str = "regions";

pub const ID_TO_HASH: &str = "id_to_hash";
pub const HASH_TO_DOCUMENT: &str = "hash_to_document";
pub const OWNER_TO_IDS: &str = "owner_to_ids";
pub const META: &str = "meta";

/// Key of the persisted id counter inside the `meta` region
pub const NEXT_ID_KEY: &str = "next_document_id";

/// Result of `verify_by_hash`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Found {
        name: String,
        owner: OwnerId,
        created_at: u64,
    },
    NotFound,
}

/// Result of `view_by_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    Found {
        id: DocumentId,
        name: String,
        created_at: u64,
    },
    Forbidden,
    NotFound,
}

/// Result of `delete_by_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { name: String, hash: ContentHash },
    Forbidden,
    NotFound,
}

/// Region sizes, reported by `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub documents: usize,
    pub hashes: usize,
    pub owners: usize,
    pub next_id: u64,
}

/// Owner of the registry indices.
///
/// No other component mutates the regions. `AccessControl` reads
/// `owner_to_ids` through [`DocumentStore::access`].
pub struct DocumentStore {
    pub(super) id_to_hash: Box<dyn OrderedMap<DocumentId, ContentHash>>,
    pub(super) hash_to_document: Box<dyn OrderedMap<ContentHash, Document>>,
    pub(super) owner_to_ids: Box<dyn OrderedMap<OwnerId, Vec<DocumentId>>>,
    pub(super) meta: Box<dyn OrderedMap<String, u64>>,
    /// Next id to hand out. Mirrors `meta[NEXT_ID_KEY]`.
    pub(super) next_id: u64,
}

impl DocumentStore {
    /// A store over volatile maps. Starts empty with the counter at 0.
    pub fn in_memory() -> Self {
        DocumentStore {
            id_to_hash: Box::new(MemoryMap::new()),
            hash_to_document: Box::new(MemoryMap::new()),
            owner_to_ids: Box::new(MemoryMap::new()),
            meta: Box::new(MemoryMap::new()),
            next_id: 0,
        }
    }

    /// Opens the durable store under `data_dir`, repairing interrupted writes.
    pub fn open(data_dir: &Path) -> RegistryResult<Self> {
        Self::open_checked(data_dir).map(|(store, _)| store)
    }

    /// Like [`DocumentStore::open`], also returning what the reconciler did.
    pub fn open_checked(data_dir: &Path) -> RegistryResult<(Self, ReconcileReport)> {
        let dir = data_dir.join(REGIONS_DIR);

        let mut store = Self::with_regions(
            Box::new(LogMap::<DocumentId, ContentHash>::open(&dir, ID_TO_HASH)?),
            Box::new(LogMap::<ContentHash, Document>::open(&dir, HASH_TO_DOCUMENT)?),
            Box::new(LogMap::<OwnerId, Vec<DocumentId>>::open(&dir, OWNER_TO_IDS)?),
            Box::new(LogMap::<String, u64>::open(&dir, META)?),
        );

        let report = Reconciler::run(&mut store)?;

        log_event_with_fields(
            Event::StoreOpened,
            &[
                ("data_dir", &data_dir.display().to_string()),
                ("documents", &store.count().to_string()),
                ("next_id", &store.next_id.to_string()),
            ],
        );

        Ok((store, report))
    }

    /// A store over caller-supplied regions. The counter is read from
    /// `meta`; no reconciliation runs.
    pub fn with_regions(
        id_to_hash: Box<dyn OrderedMap<DocumentId, ContentHash>>,
        hash_to_document: Box<dyn OrderedMap<ContentHash, Document>>,
        owner_to_ids: Box<dyn OrderedMap<OwnerId, Vec<DocumentId>>>,
        meta: Box<dyn OrderedMap<String, u64>>,
    ) -> Self {
        let next_id = meta.get(&NEXT_ID_KEY.to_string()).unwrap_or(0);
        DocumentStore {
            id_to_hash,
            hash_to_document,
            owner_to_ids,
            meta,
            next_id,
        }
    }

    /// Ownership view over `owner_to_ids`.
    pub fn access(&self) -> AccessControl<'_> {
        AccessControl::new(self.owner_to_ids.as_ref())
    }

    /// Number of entries in `id_to_hash`.
    pub fn count(&self) -> usize {
        self.id_to_hash.len()
    }

    /// Id the next `add` will assign.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            documents: self.id_to_hash.len(),
            hashes: self.hash_to_document.len(),
            owners: self.owner_to_ids.len(),
            next_id: self.next_id,
        }
    }

    /// Registers a document under `owner`.
    ///
    /// The advanced counter is persisted before any index is touched, so a
    /// crash part way through never lets an id be handed out twice.
    ///
    /// If a region write fails, every write already made by this call is
    /// undone, the counter included, and the error is returned. Ids thus
    /// advance only on success. Should the counter itself fail to roll back,
    /// its id stays consumed; it is skipped, never reissued.
    ///
    /// A document whose hash is already registered replaces the earlier
    /// record in `hash_to_document`; the earlier id keeps its `id_to_hash`
    /// entry.
    pub fn add(
        &mut self,
        owner: OwnerId,
        name: String,
        hash: ContentHash,
        now: u64,
    ) -> RegistryResult<Document> {
        let mut journal = Journal::default();
        match self.apply_add(&mut journal, owner, name, hash, now) {
            Ok((document, replaced)) => {
                if let Some(previous) = replaced {
                    log_event_with_fields(
                        Event::HashOverwritten,
                        &[
                            ("hash", &document.hash.to_text()),
                            ("id", &document.id.to_string()),
                            ("previous_id", &previous.to_string()),
                        ],
                    );
                }
                log_event_with_fields(
                    Event::DocumentAdded,
                    &[("id", &document.id.to_string()), ("owner", document.owner.as_str())],
                );
                Ok(document)
            }
            Err(e) => {
                journal.rollback(self, "add");
                Err(e)
            }
        }
    }

    /// The writes of `add`, in crash-safe order. Returns the id of any
    /// record the new document replaced.
    fn apply_add(
        &mut self,
        journal: &mut Journal,
        owner: OwnerId,
        name: String,
        hash: ContentHash,
        now: u64,
    ) -> RegistryResult<(Document, Option<DocumentId>)> {
        let id = DocumentId(self.next_id);
        let next = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| RegistryError::inconsistency("document id counter exhausted"))?;

        let prior = self.meta.insert(NEXT_ID_KEY.to_string(), next)?;
        journal.record(Undo::Counter {
            meta: prior,
            next_id: self.next_id,
        });
        self.next_id = next;

        let document = Document {
            id,
            name,
            hash: hash.clone(),
            created_at: now,
            owner: owner.clone(),
        };

        let replaced = self.hash_to_document.insert(hash.clone(), document.clone())?;
        let replaced_id = replaced.as_ref().map(|doc| doc.id);
        journal.record(Undo::HashToDocument(hash.clone(), replaced));

        let prior = self.id_to_hash.insert(id, hash)?;
        journal.record(Undo::IdToHash(id, prior));

        let prior = self.owner_to_ids.get(&owner);
        let mut ids = prior.clone().unwrap_or_default();
        ids.push(id);
        self.owner_to_ids.insert(owner.clone(), ids)?;
        journal.record(Undo::OwnerToIds(owner, prior));

        Ok((document, replaced_id))
    }

    /// Public lookup by content hash.
    pub fn verify_by_hash(&self, hash: &ContentHash) -> VerifyOutcome {
        match self.hash_to_document.get(hash) {
            Some(doc) => VerifyOutcome::Found {
                name: doc.name,
                owner: doc.owner,
                created_at: doc.created_at,
            },
            None => VerifyOutcome::NotFound,
        }
    }

    /// Ids owned by `owner`, in insertion order.
    pub fn list_owned(&self, owner: &OwnerId) -> Vec<DocumentId> {
        self.owner_to_ids.get(owner).unwrap_or_default()
    }

    pub fn view_by_id(&self, owner: &OwnerId, id: DocumentId) -> RegistryResult<ViewOutcome> {
        if !self.access().owns(owner, id) {
            return Ok(if self.id_to_hash.contains_key(&id) {
                ViewOutcome::Forbidden
            } else {
                ViewOutcome::NotFound
            });
        }

        let (_, document) = self.resolve(id)?;
        Ok(ViewOutcome::Found {
            id,
            name: document.name,
            created_at: document.created_at,
        })
    }

    /// Removes `id` from all three indices.
    ///
    /// Both lookups are resolved before the first removal, so a Forbidden,
    /// NotFound, or inconsistent call leaves every region untouched. A
    /// storage failure part way through is rolled back like in `add`.
    pub fn delete_by_id(&mut self, owner: &OwnerId, id: DocumentId) -> RegistryResult<DeleteOutcome> {
        if !self.access().owns(owner, id) {
            return Ok(if self.id_to_hash.contains_key(&id) {
                DeleteOutcome::Forbidden
            } else {
                DeleteOutcome::NotFound
            });
        }

        let (hash, document) = self.resolve(id)?;

        let mut journal = Journal::default();
        if let Err(e) = self.apply_delete(&mut journal, owner, id, &hash) {
            journal.rollback(self, "delete");
            return Err(e);
        }

        log_event_with_fields(
            Event::DocumentDeleted,
            &[("id", &id.to_string()), ("owner", owner.as_str())],
        );

        Ok(DeleteOutcome::Deleted {
            name: document.name,
            hash,
        })
    }

    fn apply_delete(
        &mut self,
        journal: &mut Journal,
        owner: &OwnerId,
        id: DocumentId,
        hash: &ContentHash,
    ) -> RegistryResult<()> {
        let prior = self.owner_to_ids.get(owner);
        let mut ids = prior.clone().unwrap_or_default();
        ids.retain(|owned| *owned != id);
        if ids.is_empty() {
            self.owner_to_ids.remove(owner)?;
        } else {
            self.owner_to_ids.insert(owner.clone(), ids)?;
        }
        journal.record(Undo::OwnerToIds(owner.clone(), prior));

        let prior = self.id_to_hash.remove(&id)?;
        journal.record(Undo::IdToHash(id, prior));

        let prior = self.hash_to_document.remove(hash)?;
        journal.record(Undo::HashToDocument(hash.clone(), prior));

        Ok(())
    }

    /// id → hash → document for an id that passed the ownership check.
    fn resolve(&self, id: DocumentId) -> RegistryResult<(ContentHash, Document)> {
        let hash = self.id_to_hash.get(&id).ok_or_else(|| {
            RegistryError::inconsistency(format!("owned id {} has no hash", id))
        })?;
        let document = self.hash_to_document.get(&hash).ok_or_else(|| {
            RegistryError::inconsistency(format!("hash of id {} has no document", id))
        })?;
        Ok((hash, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s)
    }

    fn hash(s: &str) -> ContentHash {
        ContentHash::from_text(s)
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut store = DocumentStore::in_memory();
        let a = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 10).unwrap();
        let b = store.add(owner("U2"), "b.pdf".into(), hash("H2"), 11).unwrap();
        let c = store.add(owner("U1"), "c.pdf".into(), hash("H3"), 12).unwrap();

        assert_eq!(a.id, DocumentId(0));
        assert_eq!(b.id, DocumentId(1));
        assert_eq!(c.id, DocumentId(2));
        assert_eq!(store.count(), 3);
        assert_eq!(store.next_id(), 3);
    }

    #[test]
    fn test_add_populates_all_indices() {
        let mut store = DocumentStore::in_memory();
        let doc = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 10).unwrap();

        assert_eq!(store.id_to_hash.get(&doc.id), Some(hash("H1")));
        assert_eq!(store.hash_to_document.get(&hash("H1")), Some(doc.clone()));
        assert_eq!(store.list_owned(&owner("U1")), vec![doc.id]);
        assert_eq!(store.meta.get(&NEXT_ID_KEY.to_string()), Some(1));
    }

    #[test]
    fn test_list_owned_keeps_insertion_order() {
        let mut store = DocumentStore::in_memory();
        store.add(owner("U1"), "a".into(), hash("H1"), 1).unwrap();
        store.add(owner("U2"), "b".into(), hash("H2"), 2).unwrap();
        store.add(owner("U1"), "c".into(), hash("H3"), 3).unwrap();

        assert_eq!(store.list_owned(&owner("U1")), vec![DocumentId(0), DocumentId(2)]);
        assert_eq!(store.list_owned(&owner("U2")), vec![DocumentId(1)]);
        assert!(store.list_owned(&owner("U3")).is_empty());
    }

    #[test]
    fn test_verify_by_hash() {
        let mut store = DocumentStore::in_memory();
        store.add(owner("U1"), "a.pdf".into(), hash("H1"), 77).unwrap();

        assert_eq!(
            store.verify_by_hash(&hash("H1")),
            VerifyOutcome::Found {
                name: "a.pdf".into(),
                owner: owner("U1"),
                created_at: 77
            }
        );
        assert_eq!(store.verify_by_hash(&hash("H2")), VerifyOutcome::NotFound);
    }

    #[test]
    fn test_view_by_id_owner_and_stranger() {
        let mut store = DocumentStore::in_memory();
        let doc = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 5).unwrap();

        assert_eq!(
            store.view_by_id(&owner("U1"), doc.id).unwrap(),
            ViewOutcome::Found {
                id: doc.id,
                name: "a.pdf".into(),
                created_at: 5
            }
        );
        assert_eq!(store.view_by_id(&owner("U2"), doc.id).unwrap(), ViewOutcome::Forbidden);
        assert_eq!(
            store.view_by_id(&owner("U1"), DocumentId(99)).unwrap(),
            ViewOutcome::NotFound
        );
    }

    #[test]
    fn test_delete_removes_from_every_index() {
        let mut store = DocumentStore::in_memory();
        let doc = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 5).unwrap();

        assert_eq!(
            store.delete_by_id(&owner("U1"), doc.id).unwrap(),
            DeleteOutcome::Deleted {
                name: "a.pdf".into(),
                hash: hash("H1")
            }
        );
        assert_eq!(store.count(), 0);
        assert!(store.hash_to_document.is_empty());
        assert!(store.owner_to_ids.is_empty());
        assert_eq!(store.verify_by_hash(&hash("H1")), VerifyOutcome::NotFound);
    }

    #[test]
    fn test_second_delete_is_not_found() {
        let mut store = DocumentStore::in_memory();
        let doc = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 5).unwrap();

        store.delete_by_id(&owner("U1"), doc.id).unwrap();
        assert_eq!(
            store.delete_by_id(&owner("U1"), doc.id).unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[test]
    fn test_forbidden_delete_mutates_nothing() {
        let mut store = DocumentStore::in_memory();
        let doc = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 5).unwrap();

        assert_eq!(
            store.delete_by_id(&owner("U2"), doc.id).unwrap(),
            DeleteOutcome::Forbidden
        );
        assert_eq!(store.count(), 1);
        assert_eq!(store.list_owned(&owner("U1")), vec![doc.id]);
        assert!(matches!(
            store.verify_by_hash(&hash("H1")),
            VerifyOutcome::Found { .. }
        ));
    }

    #[test]
    fn test_delete_keeps_other_owned_ids() {
        let mut store = DocumentStore::in_memory();
        store.add(owner("U1"), "a".into(), hash("H1"), 1).unwrap();
        store.add(owner("U1"), "b".into(), hash("H2"), 2).unwrap();

        store.delete_by_id(&owner("U1"), DocumentId(0)).unwrap();
        assert_eq!(store.list_owned(&owner("U1")), vec![DocumentId(1)]);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut store = DocumentStore::in_memory();
        store.add(owner("U1"), "a".into(), hash("H1"), 1).unwrap();
        store.delete_by_id(&owner("U1"), DocumentId(0)).unwrap();

        let doc = store.add(owner("U1"), "a".into(), hash("H1"), 2).unwrap();
        assert_eq!(doc.id, DocumentId(1));
    }

    #[test]
    fn test_view_detects_missing_document() {
        let mut store = DocumentStore::in_memory();
        let doc = store.add(owner("U1"), "a".into(), hash("H1"), 1).unwrap();
        store.hash_to_document.remove(&hash("H1")).unwrap();

        let err = store.view_by_id(&owner("U1"), doc.id).unwrap_err();
        assert!(err.is_inconsistency());

        // Nothing is removed when resolution fails
        let err = store.delete_by_id(&owner("U1"), doc.id).unwrap_err();
        assert!(err.is_inconsistency());
        assert_eq!(store.list_owned(&owner("U1")), vec![doc.id]);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_duplicate_hash_overwrites_document_record() {
        let mut store = DocumentStore::in_memory();
        store.add(owner("U1"), "first.pdf".into(), hash("H"), 1).unwrap();
        store.add(owner("U2"), "second.pdf".into(), hash("H"), 2).unwrap();

        // Both ids are counted, one document record remains
        assert_eq!(store.count(), 2);
        assert_eq!(store.stats().hashes, 1);
        assert_eq!(
            store.verify_by_hash(&hash("H")),
            VerifyOutcome::Found {
                name: "second.pdf".into(),
                owner: owner("U2"),
                created_at: 2
            }
        );

        // The earlier id now resolves to the later record
        assert_eq!(
            store.view_by_id(&owner("U1"), DocumentId(0)).unwrap(),
            ViewOutcome::Found {
                id: DocumentId(0),
                name: "second.pdf".into(),
                created_at: 2
            }
        );

        // Deleting one orphans the other
        store.delete_by_id(&owner("U2"), DocumentId(1)).unwrap();
        assert!(store
            .view_by_id(&owner("U1"), DocumentId(0))
            .unwrap_err()
            .is_inconsistency());
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = DocumentStore::open(temp.path()).unwrap();
            store.add(owner("U1"), "a".into(), hash("H1"), 1).unwrap();
            store.add(owner("U1"), "b".into(), hash("H2"), 2).unwrap();
            store.delete_by_id(&owner("U1"), DocumentId(1)).unwrap();
        }

        let (mut store, report) = DocumentStore::open_checked(temp.path()).unwrap();
        assert!(report.is_clean());
        assert_eq!(store.count(), 1);
        assert_eq!(store.next_id(), 2);

        let doc = store.add(owner("U1"), "c".into(), hash("H3"), 3).unwrap();
        assert_eq!(doc.id, DocumentId(2));
        assert!(temp.path().join(REGIONS_DIR).join("meta.log").exists());
    }

    // =============================================================================
    // Storage failures
    // =============================================================================

    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::kv::{KvError, KvResult};

    /// Writes a `FailingMap` still accepts before failing. `usize::MAX` never fails.
    type Budget = Arc<AtomicUsize>;

    /// Region whose writes fail once its budget runs out
    struct FailingMap<K, V> {
        inner: MemoryMap<K, V>,
        budget: Budget,
    }

    impl<K, V> FailingMap<K, V>
    where
        K: Ord,
    {
        fn new() -> (Box<Self>, Budget) {
            let budget = Arc::new(AtomicUsize::new(usize::MAX));
            let map = FailingMap {
                inner: MemoryMap::new(),
                budget: Arc::clone(&budget),
            };
            (Box::new(map), budget)
        }

        fn check(&self) -> KvResult<()> {
            let left = self.budget.load(Ordering::SeqCst);
            if left != usize::MAX && left > 0 {
                self.budget.store(left - 1, Ordering::SeqCst);
            }
            if left == 0 {
                return Err(KvError::Io {
                    region: "failing".to_string(),
                    context: "injected write failure".to_string(),
                    source: io::Error::new(io::ErrorKind::Other, "no space left on device"),
                });
            }
            Ok(())
        }
    }

    impl<K, V> OrderedMap<K, V> for FailingMap<K, V>
    where
        K: Ord + Clone + Send + Sync,
        V: Clone + Send + Sync,
    {
        fn get(&self, key: &K) -> Option<V> {
            self.inner.get(key)
        }

        fn insert(&mut self, key: K, value: V) -> KvResult<Option<V>> {
            self.check()?;
            self.inner.insert(key, value)
        }

        fn remove(&mut self, key: &K) -> KvResult<Option<V>> {
            self.check()?;
            self.inner.remove(key)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
            self.inner.iter()
        }
    }

    /// Budgets for the meta, id_to_hash, hash_to_document and owner_to_ids
    /// regions, in that order.
    fn failing_store() -> (DocumentStore, [Budget; 4]) {
        let (meta, meta_budget) = FailingMap::<String, u64>::new();
        let (ids, ids_budget) = FailingMap::<DocumentId, ContentHash>::new();
        let (docs, docs_budget) = FailingMap::<ContentHash, Document>::new();
        let (owners, owners_budget) = FailingMap::<OwnerId, Vec<DocumentId>>::new();
        let store = DocumentStore::with_regions(ids, docs, owners, meta);
        (store, [meta_budget, ids_budget, docs_budget, owners_budget])
    }

    fn fail_after(budget: &Budget, writes: usize) {
        budget.store(writes, Ordering::SeqCst);
    }

    fn heal(budget: &Budget) {
        budget.store(usize::MAX, Ordering::SeqCst);
    }

    #[test]
    fn test_failed_add_restores_overwritten_record() {
        let (mut store, [_, ids, _, _]) = failing_store();
        store.add(owner("U1"), "a.pdf".into(), hash("H"), 1).unwrap();

        fail_after(&ids, 0);
        let err = store
            .add(owner("U2"), "b.pdf".into(), hash("H"), 2)
            .unwrap_err();
        assert_eq!(err.code(), "REG_KV_IO_ERROR");

        // The first record is visible again and no trace of the second remains
        assert_eq!(
            store.verify_by_hash(&hash("H")),
            VerifyOutcome::Found {
                name: "a.pdf".into(),
                owner: owner("U1"),
                created_at: 1
            }
        );
        assert_eq!(store.count(), 1);
        assert!(store.list_owned(&owner("U2")).is_empty());
        assert_eq!(store.next_id(), 1);
        assert_eq!(store.meta.get(&NEXT_ID_KEY.to_string()), Some(1));

        heal(&ids);
        let doc = store.add(owner("U2"), "b.pdf".into(), hash("H2"), 3).unwrap();
        assert_eq!(doc.id, DocumentId(1));
    }

    #[test]
    fn test_failed_owner_write_leaves_nothing_verifiable() {
        let (mut store, [_, _, _, owners]) = failing_store();

        fail_after(&owners, 0);
        assert!(store.add(owner("U1"), "a.pdf".into(), hash("H1"), 1).is_err());

        assert_eq!(store.count(), 0);
        assert_eq!(store.verify_by_hash(&hash("H1")), VerifyOutcome::NotFound);
        assert_eq!(store.next_id(), 0);
        assert_eq!(store.meta.get(&NEXT_ID_KEY.to_string()), None);
    }

    #[test]
    fn test_failed_counter_write_changes_nothing() {
        let (mut store, [meta, _, _, _]) = failing_store();

        fail_after(&meta, 0);
        assert!(store.add(owner("U1"), "a.pdf".into(), hash("H1"), 1).is_err());
        assert_eq!(store.next_id(), 0);
        assert!(store.hash_to_document.is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_document_whole() {
        let (mut store, [_, _, docs, _]) = failing_store();
        let a = store.add(owner("U1"), "a.pdf".into(), hash("H1"), 1).unwrap();
        store.add(owner("U1"), "b.pdf".into(), hash("H2"), 2).unwrap();

        fail_after(&docs, 0);
        assert!(store.delete_by_id(&owner("U1"), a.id).is_err());

        assert_eq!(store.count(), 2);
        assert_eq!(store.list_owned(&owner("U1")), vec![DocumentId(0), DocumentId(1)]);
        assert!(matches!(
            store.verify_by_hash(&hash("H1")),
            VerifyOutcome::Found { .. }
        ));

        heal(&docs);
        assert!(matches!(
            store.delete_by_id(&owner("U1"), a.id).unwrap(),
            DeleteOutcome::Deleted { .. }
        ));
    }

    #[test]
    fn test_failed_rollback_skips_the_consumed_id() {
        let (mut store, [meta, _, _, owners]) = failing_store();
        store.add(owner("U1"), "a.pdf".into(), hash("H1"), 1).unwrap();

        // The owner write fails, then so does restoring the counter
        fail_after(&owners, 0);
        fail_after(&meta, 1);
        let err = store.add(owner("U1"), "b.pdf".into(), hash("H2"), 2);
        assert!(err.is_err());
        assert_eq!(store.count(), 1);
        assert_eq!(store.verify_by_hash(&hash("H2")), VerifyOutcome::NotFound);

        heal(&owners);
        heal(&meta);
        let doc = store.add(owner("U1"), "c.pdf".into(), hash("H3"), 3).unwrap();
        assert_eq!(doc.id, DocumentId(2));
    }
}
