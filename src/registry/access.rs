//! Ownership checks over the `owner_to_ids` index

use crate::kv::OrderedMap;

use super::document::{DocumentId, OwnerId};

/// Read-only view answering "does this owner hold this id".
pub struct AccessControl<'a> {
    owner_to_ids: &'a dyn OrderedMap<OwnerId, Vec<DocumentId>>,
}

impl<'a> AccessControl<'a> {
    pub fn new(owner_to_ids: &'a dyn OrderedMap<OwnerId, Vec<DocumentId>>) -> Self {
        AccessControl { owner_to_ids }
    }

    /// True iff `id` is listed under `owner`. An unknown owner owns nothing.
    pub fn owns(&self, owner: &OwnerId, id: DocumentId) -> bool {
        self.owner_to_ids
            .get(owner)
            .map(|ids| ids.contains(&id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryMap;

    #[test]
    fn test_owns() {
        let mut index: MemoryMap<OwnerId, Vec<DocumentId>> = MemoryMap::new();
        index
            .insert(OwnerId::new("U1"), vec![DocumentId(0), DocumentId(2)])
            .unwrap();
        index.insert(OwnerId::new("U2"), vec![DocumentId(1)]).unwrap();

        let access = AccessControl::new(&index);
        assert!(access.owns(&OwnerId::new("U1"), DocumentId(0)));
        assert!(access.owns(&OwnerId::new("U1"), DocumentId(2)));
        assert!(!access.owns(&OwnerId::new("U1"), DocumentId(1)));
        assert!(access.owns(&OwnerId::new("U2"), DocumentId(1)));
    }

    #[test]
    fn test_absent_owner_owns_nothing() {
        let index: MemoryMap<OwnerId, Vec<DocumentId>> = MemoryMap::new();
        let access = AccessControl::new(&index);
        assert!(!access.owns(&OwnerId::new("nobody"), DocumentId(0)));
    }
}
