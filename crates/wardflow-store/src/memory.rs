use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use wardflow_core::Result;

use crate::traits::{ItemSyncer, SyncedItem};

/// An [`ItemSyncer`] that keeps serialized items in process memory.
///
/// Useful for tests that exercise recovery semantics and for single-process
/// runs that want mirroring without external storage. Clones share the same
/// underlying map, so a "restarted" structure can be rebuilt from a clone of
/// the syncer handle.
#[derive(Debug)]
pub struct InMemorySyncer<T> {
    items: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for InMemorySyncer<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for InMemorySyncer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InMemorySyncer<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(BTreeMap::new())),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T: SyncedItem> ItemSyncer<T> for InMemorySyncer<T> {
    fn write(&self, item: &T) -> Result<()> {
        let bytes = serde_json::to_vec(item)?;
        self.items.lock().insert(item.sync_id(), bytes);
        Ok(())
    }

    fn delete(&self, item: &T) -> Result<()> {
        self.items.lock().remove(&item.sync_id());
        Ok(())
    }

    fn load_by_id(&self, id: &str) -> Result<Option<T>> {
        match self.items.lock().get(id) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<Vec<T>> {
        // BTreeMap iteration is id-sorted, which is the ordering the
        // contract requires.
        self.items
            .lock()
            .values()
            .map(|bytes| Ok(serde_json::from_slice(bytes)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl SyncedItem for Note {
        fn sync_id(&self) -> String {
            self.id.clone()
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_write_and_load_by_id() {
        let syncer = InMemorySyncer::new();
        syncer.write(&note("a", "first")).unwrap();

        let loaded: Option<Note> = syncer.load_by_id("a").unwrap();
        assert_eq!(loaded, Some(note("a", "first")));
        assert_eq!(syncer.load_by_id("missing").unwrap(), None);
    }

    #[test]
    fn test_write_same_id_overwrites() {
        let syncer = InMemorySyncer::new();
        syncer.write(&note("a", "first")).unwrap();
        syncer.write(&note("a", "second")).unwrap();

        assert_eq!(syncer.len(), 1);
        assert_eq!(syncer.load_by_id("a").unwrap(), Some(note("a", "second")));
    }

    #[test]
    fn test_delete_removes_item() {
        let syncer = InMemorySyncer::new();
        let n = note("a", "first");
        syncer.write(&n).unwrap();
        syncer.delete(&n).unwrap();

        assert!(syncer.is_empty());
        assert_eq!(syncer.load_by_id("a").unwrap(), None);
    }

    #[test]
    fn test_delete_absent_item_is_ok() {
        let syncer = InMemorySyncer::new();
        assert!(syncer.delete(&note("ghost", "")).is_ok());
    }

    #[test]
    fn test_load_all_is_sorted_by_id() {
        let syncer = InMemorySyncer::new();
        syncer.write(&note("charlie", "3")).unwrap();
        syncer.write(&note("alpha", "1")).unwrap();
        syncer.write(&note("bravo", "2")).unwrap();

        let all = syncer.load_all().unwrap();
        let ids: Vec<_> = all.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_clones_share_storage() {
        let syncer = InMemorySyncer::new();
        let other = syncer.clone();
        syncer.write(&note("a", "first")).unwrap();

        assert_eq!(other.load_by_id("a").unwrap(), Some(note("a", "first")));
    }
}
