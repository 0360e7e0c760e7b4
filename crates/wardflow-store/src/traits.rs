use serde::Serialize;
use serde::de::DeserializeOwned;
use wardflow_core::Result;

/// An item that can be mirrored to durable storage.
pub trait SyncedItem: Serialize + DeserializeOwned {
    /// Stable identifier used as the storage key. Two items with the same id
    /// overwrite each other in the mirror.
    fn sync_id(&self) -> String;
}

/// Receives every mutation performed on the structure it shadows.
///
/// The caller forwards additions and removals as they happen, so the mirrored
/// set stays equal to the in-memory set. Implementations are an opaque
/// key/value store to the engine; any storage technology satisfying this
/// contract works without engine changes.
pub trait ItemSyncer<T: SyncedItem>: Send + Sync {
    /// Persists the item, replacing any previous version under the same id.
    fn write(&self, item: &T) -> Result<()>;

    /// Removes the item from storage. Removing an absent item is not an error.
    fn delete(&self, item: &T) -> Result<()>;

    /// Loads a single item by id.
    fn load_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Loads every stored item, ordered by id so that replay after a restart
    /// is reproducible.
    fn load_all(&self) -> Result<Vec<T>>;
}
