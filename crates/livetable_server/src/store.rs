//! Server-side entity store with per-entity modification stamps.

use livetable_protocol::{Entity, EntityId};
use parking_lot::RwLock;

struct StoredEntity {
    entity: Entity,
    stamp: u64,
}

struct StoreInner {
    entries: Vec<StoredEntity>,
    next_stamp: u64,
}

/// The server-held collection.
///
/// Every insert or update stamps the entity with the next value of a
/// monotonically increasing sequence; the stamp doubles as the watermark
/// clients echo back as their cursor. Thread-safe; all methods take `&self`.
pub struct ObjectStore {
    inner: RwLock<StoreInner>,
}

impl ObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                entries: Vec::new(),
                next_stamp: 1,
            }),
        }
    }

    /// Inserts a new entity or merges fields into an existing one.
    ///
    /// Either way the entity is re-stamped as freshly modified. Returns the
    /// new stamp.
    pub fn put(&self, entity: Entity) -> u64 {
        let mut inner = self.inner.write();
        let stamp = inner.next_stamp;
        inner.next_stamp += 1;

        match inner
            .entries
            .iter_mut()
            .find(|stored| stored.entity.id() == entity.id())
        {
            Some(stored) => {
                stored.entity.merge_from(&entity);
                stored.stamp = stamp;
            }
            None => inner.entries.push(StoredEntity { entity, stamp }),
        }
        stamp
    }

    /// Removes an entity. Returns true if it was present.
    pub fn remove(&self, id: &EntityId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|stored| stored.entity.id() != id);
        inner.entries.len() != before
    }

    /// Returns true if an entity with the given id is present.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.inner
            .read()
            .entries
            .iter()
            .any(|stored| stored.entity.id() == id)
    }

    /// Number of entities in the store.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Ids of all entities, in store order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|stored| stored.entity.id().clone())
            .collect()
    }

    /// Copies of all entities, in store order.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|stored| stored.entity.clone())
            .collect()
    }

    /// Entities stamped after the given watermark, with their stamps.
    ///
    /// `None` means "everything" — a client without a cursor gets the full
    /// current state.
    pub fn modified_since(&self, since: Option<u64>) -> Vec<(u64, Entity)> {
        let floor = since.unwrap_or(0);
        self.inner
            .read()
            .entries
            .iter()
            .filter(|stored| stored.stamp > floor)
            .map(|stored| (stored.stamp, stored.entity.clone()))
            .collect()
    }

    /// The stamp of the most recently modified entity, if any.
    pub fn latest_stamp(&self) -> Option<u64> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|stored| stored.stamp)
            .max()
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_stamps_monotonically() {
        let store = ObjectStore::new();
        let first = store.put(Entity::new(1));
        let second = store.put(Entity::new(2));

        assert!(second > first);
        assert_eq!(store.latest_stamp(), Some(second));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn put_existing_merges_and_restamps() {
        let store = ObjectStore::new();
        store.put(Entity::new(1).with_field("name", "a").with_field("note", "x"));
        let stamp = store.put(Entity::new(1).with_field("name", "A"));

        assert_eq!(store.len(), 1);
        let entity = &store.snapshot()[0];
        assert_eq!(entity.get("name"), Some(&serde_json::Value::from("A")));
        assert_eq!(entity.get("note"), Some(&serde_json::Value::from("x")));
        assert_eq!(store.modified_since(Some(stamp - 1)).len(), 1);
    }

    #[test]
    fn modified_since_filters_by_stamp() {
        let store = ObjectStore::new();
        store.put(Entity::new(1));
        let cutoff = store.put(Entity::new(2));
        store.put(Entity::new(3));

        assert_eq!(store.modified_since(None).len(), 3);
        assert_eq!(store.modified_since(Some(cutoff)).len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let store = ObjectStore::new();
        store.put(Entity::new(1));

        assert!(store.remove(&EntityId::from(1)));
        assert!(!store.remove(&EntityId::from(1)));
        assert!(store.is_empty());
    }
}
