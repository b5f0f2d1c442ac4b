//! The client-local mirrored collection.

use livetable_protocol::{Entity, EntityId};
use parking_lot::RwLock;
use std::ops::Range;
use std::sync::Arc;

/// A mirrored collection shared between the embedding application and the
/// engine.
///
/// The collection is supplied and owned by the caller; the engine is granted
/// mutation rights over its contents but never replaces or frees it.
pub type SharedCollection = Arc<RwLock<MirroredCollection>>;

/// An ordered, identity-keyed sequence of entities.
///
/// Invariants:
/// - no two elements share an id at any observable point;
/// - insertion order is significant: new entities append, existing entities
///   keep their position when updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirroredCollection {
    entries: Vec<Entity>,
}

impl MirroredCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection from an entity sequence.
    ///
    /// Entities repeating an earlier id are dropped, keeping the first
    /// occurrence, so the uniqueness invariant holds from the start.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut collection = Self::new();
        for entity in entities {
            collection.push(entity);
        }
        collection
    }

    /// Wraps the collection for sharing with an engine.
    pub fn into_shared(self) -> SharedCollection {
        Arc::new(RwLock::new(self))
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the collection holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entity at a position.
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entries.get(index)
    }

    /// Returns the position of an entity by id.
    ///
    /// The result is a definite present/absent answer; position 0 is a valid
    /// "present" result and must never be conflated with "absent".
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.entries.iter().position(|entity| entity.id() == id)
    }

    /// Returns true if an entity with the given id is present.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the ids of all entities, in collection order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entries.iter().map(|entity| entity.id().clone()).collect()
    }

    /// Iterates over the entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.iter()
    }

    /// Returns the entities as a slice.
    pub fn entries(&self) -> &[Entity] {
        &self.entries
    }

    /// Appends an entity if its id is not already present.
    ///
    /// Returns true if the entity was appended.
    pub fn push(&mut self, entity: Entity) -> bool {
        if self.contains(entity.id()) {
            return false;
        }
        self.entries.push(entity);
        true
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entries.get_mut(index)
    }

    pub(crate) fn remove_range(&mut self, range: Range<usize>) {
        self.entries.drain(range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_duplicate_ids() {
        let mut collection = MirroredCollection::new();
        assert!(collection.push(Entity::new(1).with_field("name", "a")));
        assert!(!collection.push(Entity::new(1).with_field("name", "b")));

        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.get(0).unwrap().get("name"),
            Some(&serde_json::Value::from("a"))
        );
    }

    #[test]
    fn with_entities_keeps_first_occurrence() {
        let collection = MirroredCollection::with_entities(vec![
            Entity::new(1).with_field("name", "a"),
            Entity::new(2),
            Entity::new(1).with_field("name", "dup"),
        ]);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.ids(), vec![EntityId::from(1), EntityId::from(2)]);
    }

    #[test]
    fn position_zero_is_present() {
        let collection = MirroredCollection::with_entities(vec![Entity::new(1)]);
        assert_eq!(collection.position(&EntityId::from(1)), Some(0));
        assert_eq!(collection.position(&EntityId::from(2)), None);
    }

    #[test]
    fn ids_preserve_order() {
        let collection = MirroredCollection::with_entities(vec![
            Entity::new("b"),
            Entity::new("a"),
            Entity::new("c"),
        ]);
        assert_eq!(
            collection.ids(),
            vec![
                EntityId::from("b"),
                EntityId::from("a"),
                EntityId::from("c")
            ]
        );
    }
}
