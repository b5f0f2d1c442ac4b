//! Identity-keyed entities.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stable entity identifier: a string or an integer.
///
/// The id of an entity never changes for the lifetime of the entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Number(i64::from(n))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Text(s)
    }
}

impl From<&EntityId> for Value {
    fn from(id: &EntityId) -> Self {
        match id {
            EntityId::Number(n) => Value::from(*n),
            EntityId::Text(s) => Value::from(s.as_str()),
        }
    }
}

/// A mapping from field name to JSON value, keyed by a stable `id` field.
///
/// Construction validates that an `id` field is present and is a string or an
/// integer, so every `Entity` in circulation has a usable identity. Partial
/// entities (a subset of fields, id included) are valid update payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Entity {
    id: EntityId,
    fields: Map<String, Value>,
}

impl Entity {
    /// Creates an entity with only its `id` field set.
    pub fn new(id: impl Into<EntityId>) -> Self {
        let id = id.into();
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::from(&id));
        Self { id, fields }
    }

    /// Builder-style helper to attach a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the entity's identifier.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field value.
    ///
    /// The `id` field is immutable and writes to it are ignored.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if name == "id" {
            return;
        }
        self.fields.insert(name, value.into());
    }

    /// Merges the fields of a partial entity into this one, in place.
    ///
    /// Field-level shallow overwrite: fields named by the patch replace the
    /// current values, fields absent from the patch are left untouched. The
    /// `id` field is never overwritten.
    pub fn merge_from(&mut self, patch: &Entity) {
        for (name, value) in &patch.fields {
            if name == "id" {
                continue;
            }
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Returns all fields, including `id`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for Entity {
    type Error = ProtocolError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match fields.get("id") {
            None => return Err(ProtocolError::MissingId),
            Some(Value::String(s)) => EntityId::Text(s.clone()),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => EntityId::Number(i),
                None => return Err(ProtocolError::InvalidId(n.to_string())),
            },
            Some(other) => return Err(ProtocolError::InvalidId(other.to_string())),
        };
        Ok(Self { id, fields })
    }
}

impl From<Entity> for Map<String, Value> {
    fn from(entity: Entity) -> Self {
        entity.fields
    }
}
