//! In-memory settings service.

use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

struct SettingDef {
    readable_name: String,
    default: Value,
}

/// Server side of the settings key/value surface.
///
/// Settings are declared up front with a display name and a default value;
/// updates touch declared settings only, and a reset restores every default.
pub struct SettingsService {
    definitions: BTreeMap<String, SettingDef>,
    values: RwLock<Map<String, Value>>,
}

impl SettingsService {
    /// Creates a service with no settings declared.
    pub fn new() -> Self {
        Self {
            definitions: BTreeMap::new(),
            values: RwLock::new(Map::new()),
        }
    }

    /// Declares a setting with its display name and default value.
    pub fn with_setting(
        mut self,
        name: impl Into<String>,
        readable_name: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        let default = default.into();
        self.values.write().insert(name.clone(), default.clone());
        self.definitions.insert(
            name,
            SettingDef {
                readable_name: readable_name.into(),
                default,
            },
        );
        self
    }

    /// Current value of every setting.
    pub fn values(&self) -> Map<String, Value> {
        self.values.read().clone()
    }

    /// Display name of every setting.
    pub fn names(&self) -> BTreeMap<String, String> {
        self.definitions
            .iter()
            .map(|(name, def)| (name.clone(), def.readable_name.clone()))
            .collect()
    }

    /// Applies new values to declared settings.
    ///
    /// Rejects the whole batch if it names an undeclared setting.
    pub fn update(&self, changes: &Map<String, Value>) -> ServerResult<()> {
        for name in changes.keys() {
            if !self.definitions.contains_key(name) {
                return Err(ServerError::InvalidRequest(format!(
                    "unknown setting: {name}"
                )));
            }
        }

        let mut values = self.values.write();
        for (name, value) in changes {
            values.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    /// Restores every setting to its default value.
    pub fn reset(&self) {
        let mut values = self.values.write();
        values.clear();
        for (name, def) in &self.definitions {
            values.insert(name.clone(), def.default.clone());
        }
    }
}

impl Default for SettingsService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SettingsService {
        SettingsService::new()
            .with_setting("ssh.tasks_count", "SSH check tasks", 20)
            .with_setting("web.port", "Web server port", 6080)
    }

    #[test]
    fn declared_defaults_are_visible() {
        let service = service();
        assert_eq!(service.values().get("web.port"), Some(&Value::from(6080)));
        assert_eq!(
            service.names().get("ssh.tasks_count"),
            Some(&"SSH check tasks".to_string())
        );
    }

    #[test]
    fn update_and_reset() {
        let service = service();

        let mut changes = Map::new();
        changes.insert("web.port".to_string(), Value::from(8080));
        service.update(&changes).unwrap();
        assert_eq!(service.values().get("web.port"), Some(&Value::from(8080)));

        service.reset();
        assert_eq!(service.values().get("web.port"), Some(&Value::from(6080)));
    }

    #[test]
    fn unknown_setting_rejects_batch() {
        let service = service();

        let mut changes = Map::new();
        changes.insert("web.port".to_string(), Value::from(8080));
        changes.insert("nope".to_string(), Value::from(1));

        assert!(service.update(&changes).is_err());
        // Nothing from the batch was applied.
        assert_eq!(service.values().get("web.port"), Some(&Value::from(6080)));
    }
}
