//! Client for the settings key/value surface.
//!
//! Settings travel over a plain request/response boundary, entirely outside
//! the streaming sync core, and share no state with it. The store keeps a
//! snapshot of the last loaded values for dirty-tracking and revert.

use crate::error::EngineResult;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Request/response boundary to the settings endpoint.
pub trait SettingsApi: Send + Sync {
    /// Fetches the current value of every setting.
    fn fetch_values(&self) -> EngineResult<Map<String, Value>>;

    /// Fetches the display name of every setting.
    fn fetch_names(&self) -> EngineResult<BTreeMap<String, String>>;

    /// Submits new values.
    fn submit(&self, values: &Map<String, Value>) -> EngineResult<()>;

    /// Resets every setting to its default value.
    fn reset(&self) -> EngineResult<()>;
}

/// One setting: a value plus its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    /// Current value.
    pub value: Value,
    /// Human-readable name for presentation.
    pub readable_name: String,
}

/// Locally edited view of the server-held settings.
pub struct SettingsStore<A: SettingsApi> {
    api: A,
    settings: BTreeMap<String, Setting>,
    original: BTreeMap<String, Setting>,
}

impl<A: SettingsApi> SettingsStore<A> {
    /// Creates an empty store over the given endpoint.
    pub fn new(api: A) -> Self {
        Self {
            api,
            settings: BTreeMap::new(),
            original: BTreeMap::new(),
        }
    }

    /// Loads values and display names, replacing any local edits.
    pub fn load(&mut self) -> EngineResult<()> {
        let values = self.api.fetch_values()?;
        let mut names = self.api.fetch_names()?;

        let mut settings = BTreeMap::new();
        for (name, value) in values {
            let readable_name = names.remove(&name).unwrap_or_else(|| name.clone());
            settings.insert(name, Setting { value, readable_name });
        }

        self.original = settings.clone();
        self.settings = settings;
        Ok(())
    }

    /// Returns a setting by name.
    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.get(name)
    }

    /// All settings, keyed by name.
    pub fn settings(&self) -> &BTreeMap<String, Setting> {
        &self.settings
    }

    /// Edits a setting locally.
    ///
    /// Returns false for names the server never reported.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.settings.get_mut(name) {
            Some(setting) => {
                setting.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Returns true if local edits differ from the last loaded snapshot.
    pub fn is_changed(&self) -> bool {
        self.settings != self.original
    }

    /// Discards local edits, restoring the last loaded snapshot.
    pub fn revert(&mut self) {
        self.settings = self.original.clone();
    }

    /// Submits the current values, then reloads.
    pub fn save(&mut self) -> EngineResult<()> {
        let values: Map<String, Value> = self
            .settings
            .iter()
            .map(|(name, setting)| (name.clone(), setting.value.clone()))
            .collect();
        self.api.submit(&values)?;
        self.load()
    }

    /// Resets the server to defaults, then reloads.
    pub fn reset_defaults(&mut self) -> EngineResult<()> {
        self.api.reset()?;
        self.load()
    }
}
