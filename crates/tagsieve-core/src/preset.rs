//! Named, persistable filter presets.
//!
//! The engine only serializes presets. Storage belongs to the host, reached
//! through the [`PreferenceStore`] key/value trait. All presets live under
//! one key ([`PRESETS_KEY`]) as a JSON object keyed by preset name; saving a
//! name that exists replaces it (last write wins).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::criteria::FilterCriteria;
use crate::defaults::PRESETS_KEY;
use crate::error::{Error, Result};

// =============================================================================
// PRESET
// =============================================================================

/// A named FilterCriteria snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    pub criteria: FilterCriteria,
    /// Copy of `criteria.boolean_query`, kept top-level for listings.
    #[serde(default)]
    pub boolean_query: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FilterPreset {
    /// Snapshot `criteria` under `name`, stamped now.
    pub fn create(name: impl Into<String>, criteria: &FilterCriteria) -> Self {
        Self {
            name: name.into(),
            criteria: criteria.clone(),
            boolean_query: criteria.boolean_query.clone(),
            created_at: Utc::now(),
        }
    }

    /// Criteria stored in this preset. A query present only at the top level
    /// (older presets) is folded back in.
    pub fn load(&self) -> FilterCriteria {
        let mut criteria = self.criteria.clone();
        if criteria.boolean_query.is_none() {
            criteria.boolean_query = self.boolean_query.clone();
        }
        criteria
    }

    /// JSON-compatible representation for a preference store.
    pub fn to_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild from a stored value.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

// =============================================================================
// PREFERENCE STORE
// =============================================================================

/// String-keyed store of JSON-compatible values.
pub trait PreferenceStore {
    /// Value stored under `key`, or `None`.
    fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: JsonValue) -> Result<()>;

    /// Value under `key`, or `default` when absent.
    fn get_or(&self, key: &str, default: JsonValue) -> Result<JsonValue> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

/// In-process store, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: HashMap<String, JsonValue>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// PRESET LIBRARY
// =============================================================================

/// Preset CRUD over a preference store.
pub struct PresetLibrary<'s, S: PreferenceStore> {
    store: &'s mut S,
}

impl<'s, S: PreferenceStore> PresetLibrary<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    fn read_all(&self) -> Result<BTreeMap<String, FilterPreset>> {
        match self.store.get(PRESETS_KEY)? {
            None | Some(JsonValue::Null) => Ok(BTreeMap::new()),
            Some(value @ JsonValue::Object(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(Error::InvalidInput(format!(
                "stored presets must be an object, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn write_all(&mut self, presets: &BTreeMap<String, FilterPreset>) -> Result<()> {
        self.store.set(PRESETS_KEY, serde_json::to_value(presets)?)
    }

    /// Save `preset`, replacing one with the same name.
    pub fn save(&mut self, preset: FilterPreset) -> Result<()> {
        let mut presets = self.read_all()?;
        let name = preset.name.clone();
        let replaced = presets.insert(name.clone(), preset).is_some();
        self.write_all(&presets)?;
        info!(preset = %name, replaced, "Saved filter preset");
        Ok(())
    }

    /// Preset named `name`.
    pub fn load(&self, name: &str) -> Result<FilterPreset> {
        self.read_all()?
            .remove(name)
            .ok_or_else(|| Error::PresetNotFound(name.to_string()))
    }

    /// All presets, sorted by name.
    pub fn list(&self) -> Result<Vec<FilterPreset>> {
        let presets: Vec<FilterPreset> = self.read_all()?.into_values().collect();
        debug!(result_count = presets.len(), "Listed filter presets");
        Ok(presets)
    }

    /// Remove `name`; returns whether it existed.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let mut presets = self.read_all()?;
        let existed = presets.remove(name).is_some();
        if existed {
            self.write_all(&presets)?;
            info!(preset = %name, "Deleted filter preset");
        }
        Ok(existed)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "an object",
    }
}
