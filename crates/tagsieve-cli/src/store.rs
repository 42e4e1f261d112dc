//! File-backed preference store.
//!
//! The whole store is one JSON object on disk. Every `set` rewrites it
//! through a sibling temp file and a rename, so a crash mid-write leaves the
//! previous contents intact. Single writer assumed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value as JsonValue};
use tagsieve_core::{Error, PreferenceStore, Result};
use tracing::debug;

#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: Map<String, JsonValue>,
}

impl JsonFilePreferenceStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<JsonValue>(&text)? {
                JsonValue::Object(map) => map,
                _ => {
                    return Err(Error::Store(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(store_error(&path, e)),
        };
        debug!(path = %path.display(), keys = values.len(), "Opened preference store");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, JsonValue>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| store_error(dir, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(values)?;
        fs::write(&tmp, body).map_err(|e| store_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| store_error(&self.path, e))
    }
}

fn store_error(path: &Path, err: std::io::Error) -> Error {
    Error::Store(format!("{}: {}", path.display(), err))
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value);
        self.persist(&values)?;
        self.values = values;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tagsieve_core::{FilterCriteria, FilterPreset, PresetLibrary};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFilePreferenceStore::open(dir.path().join("prefs.json")).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn test_set_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = JsonFilePreferenceStore::open(&path).unwrap();
        store.set("theme", json!("dark")).unwrap();
        assert!(path.exists());

        let reopened = JsonFilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap(), Some(json!("dark")));
    }

    #[test]
    fn test_rejects_non_object_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            JsonFilePreferenceStore::open(&path),
            Err(Error::Store(_))
        ));
    }

    #[test]
    fn test_failed_write_leaves_values_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("sub");
        let mut store = JsonFilePreferenceStore::open(blocker.join("prefs.json")).unwrap();

        // a plain file where the store directory should be
        fs::write(&blocker, "").unwrap();
        assert!(matches!(store.set("theme", json!("dark")), Err(Error::Store(_))));
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn test_presets_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        let criteria = FilterCriteria::new().query("rust OR go").min_frequency(2);

        let mut store = JsonFilePreferenceStore::open(&path).unwrap();
        PresetLibrary::new(&mut store)
            .save(FilterPreset::create("langs", &criteria))
            .unwrap();

        let mut reopened = JsonFilePreferenceStore::open(&path).unwrap();
        let preset = PresetLibrary::new(&mut reopened).load("langs").unwrap();
        assert_eq!(preset.load(), criteria);
    }
}
