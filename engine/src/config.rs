//! Persistent user configuration addressed by dotted key paths
//! (`api_keys.openai`, `defaults.size`, ...).
//!
//! [`Config`] holds the whole document in memory and writes it back through a
//! [`ConfigStore`] on every [`Config::set`]. A change that fails to persist is not applied.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::generator::{ImageSize, Provider};

pub const DEFAULT_OUTPUT_DIR: &str = "./images";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config document must be a JSON object")]
    NotADocument,

    #[error("cannot set {key}: {segment} is not an object")]
    NotAnObject { key: String, segment: String },

    #[error("config keys must not be empty: {0:?}")]
    EmptyKey(String),
}

/// Where a [`Config`] document is loaded from and saved to.
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Value>, ConfigError>;
    fn save(&self, document: &Value) -> Result<(), ConfigError>;
}

/// Pretty-printed JSON file. The parent directory is created on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Option<Value>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let src = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let document = serde_json::from_str(&src).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(document))
    }

    fn save(&self, document: &Value) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut src = serde_json::to_string_pretty(document).map_err(|source| {
            ConfigError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        src.push('\n');
        fs::write(&self.path, src).map_err(|e| self.io_error(e))?;
        debug!("Saved config to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store. Clones share the same document, so a test can keep one handle
/// and reload a fresh [`Config`] from another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Arc<Mutex<Option<Value>>>,
}

impl MemoryStore {
    pub fn snapshot(&self) -> Option<Value> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<Value>, ConfigError> {
        Ok(self.snapshot())
    }

    fn save(&self, document: &Value) -> Result<(), ConfigError> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
        Ok(())
    }
}

/// Typed view of the `defaults` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub size: ImageSize,
    pub output_dir: PathBuf,
    pub count: u32,
}

pub struct Config {
    document: Value,
    store: Box<dyn ConfigStore>,
}

impl Config {
    /// Loads the persisted document, filling in any keys it lacks from
    /// [`Config::default_document`]. Nothing is written until the first `set`.
    pub fn load(store: impl ConfigStore + 'static) -> Result<Self, ConfigError> {
        let mut document = Self::default_document();
        if let Some(stored) = store.load()? {
            if !stored.is_object() {
                return Err(ConfigError::NotADocument);
            }
            let defaults = std::mem::replace(&mut document, stored);
            merge_missing(&mut document, &defaults);
        }

        Ok(Self {
            document,
            store: Box::new(store),
        })
    }

    pub fn default_document() -> Value {
        json!({
            "api_keys": {
                "openai": "",
                "stability": "",
            },
            "defaults": {
                "size": "1024x1024",
                "output_dir": DEFAULT_OUTPUT_DIR,
                "count": 1,
            },
        })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.document, |value, segment| value.as_object()?.get(segment))
    }

    /// The value at `key`, or `default` when the path is missing or holds a value of
    /// another type.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or(default)
    }

    /// Sets `key`, creating intermediate objects as needed, then persists the whole
    /// document.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ConfigError::EmptyKey(key.to_string()));
        }
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ConfigError::EmptyKey(key.to_string()))?;

        let mut document = self.document.clone();
        let mut table = document
            .as_object_mut()
            .ok_or(ConfigError::NotADocument)?;
        for segment in parents {
            table = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| ConfigError::NotAnObject {
                    key: key.to_string(),
                    segment: segment.to_string(),
                })?;
        }
        table.insert(last.to_string(), value.into());

        self.store.save(&document)?;
        self.document = document;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.store.save(&self.document)
    }

    /// The configured key for `provider`. Empty strings count as unset.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.get(&format!("api_keys.{}", provider.id()))
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    pub fn defaults(&self) -> Defaults {
        let size = self
            .get("defaults.size")
            .and_then(Value::as_str)
            .and_then(|size| size.parse().ok())
            .unwrap_or_default();
        let count = self
            .get_or::<u32>("defaults.count", 1)
            .max(1);
        let output_dir = self.get_or("defaults.output_dir", PathBuf::from(DEFAULT_OUTPUT_DIR));

        Defaults {
            size,
            output_dir,
            count,
        }
    }
}

/// Copies every key of `defaults` that `target` lacks, recursing into objects present in
/// both.
fn merge_missing(target: &mut Value, defaults: &Value) {
    let (Some(target), Some(defaults)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };
    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(existing) => merge_missing(existing, default),
            None => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn fresh_config_uses_defaults() {
        let config = Config::load(MemoryStore::default()).unwrap();

        assert_eq!(config.get("defaults.size"), Some(&json!("1024x1024")));
        assert_eq!(config.api_key(Provider::OpenAi), None);
        assert_eq!(
            config.defaults(),
            Defaults {
                size: ImageSize::new(1024, 1024),
                output_dir: PathBuf::from("./images"),
                count: 1,
            }
        );
    }

    #[test]
    fn get_falls_back_for_missing_paths() {
        let config = Config::load(MemoryStore::default()).unwrap();

        assert_eq!(config.get("defaults.nope"), None);
        assert_eq!(config.get("api_keys.openai.nested"), None);
        assert_eq!(config.get_or("defaults.nope", 7), 7);
        assert_eq!(config.get_or("defaults.count", 7), 1);
        assert_eq!(config.get_or("defaults.size", 7), 7);
    }

    #[test]
    fn set_then_get_survives_reload() {
        let store = MemoryStore::default();
        let mut config = Config::load(store.clone()).unwrap();

        config.set("api_keys.openai", "sk-test").unwrap();
        config.set("defaults.count", 3).unwrap();
        assert_eq!(config.get("api_keys.openai"), Some(&json!("sk-test")));

        let reloaded = Config::load(store).unwrap();
        assert_eq!(reloaded.get("api_keys.openai"), Some(&json!("sk-test")));
        assert_eq!(reloaded.api_key(Provider::OpenAi), Some("sk-test".into()));
        assert_eq!(reloaded.defaults().count, 3);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let store = MemoryStore::default();
        let mut config = Config::load(store.clone()).unwrap();

        config.set("profiles.work.output_dir", "/tmp/work").unwrap();

        assert_eq!(
            config.get("profiles.work"),
            Some(&json!({ "output_dir": "/tmp/work" }))
        );
        assert_eq!(
            store.snapshot().unwrap()["profiles"]["work"]["output_dir"],
            json!("/tmp/work")
        );
    }

    #[test]
    fn set_refuses_to_descend_into_scalars() {
        let store = MemoryStore::default();
        let mut config = Config::load(store.clone()).unwrap();

        let err = config.set("defaults.size.width", 5).unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject { ref segment, .. } if segment == "size"));
        assert!(matches!(config.set("defaults..size", 5), Err(ConfigError::EmptyKey(_))));
        assert!(matches!(config.set("", 5), Err(ConfigError::EmptyKey(_))));
        assert!(store.snapshot().is_none());
    }

    struct ReadOnlyStore;

    impl ConfigStore for ReadOnlyStore {
        fn load(&self) -> Result<Option<Value>, ConfigError> {
            Ok(None)
        }

        fn save(&self, _: &Value) -> Result<(), ConfigError> {
            Err(ConfigError::Io {
                path: PathBuf::from("config.json"),
                source: std::io::ErrorKind::PermissionDenied.into(),
            })
        }
    }

    #[test]
    fn failed_save_leaves_the_document_alone() {
        let mut config = Config::load(ReadOnlyStore).unwrap();

        assert!(matches!(
            config.set("api_keys.openai", "sk-test"),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            config.set("extra.nested", 1),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(config.api_key(Provider::OpenAi), None);
        assert_eq!(config.get("extra"), None);
    }

    #[test]
    fn stored_documents_gain_missing_defaults() {
        let store = MemoryStore::default();
        store
            .save(&json!({ "api_keys": { "stability": "st-key" }, "theme": "dark" }))
            .unwrap();

        let config = Config::load(store).unwrap();

        assert_eq!(config.api_key(Provider::Stability), Some("st-key".into()));
        assert_eq!(config.get("api_keys.openai"), Some(&json!("")));
        assert_eq!(config.get("defaults.output_dir"), Some(&json!("./images")));
        assert_eq!(config.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn bad_defaults_fall_back() {
        let store = MemoryStore::default();
        store
            .save(&json!({ "defaults": { "size": "huge", "count": 0, "output_dir": 4 } }))
            .unwrap();

        let defaults = Config::load(store).unwrap().defaults();

        assert_eq!(defaults.size, ImageSize::default());
        assert_eq!(defaults.count, 1);
        assert_eq!(defaults.output_dir, PathBuf::from("./images"));
    }

    #[test]
    fn json_file_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("aiimgen").join("config.json");

        let mut config = Config::load(JsonFileStore::new(&path)).unwrap();
        assert!(!path.exists());
        config.set("api_keys.stability", "st-123").unwrap();

        expect![[r#"
            {
              "api_keys": {
                "openai": "",
                "stability": "st-123"
              },
              "defaults": {
                "count": 1,
                "output_dir": "./images",
                "size": "1024x1024"
              }
            }
        "#]]
        .assert_eq(&fs::read_to_string(&path).unwrap());

        let reloaded = Config::load(JsonFileStore::new(&path)).unwrap();
        assert_eq!(reloaded.api_key(Provider::Stability), Some("st-123".into()));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load(JsonFileStore::new(&path)).err().unwrap();
        assert!(matches!(err, ConfigError::Parse { .. }));

        fs::write(&path, "[1, 2]").unwrap();
        let err = Config::load(JsonFileStore::new(&path)).err().unwrap();
        assert!(matches!(err, ConfigError::NotADocument));
    }
}
