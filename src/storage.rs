use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synchronous namespaced key-value store. Reads never fail: a missing or
/// unreadable namespace reads as empty.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;

    /// Writes all `entries` into `namespace` as one batch.
    fn put_all(&self, namespace: &str, entries: Vec<(&str, Value)>) -> Result<(), StoreError>;

    fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.put_all(namespace, vec![(key, value)])
    }

    fn get_string(&self, namespace: &str, key: &str, default: &str) -> String {
        self.get(namespace, key)
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_else(|| default.to_owned())
    }

    fn get_i64(&self, namespace: &str, key: &str) -> Option<i64> {
        self.get(namespace, key).and_then(|value| value.as_i64())
    }

    fn get_u32(&self, namespace: &str, key: &str) -> u32 {
        self.get_i64(namespace, key)
            .map(|value| value.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0)
    }

    fn get_bool(&self, namespace: &str, key: &str) -> bool {
        self.get(namespace, key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }
}

type Namespaces = BTreeMap<String, Map<String, Value>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: Mutex<Namespaces>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let namespaces = self.namespaces.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        namespaces.get(namespace).and_then(|map| map.get(key)).cloned()
    }

    fn put_all(&self, namespace: &str, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let map = namespaces.entry(namespace.to_owned()).or_default();
        for (key, value) in entries {
            map.insert(key.to_owned(), value);
        }
        Ok(())
    }
}

/// One pretty-printed JSON object per namespace under `dir`, cached in
/// memory and written through on every batch.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    cache: Mutex<Namespaces>,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    fn load_namespace<'a>(&self, cache: &'a mut Namespaces, namespace: &str) -> &'a mut Map<String, Value> {
        if !cache.contains_key(namespace) {
            let loaded = load_namespace_file(&self.namespace_path(namespace));
            cache.insert(namespace.to_owned(), loaded);
        }
        cache.entry(namespace.to_owned()).or_default()
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.load_namespace(&mut cache, namespace).get(key).cloned()
    }

    fn put_all(&self, namespace: &str, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.load_namespace(&mut cache, namespace).clone();
        for (key, value) in entries {
            map.insert(key.to_owned(), value);
        }

        // the cache only sees what reached disk
        let payload = serde_json::to_vec_pretty(&map)?;
        fs::write(self.namespace_path(namespace), payload)?;
        cache.insert(namespace.to_owned(), map);
        debug!(namespace, "persisted namespace");
        Ok(())
    }
}

fn load_namespace_file(path: &Path) -> Map<String, Value> {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                error!("data file {} is not a JSON object", path.display());
                Map::new()
            }
            Err(err) => {
                error!("failed to parse data file {}: {err}", path.display());
                Map::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            Map::new()
        }
    }
}
