use crate::error::Result;
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::PathBuf;

/// Fixed keys for the locally synthesized guest principal.
pub const GUEST_USER_KEY: &str = "user";
pub const GUEST_FLAG_KEY: &str = "is_guest";

/// Client-local key-value persistence: one JSON object in one file. This is
/// the only durable state the core owns; everything else lives behind the
/// hosted backend. Reads and writes are synchronous so guest logout can
/// reset state without suspending.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Map<String, JsonValue> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<JsonValue>(&raw) {
            Ok(JsonValue::Object(map)) => map,
            _ => {
                tracing::warn!("local store at {:?} is not a JSON object, resetting", self.path);
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, JsonValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.read_map().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
