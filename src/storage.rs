//! Persistent key-value storage for wallet state.
//!
//! A single JSON document on disk, read and rewritten per operation. This is
//! the extension-storage surface the rest of the core consumes: the active
//! address, the wallet collection, the tracked AO tokens, the signature
//! allowance threshold and the latest-transaction display snapshot.

use std::{fs, io, path::PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

pub const ACTIVE_ADDRESS: &str = "active_address";
pub const WALLETS: &str = "wallets";
pub const AO_TOKENS: &str = "ao_tokens";
pub const SIGNATURE_ALLOWANCE: &str = "signatureAllowance";
pub const LATEST_TX: &str = "latest_tx";

pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, String> {
        let map = self.read_map().map_err(|e| e.to_string())?;
        match map.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| format!("fail to parse stored value for '{}': {}", key, e)),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), String> {
        let mut map = self.read_map().map_err(|e| e.to_string())?;
        let value = serde_json::to_value(value)
            .map_err(|e| format!("fail to serialize value for '{}': {}", key, e))?;
        map.insert(key.to_string(), value);
        self.write_map(&map).map_err(|e| e.to_string())
    }

    pub fn remove(&self, key: &str) -> Result<(), String> {
        let mut map = self.read_map().map_err(|e| e.to_string())?;
        if map.remove(key).is_some() {
            self.write_map(&map).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn read_map(&self) -> io::Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let map = serde_json::from_str::<Map<String, Value>>(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(map)
    }

    fn write_map(&self, map: &Map<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(map)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, content)
    }
}
