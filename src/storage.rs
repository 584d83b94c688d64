//! Durable key-value storage for board state.
//!
//! One JSON file per key under the data directory (default
//! `~/.nownext-board/`). Reads are fail-soft: a missing or malformed file
//! is "not set", never a startup error. Writes log failures and continue —
//! the UI thread is the only writer, so there is no locking to do.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub const KEY_USER_SEQUENCES: &str = "user_sequences";
pub const KEY_FAVORITE_SYMBOLS: &str = "favorite_symbols";
pub const KEY_PLAYBACK_POSITION: &str = "playback_position";

#[derive(Clone)]
pub struct BoardStorage {
    dir: PathBuf,
}

impl BoardStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Storage rooted at the configured directory, or `~/.nownext-board`
    /// when the config leaves it empty.
    pub fn from_config_dir(dir: &str) -> Self {
        let dir = if dir.is_empty() {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".nownext-board")
        } else {
            PathBuf::from(dir)
        };
        Self::new(dir)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a key, or `None` when absent or malformed.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.key_path(key);
        if !path.exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Malformed record in {}: {e}, treating as not set", path.display());
                None
            }
        }
    }

    /// Read a key holding a JSON array as raw records, so callers can drop
    /// individually corrupt entries instead of losing the whole list.
    pub fn read_list(&self, key: &str) -> Vec<serde_json::Value> {
        match self.read::<serde_json::Value>(key) {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => {
                warn!("Key {key} does not hold a list, treating as empty");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Write a key. Fire-and-forget: failures are logged, not propagated.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("Failed to create storage dir {}: {e}", self.dir.display());
            return;
        }

        let path = self.key_path(key);
        match serde_json::to_string_pretty(value) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!("Failed to write {}: {e}", path.display());
                } else {
                    debug!("Saved {key} to {}", path.display());
                }
            }
            Err(e) => warn!("Failed to serialize {key}: {e}"),
        }
    }

    /// Remove a key. Missing files are fine.
    pub fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }
}
