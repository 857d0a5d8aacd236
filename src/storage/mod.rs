//! Flat string-keyed store with JSON values.
//!
//! Everything the arena knows lives here: profiles, the public profile
//! directory, the leaderboard, matchmaking queues, and match records. Values
//! that are missing or fail to parse are read as absent.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Backing store for all arena state.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
    /// All keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

/// Read and decode a value. Malformed values are logged and treated as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("Ignoring malformed value at '{}': {}", key, e);
            None
        }
    }
}

pub fn write_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> io::Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    store.set(key, raw)
}

/// Key layout.
pub mod keys {
    use crate::models::{MatchId, PlayerId};

    pub const LAST_PLAYER_ID: &str = "last_player_id";
    pub const PUBLIC_PROFILES: &str = "public_profiles";
    pub const LEADERBOARD: &str = "leaderboard";
    pub const LEADERBOARD_VERSION: &str = "leaderboard_version";
    pub const QUEUE_PREFIX: &str = "queue:";
    pub const MATCH_PREFIX: &str = "match:";
    pub const ACTIVE_MATCH_PREFIX: &str = "active_match:";

    pub fn profile(id: PlayerId) -> String {
        format!("profile:{}", id)
    }

    pub fn selection(id: PlayerId) -> String {
        format!("selection:{}", id)
    }

    pub fn active_match(id: PlayerId) -> String {
        format!("{}{}", ACTIVE_MATCH_PREFIX, id)
    }

    pub fn match_record(id: MatchId) -> String {
        format!("{}{}", MATCH_PREFIX, id)
    }

    pub fn queue(subject: &str, lesson: &str) -> String {
        format!("{}{}:{}", QUEUE_PREFIX, subject, lesson)
    }

    /// Inverse of `queue`: (subject, lesson).
    pub fn parse_queue(key: &str) -> Option<(&str, &str)> {
        key.strip_prefix(QUEUE_PREFIX)?.split_once(':')
    }
}
