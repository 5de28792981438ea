//! Durable key/value surface
//!
//! The single persistence abstraction the rest of the crate builds on:
//! string keys mapped to JSON values, surviving process restarts.
//!
//! ## Implementations
//!
//! - [`SqliteKv`]: durable store backed by a single SQLite file
//! - [`MemoryKv`]: in-memory fake for tests, with a switchable
//!   write-failure mode
//!
//! Writes are write-through: callers persist immediately after each
//! in-memory mutation, with no batching and no rollback on failure.

pub mod error;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;

/// Fixed keys on the durable surface
///
/// Unchanged from the original deployment so existing data remains
/// readable.
pub mod keys {
    /// The full bookmark set, as a JSON array
    pub const BOOKMARKS: &str = "hadith-bookmarks";
    /// The timer session log, as a JSON array
    pub const TIMER_SESSIONS: &str = "hadith_timer_sessions";
    /// Monotonic counter backing session id allocation
    pub const TIMER_ID_COUNTER: &str = "hadith_timer_id_counter";
    /// Reading font size preference
    pub const FONT_SIZE: &str = "hadith-font-size";
    /// Language display mode preference
    pub const LANGUAGE: &str = "hadith-language";
    /// Color theme preference
    pub const THEME: &str = "hadith-theme";
    /// Bookmark-on-open preference
    pub const AUTO_BOOKMARK: &str = "hadith-auto-bookmark";
    /// Transliteration display preference
    pub const TRANSLITERATION: &str = "hadith-transliteration";
}

/// Capability for persisting JSON values by string key
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Delete the value under `key`; missing keys are not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

impl dyn KeyValueStore {
    /// Fetch and deserialize the value under `key`
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => {
                let parsed =
                    serde_json::from_value(value).map_err(|source| StorageError::Serialization {
                        key: key.to_string(),
                        source,
                    })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Serialize and store `value` under `key`
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.set(key, value).await
    }
}
