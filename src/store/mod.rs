//! Record store for submissions and settings.
//!
//! The store exposes exactly two logical tables: submissions keyed by user id
//! and settings keyed by name. Implementations must apply every mutation
//! atomically with respect to other mutations.

mod memory;
mod sqlite;
mod tables;

use async_trait::async_trait;

use crate::types::{MessageId, Submission, UserId};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Schema version stamped into the database (`PRAGMA user_version`)
pub const STORE_SCHEMA_VERSION: u32 = 1;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Store task failed: {0}")]
    Background(String),
}

/// Keyed storage backing the contest
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the backing schema if missing. Safe to call repeatedly.
    async fn init(&self) -> StoreResult<()>;

    /// Upsert keyed by user id, replacing any prior row for that user entirely
    async fn put(&self, submission: Submission) -> StoreResult<()>;

    async fn get_by_user(&self, user_id: &str) -> StoreResult<Option<Submission>>;

    async fn get_by_message(&self, message_id: &str) -> StoreResult<Option<Submission>>;

    /// Returns the message id of the removed row
    async fn delete_by_user(&self, user_id: &str) -> StoreResult<Option<MessageId>>;

    /// Returns the user id of the removed row
    async fn delete_by_message(&self, message_id: &str) -> StoreResult<Option<UserId>>;

    /// All rows in insertion order
    async fn list_all(&self) -> StoreResult<Vec<Submission>>;

    /// Remove every submission, returning how many were removed. Settings are kept.
    async fn clear_all(&self) -> StoreResult<usize>;

    async fn get_setting(&self, key: &str) -> StoreResult<Option<serde_json::Value>>;

    async fn set_setting(&self, key: &str, value: serde_json::Value) -> StoreResult<()>;

    /// Add `delta` to the vote count of the row keyed by `message_id`.
    /// Returns the new count, or `None` when no row matches.
    async fn adjust_vote(&self, message_id: &str, delta: i64) -> StoreResult<Option<i64>>;
}
