use async_trait::async_trait;
use tokio::sync::RwLock;

use super::tables::Tables;
use super::{RecordStore, StoreResult};
use crate::types::{MessageId, Submission, UserId};

/// Volatile store, used for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn put(&self, submission: Submission) -> StoreResult<()> {
        self.tables.write().await.put(submission);
        Ok(())
    }

    async fn get_by_user(&self, user_id: &str) -> StoreResult<Option<Submission>> {
        Ok(self.tables.read().await.get_by_user(user_id))
    }

    async fn get_by_message(&self, message_id: &str) -> StoreResult<Option<Submission>> {
        Ok(self.tables.read().await.get_by_message(message_id))
    }

    async fn delete_by_user(&self, user_id: &str) -> StoreResult<Option<MessageId>> {
        Ok(self.tables.write().await.delete_by_user(user_id))
    }

    async fn delete_by_message(&self, message_id: &str) -> StoreResult<Option<UserId>> {
        Ok(self.tables.write().await.delete_by_message(message_id))
    }

    async fn list_all(&self) -> StoreResult<Vec<Submission>> {
        Ok(self.tables.read().await.list_all())
    }

    async fn clear_all(&self) -> StoreResult<usize> {
        Ok(self.tables.write().await.clear_all())
    }

    async fn get_setting(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.tables.read().await.get_setting(key))
    }

    async fn set_setting(&self, key: &str, value: serde_json::Value) -> StoreResult<()> {
        self.tables.write().await.set_setting(key, value);
        Ok(())
    }

    async fn adjust_vote(&self, message_id: &str, delta: i64) -> StoreResult<Option<i64>> {
        Ok(self.tables.write().await.adjust_vote(message_id, delta))
    }
}
