use super::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A side effect recorded by [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    PostMessage {
        channel_id: String,
        content: String,
        message_id: MessageId,
    },
    DeleteMessage {
        channel_id: String,
        message_id: MessageId,
    },
    AddReaction {
        channel_id: String,
        message_id: MessageId,
        emoji: String,
    },
    GrantRole {
        user_id: String,
        role_id: String,
        reason: String,
    },
    RevokeRole {
        user_id: String,
        role_id: String,
        reason: String,
    },
}

/// In-process transport that records every side effect.
///
/// Message ids are assigned sequentially (`msg-1`, `msg-2`, ...). Used by the
/// test suite, and via [`MemoryTransport::dry_run`] when no chat bridge is
/// configured.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    /// Keep neither the call log nor message contents
    dry_run: bool,
    next_id: AtomicU64,
    calls: RwLock<Vec<TransportCall>>,
    messages: RwLock<HashMap<MessageId, String>>,
    roles: RwLock<HashMap<String, HashSet<String>>>,
    failing: RwLock<HashSet<&'static str>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport for a long-running process without a chat bridge. Only
    /// role state is kept, so memory stays bounded by the number of users.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Make every call of the named operation (e.g. `"post_message"`) fail
    pub async fn fail_on(&self, operation: &'static str) {
        self.failing.write().await.insert(operation);
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.read().await.clone()
    }

    /// Message ids currently present in the chat
    pub async fn live_messages(&self) -> Vec<MessageId> {
        let mut ids: Vec<_> = self.messages.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn message_content(&self, message_id: &str) -> Option<String> {
        self.messages.read().await.get(message_id).cloned()
    }

    pub async fn user_has_role(&self, user_id: &str, role_id: &str) -> bool {
        self.roles
            .read()
            .await
            .get(user_id)
            .is_some_and(|roles| roles.contains(role_id))
    }

    async fn check(&self, operation: &'static str) -> TransportResult<()> {
        if self.failing.read().await.contains(operation) {
            return Err(TransportError::Request(format!(
                "{} failed (simulated)",
                operation
            )));
        }
        Ok(())
    }

    async fn record(&self, call: TransportCall) {
        if self.dry_run {
            tracing::debug!("Dry run: {:?}", call);
            return;
        }
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn post_message(&self, channel_id: &str, content: &str) -> TransportResult<MessageId> {
        self.check("post_message").await?;
        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        if !self.dry_run {
            self.messages
                .write()
                .await
                .insert(id.clone(), content.to_string());
        }
        self.record(TransportCall::PostMessage {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
            message_id: id.clone(),
        })
        .await;
        Ok(id)
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> TransportResult<DeleteOutcome> {
        self.check("delete_message").await?;
        let removed = self.messages.write().await.remove(message_id).is_some();
        self.record(TransportCall::DeleteMessage {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        })
        .await;
        Ok(if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> TransportResult<()> {
        self.check("add_reaction").await?;
        self.record(TransportCall::AddReaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
        })
        .await;
        Ok(())
    }

    async fn grant_role(&self, user_id: &str, role_id: &str, reason: &str) -> TransportResult<()> {
        self.check("grant_role").await?;
        self.roles
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .insert(role_id.to_string());
        self.record(TransportCall::GrantRole {
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn revoke_role(
        &self,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> TransportResult<()> {
        self.check("revoke_role").await?;
        if let Some(roles) = self.roles.write().await.get_mut(user_id) {
            roles.remove(role_id);
        }
        self.record(TransportCall::RevokeRole {
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn has_role(&self, user_id: &str, role_id: &str) -> TransportResult<bool> {
        self.check("has_role").await?;
        Ok(self.user_has_role(user_id, role_id).await)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
