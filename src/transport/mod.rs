//! Chat platform side effects.
//!
//! The contest core never talks to the chat platform directly. Handlers issue
//! side effects through a [`ChatTransport`], which is implemented by an HTTP
//! bridge to a chat gateway and by an in-memory recorder for tests.

mod http;
mod memory;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::MessageId;

pub use http::HttpBridgeTransport;
pub use memory::{MemoryTransport, TransportCall};

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to the chat platform
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Chat gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response decoding failed: {0}")]
    Decode(String),
}

/// Outcome of a message deletion. A missing message counts as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Operations the contest needs from the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a message and return its id
    async fn post_message(&self, channel_id: &str, content: &str) -> TransportResult<MessageId>;

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> TransportResult<DeleteOutcome>;

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> TransportResult<()>;

    async fn grant_role(&self, user_id: &str, role_id: &str, reason: &str) -> TransportResult<()>;

    async fn revoke_role(&self, user_id: &str, role_id: &str, reason: &str)
        -> TransportResult<()>;

    async fn has_role(&self, user_id: &str, role_id: &str) -> TransportResult<bool>;

    /// Name of this transport, for logging
    fn name(&self) -> &str;
}
