use crate::types::*;
use serde::{Deserialize, Serialize};

/// Events delivered by the chat gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ContestEvent {
    /// A user invoked the submit command
    SubmissionCommand {
        user_id: UserId,
        display_name: String,
        channel_id: ChannelId,
        url: String,
    },
    MessageDeleted {
        message_id: MessageId,
        channel_id: ChannelId,
    },
    /// A reaction was added (`delta > 0`) or removed (`delta < 0`)
    ReactionChanged {
        message_id: MessageId,
        channel_id: ChannelId,
        emoji: String,
        delta: i64,
    },
    MessagePosted {
        message_id: MessageId,
        channel_id: ChannelId,
        author_id: UserId,
    },
}

/// Moderator commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ModeratorCommand {
    /// Exclude a user from participating and remove their entry
    Ban {
        target_user_id: UserId,
        moderator_name: String,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Lift a ban
    Unban {
        target_user_id: UserId,
        moderator_name: String,
    },
    Open,
    Close,
    /// CSV of the submissions collected so far
    Download,
    /// Delete all submissions, returning a CSV backup
    Clear {
        confirmation: String,
    },
}

/// A file attached to a reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub body: String,
}

/// Response to show to the user who triggered an event or command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub content: String,
    /// Only visible to the invoking user
    pub ephemeral: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
            attachment: None,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}
