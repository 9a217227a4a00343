use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types handed out by the chat platform
pub type UserId = String;
pub type MessageId = String;
pub type ChannelId = String;
pub type RoleId = String;

/// Settings key for the submission window flag
pub const SUBMISSIONS_OPEN: &str = "submissions_open";

/// A user's single live contest entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub user_id: UserId,
    /// Snapshot of the display name at submission time
    pub display_name: String,
    pub url: String,
    /// Advisory tally, may go negative when reaction events are lost
    pub vote_count: i64,
    pub message_id: MessageId,
    pub submitted_at: DateTime<Utc>,
}

/// A reaction add/remove direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Classify a raw reaction delta; zero carries no vote
    pub fn from_delta(delta: i64) -> Option<Self> {
        match delta {
            d if d > 0 => Some(VoteDirection::Up),
            d if d < 0 => Some(VoteDirection::Down),
            _ => None,
        }
    }
}
