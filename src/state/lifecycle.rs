//! Submission lifecycle: create, replace, withdraw, reconcile.
//!
//! Per user: `NONE -> ACTIVE -> (REPLACED -> ACTIVE | WITHDRAWN -> NONE)`.
//! A ban or an external deletion also takes `ACTIVE -> NONE`.
//!
//! Submitting is split in two because the chat message has to exist before
//! the row can reference it: [`AppState::begin_submission`] validates and
//! clears out the previous entry, the caller posts the new message, and
//! [`AppState::confirm_submission`] writes the row.

use super::AppState;
use crate::error::{ContestError, ContestResult};
use crate::types::*;
use chrono::{DateTime, Utc};

/// An accepted submission that is not yet tied to a chat message
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub user_id: UserId,
    pub display_name: String,
    pub url: String,
    pub submitted_at: DateTime<Utc>,
    /// Previous entry's message. Already suppressed; the caller must delete it.
    pub prior_message_id: Option<MessageId>,
}

/// Result of writing a submission row
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedSubmission {
    pub submission: Submission,
    /// Message of a concurrent submit by the same user that this one replaced.
    /// Already suppressed; the caller must delete it.
    pub superseded_message_id: Option<MessageId>,
}

/// Check that a submission URL is a well-formed absolute URI
pub fn validate_url(raw: &str) -> ContestResult<String> {
    let trimmed = raw.trim();
    url::Url::parse(trimmed).map_err(|e| {
        ContestError::Validation(format!("Submission URL {:?} is not valid: {}", trimmed, e))
    })?;
    Ok(trimmed.to_string())
}

impl AppState {
    /// Accept a submission and clear out the user's previous entry.
    ///
    /// Rejected when the window is closed or the URL does not parse. Ban
    /// status is the caller's to check.
    pub async fn begin_submission(
        &self,
        user_id: &str,
        display_name: &str,
        url: &str,
    ) -> ContestResult<PendingSubmission> {
        let url = validate_url(url)?;
        if !self.submissions_open().await? {
            return Err(ContestError::Validation(
                "Submissions are currently closed".to_string(),
            ));
        }

        let mut suppression = self.gate.lock().await;

        let now = Utc::now();
        let prior = self.store.get_by_user(user_id).await?;
        let submitted_at = match &prior {
            Some(p) if p.submitted_at > now => p.submitted_at,
            _ => now,
        };

        let prior_message_id = match prior {
            Some(_) => self.store.delete_by_user(user_id).await?,
            None => None,
        };
        if let Some(message_id) = &prior_message_id {
            suppression.insert(message_id.clone());
            tracing::info!(
                "User {} is replacing submission in message {}",
                user_id,
                message_id
            );
        }

        Ok(PendingSubmission {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            url,
            submitted_at,
            prior_message_id,
        })
    }

    /// Write the submission row once its chat message exists.
    ///
    /// On a storage failure the message is left in place and the caller must
    /// treat the user as not having submitted.
    pub async fn confirm_submission(
        &self,
        pending: PendingSubmission,
        message_id: &str,
    ) -> ContestResult<ConfirmedSubmission> {
        let mut suppression = self.gate.lock().await;

        let existing = self.store.get_by_user(&pending.user_id).await?;

        let submission = Submission {
            user_id: pending.user_id,
            display_name: pending.display_name,
            url: pending.url,
            vote_count: 0,
            message_id: message_id.to_string(),
            submitted_at: pending.submitted_at,
        };
        self.store.put(submission.clone()).await?;

        let superseded_message_id = existing
            .map(|e| e.message_id)
            .filter(|old| old != message_id);
        if let Some(old) = &superseded_message_id {
            suppression.insert(old.clone());
            tracing::warn!(
                "Concurrent submit by {} superseded message {}",
                submission.user_id,
                old
            );
        }

        tracing::info!(
            "Recorded submission for {} in message {}",
            submission.user_id,
            submission.message_id
        );

        Ok(ConfirmedSubmission {
            submission,
            superseded_message_id,
        })
    }

    /// Remove a user's entry at their own request. Returns the message to delete.
    pub async fn withdraw_by_user(&self, user_id: &str) -> ContestResult<Option<MessageId>> {
        let _gate = self.gate.lock().await;
        let message_id = self.store.delete_by_user(user_id).await?;
        if let Some(id) = &message_id {
            tracing::info!("User {} withdrew submission in message {}", user_id, id);
        }
        Ok(message_id)
    }

    /// Handle a chat message that disappeared without us deleting it.
    ///
    /// Returns the user whose entry was removed, or `None` when the deletion
    /// was self-caused or nothing was keyed to the message.
    pub async fn reconcile_external_deletion(
        &self,
        message_id: &str,
    ) -> ContestResult<Option<UserId>> {
        let mut suppression = self.gate.lock().await;

        if suppression.consume(message_id) {
            tracing::debug!("Deletion of message {} was self-caused", message_id);
            return Ok(None);
        }

        let user_id = self.store.delete_by_message(message_id).await?;
        if let Some(user) = &user_id {
            tracing::info!(
                "Submission message {} deleted, removed entry of {}",
                message_id,
                user
            );
        }
        Ok(user_id)
    }

    /// Remove a banned user's entry. Returns the message to delete.
    pub async fn ban_user(&self, user_id: &str) -> ContestResult<Option<MessageId>> {
        let _gate = self.gate.lock().await;
        let message_id = self.store.delete_by_user(user_id).await?;
        tracing::info!(
            "Ban removed submission of {}: {:?}",
            user_id,
            message_id
        );
        Ok(message_id)
    }
}
