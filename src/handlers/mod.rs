//! Event and command dispatch
//!
//! This module provides the entry points for everything the chat gateway and
//! moderators send us. Events are filtered here, then dispatched to
//! the contestant or moderator handler modules.

mod contestant;
mod moderator;

use crate::protocol::{ContestEvent, ModeratorCommand, Reply};
use crate::state::AppState;
use crate::transport::DeleteOutcome;
use std::sync::Arc;

/// Handle one gateway event and return an optional reply for the invoking user.
///
/// Failures are logged and the event is dropped; this never returns an error
/// so a bad event cannot stall the ones after it.
pub async fn handle_event(event: ContestEvent, state: &Arc<AppState>) -> Option<Reply> {
    let result = match event {
        ContestEvent::SubmissionCommand {
            user_id,
            display_name,
            channel_id,
            url,
        } => {
            return contestant::handle_submission_command(
                state,
                user_id,
                display_name,
                channel_id,
                url,
            )
            .await;
        }

        ContestEvent::MessageDeleted {
            message_id,
            channel_id,
        } => {
            if !is_submission_channel(state, &channel_id) {
                return None;
            }
            contestant::handle_message_deleted(state, &message_id).await
        }

        ContestEvent::ReactionChanged {
            message_id,
            channel_id,
            emoji,
            delta,
        } => {
            if !is_submission_channel(state, &channel_id) || emoji != state.config.vote_emoji {
                return None;
            }
            contestant::handle_reaction_changed(state, &message_id, delta).await
        }

        ContestEvent::MessagePosted {
            message_id,
            channel_id,
            author_id,
        } => {
            if !is_submission_channel(state, &channel_id) {
                return None;
            }
            contestant::handle_message_posted(state, &message_id, &author_id).await
        }
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(code = e.code(), "Dropped event after failure: {}", e);
            None
        }
    }
}

/// Handle a moderator command. Authorization is checked by the caller.
pub async fn handle_command(command: ModeratorCommand, state: &Arc<AppState>) -> Option<Reply> {
    match command {
        ModeratorCommand::Ban {
            target_user_id,
            moderator_name,
            reason,
        } => moderator::handle_ban(state, target_user_id, moderator_name, reason).await,

        ModeratorCommand::Unban {
            target_user_id,
            moderator_name,
        } => moderator::handle_unban(state, target_user_id, moderator_name).await,

        ModeratorCommand::Open => moderator::handle_toggle_open(state, true).await,

        ModeratorCommand::Close => moderator::handle_toggle_open(state, false).await,

        ModeratorCommand::Download => moderator::handle_download(state).await,

        ModeratorCommand::Clear { confirmation } => {
            moderator::handle_clear(state, confirmation).await
        }
    }
}

fn is_submission_channel(state: &AppState, channel_id: &str) -> bool {
    channel_id == state.config.submission_channel_id
}

/// Delete a message in the submission channel, treating "already gone" as done.
/// Returns false when the transport failed.
async fn delete_submission_message(state: &AppState, message_id: &str) -> bool {
    match state
        .transport
        .delete_message(&state.config.submission_channel_id, message_id)
        .await
    {
        Ok(DeleteOutcome::Deleted) => true,
        Ok(DeleteOutcome::NotFound) => {
            tracing::debug!("Message {} was already gone", message_id);
            true
        }
        Err(e) => {
            tracing::warn!("Failed to delete message {}: {}", message_id, e);
            false
        }
    }
}
