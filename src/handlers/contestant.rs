//! Contestant-driven events
//!
//! Submissions, deletions of submission messages, and vote reactions.

use super::delete_submission_message;
use crate::error::{ContestError, ContestResult};
use crate::protocol::Reply;
use crate::state::lifecycle::validate_url;
use crate::state::AppState;
use crate::types::VoteDirection;
use std::sync::Arc;

const EXCLUDED_MESSAGE: &str =
    "You have been excluded from participation. If you believe this is in error, contact the mods.";
const INVALID_URL_MESSAGE: &str = "Your submission must be a valid url to a video hosting website.";
const CLOSED_MESSAGE: &str = "Submissions are currently closed.";
const STORAGE_FAILED_MESSAGE: &str =
    "Failed to record your submission due to a database error, please try again. 😔";
const GENERIC_FAILED_MESSAGE: &str = "Something went wrong with your submission, please try again.";

pub async fn handle_submission_command(
    state: &Arc<AppState>,
    user_id: String,
    display_name: String,
    channel_id: String,
    url: String,
) -> Option<Reply> {
    tracing::info!("Submission from {} ({}): {}", display_name, user_id, url);
    let config = &state.config;

    if channel_id != config.submission_channel_id {
        return Some(Reply::ephemeral(format!(
            "Please submit your entry in <#{}>!",
            config.submission_channel_id
        )));
    }

    match state.submissions_open().await {
        Ok(true) => {}
        Ok(false) => return Some(Reply::ephemeral(CLOSED_MESSAGE)),
        Err(e) => {
            tracing::error!("Failed to read submission window: {}", e);
            return Some(Reply::ephemeral(GENERIC_FAILED_MESSAGE));
        }
    }

    match state
        .transport
        .has_role(&user_id, &config.excluded_role_id)
        .await
    {
        Ok(false) => {}
        Ok(true) => {
            tracing::info!("Rejected submission from excluded user {}", user_id);
            return Some(Reply::ephemeral(EXCLUDED_MESSAGE));
        }
        Err(e) => {
            tracing::error!("Failed to check exclusion for {}: {}", user_id, e);
            return Some(Reply::ephemeral(GENERIC_FAILED_MESSAGE));
        }
    }

    if validate_url(&url).is_err() {
        return Some(Reply::ephemeral(INVALID_URL_MESSAGE));
    }

    let pending = match state
        .begin_submission(&user_id, &display_name, &url)
        .await
    {
        Ok(pending) => pending,
        // The window closed between the check above and now
        Err(ContestError::Validation(_)) => return Some(Reply::ephemeral(CLOSED_MESSAGE)),
        Err(e) => {
            tracing::error!("Failed to start submission for {}: {}", user_id, e);
            return Some(Reply::ephemeral(STORAGE_FAILED_MESSAGE));
        }
    };

    if let Some(prior) = &pending.prior_message_id {
        delete_submission_message(state, prior).await;
    }

    let message_id = match state
        .transport
        .post_message(&config.submission_channel_id, &pending.url)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to post submission for {}: {}", user_id, e);
            // The previous entry is already gone, so the user no longer competes
            if pending.prior_message_id.is_some() {
                if let Err(e) = state
                    .transport
                    .revoke_role(
                        &user_id,
                        &config.contestant_role_id,
                        "Replacement submission could not be posted",
                    )
                    .await
                {
                    tracing::warn!("Failed to revoke contestant role of {}: {}", user_id, e);
                }
            }
            return Some(Reply::ephemeral(GENERIC_FAILED_MESSAGE));
        }
    };

    let confirmed = match state.confirm_submission(pending, &message_id).await {
        Ok(confirmed) => confirmed,
        Err(e) => {
            tracing::error!(
                "Failed to record submission for {}, message {} is orphaned: {}",
                user_id,
                message_id,
                e
            );
            return Some(Reply::ephemeral(STORAGE_FAILED_MESSAGE));
        }
    };

    if let Some(superseded) = &confirmed.superseded_message_id {
        delete_submission_message(state, superseded).await;
    }

    if let Err(e) = state
        .transport
        .add_reaction(&config.submission_channel_id, &message_id, &config.vote_emoji)
        .await
    {
        tracing::warn!("Failed to add vote reaction to {}: {}", message_id, e);
    }

    if let Err(e) = state
        .transport
        .grant_role(
            &user_id,
            &config.contestant_role_id,
            "User submitted a contest entry.",
        )
        .await
    {
        tracing::warn!("Failed to grant contestant role to {}: {}", user_id, e);
    }

    Some(Reply::ephemeral("Your entry has been recorded, good luck!"))
}

pub async fn handle_message_deleted(
    state: &Arc<AppState>,
    message_id: &str,
) -> ContestResult<Option<Reply>> {
    let Some(user_id) = state.reconcile_external_deletion(message_id).await? else {
        return Ok(None);
    };

    state
        .transport
        .revoke_role(
            &user_id,
            &state.config.contestant_role_id,
            "Submission deleted",
        )
        .await?;
    Ok(None)
}

pub async fn handle_reaction_changed(
    state: &Arc<AppState>,
    message_id: &str,
    delta: i64,
) -> ContestResult<Option<Reply>> {
    let Some(direction) = VoteDirection::from_delta(delta) else {
        return Ok(None);
    };
    state.record_vote(message_id, direction).await?;
    Ok(None)
}

/// Keep the submission channel to our own messages
pub async fn handle_message_posted(
    state: &Arc<AppState>,
    message_id: &str,
    author_id: &str,
) -> ContestResult<Option<Reply>> {
    let Some(bot_user_id) = &state.config.bot_user_id else {
        tracing::debug!("No bot user configured, keeping message {}", message_id);
        return Ok(None);
    };

    if author_id != bot_user_id {
        tracing::info!(
            "Removing message {} by {} from the submission channel",
            message_id,
            author_id
        );
        delete_submission_message(state, message_id).await;
    }
    Ok(None)
}
