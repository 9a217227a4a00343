//! Moderator command handlers
//!
//! All handlers in this module require moderator rights.
//! Authorization is checked by the HTTP layer before calling these.

use super::delete_submission_message;
use crate::error::ContestError;
use crate::export::csv_attachment;
use crate::protocol::Reply;
use crate::state::AppState;
use std::sync::Arc;

pub async fn handle_ban(
    state: &Arc<AppState>,
    target_user_id: String,
    moderator_name: String,
    reason: Option<String>,
) -> Option<Reply> {
    let reason = format!(
        "{}: {}",
        moderator_name,
        reason.unwrap_or_else(|| "No reason given.".to_string())
    );
    tracing::info!("Banning {} ({})", target_user_id, reason);
    let config = &state.config;
    let mut chat_ok = true;

    if let Err(e) = state
        .transport
        .grant_role(&target_user_id, &config.excluded_role_id, &reason)
        .await
    {
        tracing::error!("Failed to grant exclusion role to {}: {}", target_user_id, e);
        chat_ok = false;
    }
    if let Err(e) = state
        .transport
        .revoke_role(&target_user_id, &config.contestant_role_id, &reason)
        .await
    {
        tracing::warn!("Failed to revoke contestant role of {}: {}", target_user_id, e);
        chat_ok = false;
    }

    match state.ban_user(&target_user_id).await {
        Ok(Some(message_id)) => {
            chat_ok &= delete_submission_message(state, &message_id).await;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to remove submission of {}: {}", target_user_id, e);
            return Some(Reply::ephemeral(format!(
                "<@{}> could not be banned: {}",
                target_user_id, e
            )));
        }
    }

    let mut content = format!(
        "<@{}> is excluded from participation, and their submission has been removed, if any.",
        target_user_id
    );
    if !chat_ok {
        content.push_str(" Some chat updates failed, check the logs.");
    }
    Some(Reply::ephemeral(content))
}

pub async fn handle_unban(
    state: &Arc<AppState>,
    target_user_id: String,
    moderator_name: String,
) -> Option<Reply> {
    tracing::info!("{} lifting ban of {}", moderator_name, target_user_id);
    match state
        .transport
        .revoke_role(&target_user_id, &state.config.excluded_role_id, &moderator_name)
        .await
    {
        Ok(()) => Some(Reply::ephemeral(format!(
            "<@{}> can participate again.",
            target_user_id
        ))),
        Err(e) => {
            tracing::error!("Failed to lift ban of {}: {}", target_user_id, e);
            Some(Reply::ephemeral(format!(
                "Failed to lift the ban of <@{}>: {}",
                target_user_id, e
            )))
        }
    }
}

pub async fn handle_toggle_open(state: &Arc<AppState>, open: bool) -> Option<Reply> {
    match state.set_submissions_open(open).await {
        Ok(()) if open => Some(Reply::ephemeral("Submissions are now enabled!")),
        Ok(()) => Some(Reply::ephemeral("Submissions are now disabled!")),
        Err(e) => {
            tracing::error!("Failed to toggle submissions: {}", e);
            Some(Reply::ephemeral(format!("Failed to update the setting: {}", e)))
        }
    }
}

pub async fn handle_download(state: &Arc<AppState>) -> Option<Reply> {
    let submissions = match state.export_all().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to export submissions: {}", e);
            return Some(Reply::ephemeral(format!("Export failed: {}", e)));
        }
    };

    match csv_attachment(
        &submissions,
        state.config.message_link_base.as_deref(),
        &state.config.submission_channel_id,
    ) {
        Ok(Some(attachment)) => Some(Reply::public("There you go!").with_attachment(attachment)),
        Ok(None) => Some(Reply::public("No submissions available.")),
        Err(e) => {
            tracing::error!("Failed to render CSV: {}", e);
            Some(Reply::ephemeral(format!("Export failed: {}", e)))
        }
    }
}

pub async fn handle_clear(state: &Arc<AppState>, confirmation: String) -> Option<Reply> {
    let removed = match state.clear_all(&confirmation).await {
        Ok(removed) => removed,
        Err(ContestError::Validation(_)) => {
            return Some(Reply::ephemeral(
                "Incorrect confirmation. Have an eggcellent day.",
            ))
        }
        Err(e) => {
            tracing::error!("Failed to clear submissions: {}", e);
            return Some(Reply::ephemeral(format!("Failed to clear submissions: {}", e)));
        }
    };

    match csv_attachment(
        &removed,
        state.config.message_link_base.as_deref(),
        &state.config.submission_channel_id,
    ) {
        Ok(Some(attachment)) => Some(
            Reply::public("All submissions deleted from the database. Here's a copy, just in case.")
                .with_attachment(attachment),
        ),
        Ok(None) => Some(Reply::public("All submissions deleted from the database.")),
        Err(e) => {
            // Keep the removed rows somewhere a moderator can recover them
            tracing::error!(
                rows = %serde_json::to_string(&removed).unwrap_or_default(),
                "Failed to render backup CSV after clearing: {}",
                e
            );
            Some(Reply::ephemeral(format!(
                "All submissions deleted, but the backup could not be rendered: {}. The rows are in the logs.",
                e
            )))
        }
    }
}
