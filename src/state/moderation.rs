use super::AppState;
use crate::error::{ContestError, ContestResult};
use crate::types::*;

impl AppState {
    /// All submissions in insertion order
    pub async fn export_all(&self) -> ContestResult<Vec<Submission>> {
        Ok(self.store.list_all().await?)
    }

    pub async fn get_submission(&self, user_id: &str) -> ContestResult<Submission> {
        self.store
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| ContestError::NotFound(format!("No submission for user {}", user_id)))
    }

    /// Delete every submission and return the removed rows as a backup.
    ///
    /// `confirmation` must match the configured phrase exactly; otherwise
    /// nothing is deleted. The rows are read and deleted under one gate
    /// acquisition, so the backup holds exactly what was removed.
    pub async fn clear_all(&self, confirmation: &str) -> ContestResult<Vec<Submission>> {
        if confirmation != self.config.clear_confirmation {
            return Err(ContestError::Validation(
                "Incorrect confirmation phrase".to_string(),
            ));
        }

        let _gate = self.gate.lock().await;
        let backup = self.store.list_all().await?;
        let removed = self.store.clear_all().await?;
        if removed != backup.len() {
            tracing::warn!(
                "Cleared {} submissions but backed up {}",
                removed,
                backup.len()
            );
        }
        tracing::info!("Cleared {} submissions", removed);
        Ok(backup)
    }

    /// Open or close the submission window
    pub async fn set_submissions_open(&self, open: bool) -> ContestResult<()> {
        let value = if open { "true" } else { "false" };
        self.store
            .set_setting(SUBMISSIONS_OPEN, serde_json::Value::String(value.to_string()))
            .await?;
        tracing::info!("Submissions are now {}", if open { "open" } else { "closed" });
        Ok(())
    }

    /// Whether submissions are accepted. A missing flag means closed.
    pub async fn submissions_open(&self) -> ContestResult<bool> {
        let value = self.store.get_setting(SUBMISSIONS_OPEN).await?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => s == "true",
            Some(serde_json::Value::Bool(b)) => b,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContestConfig;
    use crate::state::test_support::open_state;
    use crate::store::MemoryStore;
    use crate::transport::MemoryTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_window_defaults_to_closed() {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryTransport::new()),
            ContestConfig::default(),
        );
        assert!(!state.submissions_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_writes_boolean_as_string() {
        let (state, _) = open_state().await;
        state.set_submissions_open(false).await.unwrap();

        assert!(!state.submissions_open().await.unwrap());
        assert_eq!(
            state.store.get_setting(SUBMISSIONS_OPEN).await.unwrap(),
            Some(serde_json::json!("false"))
        );

        state.set_submissions_open(true).await.unwrap();
        assert!(state.submissions_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_with_wrong_phrase_deletes_nothing() {
        let (state, _) = open_state().await;
        let pending = state
            .begin_submission("u1", "Alice", "http://x/1")
            .await
            .unwrap();
        state.confirm_submission(pending, "m1").await.unwrap();

        let result = state.clear_all("delete everything please").await;
        assert!(matches!(result, Err(ContestError::Validation(_))));
        assert_eq!(state.export_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_with_phrase_deletes_all() {
        let (state, _) = open_state().await;
        for (user, message) in [("u1", "m1"), ("u2", "m2")] {
            let pending = state
                .begin_submission(user, "Someone", "http://x/1")
                .await
                .unwrap();
            state.confirm_submission(pending, message).await.unwrap();
        }

        let backup = state.clear_all("Delete everything please!").await.unwrap();
        let users: Vec<_> = backup.into_iter().map(|s| s.user_id).collect();
        assert_eq!(users, vec!["u1", "u2"]);
        assert!(state.export_all().await.unwrap().is_empty());
        // The window flag survives a clear
        assert!(state.submissions_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_backup_includes_racing_submission() {
        let (state, _) = open_state().await;
        let state = Arc::new(state);
        let pending = state
            .begin_submission("u1", "Alice", "http://x/1")
            .await
            .unwrap();

        // Hold the gate so the clear and the confirm queue up behind it
        let gate = state.gate.lock().await;
        let clearing = {
            let state = state.clone();
            tokio::spawn(async move { state.clear_all("Delete everything please!").await })
        };
        let confirming = {
            let state = state.clone();
            tokio::spawn(async move { state.confirm_submission(pending, "m1").await })
        };
        tokio::task::yield_now().await;
        drop(gate);

        let backup = clearing.await.unwrap().unwrap();
        confirming.await.unwrap().unwrap();

        // Either the row was cleared and is in the backup, or it landed after the clear
        let remaining = state.export_all().await.unwrap();
        assert_eq!(backup.len() + remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_get_submission_not_found() {
        let (state, _) = open_state().await;
        let result = state.get_submission("nobody").await;
        assert!(matches!(result, Err(ContestError::NotFound(_))));
    }
}
