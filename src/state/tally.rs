use crate::error::ContestResult;
use crate::state::AppState;
use crate::types::VoteDirection;

impl AppState {
    /// Count a vote reaction added to a submission message
    pub async fn increment(&self, message_id: &str) -> ContestResult<Option<i64>> {
        self.record_vote(message_id, VoteDirection::Up).await
    }

    /// Count a vote reaction removed from a submission message
    pub async fn decrement(&self, message_id: &str) -> ContestResult<Option<i64>> {
        self.record_vote(message_id, VoteDirection::Down).await
    }

    /// Apply one vote. Returns the new count, or `None` when the message
    /// carries no submission (e.g. it was withdrawn); such votes are dropped.
    /// There is no floor: lost events can leave the count negative.
    pub async fn record_vote(
        &self,
        message_id: &str,
        direction: VoteDirection,
    ) -> ContestResult<Option<i64>> {
        let delta = match direction {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        };

        let _gate = self.gate.lock().await;
        let count = self.store.adjust_vote(message_id, delta).await?;

        match count {
            Some(count) => tracing::debug!("Message {} now has {} votes", message_id, count),
            None => tracing::debug!("Dropped vote on message {} without submission", message_id),
        }
        Ok(count)
    }
}
