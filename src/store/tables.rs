use crate::types::{MessageId, Submission, UserId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    submission: Submission,
}

/// In-memory submissions and settings tables
#[derive(Debug, Default)]
pub(crate) struct Tables {
    next_seq: u64,
    rows: HashMap<UserId, Row>,
    by_message: HashMap<MessageId, UserId>,
    settings: BTreeMap<String, serde_json::Value>,
}

impl Tables {
    pub fn put(&mut self, submission: Submission) {
        if let Some(prior) = self.rows.remove(&submission.user_id) {
            self.by_message.remove(&prior.submission.message_id);
        }

        // A message carries at most one submission
        if let Some(other_user) = self.by_message.remove(&submission.message_id) {
            tracing::warn!(
                "Message {} was still indexed to user {}, dropping that row",
                submission.message_id,
                other_user
            );
            self.rows.remove(&other_user);
        }

        self.next_seq += 1;
        self.by_message
            .insert(submission.message_id.clone(), submission.user_id.clone());
        self.rows.insert(
            submission.user_id.clone(),
            Row {
                seq: self.next_seq,
                submission,
            },
        );
    }

    pub fn get_by_user(&self, user_id: &str) -> Option<Submission> {
        self.rows.get(user_id).map(|row| row.submission.clone())
    }

    pub fn get_by_message(&self, message_id: &str) -> Option<Submission> {
        let user_id = self.by_message.get(message_id)?;
        self.get_by_user(user_id)
    }

    pub fn delete_by_user(&mut self, user_id: &str) -> Option<MessageId> {
        let row = self.rows.remove(user_id)?;
        self.by_message.remove(&row.submission.message_id);
        Some(row.submission.message_id)
    }

    pub fn delete_by_message(&mut self, message_id: &str) -> Option<UserId> {
        let user_id = self.by_message.remove(message_id)?;
        self.rows.remove(&user_id);
        Some(user_id)
    }

    pub fn list_all(&self) -> Vec<Submission> {
        let mut rows: Vec<&Row> = self.rows.values().collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| row.submission.clone()).collect()
    }

    pub fn clear_all(&mut self) -> usize {
        let removed = self.rows.len();
        self.rows.clear();
        self.by_message.clear();
        removed
    }

    pub fn get_setting(&self, key: &str) -> Option<serde_json::Value> {
        self.settings.get(key).cloned()
    }

    pub fn set_setting(&mut self, key: &str, value: serde_json::Value) {
        self.settings.insert(key.to_string(), value);
    }

    pub fn adjust_vote(&mut self, message_id: &str, delta: i64) -> Option<i64> {
        let user_id = self.by_message.get(message_id)?;
        let row = self.rows.get_mut(user_id)?;
        row.submission.vote_count = row.submission.vote_count.saturating_add(delta);
        Some(row.submission.vote_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(user: &str, message: &str) -> Submission {
        Submission {
            user_id: user.to_string(),
            display_name: format!("name-{}", user),
            url: format!("http://x/{}", message),
            vote_count: 0,
            message_id: message.to_string(),
            submitted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_put_replaces_row_and_message_index() {
        let mut tables = Tables::default();
        tables.put(submission("u1", "m1"));
        tables.put(submission("u1", "m2"));

        assert_eq!(tables.list_all().len(), 1);
        assert!(tables.get_by_message("m1").is_none());
        assert_eq!(tables.get_by_message("m2").unwrap().user_id, "u1");
    }

    #[test]
    fn test_put_same_message_for_other_user_drops_stale_row() {
        let mut tables = Tables::default();
        tables.put(submission("u1", "m1"));
        tables.put(submission("u2", "m1"));

        assert!(tables.get_by_user("u1").is_none());
        assert_eq!(tables.get_by_message("m1").unwrap().user_id, "u2");
    }

    #[test]
    fn test_list_all_keeps_insertion_order() {
        let mut tables = Tables::default();
        tables.put(submission("u3", "m3"));
        tables.put(submission("u1", "m1"));
        tables.put(submission("u2", "m2"));

        let users: Vec<_> = tables.list_all().into_iter().map(|s| s.user_id).collect();
        assert_eq!(users, vec!["u3", "u1", "u2"]);
    }

    #[test]
    fn test_adjust_vote_unknown_message() {
        let mut tables = Tables::default();
        tables.put(submission("u1", "m1"));
        assert_eq!(tables.adjust_vote("missing", 1), None);
        assert_eq!(tables.get_by_user("u1").unwrap().vote_count, 0);
    }

    #[test]
    fn test_adjust_vote_can_go_negative() {
        let mut tables = Tables::default();
        tables.put(submission("u1", "m1"));
        assert_eq!(tables.adjust_vote("m1", -1), Some(-1));
        assert_eq!(tables.adjust_vote("m1", -1), Some(-2));
    }
}
