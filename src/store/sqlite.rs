//! SQLite-backed store.
//!
//! Two tables, `submissions` (keyed by user id, unique message id) and
//! `settings` (keyed by name). The connection runs in WAL mode with
//! `synchronous = FULL`, so a mutation that returned `Ok` survives a crash.
//! Statements run on the blocking pool behind a single connection mutex.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{RecordStore, StoreError, StoreResult, STORE_SCHEMA_VERSION};
use crate::types::{MessageId, Submission, UserId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SUBMISSION_COLUMNS: &str =
    "user_id, display_name, url, vote_count, message_id, submitted_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`. Tables are created by
    /// [`RecordStore::init`].
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Background(format!("connection lock poisoned: {e}")))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

fn apply_pragmas(conn: &Connection) -> StoreResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > STORE_SCHEMA_VERSION {
        return Err(StoreError::Schema(format!(
            "Store schema version {} is newer than supported version {}",
            version, STORE_SCHEMA_VERSION
        )));
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS submissions (
           user_id TEXT PRIMARY KEY,
           display_name TEXT NOT NULL,
           url TEXT NOT NULL,
           vote_count INTEGER NOT NULL DEFAULT 0,
           message_id TEXT NOT NULL UNIQUE,
           submitted_at TEXT NOT NULL,
           seq INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS settings (
           key TEXT PRIMARY KEY,
           value TEXT NOT NULL
         );",
    )?;
    conn.pragma_update(None, "user_version", STORE_SCHEMA_VERSION)?;
    Ok(())
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        url: row.get(2)?,
        vote_count: row.get(3)?,
        message_id: row.get(4)?,
        submitted_at: row.get(5)?,
    })
}

fn select_one(conn: &Connection, filter: &str, key: &str) -> StoreResult<Option<Submission>> {
    let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE {filter} = ?1");
    Ok(conn
        .query_row(&sql, params![key], submission_from_row)
        .optional()?)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn init(&self) -> StoreResult<()> {
        self.with_conn(|conn| initialize_schema(conn)).await?;
        tracing::info!("Store ready at {}", self.path.display());
        Ok(())
    }

    async fn put(&self, submission: Submission) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            // A message carries at most one submission
            let stale = tx.execute(
                "DELETE FROM submissions WHERE message_id = ?1 AND user_id <> ?2",
                params![submission.message_id, submission.user_id],
            )?;
            if stale > 0 {
                tracing::warn!(
                    "Message {} was still keyed to another user, dropping that row",
                    submission.message_id
                );
            }
            tx.execute(
                "INSERT INTO submissions
                   (user_id, display_name, url, vote_count, message_id, submitted_at, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                   (SELECT COALESCE(MAX(seq), 0) + 1 FROM submissions))
                 ON CONFLICT(user_id) DO UPDATE SET
                   display_name = excluded.display_name,
                   url = excluded.url,
                   vote_count = excluded.vote_count,
                   message_id = excluded.message_id,
                   submitted_at = excluded.submitted_at,
                   seq = excluded.seq",
                params![
                    submission.user_id,
                    submission.display_name,
                    submission.url,
                    submission.vote_count,
                    submission.message_id,
                    submission.submitted_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_by_user(&self, user_id: &str) -> StoreResult<Option<Submission>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| select_one(conn, "user_id", &user_id))
            .await
    }

    async fn get_by_message(&self, message_id: &str) -> StoreResult<Option<Submission>> {
        let message_id = message_id.to_string();
        self.with_conn(move |conn| select_one(conn, "message_id", &message_id))
            .await
    }

    async fn delete_by_user(&self, user_id: &str) -> StoreResult<Option<MessageId>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "DELETE FROM submissions WHERE user_id = ?1 RETURNING message_id",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?)
        })
        .await
    }

    async fn delete_by_message(&self, message_id: &str) -> StoreResult<Option<UserId>> {
        let message_id = message_id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "DELETE FROM submissions WHERE message_id = ?1 RETURNING user_id",
                    params![message_id],
                    |row| row.get(0),
                )
                .optional()?)
        })
        .await
    }

    async fn list_all(&self) -> StoreResult<Vec<Submission>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY seq");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], submission_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn clear_all(&self) -> StoreResult<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM submissions", [])?))
            .await
    }

    async fn get_setting(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            match raw {
                Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn set_setting(&self, key: &str, value: serde_json::Value) -> StoreResult<()> {
        let key = key.to_string();
        let raw = serde_json::to_string(&value)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, raw],
            )?;
            Ok(())
        })
        .await
    }

    async fn adjust_vote(&self, message_id: &str, delta: i64) -> StoreResult<Option<i64>> {
        let message_id = message_id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "UPDATE submissions SET vote_count = vote_count + ?1
                     WHERE message_id = ?2 RETURNING vote_count",
                    params![delta, message_id],
                    |row| row.get(0),
                )
                .optional()?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(user: &str, message: &str) -> Submission {
        Submission {
            user_id: user.to_string(),
            display_name: "Alice".to_string(),
            url: format!("http://x/{}", message),
            vote_count: 0,
            message_id: message.to_string(),
            submitted_at: chrono::Utc::now(),
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        let store = SqliteStore::open(dir.path().join("nested").join("contest.db")).unwrap();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_init_creates_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        assert!(store.path().exists());

        store.put(submission("u1", "m1")).await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reopen_restores_rows_settings_and_votes() {
        let dir = tempfile::tempdir().unwrap();
        let first = submission("u1", "m1");
        {
            let store = open_store(&dir).await;
            store.put(first.clone()).await.unwrap();
            store.put(submission("u2", "m2")).await.unwrap();
            store.adjust_vote("m2", 3).await.unwrap();
            store
                .set_setting("submissions_open", serde_json::json!("true"))
                .await
                .unwrap();
        }

        let reopened = open_store(&dir).await;
        let rows = reopened.list_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], first);
        assert_eq!(
            reopened.get_by_message("m2").await.unwrap().unwrap().vote_count,
            3
        );
        assert_eq!(
            reopened.get_setting("submissions_open").await.unwrap(),
            Some(serde_json::json!("true"))
        );
    }

    #[tokio::test]
    async fn test_init_rejects_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contest.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", STORE_SCHEMA_VERSION + 1)
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let result = store.init().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("newer than supported"));
    }

    #[tokio::test]
    async fn test_put_replaces_row_and_moves_it_last() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.put(submission("u1", "m1")).await.unwrap();
        store.put(submission("u2", "m2")).await.unwrap();
        store.adjust_vote("m1", 2).await.unwrap();

        store.put(submission("u1", "m3")).await.unwrap();

        let users: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.user_id)
            .collect();
        assert_eq!(users, vec!["u2", "u1"]);
        assert!(store.get_by_message("m1").await.unwrap().is_none());
        assert_eq!(store.get_by_user("u1").await.unwrap().unwrap().vote_count, 0);
    }

    #[tokio::test]
    async fn test_put_same_message_for_other_user_drops_stale_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.put(submission("u1", "m1")).await.unwrap();
        store.put(submission("u2", "m1")).await.unwrap();

        assert!(store.get_by_user("u1").await.unwrap().is_none());
        assert_eq!(
            store.get_by_message("m1").await.unwrap().unwrap().user_id,
            "u2"
        );
    }

    #[tokio::test]
    async fn test_deletes_return_the_other_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.put(submission("u1", "m1")).await.unwrap();
        store.put(submission("u2", "m2")).await.unwrap();

        assert_eq!(
            store.delete_by_user("u1").await.unwrap(),
            Some("m1".to_string())
        );
        assert_eq!(store.delete_by_user("u1").await.unwrap(), None);
        assert_eq!(
            store.delete_by_message("m2").await.unwrap(),
            Some("u2".to_string())
        );
        assert_eq!(store.delete_by_message("m2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_votes_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        assert_eq!(store.adjust_vote("missing", 1).await.unwrap(), None);

        store.put(submission("u1", "m1")).await.unwrap();
        assert_eq!(store.adjust_vote("m1", -1).await.unwrap(), Some(-1));
        assert_eq!(store.adjust_vote("m1", -1).await.unwrap(), Some(-2));

        store
            .set_setting("submissions_open", serde_json::json!("false"))
            .await
            .unwrap();
        assert_eq!(store.clear_all().await.unwrap(), 1);
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(
            store.get_setting("submissions_open").await.unwrap(),
            Some(serde_json::json!("false"))
        );
    }
}
