use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deskhive_schema::SessionState;
use rusqlite::{params, Connection};
use tokio::task;

use crate::{SessionStore, StoreError};

/// Durable session store backed by sqlite. The connection lives behind a
/// mutex and all statements run on the blocking pool.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;
        tracing::debug!("session store opened at {path}");
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn db(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }
}

fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS conversation_sessions (
            conversation_id TEXT PRIMARY KEY,
            snapshot TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
            ON conversation_sessions(updated_at);
        "#,
    )
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<SessionState>, StoreError> {
        let db = Arc::clone(&self.db);
        let conversation_id = conversation_id.to_owned();
        task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            let mut stmt = conn.prepare(
                r#"
                SELECT snapshot
                FROM conversation_sessions
                WHERE conversation_id = ?1
                LIMIT 1
                "#,
            )?;
            let mut rows = stmt.query(params![conversation_id])?;
            if let Some(row) = rows.next()? {
                let raw: String = row.get(0)?;
                let state: SessionState = serde_json::from_str(&raw)?;
                return Ok(Some(state));
            }
            Ok::<Option<SessionState>, StoreError>(None)
        })
        .await?
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let state = state.clone();
        task::spawn_blocking(move || {
            let snapshot = serde_json::to_string(&state)?;
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            conn.execute(
                r#"
                INSERT INTO conversation_sessions (conversation_id, snapshot, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(conversation_id) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    updated_at = excluded.updated_at
                "#,
                params![
                    state.conversation_id,
                    snapshot,
                    state.last_activity.to_rfc3339(),
                ],
            )?;
            Ok::<(), StoreError>(())
        })
        .await??;

        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, StoreError> {
        let db = Arc::clone(&self.db);
        let conversation_id = conversation_id.to_owned();
        task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            let deleted = conn.execute(
                "DELETE FROM conversation_sessions WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok::<bool, StoreError>(deleted > 0)
        })
        .await?
    }

    async fn list_conversations(&self) -> Result<Vec<String>, StoreError> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            let mut stmt = conn.prepare(
                r#"
                SELECT conversation_id
                FROM conversation_sessions
                ORDER BY updated_at DESC
                "#,
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok::<Vec<String>, StoreError>(ids)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhive_schema::{ConversationStatus, FrustrationLevel};

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut state = SessionState::new("conv-1", Some("user_456".into()));
        state.status = ConversationStatus::InProgress;
        state.turn_count = 5;
        state.user_frustration_level = FrustrationLevel::Frustrated;
        store.save(&state).await.unwrap();

        let loaded = store.load("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, ConversationStatus::InProgress);
        assert_eq!(loaded.turn_count, 5);
        assert_eq!(
            loaded.user_frustration_level,
            FrustrationLevel::Frustrated
        );
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_existing_snapshot() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut state = SessionState::new("conv-2", None);
        store.save(&state).await.unwrap();

        state.turn_count = 9;
        state.touch();
        store.save(&state).await.unwrap();

        let loaded = store.load("conv-2").await.unwrap().unwrap();
        assert_eq!(loaded.turn_count, 9);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteSessionStore::open(path).unwrap();
            let mut state = SessionState::new("conv-3", None);
            state.turn_count = 2;
            store.save(&state).await.unwrap();
        }

        let store = SqliteSessionStore::open(path).unwrap();
        let loaded = store.load("conv-3").await.unwrap().unwrap();
        assert_eq!(loaded.turn_count, 2);
    }

    #[tokio::test]
    async fn legacy_snapshot_loads_with_defaults() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        // A row written by an earlier build that knew fewer fields.
        {
            let db = store.db();
            let conn = db.lock().unwrap();
            conn.execute(
                "INSERT INTO conversation_sessions (conversation_id, snapshot, updated_at) VALUES (?1, ?2, ?3)",
                params![
                    "conv-legacy",
                    r#"{"conversation_id":"conv-legacy","status":"awaiting_user","turn_count":6}"#,
                    "2025-01-01T00:00:00+00:00",
                ],
            )
            .unwrap();
        }

        let loaded = store.load("conv-legacy").await.unwrap().unwrap();
        assert_eq!(loaded.status, ConversationStatus::AwaitingUser);
        assert_eq!(loaded.turn_count, 6);
        assert!(!loaded.escalation_requested);
        assert!(loaded.attempted_solutions.is_empty());
        assert_eq!(loaded.ticket_id, None);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store
            .save(&SessionState::new("conv-4", None))
            .await
            .unwrap();
        assert!(store.delete("conv-4").await.unwrap());
        assert!(!store.delete("conv-4").await.unwrap());
        assert!(store.load("conv-4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_by_recency() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut older = SessionState::new("conv-old", None);
        older.last_activity = older.last_activity - chrono::TimeDelta::try_seconds(120).unwrap();
        store.save(&older).await.unwrap();
        store
            .save(&SessionState::new("conv-new", None))
            .await
            .unwrap();

        let ids = store.list_conversations().await.unwrap();
        assert_eq!(ids, vec!["conv-new".to_string(), "conv-old".to_string()]);
    }
}
