pub mod memory;
pub mod store;

pub use memory::MemorySessionStore;
pub use store::SqliteSessionStore;

use async_trait::async_trait;
use deskhive_schema::SessionState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("snapshot serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store task join: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Persistence seam for per-conversation session snapshots.
///
/// Backends must round-trip the snapshot losslessly: unknown fields are
/// ignored on load and missing fields resolve to their defaults, which
/// the serde derives on `SessionState` already guarantee.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Result<Option<SessionState>, StoreError>;

    async fn save(&self, state: &SessionState) -> Result<(), StoreError>;

    /// Returns true when a snapshot existed and was removed.
    async fn delete(&self, conversation_id: &str) -> Result<bool, StoreError>;

    /// Conversation ids, most recently active first.
    async fn list_conversations(&self) -> Result<Vec<String>, StoreError>;
}
