use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use deskhive_schema::SessionState;

use crate::{SessionStore, StoreError};

/// In-process session store. Used by tests and by deployments that do not
/// need snapshots to survive a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<SessionState>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(sessions.get(conversation_id).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        sessions.insert(state.conversation_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(sessions.remove(conversation_id).is_some())
    }

    async fn list_conversations(&self) -> Result<Vec<String>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut entries: Vec<(&String, &SessionState)> = sessions.iter().collect();
        entries.sort_by(|a, b| b.1.last_activity.cmp(&a.1.last_activity));
        Ok(entries.into_iter().map(|(id, _)| id.clone()).collect())
    }
}
