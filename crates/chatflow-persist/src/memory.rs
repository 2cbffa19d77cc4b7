use crate::error::Result;
use crate::store::SessionStore;
use async_trait::async_trait;
use chatflow_types::{Session, SessionId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory session store for tests and single-process deployments. All
/// access serializes behind one async mutex, which trivially satisfies the
/// single-writer-per-key requirement.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.sessions.lock().await.remove(id);
        Ok(())
    }

    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        let removed = (before - sessions.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "swept idle sessions");
        }
        Ok(removed)
    }
}
