use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::store::{SessionStore, StoreError, UserSession};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<BTreeMap<String, UserSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self, id: &str) -> Result<Option<UserSession>, StoreError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        match sessions.get(id) {
            Some(s) if s.is_expired(now) => {
                sessions.remove(id);
                Ok(None)
            }
            other => Ok(other.cloned()),
        }
    }

    async fn set_session(&self, session: UserSession) -> Result<(), StoreError> {
        self.sessions.write().insert(session.id.clone(), session);
        Ok(())
    }

    async fn remove_session(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.write().remove(id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<UserSession>, StoreError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|s| !s.is_expired(now))
            .cloned()
            .collect())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.sessions.write().clear();
        Ok(())
    }
}
