use async_trait::async_trait;

use crate::store::types::UserSession;

/// Handle for session state shared by the regions of one run.
///
/// Passed explicitly to whatever needs it; there is no process-wide default.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session unless it is missing or expired.
    async fn get_session(&self, id: &str) -> Result<Option<UserSession>, StoreError>;

    async fn set_session(&self, session: UserSession) -> Result<(), StoreError>;

    async fn remove_session(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_sessions(&self) -> Result<Vec<UserSession>, StoreError>;

    /// Drops every session, e.g. between test batches.
    async fn reset(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Other(String),
    #[error("session details could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}
