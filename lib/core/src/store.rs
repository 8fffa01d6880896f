//! Session storage.
//!
//! The gate reads and writes sessions through [`SessionStore`]. The crate
//! ships an in-process [`MemorySessionStore`]; deployments running more than
//! one instance plug in a shared backend.

use async_trait::async_trait;
use rootcause::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::SessionStoreError;
use crate::session::{Session, SessionId};

/// Persistence for browser sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Loads a session by ID.
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, Report<SessionStoreError>>;

    /// Inserts or replaces a session.
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>>;

    /// Replaces a session only if it is still stored.
    ///
    /// Returns false, and stores nothing, when the session was deleted in the
    /// meantime.
    async fn update(&self, session: &Session) -> Result<bool, Report<SessionStoreError>>;

    /// Deletes a session. Deleting an unknown ID is not an error.
    async fn delete(&self, id: &SessionId) -> Result<(), Report<SessionStoreError>>;

    /// Deletes every expired session and returns how many were removed.
    async fn delete_expired(&self) -> Result<u64, Report<SessionStoreError>>;
}

/// In-process session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, Report<SessionStoreError>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>> {
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<bool, Report<SessionStoreError>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session.id()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<(), Report<SessionStoreError>> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Report<SessionStoreError>> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        let removed = (before - sessions.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "deleted expired sessions");
        }
        Ok(removed)
    }
}
