use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::Session;

/// Source of the current session credentials.
///
/// Reads are async because the store may still be hydrating right after a
/// sign-in redirect.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn current(&self) -> Option<Session>;
}

/// Session store held in memory for one identity
#[derive(Default)]
pub struct InMemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    pub async fn set(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Remove the session, returning it if one was set
    pub async fn clear(&self) -> Option<Session> {
        self.session.write().await.take()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}
