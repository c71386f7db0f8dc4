//! Client-held authentication state.
//!
//! [`SessionContext`] is the single writer of the token: `login`, `logout`
//! and `refresh` are its public mutation points, and the request client may
//! only expire it after a 401. Everything else reads.

mod store;

pub use store::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::client::ClientError;
use crate::models::User;

/// What session-dependent views observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True until the first `refresh` settles.
    pub loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

/// Resolves a stored token to the user it belongs to (`GET /auth/me`).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<User, ClientError>;
}

pub struct SessionContext {
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    refreshed: AtomicBool,
}

impl SessionContext {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            state,
            refreshed: AtomicBool::new(false),
        }
    }

    /// Session backed by a process-local store, mainly for tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn token(&self) -> Option<String> {
        self.store.load()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Persist a freshly issued token and publish its user.
    pub fn login(&self, token: &str, user: User) -> Result<(), StoreError> {
        self.store.save(token)?;
        tracing::info!(username = %user.username, "Logged in");
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.loading = false;
        });
        Ok(())
    }

    pub fn logout(&self) {
        self.clear_token();
        tracing::info!("Logged out");
        self.state.send_modify(|s| {
            s.user = None;
            s.loading = false;
        });
    }

    /// Re-validate the persisted token. Runs once; later calls return the
    /// current state without touching the network.
    pub async fn refresh(&self, identity: &dyn IdentityProvider) -> SessionState {
        if self.refreshed.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let user = match self.store.load() {
            None => {
                tracing::debug!("No persisted session token");
                None
            }
            Some(_) => match identity.current_user().await {
                Ok(user) => {
                    tracing::info!(username = %user.username, "Restored session");
                    Some(user)
                }
                Err(e) => {
                    tracing::warn!("Persisted session rejected: {}", e);
                    self.clear_token();
                    None
                }
            },
        };

        self.state.send_modify(|s| {
            s.user = user;
            s.loading = false;
        });
        self.state()
    }

    /// Drop the token after the backend answered 401. Leaves `loading`
    /// alone so an in-flight refresh still owns settling it.
    pub(crate) fn expire(&self) {
        self.clear_token();
        let had_user = self.state.send_if_modified(|s| s.user.take().is_some());
        tracing::info!(had_user, "Session expired");
    }

    fn clear_token(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear session token: {}", e);
        }
    }
}
