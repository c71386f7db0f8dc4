//! Gatekeeping for views that need a signed-in user.

use tokio::sync::watch;

use crate::session::SessionState;

pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// What a protected view should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still being restored; show a loading placeholder.
    Placeholder,
    Render,
    Redirect { to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Never redirects while `loading` is set, so a restorable session is
    /// not bounced to the login page.
    pub fn decide(&self, state: &SessionState) -> GuardDecision {
        if state.loading {
            GuardDecision::Placeholder
        } else if state.user.is_some() {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect {
                to: self.login_path.clone(),
            }
        }
    }

    /// Wait for the session to settle, then decide.
    ///
    /// A closed channel can no longer settle and is treated as signed out.
    pub async fn resolve(&self, session: &mut watch::Receiver<SessionState>) -> GuardDecision {
        match session.wait_for(|s| !s.loading).await {
            Ok(state) => self.decide(&state),
            Err(_) => {
                tracing::debug!("Session channel closed before settling");
                GuardDecision::Redirect {
                    to: self.login_path.clone(),
                }
            }
        }
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            auth_provider: "local".to_string(),
            is_email_verified: true,
        }
    }

    #[test]
    fn loading_shows_placeholder_even_without_user() {
        let guard = RouteGuard::default();

        assert_eq!(guard.decide(&SessionState::default()), GuardDecision::Placeholder);
    }

    #[test]
    fn settled_user_renders() {
        let state = SessionState {
            user: Some(user()),
            loading: false,
        };

        assert_eq!(RouteGuard::default().decide(&state), GuardDecision::Render);
    }

    #[test]
    fn settled_without_user_redirects_to_login() {
        let state = SessionState {
            user: None,
            loading: false,
        };

        assert_eq!(
            RouteGuard::new("/signin").decide(&state),
            GuardDecision::Redirect {
                to: "/signin".to_string()
            }
        );
    }

    #[tokio::test]
    async fn resolve_waits_for_loading_to_clear() {
        let (tx, mut rx) = watch::channel(SessionState::default());
        let guard = RouteGuard::default();

        let pending = tokio::spawn(async move { guard.resolve(&mut rx).await });
        tx.send_replace(SessionState {
            user: Some(user()),
            loading: false,
        });

        assert_eq!(pending.await.unwrap(), GuardDecision::Render);
    }

    #[tokio::test]
    async fn resolve_redirects_when_channel_closes_while_loading() {
        let (tx, mut rx) = watch::channel(SessionState::default());
        drop(tx);

        assert_eq!(
            RouteGuard::default().resolve(&mut rx).await,
            GuardDecision::Redirect {
                to: DEFAULT_LOGIN_PATH.to_string()
            }
        );
    }
}
