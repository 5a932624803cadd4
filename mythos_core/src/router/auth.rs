//! Authentication state as seen by the router
//!
//! The identity provider lives elsewhere; the router only needs to know
//! whether the initial check has finished and who, if anyone, is signed in.
//! [`auth_channel`] returns the provider-side [`AuthHandle`] and the
//! router-side [`AuthSignal`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub display_name: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Authentication state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Initial check still running
    #[default]
    Pending,
    /// Check finished, with or without a user
    Resolved(Option<User>),
}

/// Provider side: publishes state changes
#[derive(Debug)]
pub struct AuthHandle {
    tx: watch::Sender<AuthState>,
}

/// Consumer side: read the state and wait for changes
#[derive(Debug, Clone)]
pub struct AuthSignal {
    rx: watch::Receiver<AuthState>,
}

/// Create a pending auth state
pub fn auth_channel() -> (AuthHandle, AuthSignal) {
    let (tx, rx) = watch::channel(AuthState::Pending);
    (AuthHandle { tx }, AuthSignal { rx })
}

impl AuthHandle {
    /// Finish (or redo) the auth check
    pub fn resolve(&self, user: Option<User>) {
        log::debug!(
            "Auth resolved: {}",
            user.as_ref().map_or("anonymous", |u| u.uid.as_str())
        );
        self.tx.send_replace(AuthState::Resolved(user));
    }

    pub fn sign_in(&self, user: User) {
        self.resolve(Some(user));
    }

    pub fn sign_out(&self) {
        self.resolve(None);
    }

    /// Another consumer of this state
    pub fn signal(&self) -> AuthSignal {
        AuthSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl AuthSignal {
    /// A signal that is already resolved and never changes
    pub fn resolved(user: Option<User>) -> Self {
        let (_, rx) = watch::channel(AuthState::Resolved(user));
        Self { rx }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.rx.borrow(), AuthState::Resolved(_))
    }

    pub fn current_user(&self) -> Option<User> {
        match &*self.rx.borrow() {
            AuthState::Resolved(user) => user.clone(),
            AuthState::Pending => None,
        }
    }

    /// Receiver notified on every state change after this call
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }

    /// Wait until the state is resolved
    ///
    /// Returns immediately when it already is. If the provider goes away
    /// while pending, resolves as anonymous.
    pub async fn ready(&self) -> Option<User> {
        let mut rx = self.rx.clone();
        match rx.wait_for(|state| matches!(state, AuthState::Resolved(_))).await {
            Ok(state) => match &*state {
                AuthState::Resolved(user) => user.clone(),
                AuthState::Pending => None,
            },
            Err(_) => None,
        }
    }
}
