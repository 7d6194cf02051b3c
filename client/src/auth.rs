//! Authentication completion signal.
//!
//! The client does not authenticate anyone itself. Whatever performs the
//! login holds an [`AuthCompleter`] and completes it once with the resulting
//! [`Session`]; the sync side awaits the matching [`AuthSignal`].

use tokio::sync::oneshot;

/// An established session with the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token presented on every fetch
    pub token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Completing half, held by the login flow.
#[derive(Debug)]
pub struct AuthCompleter {
    tx: oneshot::Sender<Session>,
}

impl AuthCompleter {
    /// Report a successful login.
    ///
    /// Returns `false` if nobody is waiting for the signal anymore.
    pub fn complete(self, session: Session) -> bool {
        self.tx.send(session).is_ok()
    }
}

/// Waiting half, consumed by whoever reacts to the login.
#[derive(Debug)]
pub struct AuthSignal {
    rx: oneshot::Receiver<Session>,
}

impl AuthSignal {
    /// Wait for the login to complete.
    ///
    /// Resolves to `None` when the completer is dropped without a session.
    pub async fn wait(self) -> Option<Session> {
        self.rx.await.ok()
    }
}

/// Create a connected completer/signal pair.
pub fn auth_signal() -> (AuthCompleter, AuthSignal) {
    let (tx, rx) = oneshot::channel();
    (AuthCompleter { tx }, AuthSignal { rx })
}
