use std::sync::Arc;

use domain::{SessionProvider, SessionUser};
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
pub struct SharedSession {
    tx: Arc<watch::Sender<Option<SessionUser>>>,
}

impl SharedSession {
    pub fn new(user: Option<SessionUser>) -> Self {
        let (tx, _) = watch::channel(user);
        Self { tx: Arc::new(tx) }
    }

    pub fn sign_in(&self, user: SessionUser) {
        info!("Signed in as {}", user.username);
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        self.tx.send_replace(None);
    }

    /// Applies a profile rename. Comments already posted keep the old name.
    pub fn rename(&self, username: impl Into<String>) {
        let username = username.into();
        self.tx.send_modify(|user| {
            if let Some(user) = user {
                user.username = username;
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }
}

impl SessionProvider for SharedSession {
    fn current_user(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }
}
