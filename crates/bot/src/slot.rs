use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use nagbot_irc::{ChannelDelivery, ChatSession, IrcError, IrcMessage, SessionState};

/// The single place the current [`ChatSession`] lives.
///
/// The supervisor installs a session when a connection comes up and clears
/// it when the connection is lost; the alert path only ever borrows it. At
/// most one session exists at a time.
///
/// Sessions in the slot write into a [`line_queue`](nagbot_irc::line_queue),
/// so the lock is never held across socket I/O.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<Mutex<Option<ChatSession>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `session`, replacing (and discarding) any previous one.
    pub async fn install(&self, session: ChatSession) {
        let mut guard = self.inner.lock().await;
        if let Some(mut old) = guard.replace(session) {
            warn!(nickname = %old.nickname(), "replacing a live session");
            old.disconnected();
        }
    }

    /// Drop the current session after its connection was lost.
    pub async fn clear(&self) {
        if let Some(mut session) = self.inner.lock().await.take() {
            session.disconnected();
            debug!(nickname = %session.nickname(), "session cleared");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.state() != SessionState::Disconnected)
    }

    pub async fn state(&self) -> Option<SessionState> {
        self.inner.lock().await.as_ref().map(ChatSession::state)
    }

    pub async fn active_channels(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|s| s.active_channels().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Feed one server line to the session and report its state afterwards.
    pub async fn handle(&self, msg: &IrcMessage) -> Result<SessionState, IrcError> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(IrcError::Closed)?;
        session.handle(msg).await?;
        Ok(session.state())
    }

    /// Broadcast to the current session's channels. `None` when there is no session.
    pub async fn broadcast(&self, text: &str) -> Option<Vec<ChannelDelivery>> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut()?;
        Some(session.broadcast(text).await)
    }

    /// Send a keepalive `PING` on the current session.
    pub async fn ping(&self, token: &str) -> Result<(), IrcError> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(IrcError::Closed)?;
        session.ping(token).await
    }

    /// Send `QUIT` on the current session, if any, and drop it.
    pub async fn quit(&self, reason: &str) {
        let Some(mut session) = self.inner.lock().await.take() else {
            return;
        };
        if let Err(e) = session.quit(reason).await {
            warn!(error = %e, "failed to send QUIT");
        }
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot").finish_non_exhaustive()
    }
}
