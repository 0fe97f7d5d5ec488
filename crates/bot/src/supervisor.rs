//! Connection supervision.
//!
//! The [`SessionSupervisor`] owns the connect → register → serve → reconnect
//! cycle. Every connection gets a fresh [`ChatSession`]; nothing from a
//! previous connection (kicked channels, collided nicknames) carries over.
//! Failures are never fatal: the supervisor waits out the backoff delay and
//! tries again until shutdown.
//!
//! Outgoing lines go through a [`line_queue`]: sessions enqueue, and the
//! serve loop drains the queue into the socket alongside reading. A write
//! that stalls past the write timeout, or a server that stays silent through
//! a keepalive `PING`, counts as a lost connection.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::futures::Notified;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use nagbot_irc::{
    line_queue, ChatSession, Connection, IrcError, IrcMessage, NickAllocator, SessionConfig,
    SessionState,
};

use crate::backoff::Backoff;
use crate::config::IrcConfig;
use crate::slot::SessionSlot;

// ── Connector ───────────────────────────────────────────────────────

/// Opens connections to the IRC server.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, IrcError>;

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self) -> Result<Connection, IrcError> {
        (**self).connect().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Plain TCP connector.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_config(config: &IrcConfig) -> Self {
        Self::new(&config.server, config.port, config.connect_timeout())
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Connection, IrcError> {
        Connection::connect_tcp(&self.host, self.port, self.timeout).await
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Supervisor ──────────────────────────────────────────────────────

/// Published supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Connecting,
    /// A session is installed in the slot.
    Connected,
    /// Waiting this long before the next attempt.
    Backoff(Duration),
    Stopped,
}

type NickFactory = Arc<dyn Fn() -> NickAllocator + Send + Sync>;

/// Token carried by keepalive `PING`s.
const KEEPALIVE_TOKEN: &str = "nagbot";

/// Upper bound on flushing `QUIT` during shutdown.
const QUIT_FLUSH: Duration = Duration::from_secs(2);

/// How a served connection ended.
enum Served {
    Shutdown,
    Lost(String),
}

pub struct SessionSupervisor {
    connector: Arc<dyn Connector>,
    session_config: SessionConfig,
    backoff: Backoff,
    slot: SessionSlot,
    nicks: NickFactory,
    quit_message: String,
    ping_interval: Duration,
    ping_timeout: Duration,
    write_timeout: Duration,
    state: watch::Sender<SupervisorState>,
}

impl SessionSupervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        session_config: SessionConfig,
        backoff: Backoff,
        slot: SessionSlot,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self {
            connector,
            session_config,
            backoff,
            slot,
            nicks: Arc::new(NickAllocator::from_entropy),
            quit_message: "relay shutting down".into(),
            ping_interval: Duration::from_secs(120),
            ping_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(30),
            state,
        }
    }

    /// Supply the nickname allocator for each new session (seeded in tests).
    pub fn with_nick_allocator(
        mut self,
        factory: impl Fn() -> NickAllocator + Send + Sync + 'static,
    ) -> Self {
        self.nicks = Arc::new(factory);
        self
    }

    pub fn with_quit_message(mut self, message: impl Into<String>) -> Self {
        self.quit_message = message.into();
        self
    }

    /// `PING` the server after `interval` of silence and drop the connection
    /// if nothing arrives within `timeout` after that.
    pub fn with_keepalive(mut self, interval: Duration, timeout: Duration) -> Self {
        self.ping_interval = interval;
        self.ping_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` is notified. Never gives up on its own.
    #[instrument(skip_all, fields(server = %self.connector.describe()))]
    pub async fn run(mut self, shutdown: Arc<Notify>) {
        let stop = shutdown.notified();
        tokio::pin!(stop);

        loop {
            self.set_state(SupervisorState::Connecting);
            debug!(attempt = self.backoff.attempts() + 1, "connecting to IRC server");

            let connected = tokio::select! {
                _ = stop.as_mut() => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(conn) => {
                    self.backoff.connected(Instant::now());
                    match self.serve(conn, stop.as_mut()).await {
                        Served::Shutdown => break,
                        Served::Lost(reason) => {
                            error!(reason = %reason, "lost connection to IRC server");
                        }
                    }
                    self.slot.clear().await;
                    if self.backoff.disconnected(Instant::now()) {
                        debug!("connection had been stable, reconnect delay reset");
                    }
                }
                Err(e) => {
                    error!(error = %e, "could not connect to IRC server");
                }
            }

            let delay = self.backoff.next_delay();
            self.set_state(SupervisorState::Backoff(delay));
            warn!(delay = ?delay, attempt = self.backoff.attempts(), "reconnecting after delay");

            tokio::select! {
                _ = stop.as_mut() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(SupervisorState::Stopped);
        info!("session supervisor stopped");
    }

    /// Register a new session on `conn` and pump server lines into it until
    /// the connection ends or shutdown is requested.
    ///
    /// The session only ever writes into the queue; this loop owns the real
    /// sink, so the slot lock is never held across a socket write.
    async fn serve(&mut self, conn: Connection, mut stop: Pin<&mut Notified<'_>>) -> Served {
        let Connection {
            mut source,
            sink,
            peer,
        } = conn;

        let (queued, queue) = line_queue();
        let writer = queue.drain_into(sink, self.write_timeout);
        tokio::pin!(writer);

        let mut session =
            ChatSession::new(Box::new(queued), self.session_config.clone(), (self.nicks)());
        if let Err(e) = session.register().await {
            return Served::Lost(e.to_string());
        }
        self.slot.install(session).await;
        self.set_state(SupervisorState::Connected);
        info!(peer = %peer, "IRC session started");

        let mut registered = false;
        let mut awaiting_pong = false;

        loop {
            let idle = if awaiting_pong {
                self.ping_timeout
            } else {
                self.ping_interval
            };

            tokio::select! {
                _ = stop.as_mut() => {
                    info!(reason = %self.quit_message, "quitting IRC");
                    // Dropping the session closes the queue once QUIT is in it.
                    self.slot.quit(&self.quit_message).await;
                    let flush = self.write_timeout.min(QUIT_FLUSH);
                    match tokio::time::timeout(flush, writer.as_mut()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!(error = %e, "QUIT not delivered"),
                        Err(_) => warn!(timeout = ?flush, "gave up flushing QUIT"),
                    }
                    return Served::Shutdown;
                }
                written = writer.as_mut() => {
                    return Served::Lost(match written {
                        Ok(()) => "write queue closed".into(),
                        Err(e) => format!("write failed: {e}"),
                    });
                }
                line = tokio::time::timeout(idle, source.next_line()) => match line {
                    Err(_) if awaiting_pong => {
                        return Served::Lost(format!(
                            "no reply to PING within {:?}",
                            self.ping_timeout
                        ));
                    }
                    Err(_) => {
                        debug!(idle = ?idle, "server quiet, sending keepalive");
                        if let Err(e) = self.slot.ping(KEEPALIVE_TOKEN).await {
                            return Served::Lost(e.to_string());
                        }
                        awaiting_pong = true;
                    }
                    Ok(Ok(Some(line))) => {
                        awaiting_pong = false;
                        let msg = match IrcMessage::parse(&line) {
                            Ok(msg) => msg,
                            Err(e) => {
                                debug!(error = %e, line = %line, "ignoring unparseable line");
                                continue;
                            }
                        };
                        match self.slot.handle(&msg).await {
                            Ok(SessionState::Disconnected) => {
                                return Served::Lost("server closed the link".into());
                            }
                            Ok(SessionState::Registered | SessionState::Joined) if !registered => {
                                registered = true;
                                self.backoff.reset();
                                info!("registered with IRC server, reconnect delay reset");
                            }
                            Ok(_) => {}
                            Err(e) => return Served::Lost(e.to_string()),
                        }
                    }
                    Ok(Ok(None)) => return Served::Lost("connection closed by server".into()),
                    Ok(Err(e)) => return Served::Lost(e.to_string()),
                },
            }
        }
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.send_replace(state);
    }
}
