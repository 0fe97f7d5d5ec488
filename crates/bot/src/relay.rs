use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

use nagbot_alert::{AlertFormatter, AlertListener, Palette};
use nagbot_irc::NickAllocator;

use crate::config::Config;
use crate::error::RelayError;
use crate::forwarder::SessionForwarder;
use crate::slot::SessionSlot;
use crate::supervisor::{Connector, SessionSupervisor, SupervisorState, TcpConnector};

type NickFactory = Arc<dyn Fn() -> NickAllocator + Send + Sync>;

/// Assembles the listener, formatter, session slot and supervisor from a
/// [`Config`] and starts them.
pub struct Relay {
    config: Config,
    connector: Option<Arc<dyn Connector>>,
    nicks: Option<NickFactory>,
}

impl Relay {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector: None,
            nicks: None,
        }
    }

    /// Replace the TCP connector built from `[irc]`.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_nick_allocator(
        mut self,
        factory: impl Fn() -> NickAllocator + Send + Sync + 'static,
    ) -> Self {
        self.nicks = Some(Arc::new(factory));
        self
    }

    /// Bind the UDP listener and spawn the listener and supervisor tasks.
    ///
    /// Only binding can fail; everything after that retries on its own.
    pub async fn start(self, shutdown: Arc<Notify>) -> Result<RelayHandle, RelayError> {
        let Self {
            config,
            connector,
            nicks,
        } = self;

        let listener = AlertListener::bind(config.listener.socket_addr()).await?;
        let listen_addr = listener.local_addr()?;

        let mut palette = Palette::standard();
        palette.extend(&config.palette);

        let slot = SessionSlot::new();
        let forwarder = Arc::new(SessionForwarder::new(AlertFormatter::new(palette), slot.clone()));

        let connector =
            connector.unwrap_or_else(|| Arc::new(TcpConnector::from_config(&config.irc)));
        info!(
            server = %connector.describe(),
            listen = %listen_addr,
            channels = config.channels.len(),
            "starting relay"
        );

        let mut supervisor = SessionSupervisor::new(
            connector,
            config.session_config(),
            config.reconnect.backoff(),
            slot.clone(),
        )
        .with_quit_message(config.irc.quit_message.clone())
        .with_keepalive(config.irc.ping_interval(), config.irc.ping_timeout())
        .with_write_timeout(config.irc.write_timeout());
        if let Some(nicks) = nicks {
            supervisor = supervisor.with_nick_allocator(move || nicks());
        }
        let state = supervisor.subscribe();

        let tasks = vec![
            tokio::spawn(listener.run(forwarder, shutdown.clone())),
            tokio::spawn(supervisor.run(shutdown)),
        ];

        Ok(RelayHandle {
            listen_addr,
            slot,
            state,
            tasks,
        })
    }
}

/// Running relay.
pub struct RelayHandle {
    listen_addr: SocketAddr,
    slot: SessionSlot,
    state: watch::Receiver<SupervisorState>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    /// Address the UDP listener is actually bound to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }

    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    /// Wait for both tasks to finish after shutdown was notified.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "relay task panicked");
            }
        }
        info!("relay stopped");
    }
}
