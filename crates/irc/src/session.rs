//! One registered IRC connection and its channel membership.
//!
//! A [`ChatSession`] lives exactly as long as its connection. It registers,
//! identifies, opers up, and joins the configured channels once the server
//! welcomes it, then relays broadcasts to whichever channels it is still in.
//! Kicked channels stay gone until the next connection builds a new session.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::IrcError;
use crate::message::{numeric, IrcMessage};
use crate::nick::NickAllocator;
use crate::transport::LineSink;

/// Services bot that handles `IDENTIFY`.
const NICKSERV: &str = "NickServ";
/// User mode requested on ourselves right after registration (blocks
/// unsolicited private messages on networks that support it).
const SELF_MODE: &str = "B";

// ── Configuration ───────────────────────────────────────────────────

/// Per-channel settings. The channel name is the key of
/// [`SessionConfig::channels`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel key supplied with `JOIN`.
    #[serde(default)]
    pub password: Option<String>,

    /// Channel modes requested for ourselves after joining, in order (e.g. `["a", "o"]`).
    #[serde(default)]
    pub modes: Vec<String>,
}

/// IRC operator credentials for `OPER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperCredentials {
    pub user: String,
    pub password: String,
}

/// Identity and channel table shared by every session of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Requested nickname, also the base for collision fallbacks.
    pub nickname: String,
    pub realname: String,
    pub nickserv_password: Option<String>,
    pub oper: Option<OperCredentials>,
    /// Channels in join (and broadcast) order.
    pub channels: IndexMap<String, ChannelConfig>,
}

// ── Session state ───────────────────────────────────────────────────

/// Lifecycle of a single session. `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// NICK/USER sent, waiting for the welcome.
    Connecting,
    /// Welcome received, setup commands sent.
    Registered,
    /// In at least one channel.
    Joined,
    Disconnected,
}

/// Outcome of one channel send during [`ChatSession::broadcast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDelivery {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
}

// ── ChatSession ─────────────────────────────────────────────────────

pub struct ChatSession {
    sink: Box<dyn LineSink>,
    config: SessionConfig,
    nicks: NickAllocator,
    nickname: String,
    state: SessionState,
    active: IndexSet<String>,
}

impl ChatSession {
    pub fn new(sink: Box<dyn LineSink>, config: SessionConfig, nicks: NickAllocator) -> Self {
        let nickname = config.nickname.clone();
        Self {
            sink,
            config,
            nicks,
            nickname,
            state: SessionState::Connecting,
            active: IndexSet::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Nickname currently in use (may differ from the configured one after a collision).
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Channels currently joined, in broadcast order.
    pub fn active_channels(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub fn is_active(&self, channel: &str) -> bool {
        self.active.contains(channel)
    }

    /// Send `NICK` and `USER` to start registration.
    pub async fn register(&mut self) -> Result<(), IrcError> {
        info!(nickname = %self.nickname, "registering with IRC server");
        self.send(IrcMessage::nick(&self.nickname)).await?;
        let user = IrcMessage::user(&self.config.nickname, &self.config.realname);
        self.send(user).await
    }

    /// React to one line from the server.
    ///
    /// Errors are write failures on the connection; protocol oddities are
    /// only logged.
    pub async fn handle(&mut self, msg: &IrcMessage) -> Result<(), IrcError> {
        match msg.command.as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or_default().to_string();
                self.send(IrcMessage::pong(&token)).await?;
            }
            numeric::RPL_WELCOME => {
                if let Some(assigned) = msg.param(0) {
                    self.nickname = assigned.to_string();
                }
                self.on_registered().await?;
            }
            numeric::ERR_NICKNAMEINUSE | numeric::ERR_NICKCOLLISION => {
                if self.state == SessionState::Connecting {
                    let rejected = msg.param(1).unwrap_or(&self.nickname).to_string();
                    self.nickname = self.nicks.alternate(&self.config.nickname);
                    warn!(rejected = %rejected, retry = %self.nickname, "nickname in use, retrying");
                    self.send(IrcMessage::nick(&self.nickname)).await?;
                }
            }
            numeric::RPL_YOUREOPER => {
                info!("operator privileges granted");
            }
            numeric::ERR_CHANNELISFULL
            | numeric::ERR_INVITEONLYCHAN
            | numeric::ERR_BANNEDFROMCHAN
            | numeric::ERR_BADCHANNELKEY => {
                warn!(
                    channel = msg.param(1).unwrap_or_default(),
                    code = %msg.command,
                    reason = msg.params.last().map(String::as_str).unwrap_or_default(),
                    "could not join channel"
                );
            }
            "JOIN" if self.is_me(msg.source_nick()) => {
                if let Some(channel) = msg.param(0) {
                    self.on_joined(channel).await?;
                }
            }
            "KICK" => {
                if let (Some(channel), Some(target)) = (msg.param(0), msg.param(1)) {
                    if self.is_me(Some(target)) {
                        self.on_kicked(channel, msg.source_nick(), msg.param(2));
                    }
                }
            }
            "NICK" if self.is_me(msg.source_nick()) => {
                if let Some(new_nick) = msg.param(0) {
                    info!(old = %self.nickname, new = %new_nick, "nickname changed");
                    self.nickname = new_nick.to_string();
                }
            }
            "ERROR" => {
                error!(reason = msg.param(0).unwrap_or_default(), "server sent ERROR");
                self.state = SessionState::Disconnected;
            }
            _ => {}
        }
        Ok(())
    }

    /// Send `message` to every active channel, in order.
    ///
    /// A failed send is logged and reported; remaining channels are still tried.
    pub async fn broadcast(&mut self, message: &str) -> Vec<ChannelDelivery> {
        let mut results = Vec::with_capacity(self.active.len());

        for channel in &self.active {
            debug!(channel = %channel, message, "sending alert to channel");
            let line = IrcMessage::privmsg(channel, message).to_string();
            let (success, error) = match self.sink.send_line(&line).await {
                Ok(()) => (true, None),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "channel send failed");
                    (false, Some(e.to_string()))
                }
            };
            results.push(ChannelDelivery {
                channel: channel.clone(),
                success,
                error,
            });
        }

        results
    }

    /// Probe the server; any reply proves the connection is alive.
    pub async fn ping(&mut self, token: &str) -> Result<(), IrcError> {
        debug!(token, "pinging server");
        self.send(IrcMessage::ping(token)).await
    }

    /// Send a single message to one channel.
    pub async fn send_to(&mut self, channel: &str, text: &str) -> Result<(), IrcError> {
        self.send(IrcMessage::privmsg(channel, text)).await
    }

    /// Leave the network. The session is unusable afterwards.
    pub async fn quit(&mut self, reason: &str) -> Result<(), IrcError> {
        self.state = SessionState::Disconnected;
        self.active.clear();
        self.send(IrcMessage::quit(reason)).await
    }

    /// Mark the session dead after the connection dropped.
    pub fn disconnected(&mut self) {
        self.state = SessionState::Disconnected;
        self.active.clear();
    }

    // ── Event handlers ──────────────────────────────────────────────

    async fn on_registered(&mut self) -> Result<(), IrcError> {
        self.state = SessionState::Registered;
        info!(nickname = %self.nickname, "signed on");

        debug!(mode = SELF_MODE, "setting user mode");
        let nick = self.nickname.clone();
        self.send(IrcMessage::mode(&nick, SELF_MODE, None)).await?;

        if let Some(password) = self.config.nickserv_password.clone() {
            debug!("identifying to NickServ");
            self.send(IrcMessage::privmsg(NICKSERV, &format!("IDENTIFY {password}")))
                .await?;
        }

        if let Some(oper) = self.config.oper.clone() {
            debug!(user = %oper.user, "requesting operator privileges");
            self.send(IrcMessage::oper(&oper.user, &oper.password)).await?;
        }

        let joins: Vec<IrcMessage> = self
            .config
            .channels
            .iter()
            .map(|(name, channel)| {
                info!(channel = %name, keyed = channel.password.is_some(), "joining channel");
                IrcMessage::join(name, channel.password.as_deref())
            })
            .collect();
        for join in joins {
            self.send(join).await?;
        }
        Ok(())
    }

    async fn on_joined(&mut self, channel: &str) -> Result<(), IrcError> {
        let Some((name, modes)) = self
            .config
            .channels
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(channel))
            .map(|(name, cfg)| (name.clone(), cfg.modes.clone()))
        else {
            debug!(channel, "joined unconfigured channel, ignoring");
            return Ok(());
        };

        info!(channel = %name, "joined channel");
        self.active.insert(name.clone());
        if self.state != SessionState::Disconnected {
            self.state = SessionState::Joined;
        }

        let nick = self.nickname.clone();
        for mode in &modes {
            info!(channel = %name, mode = %mode, "setting channel mode");
            self.send(IrcMessage::mode(&name, mode, Some(&nick))).await?;
        }
        Ok(())
    }

    fn on_kicked(&mut self, channel: &str, kicker: Option<&str>, reason: Option<&str>) {
        let before = self.active.len();
        self.active
            .retain(|name| !name.eq_ignore_ascii_case(channel));
        if self.active.len() < before {
            info!(
                channel,
                kicker = kicker.unwrap_or_default(),
                reason = reason.unwrap_or_default(),
                "kicked from channel, not rejoining this session"
            );
        }
        if self.active.is_empty() && self.state == SessionState::Joined {
            self.state = SessionState::Registered;
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn is_me(&self, nick: Option<&str>) -> bool {
        nick.is_some_and(|n| n.eq_ignore_ascii_case(&self.nickname))
    }

    async fn send(&mut self, msg: IrcMessage) -> Result<(), IrcError> {
        self.sink.send_line(&msg.to_string()).await
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("nickname", &self.nickname)
            .field("state", &self.state)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
