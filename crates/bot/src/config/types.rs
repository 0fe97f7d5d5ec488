use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use nagbot_alert::{Palette, DEFAULT_LISTEN_PORT};
use nagbot_irc::{ChannelConfig, OperCredentials};

// ── Top-level config ────────────────────────────────────────────────

/// Full relay configuration.
///
/// Built once at startup and handed to the relay by value; nothing reads
/// configuration from globals afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// IRC server, identity and credentials.
    #[serde(default)]
    pub irc: IrcConfig,

    /// Channels to join, in join and broadcast order.
    #[serde(default = "default_channels")]
    pub channels: IndexMap<String, ChannelConfig>,

    /// UDP alert listener.
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Reconnect backoff policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Color overrides merged over the built-in palette.
    #[serde(default)]
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            irc: IrcConfig::default(),
            channels: default_channels(),
            listener: ListenerConfig::default(),
            reconnect: ReconnectConfig::default(),
            palette: Palette::default(),
        }
    }
}

fn default_channels() -> IndexMap<String, ChannelConfig> {
    IndexMap::from([("#nagios".to_string(), ChannelConfig::default())])
}

// ── Section configs ─────────────────────────────────────────────────

/// `[irc]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrcConfig {
    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_irc_port")]
    pub port: u16,

    #[serde(default = "default_nickname")]
    pub nickname: String,

    #[serde(default = "default_realname")]
    pub realname: String,

    /// NickServ password; `${VAR}` reads it from the environment.
    #[serde(default)]
    pub nickserv_password: Option<String>,

    /// `[irc.oper]` credentials; the password accepts `${VAR}` too.
    #[serde(default)]
    pub oper: Option<OperCredentials>,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Send a keepalive `PING` after this many seconds without a server line.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Drop the connection if nothing arrives this long after the keepalive `PING`.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,

    /// A single socket write that takes longer than this counts as a lost connection.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

fn default_server() -> String {
    "localhost".into()
}

fn default_irc_port() -> u16 {
    6667
}

fn default_nickname() -> String {
    "Nagios".into()
}

fn default_realname() -> String {
    "Nagios IRC relay".into()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_ping_interval() -> u64 {
    120
}

fn default_ping_timeout() -> u64 {
    60
}

fn default_write_timeout() -> u64 {
    30
}

fn default_quit_message() -> String {
    "relay shutting down".into()
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_irc_port(),
            nickname: default_nickname(),
            realname: default_realname(),
            nickserv_password: None,
            oper: None,
            connect_timeout_secs: default_connect_timeout(),
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            write_timeout_secs: default_write_timeout(),
            quit_message: default_quit_message(),
        }
    }
}

impl IrcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// `[listener]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    #[serde(default = "default_listen_port")]
    pub port: u16,
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_listen_port(),
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// `[reconnect]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// First retry delay in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Ceiling for the retry delay in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// Growth factor applied after each failed attempt.
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// A connection that lasts this long resets the delay to its initial value.
    #[serde(default = "default_stable_after")]
    pub stable_after_secs: u64,
}

fn default_initial_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    300
}

fn default_factor() -> f64 {
    2.0
}

fn default_stable_after() -> u64 {
    30
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_secs: default_max_delay(),
            factor: default_factor(),
            stable_after_secs: default_stable_after(),
        }
    }
}
