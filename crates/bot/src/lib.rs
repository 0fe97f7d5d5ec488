//! Nagios → IRC relay.
//!
//! Wires the UDP [`AlertListener`](nagbot_alert::AlertListener) to a
//! supervised, auto-reconnecting IRC session:
//!
//! ```text
//! datagram → AlertListener → AlertFormatter → SessionSlot → ChatSession::broadcast
//!                                                  ↑
//!                                         SessionSupervisor (connect / backoff / reconnect)
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod relay;
pub mod slot;
pub mod supervisor;

pub use backoff::Backoff;
pub use config::{Config, IrcConfig, ListenerConfig, ReconnectConfig};
pub use error::{ConfigError, RelayError};
pub use forwarder::SessionForwarder;
pub use relay::{Relay, RelayHandle};
pub use slot::SessionSlot;
pub use supervisor::{Connector, SessionSupervisor, SupervisorState, TcpConnector};
