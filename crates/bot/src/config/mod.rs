//! Relay configuration, parsed from `nagbot.toml` with `NAGBOT_*`
//! environment overrides and `${VAR}` secret references.

mod loading;
mod types;
mod validation;


pub use types::{Config, IrcConfig, ListenerConfig, ReconnectConfig};
