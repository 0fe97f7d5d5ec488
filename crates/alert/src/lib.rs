//! Nagios alert parsing, formatting, and the inbound UDP listener.
//!
//! This crate provides:
//! - [`AlertRecord`] and the `||~||` payload parser
//! - [`Palette`] color tables with a plain-text fallback on lookup misses
//! - [`AlertFormatter`] rendering records as mIRC-colored lines
//! - [`AlertListener`] receiving datagrams and handing parsed records to an [`AlertHandler`]
//!
//! Nagios feeds the listener through notification commands such as:
//!
//! ```text
//! define command{
//!         command_name notify-service-by-irc
//!         command_line /bin/echo "service||~||$NOTIFICATIONTYPE$||~||$HOSTNAME$||~||$SERVICEDESC$||~||$SERVICESTATE$||~||$SERVICEOUTPUT$" | socat - UDP:localhost:3843
//! }
//!
//! define command{
//!         command_name notify-host-by-irc
//!         command_line /bin/echo "host||~||$NOTIFICATIONTYPE$||~||$HOSTNAME$||~||$HOSTSTATE$||~||$HOSTOUTPUT$" | socat - UDP:localhost:3843
//! }
//! ```

pub mod error;
pub mod format;
pub mod listener;
pub mod palette;
pub mod parser;
pub mod record;

pub use error::AlertError;
pub use format::AlertFormatter;
pub use listener::{AlertHandler, AlertListener, DEFAULT_LISTEN_PORT};
pub use palette::{ColorTable, IrcColor, Palette, Style};
pub use parser::{parse_payload, sanitize, FIELD_DELIMITER};
pub use record::{AlertKind, AlertRecord};
