//! Minimal IRC client plumbing for the relay bot.
//!
//! This crate provides:
//! - [`IrcMessage`] line parsing and serialization
//! - [`LineSource`]/[`LineSink`] transport traits with a TCP implementation and a
//!   [`line_queue`] that keeps socket writes off the session's caller
//! - [`NickAllocator`] for nickname-collision fallbacks
//! - [`ChatSession`], one registered connection with its joined channels

pub mod error;
pub mod message;
pub mod nick;
pub mod session;
pub mod transport;

pub use error::IrcError;
pub use message::IrcMessage;
pub use nick::NickAllocator;
pub use session::{
    ChannelConfig, ChannelDelivery, ChatSession, OperCredentials, SessionConfig, SessionState,
};
pub use transport::{
    line_queue, Connection, LineQueue, LineSink, LineSource, QueuedSink, TcpLineSink, TcpLineSource,
};
