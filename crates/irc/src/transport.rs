//! Line-oriented transport under a [`ChatSession`](crate::ChatSession).
//!
//! The session only ever writes whole lines and the supervisor only ever reads
//! whole lines, so both halves are modelled as traits. Tests plug in
//! in-memory implementations; production uses a split [`TcpStream`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace};

use crate::error::IrcError;

/// Longest line body the protocol allows (512 minus CRLF).
pub const MAX_LINE_BYTES: usize = 510;

/// Write half: sends one protocol line at a time (without CRLF).
#[async_trait]
pub trait LineSink: Send {
    async fn send_line(&mut self, line: &str) -> Result<(), IrcError>;
}

/// Read half: yields lines from the server, `None` at end of stream.
#[async_trait]
pub trait LineSource: Send {
    async fn next_line(&mut self) -> Result<Option<String>, IrcError>;
}

/// Both halves of an established connection plus a label for logging.
pub struct Connection {
    pub source: Box<dyn LineSource>,
    pub sink: Box<dyn LineSink>,
    pub peer: String,
}

impl Connection {
    /// Open a TCP connection to `host:port`, failing after `timeout`.
    #[instrument(skip_all, fields(host = %host, port = port))]
    pub async fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<Self, IrcError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| IrcError::Timeout(timeout))??;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?.to_string();
        info!(peer = %peer, "connected to IRC server");

        let (read, write) = stream.into_split();
        Ok(Self {
            source: Box::new(TcpLineSource::new(read)),
            sink: Box::new(TcpLineSink::new(write)),
            peer,
        })
    }
}

/// Clamp an outgoing line: cut at the first CR/LF, then at [`MAX_LINE_BYTES`]
/// on a UTF-8 boundary.
pub fn clamp_line(line: &str) -> &str {
    let line = line.split(['\r', '\n']).next().unwrap_or_default();
    if line.len() <= MAX_LINE_BYTES {
        return line;
    }
    let mut end = MAX_LINE_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

pub struct TcpLineSink {
    writer: OwnedWriteHalf,
}

impl TcpLineSink {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl LineSink for TcpLineSink {
    async fn send_line(&mut self, line: &str) -> Result<(), IrcError> {
        let line = clamp_line(line);
        trace!(line, "irc >>");
        let mut buf = Vec::with_capacity(line.len() + 2);
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(b"\r\n");
        self.writer.write_all(&buf).await?;
        Ok(())
    }
}

pub struct TcpLineSource {
    reader: BufReader<OwnedReadHalf>,
    buf: Vec<u8>,
}

impl TcpLineSource {
    pub fn new(reader: OwnedReadHalf) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::with_capacity(1024),
        }
    }
}

#[async_trait]
impl LineSource for TcpLineSource {
    /// Cancel safe: a partially read line stays buffered for the next call.
    async fn next_line(&mut self) -> Result<Option<String>, IrcError> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.buf).await?;
            if n == 0 && self.buf.is_empty() {
                debug!("server closed the connection");
                return Ok(None);
            }
            // Servers are not obliged to send UTF-8.
            let line = String::from_utf8_lossy(&self.buf)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            self.buf.clear();
            if line.is_empty() {
                continue;
            }
            trace!(line = %line, "irc <<");
            return Ok(Some(line));
        }
    }
}

// ── Write queue ─────────────────────────────────────────────────────

/// Create a connected [`QueuedSink`] / [`LineQueue`] pair.
///
/// The session writes into the queued half, which never waits on the
/// network; whoever owns the connection drains the queue into the real sink.
pub fn line_queue() -> (QueuedSink, LineQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueuedSink { tx }, LineQueue { rx })
}

/// Sink half of [`line_queue`]. Fails with [`IrcError::Closed`] once the
/// queue is gone.
#[derive(Debug, Clone)]
pub struct QueuedSink {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl LineSink for QueuedSink {
    async fn send_line(&mut self, line: &str) -> Result<(), IrcError> {
        self.tx.send(line.to_string()).map_err(|_| IrcError::Closed)
    }
}

/// Receiving half of [`line_queue`].
#[derive(Debug)]
pub struct LineQueue {
    rx: mpsc::UnboundedReceiver<String>,
}

impl LineQueue {
    /// Write queued lines to `sink` in order until every [`QueuedSink`] is
    /// dropped and the queue is empty.
    ///
    /// A single write that takes longer than `write_timeout` ends the drain
    /// with [`IrcError::Timeout`]; a peer that stops reading counts as a
    /// lost connection.
    pub async fn drain_into(
        mut self,
        mut sink: Box<dyn LineSink>,
        write_timeout: Duration,
    ) -> Result<(), IrcError> {
        while let Some(line) = self.rx.recv().await {
            tokio::time::timeout(write_timeout, sink.send_line(&line))
                .await
                .map_err(|_| IrcError::Timeout(write_timeout))??;
        }
        Ok(())
    }
}
