//! End-to-end: UDP alert in, PRIVMSG out, against a fake IRC server on loopback.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::Notify;
use tokio::time::timeout;

use nagbot::{Config, Relay};
use nagbot_alert::AlertFormatter;
use nagbot_irc::{ChannelConfig, IrcMessage, NickAllocator};

const TIMEOUT: Duration = Duration::from_secs(5);

const SERVICE_ALERT: &[u8] =
    b"service||~||PROBLEM||~||web01||~||HTTP||~||CRITICAL||~||Connection refused\n";

/// Server side of one accepted client connection.
struct FakeServer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FakeServer {
    async fn accept(listener: &TcpListener) -> Self {
        let (sock, _) = timeout(TIMEOUT, listener.accept())
            .await
            .expect("relay never connected")
            .unwrap();
        let (read, writer) = sock.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn next(&mut self) -> String {
        timeout(TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line from the relay")
            .unwrap()
            .expect("relay closed the connection")
    }

    /// Read lines until one equals `expected`, returning everything before it.
    async fn read_until(&mut self, expected: &str) -> Vec<String> {
        let mut seen = Vec::new();
        loop {
            let line = self.next().await;
            if line == expected {
                return seen;
            }
            seen.push(line);
        }
    }

    /// Round-trip a PING so every earlier server line has been handled.
    async fn sync(&mut self, token: &str) -> Vec<String> {
        self.send(&format!("PING :{token}")).await;
        self.read_until(&format!("PONG {token}")).await
    }
}

fn config(irc_port: u16) -> Config {
    let mut config = Config::default();
    config.irc.server = "127.0.0.1".into();
    config.irc.port = irc_port;
    config.listener.bind = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.listener.port = 0;
    config.channels = IndexMap::from([
        (
            "#ops".to_string(),
            ChannelConfig {
                password: Some("opskey".into()),
                modes: vec!["o".into()],
            },
        ),
        ("#alerts".to_string(), ChannelConfig::default()),
    ]);
    config
}

async fn send_alert(to: SocketAddr, payload: &[u8]) {
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(payload, to).await.unwrap();
}

/// Start a relay and walk the fake server through registration and joins.
async fn joined_relay() -> (FakeServer, nagbot::RelayHandle, Arc<Notify>) {
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = irc.local_addr().unwrap().port();

    let shutdown = Arc::new(Notify::new());
    let handle = Relay::new(config(port))
        .with_nick_allocator(|| NickAllocator::seeded(9))
        .start(shutdown.clone())
        .await
        .unwrap();

    let mut server = FakeServer::accept(&irc).await;
    assert_eq!(server.next().await, "NICK Nagios");
    assert_eq!(server.next().await, "USER Nagios 0 * :Nagios IRC relay");

    server.send(":irc.test 001 Nagios :Welcome").await;
    assert_eq!(server.next().await, "MODE Nagios +B");
    assert_eq!(server.next().await, "JOIN #ops opskey");
    assert_eq!(server.next().await, "JOIN #alerts");

    server.send(":Nagios!nagios@relay JOIN #ops").await;
    server.send(":Nagios!nagios@relay JOIN #alerts").await;
    assert_eq!(server.next().await, "MODE #ops +o Nagios");
    server.sync("joined").await;

    (server, handle, shutdown)
}

#[tokio::test]
async fn alert_is_broadcast_to_every_joined_channel() {
    let (mut server, handle, shutdown) = joined_relay().await;

    send_alert(handle.listen_addr(), SERVICE_ALERT).await;

    let text = AlertFormatter::default()
        .format_payload(std::str::from_utf8(SERVICE_ALERT).unwrap())
        .unwrap();
    assert_eq!(server.next().await, IrcMessage::privmsg("#ops", &text).to_string());
    assert_eq!(server.next().await, IrcMessage::privmsg("#alerts", &text).to_string());

    shutdown.notify_waiters();
    let rest = server.read_until("QUIT :relay shutting down").await;
    assert!(rest.is_empty(), "unexpected lines before QUIT: {rest:?}");
    timeout(TIMEOUT, handle.wait()).await.expect("relay did not stop");
}

#[tokio::test]
async fn kicked_channel_stops_receiving_alerts() {
    let (mut server, handle, shutdown) = joined_relay().await;

    server.send(":oper!o@irc.test KICK #ops Nagios :go away").await;
    let during_kick = server.sync("kicked").await;
    assert!(during_kick.is_empty(), "relay tried to rejoin: {during_kick:?}");
    assert_eq!(handle.slot().active_channels().await, vec!["#alerts"]);

    send_alert(handle.listen_addr(), b"rebuild||~||cache invalidated").await;
    let line = server.next().await;
    let msg = IrcMessage::parse(&line).unwrap();
    assert_eq!(msg.command, "PRIVMSG");
    assert_eq!(msg.param(0), Some("#alerts"));

    // Nothing went to #ops.
    let after = server.sync("after").await;
    assert!(after.iter().all(|l| !l.contains("#ops")), "{after:?}");

    shutdown.notify_waiters();
    server.read_until("QUIT :relay shutting down").await;
    timeout(TIMEOUT, handle.wait()).await.expect("relay did not stop");
}

#[tokio::test]
async fn malformed_alert_is_dropped_and_relay_keeps_going() {
    let (mut server, handle, shutdown) = joined_relay().await;

    send_alert(handle.listen_addr(), b"bogus||~||nothing").await;
    send_alert(handle.listen_addr(), b"host||~||RECOVERY||~||db01||~||UP||~||PING OK").await;

    let line = server.next().await;
    let msg = IrcMessage::parse(&line).unwrap();
    assert_eq!(msg.param(0), Some("#ops"));
    assert!(msg.param(1).unwrap().contains("db01"));

    shutdown.notify_waiters();
    server.read_until("QUIT :relay shutting down").await;
    timeout(TIMEOUT, handle.wait()).await.expect("relay did not stop");
}

#[tokio::test]
async fn relay_reconnects_after_server_drops_connection() {
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = irc.local_addr().unwrap().port();

    let mut cfg = config(port);
    cfg.reconnect.initial_delay_ms = 50;

    let shutdown = Arc::new(Notify::new());
    let handle = Relay::new(cfg).start(shutdown.clone()).await.unwrap();

    let first = FakeServer::accept(&irc).await;
    drop(first);

    let mut second = FakeServer::accept(&irc).await;
    assert_eq!(second.next().await, "NICK Nagios");

    shutdown.notify_waiters();
    second.read_until("QUIT :relay shutting down").await;
    timeout(TIMEOUT, handle.wait()).await.expect("relay did not stop");
}
