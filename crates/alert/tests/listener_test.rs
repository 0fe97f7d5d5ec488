//! Integration tests for the UDP listener over loopback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use nagbot_alert::{AlertHandler, AlertListener, AlertRecord};

const TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(200);

struct ChannelHandler {
    tx: mpsc::UnboundedSender<AlertRecord>,
}

#[async_trait]
impl AlertHandler for ChannelHandler {
    async fn handle(&self, record: AlertRecord) {
        let _ = self.tx.send(record);
    }
}

#[tokio::test]
async fn malformed_datagram_does_not_stop_listener() {
    let listener = AlertListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let shutdown = Arc::new(Notify::new());
    let handle = tokio::spawn(listener.run(Arc::new(ChannelHandler { tx }), shutdown.clone()));

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(b"garbage without delimiter", addr).await.unwrap();
    sender
        .send_to(b"service||~||PROBLEM||~||web01||~||HTTP||~||CRITICAL||~||Connection refused\n", addr)
        .await
        .unwrap();

    let record = timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for alert")
        .expect("handler channel closed");
    assert_eq!(record.host_name(), Some("web01"));

    // Nothing else should have been delivered.
    tokio::time::sleep(SETTLE).await;
    assert!(rx.try_recv().is_err());

    shutdown.notify_waiters();
    timeout(TIMEOUT, handle)
        .await
        .expect("listener should stop on shutdown")
        .unwrap();
}

#[tokio::test]
async fn each_datagram_is_one_alert() {
    let listener = AlertListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let shutdown = Arc::new(Notify::new());
    let handle = tokio::spawn(listener.run(Arc::new(ChannelHandler { tx }), shutdown.clone()));

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..3 {
        let payload = format!("rebuild||~||step||~||{i}");
        sender.send_to(payload.as_bytes(), addr).await.unwrap();
    }

    for _ in 0..3 {
        let record = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(record, AlertRecord::Rebuild { ref details } if details.len() == 2));
    }

    shutdown.notify_waiters();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}
