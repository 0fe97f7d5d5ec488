//! UDP alert listener.
//!
//! Each datagram carries exactly one alert. Malformed datagrams are logged and
//! dropped; they never stop the receive loop. The sender address is only
//! logged, since plain UDP gives no way to authenticate it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tracing::{debug, error, info, instrument, warn};

use crate::error::AlertError;
use crate::parser::parse_payload;
use crate::record::AlertRecord;

/// Port the Nagios notification commands send to.
pub const DEFAULT_LISTEN_PORT: u16 = 3843;

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_535;

const RECV_ERROR_PAUSE_MIN: Duration = Duration::from_millis(10);
const RECV_ERROR_PAUSE_MAX: Duration = Duration::from_secs(1);

/// How long to wait after the `consecutive`-th receive error in a row.
fn recv_error_pause(consecutive: u32) -> Duration {
    let doublings = consecutive.saturating_sub(1).min(7);
    (RECV_ERROR_PAUSE_MIN * (1u32 << doublings)).min(RECV_ERROR_PAUSE_MAX)
}

/// Receives every successfully parsed alert.
#[async_trait]
pub trait AlertHandler: Send + Sync {
    async fn handle(&self, record: AlertRecord);
}

#[async_trait]
impl<T: AlertHandler + ?Sized> AlertHandler for Arc<T> {
    async fn handle(&self, record: AlertRecord) {
        (**self).handle(record).await
    }
}

/// Owns the bound UDP socket.
pub struct AlertListener {
    socket: UdpSocket,
}

impl AlertListener {
    /// Bind the listening socket.
    #[instrument(skip_all, fields(addr = %addr))]
    pub async fn bind(addr: SocketAddr) -> Result<Self, AlertError> {
        let socket = UdpSocket::bind(addr).await?;
        info!(local_addr = %socket.local_addr()?, "alert listener bound");
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AlertError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive datagrams until `shutdown` is notified. The socket is closed on return.
    pub async fn run(self, handler: Arc<dyn AlertHandler>, shutdown: Arc<Notify>) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut failures = 0u32;
        let stop = shutdown.notified();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("alert listener shutting down");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => {
                        failures = 0;
                        dispatch(&buf[..len], peer, handler.as_ref()).await;
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let pause = recv_error_pause(failures);
                        warn!(error = %e, failures, pause = ?pause, "datagram receive failed");
                        tokio::select! {
                            _ = &mut stop => {
                                info!("alert listener shutting down");
                                break;
                            }
                            _ = tokio::time::sleep(pause) => {}
                        }
                    }
                },
            }
        }
    }
}

/// Parse one datagram and hand it to `handler`. Returns whether the handler ran.
pub async fn dispatch(datagram: &[u8], peer: SocketAddr, handler: &dyn AlertHandler) -> bool {
    let payload = String::from_utf8_lossy(datagram);
    info!(peer = %peer, bytes = datagram.len(), "received alert datagram");

    match parse_payload(&payload) {
        Ok(record) => {
            debug!(peer = %peer, kind = %record.kind(), host = ?record.host_name(), "parsed alert");
            handler.handle(record).await;
            true
        }
        Err(e) if e.is_parse_error() => {
            warn!(peer = %peer, error = %e, payload = %payload.trim_end(), "dropping malformed alert");
            false
        }
        Err(e) => {
            error!(peer = %peer, error = %e, "failed to decode alert");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct Recorder {
        records: Mutex<Vec<AlertRecord>>,
    }

    #[async_trait]
    impl AlertHandler for Recorder {
        async fn handle(&self, record: AlertRecord) {
            self.records.lock().await.push(record);
        }
    }

    fn peer() -> SocketAddr {
        "192.0.2.10:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn dispatch_invokes_handler_once_per_valid_datagram() {
        let recorder = Recorder {
            records: Mutex::new(Vec::new()),
        };

        assert!(dispatch(b"rebuild||~||cache", peer(), &recorder).await);
        assert!(dispatch(b"host||~||PROBLEM||~||h||~||DOWN||~||out\n", peer(), &recorder).await);

        assert_eq!(recorder.records.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn dispatch_skips_handler_on_parse_failure() {
        let recorder = Recorder {
            records: Mutex::new(Vec::new()),
        };

        assert!(!dispatch(b"bogus||~||x", peer(), &recorder).await);
        assert!(!dispatch(b"service||~||PROBLEM", peer(), &recorder).await);
        assert!(!dispatch(b"", peer(), &recorder).await);

        assert!(recorder.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let recorder = Recorder {
            records: Mutex::new(Vec::new()),
        };

        assert!(dispatch(b"rebuild||~||caf\xff", peer(), &recorder).await);
        let records = recorder.records.lock().await;
        assert_eq!(
            records[0],
            AlertRecord::Rebuild {
                details: vec!["caf\u{fffd}".into()]
            }
        );
    }

    #[test]
    fn receive_errors_back_off_up_to_a_second() {
        assert_eq!(recv_error_pause(1), Duration::from_millis(10));
        assert_eq!(recv_error_pause(2), Duration::from_millis(20));
        assert_eq!(recv_error_pause(5), Duration::from_millis(160));
        assert_eq!(recv_error_pause(8), Duration::from_secs(1));
        assert_eq!(recv_error_pause(u32::MAX), Duration::from_secs(1));
    }
}
