use async_trait::async_trait;
use tracing::{debug, info, warn};

use nagbot_alert::{AlertFormatter, AlertHandler, AlertRecord};

use crate::slot::SessionSlot;

/// Formats each parsed alert and broadcasts it through the current session.
///
/// Alerts that arrive while no session is installed are dropped, not queued.
pub struct SessionForwarder {
    formatter: AlertFormatter,
    slot: SessionSlot,
}

impl SessionForwarder {
    pub fn new(formatter: AlertFormatter, slot: SessionSlot) -> Self {
        Self { formatter, slot }
    }
}

#[async_trait]
impl AlertHandler for SessionForwarder {
    async fn handle(&self, record: AlertRecord) {
        let text = self.formatter.format(&record);

        let Some(deliveries) = self.slot.broadcast(&text).await else {
            debug!(kind = %record.kind(), "no IRC session, dropping alert");
            return;
        };

        if deliveries.is_empty() {
            debug!(kind = %record.kind(), "not in any channel, dropping alert");
            return;
        }

        let failed = deliveries.iter().filter(|d| !d.success).count();
        if failed > 0 {
            warn!(
                kind = %record.kind(),
                failed,
                total = deliveries.len(),
                "alert not delivered to every channel"
            );
        } else {
            info!(kind = %record.kind(), channels = deliveries.len(), "alert relayed");
        }
    }
}
