use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use dealroom_types::events::NotificationEvent;

/// Fans status-change events out to delivery workers. Publishing never
/// blocks and never fails the request that triggered it.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    tx: broadcast::Sender<NotificationEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(NotifierInner { tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.tx.subscribe()
    }

    pub fn publish(&self, event: NotificationEvent) {
        debug!("Publishing {:?}", event);
        // No subscriber is not an error: delivery is best effort.
        let _ = self.inner.tx.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Outbound delivery worker. Email sending is out of process; this loop
/// records what would be sent and to whom.
pub async fn run_delivery_loop(mut rx: broadcast::Receiver<NotificationEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let audience = if event.is_admin_only() { "moderators" } else { "participants" };
                info!(
                    inquiry_id = %event.inquiry_id(),
                    audience,
                    "Notification queued: {:?}",
                    event
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Notification worker lagged, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Notification channel closed, delivery worker exiting");
                break;
            }
        }
    }
}
