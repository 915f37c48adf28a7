use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::business::InquiryStatus;

/// Who a notification is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Requester(Uuid),
    Operators,
}

/// Emitted on every inquiry status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub inquiry_id: Uuid,
    pub offer_id: Option<Uuid>,
    pub from: InquiryStatus,
    pub to: InquiryStatus,
    pub message: Option<String>,
}

/// Delivery collaborator (email, chat, push)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Sink that only writes each notification to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&notification)?;
        info!(notification = %payload, "Notify {:?}: inquiry {}", notification.recipient, notification.inquiry_id);
        Ok(())
    }
}

/// Sink that logs each notification and keeps it for inspection
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        info!(
            "Notify {:?}: inquiry {} {} -> {}",
            notification.recipient, notification.inquiry_id, notification.from, notification.to
        );
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
