use crate::core::mail_dispatcher::MailDispatcher;
use crate::domain::model::{NotificationPayload, OutboundEmail};
use crate::domain::ports::{MailTransport, MessageSource};
use crate::utils::error::NotifierError;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Sent { booking_id: i64, message_id: String },
    Malformed,
    Rejected { booking_id: i64 },
    Failed { booking_id: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: usize,
    pub sent: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl ConsumerStats {
    fn record(&mut self, outcome: &MessageOutcome) {
        self.received += 1;
        match outcome {
            MessageOutcome::Sent { .. } => self.sent += 1,
            MessageOutcome::Malformed => self.malformed += 1,
            MessageOutcome::Rejected { .. } => self.rejected += 1,
            MessageOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// 逐筆處理訂位事件並寄出確認信
///
/// 訊息在收到時即視為已確認 (at-most-once)；單筆失敗只記錄，不中斷迴圈。
pub struct NotificationConsumer<M: MessageSource> {
    source: M,
    transport: Arc<dyn MailTransport>,
    dispatcher: MailDispatcher,
    stats: ConsumerStats,
}

impl<M: MessageSource> NotificationConsumer<M> {
    pub fn new(source: M, transport: Arc<dyn MailTransport>, dispatcher: MailDispatcher) -> Self {
        Self {
            source,
            transport,
            dispatcher,
            stats: ConsumerStats::default(),
        }
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// 直到訊息來源關閉為止
    pub async fn run(&mut self) -> ConsumerStats {
        tracing::info!("Waiting for messages");

        while let Some(message) = self.source.next_message().await {
            let outcome = self.handle_message(&message.body).await;
            self.stats.record(&outcome);
        }

        tracing::info!(
            "Message source closed: received={}, sent={}, malformed={}, rejected={}, failed={}",
            self.stats.received,
            self.stats.sent,
            self.stats.malformed,
            self.stats.rejected,
            self.stats.failed
        );
        self.stats.clone()
    }

    pub async fn handle_message(&self, body: &[u8]) -> MessageOutcome {
        tracing::debug!("Received message: {}", String::from_utf8_lossy(body));

        let payload: NotificationPayload = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    "Failed to unmarshal message: {}, raw message: {}",
                    e,
                    String::from_utf8_lossy(body)
                );
                return MessageOutcome::Malformed;
            }
        };

        let email = OutboundEmail::from_payload(&payload);
        tracing::info!(
            "Sending confirmation for booking {} to {} with subject: {}",
            payload.booking_id,
            email.to,
            email.subject
        );

        match self
            .dispatcher
            .send_email(self.transport.as_ref(), &email)
            .await
        {
            Ok(message_id) => {
                tracing::info!(
                    "Successfully sent email notification for booking {}",
                    payload.booking_id
                );
                MessageOutcome::Sent {
                    booking_id: payload.booking_id,
                    message_id,
                }
            }
            Err(e @ NotifierError::InvalidRecipientError { .. }) => {
                tracing::warn!("Skipping booking {}: {}", payload.booking_id, e);
                MessageOutcome::Rejected {
                    booking_id: payload.booking_id,
                }
            }
            Err(e) => {
                tracing::error!(
                    "Failed to send email to {}: {} ({})",
                    email.to,
                    e,
                    e.recovery_suggestion()
                );
                MessageOutcome::Failed {
                    booking_id: payload.booking_id,
                }
            }
        }
    }
}
