use crate::domain::model::OutboundEmail;
use crate::domain::ports::MailTransport;
use crate::utils::error::{NotifierError, Result};
use crate::utils::validation::is_valid_email;

pub const DEFAULT_SENDER: &str = "me";

/// 組出最精簡的 RFC 5322 純文字訊息
pub fn build_raw_message(from: &str, to: &str, subject: &str, body: &str) -> String {
    // header 內不允許換行
    let subject = subject.replace(['\r', '\n'], " ");
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{}",
        from, to, subject, body
    )
}

/// 驗證收件人、組信並透過 transport 送出，不重試
pub async fn send(
    transport: &dyn MailTransport,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<()> {
    MailDispatcher::default()
        .send(transport, to, subject, body)
        .await
        .map(|_| ())
}

#[derive(Debug, Clone)]
pub struct MailDispatcher {
    from: String,
}

impl Default for MailDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SENDER)
    }
}

impl MailDispatcher {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    pub fn sender(&self) -> &str {
        &self.from
    }

    pub async fn send(
        &self,
        transport: &dyn MailTransport,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String> {
        if !is_valid_email(to) {
            tracing::warn!("Invalid email address detected: {}", to);
            return Err(NotifierError::InvalidRecipientError {
                address: to.to_string(),
            });
        }

        let raw = build_raw_message(&self.from, to, subject, body);
        tracing::debug!("Sending email to {} ({} bytes)", to, raw.len());

        let message_id = transport
            .send_raw(raw.as_bytes())
            .await
            .map_err(NotifierError::dispatch)?;

        tracing::info!("Successfully sent email to {}", to);
        Ok(message_id)
    }

    pub async fn send_email(
        &self,
        transport: &dyn MailTransport,
        email: &OutboundEmail,
    ) -> Result<String> {
        self.send(transport, &email.to, &email.subject, &email.body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send_raw(&self, raw_message: &[u8]) -> Result<String> {
            if self.fail {
                return Err(NotifierError::TokenExchangeError {
                    message: "refresh rejected".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(raw_message).into_owned());
            Ok("msg-1".to_string())
        }
    }

    #[test]
    fn test_build_raw_message_headers() {
        let raw = build_raw_message("me", "user@example.com", "Hello", "Body text");
        assert_eq!(
            raw,
            "From: me\r\nTo: user@example.com\r\nSubject: Hello\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\nBody text"
        );
    }

    #[test]
    fn test_build_raw_message_strips_subject_newlines() {
        let raw = build_raw_message("me", "user@example.com", "Hi\r\nBcc: evil@example.com", "x");
        assert!(raw.contains("Subject: Hi  Bcc: evil@example.com\r\n"));
        assert!(!raw.contains("\r\nBcc:"));
    }

    #[tokio::test]
    async fn test_invalid_recipients_are_rejected() {
        let transport = RecordingTransport::default();
        for address in ["not-an-email", "missing@domain", "@nodomain.com"] {
            let result = send(&transport, address, "s", "b").await;
            assert!(
                matches!(result, Err(NotifierError::InvalidRecipientError { .. })),
                "{address} should be rejected"
            );
        }
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_valid_recipient_is_sent_once() {
        let transport = RecordingTransport::default();
        send(&transport, "user@example.com", "Subject", "Body")
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("To: user@example.com\r\n"));
        assert!(sent[0].ends_with("\r\n\r\nBody"));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_dispatch_error() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let result = MailDispatcher::new("bookings@example.com")
            .send(&transport, "user@example.com", "s", "b")
            .await;
        assert!(matches!(result, Err(NotifierError::DispatchError { .. })));
    }
}
