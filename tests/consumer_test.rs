mod common;

use anyhow::Result;
use booking_notifier::adapters::{ChannelSource, JsonLinesSource};
use booking_notifier::core::consumer::{ConsumerStats, MessageOutcome};
use booking_notifier::core::oauth::OAuthClient;
use booking_notifier::core::{CredentialSource, InboundMessage, MailTransport, Token};
use booking_notifier::{GmailClient, InlineCredentialSource, MailDispatcher, NotificationConsumer};
use common::{client_config, client_secret_json, RecordingTransport};
use httpmock::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn test_malformed_message_is_dropped_and_loop_continues() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (sender, source) = ChannelSource::channel(8);

    sender
        .send(InboundMessage::new(r#"{"bookingId": "not-a-number"}"#))
        .await?;
    sender
        .send(InboundMessage::new(
            r#"{"bookingId":123,"eventId":"EVT1","userEmail":"a@b.com"}"#,
        ))
        .await?;
    drop(sender);

    let mut consumer = NotificationConsumer::new(source, transport.clone(), MailDispatcher::default());
    let stats = consumer.run().await;

    assert_eq!(
        stats,
        ConsumerStats {
            received: 2,
            sent: 1,
            malformed: 1,
            rejected: 0,
            failed: 0,
        }
    );

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("To: a@b.com\r\n"));
    assert!(sent[0].contains("Subject: Booking Confirmation for Event EVT1\r\n"));
    assert!(sent[0].contains("(Booking ID: 123)"));
    Ok(())
}

#[tokio::test]
async fn test_per_message_errors_do_not_stop_the_loop() -> Result<()> {
    let transport = Arc::new(RecordingTransport::failing_for("down@example.com"));
    let input = concat!(
        r#"{"bookingId":1,"eventId":"E1","userEmail":"not-an-email"}"#,
        "\n",
        r#"{"bookingId":2,"eventId":"E2","userEmail":"down@example.com"}"#,
        "\n",
        "this is not json\n",
        r#"{"bookingId":3,"eventId":"E3","userEmail":"ok@example.com"}"#,
        "\n",
    );

    let source = JsonLinesSource::new(input.as_bytes());
    let mut consumer = NotificationConsumer::new(source, transport.clone(), MailDispatcher::default());
    let stats = consumer.run().await;

    assert_eq!(stats.received, 4);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.sent, 1);
    assert_eq!(consumer.stats(), &stats);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("To: ok@example.com\r\n"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_utf8_line_is_malformed_and_loop_continues() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let input: &[u8] = b"{\"bookingId\":1,\"eventId\":\"E\xff\",\"userEmail\":\"bad@example.com\"}\n\
{\"bookingId\":2,\"eventId\":\"E2\",\"userEmail\":\"ok@example.com\"}\n";

    let mut consumer = NotificationConsumer::new(
        JsonLinesSource::new(input),
        transport.clone(),
        MailDispatcher::default(),
    );
    let stats = consumer.run().await;

    assert_eq!(stats.received, 2);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.sent, 1);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("To: ok@example.com\r\n"));
    Ok(())
}

#[tokio::test]
async fn test_handle_message_outcomes() -> Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let (_sender, source) = ChannelSource::channel(1);
    let consumer = NotificationConsumer::new(source, transport, MailDispatcher::new("bookings@example.com"));

    assert_eq!(
        consumer.handle_message(b"{}").await,
        MessageOutcome::Malformed
    );
    assert_eq!(
        consumer
            .handle_message(br#"{"bookingId":9,"eventId":"E9","userEmail":"@nodomain.com"}"#)
            .await,
        MessageOutcome::Rejected { booking_id: 9 }
    );
    assert_eq!(
        consumer
            .handle_message(br#"{"bookingId":10,"eventId":"E10","userEmail":"user@example.com"}"#)
            .await,
        MessageOutcome::Sent {
            booking_id: 10,
            message_id: "msg-1".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_payload_results_in_exactly_one_api_call() -> Result<()> {
    let server = MockServer::start();
    let send_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/gmail/v1/users/me/messages/send")
            .header("authorization", "Bearer ya29.valid");
        then.status(200).json_body(serde_json::json!({ "id": "sent-1" }));
    });

    let source: Arc<dyn CredentialSource> = Arc::new(InlineCredentialSource::new(
        client_secret_json(&server.url("/token")),
        None,
    ));
    let client = GmailClient::new(
        OAuthClient::new(client_config(server.url("/token"))),
        Token::new("ya29.valid"),
        source,
    )
    .with_api_base(server.base_url());
    let transport: Arc<dyn MailTransport> = Arc::new(client);

    let input = r#"{"bookingId":123,"eventId":"EVT1","userEmail":"a@b.com"}"#;
    let mut consumer = NotificationConsumer::new(
        JsonLinesSource::new(input.as_bytes()),
        transport,
        MailDispatcher::default(),
    );
    let stats = consumer.run().await;

    assert_eq!(stats.sent, 1);
    send_mock.assert_hits(1);
    Ok(())
}
