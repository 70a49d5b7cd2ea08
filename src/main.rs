use booking_notifier::adapters::JsonLinesSource;
use booking_notifier::config::cli::LogFormat;
use booking_notifier::core::consumer::ConsumerStats;
use booking_notifier::core::{MailTransport, MessageSource};
use booking_notifier::utils::error::ErrorSeverity;
use booking_notifier::utils::{logger, validation::Validate};
use booking_notifier::{
    CliConfig, CredentialStore, MailDispatcher, NotificationConsumer, NotifierError, Result,
};
use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    let config = CliConfig::parse();

    // 初始化日誌
    match config.log_format {
        LogFormat::Compact => logger::init_cli_logger(config.verbose),
        LogFormat::Json => logger::init_json_logger(config.verbose),
    }
    if let Err(e) = dotenv {
        tracing::warn!(".env file not found, using system environment variables: {}", e);
    }

    tracing::info!("Starting booking-notifier");

    match run(config).await {
        Ok(stats) => {
            tracing::info!(
                "✅ Consumer stopped after {} messages ({} sent)",
                stats.received,
                stats.sent
            );
        }
        Err(e) => {
            tracing::error!(
                "❌ Notifier failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            std::process::exit(exit_code(&e));
        }
    }
}

fn exit_code(error: &NotifierError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

async fn run(cli: CliConfig) -> Result<ConsumerStats> {
    let config = cli.to_notifier_config()?;
    config.validate()?;

    // 啟動階段：取得已授權的 mail client，失敗即結束
    let source = config.credential_source()?;
    let store = CredentialStore::load(source, config.acquirer_settings()?)
        .await?
        .with_api_base(config.mail.api_base.clone());
    let client: Arc<dyn MailTransport> = Arc::new(store.obtain_client().await?);
    let dispatcher = MailDispatcher::new(config.mail.from.clone());

    tracing::info!(
        "Starting to consume messages from queue '{}' (input: {})",
        config.consumer.queue_name,
        config.consumer.input
    );

    let stats = if config.consumer.input == "-" {
        let stdin = JsonLinesSource::new(BufReader::new(tokio::io::stdin()));
        consume(stdin, client, dispatcher).await
    } else {
        let file = tokio::fs::File::open(&config.consumer.input).await?;
        consume(JsonLinesSource::new(BufReader::new(file)), client, dispatcher).await
    };

    Ok(stats)
}

async fn consume<M: MessageSource>(
    source: M,
    transport: Arc<dyn MailTransport>,
    dispatcher: MailDispatcher,
) -> ConsumerStats {
    let mut consumer = NotificationConsumer::new(source, transport, dispatcher);

    let finished = tokio::select! {
        stats = consumer.run() => Some(stats),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            None
        }
    };

    finished.unwrap_or_else(|| consumer.stats().clone())
}
