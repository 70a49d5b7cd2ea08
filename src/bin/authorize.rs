use booking_notifier::utils::{logger, validation::Validate};
use booking_notifier::{CliConfig, CredentialStore};
use clap::Parser;
use std::sync::Arc;

/// 只執行 OAuth 授權並保存 token，供首次部署使用
#[derive(Debug, Parser)]
#[command(name = "authorize")]
#[command(about = "Runs the OAuth authorization flow and stores the resulting token")]
struct AuthorizeArgs {
    #[command(flatten)]
    config: CliConfig,

    #[arg(long, help = "Authorize again even if a usable token is stored")]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = AuthorizeArgs::parse();
    logger::init_cli_logger(args.config.verbose);
    if let Err(e) = dotenv {
        tracing::debug!(".env file not loaded: {}", e);
    }

    let config = args.config.to_notifier_config()?;
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let source = config.credential_source()?;
    let store = CredentialStore::load(Arc::clone(&source), config.acquirer_settings()?).await?;

    let token = if args.force {
        store.acquirer().acquire(source.as_ref()).await?
    } else {
        store.resolve_token().await?
    };

    tracing::info!("Authorization complete: {:?}", token);
    println!("✅ Token available via {}", source.describe());
    Ok(())
}
