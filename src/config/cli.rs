use crate::adapters::gmail::DEFAULT_API_BASE;
use crate::config::{
    AuthorizationConfig, ConsumerConfig, CredentialMode, CredentialsConfig, MailConfig,
    NotifierConfig, DEFAULT_QUEUE_NAME, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::mail_dispatcher::DEFAULT_SENDER;
use crate::core::token_acquirer::DEFAULT_CALLBACK_ADDR;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "booking-notifier")]
#[command(about = "Relays booking events to confirmation emails")]
pub struct CliConfig {
    #[arg(long, env = "NOTIFIER_CONFIG", help = "TOML config file; overrides the flags below")]
    pub config: Option<String>,

    #[arg(long, value_enum, env = "GOOGLE_CREDENTIALS_MODE")]
    pub credentials_mode: Option<CredentialMode>,

    #[arg(long, env = "GOOGLE_CREDENTIALS_PATH")]
    pub credentials_path: Option<String>,

    #[arg(long, env = "GOOGLE_TOKEN_PATH")]
    pub token_path: Option<String>,

    #[arg(long, env = "GOOGLE_CREDENTIALS_JSON", hide_env_values = true)]
    pub credentials_json: Option<String>,

    #[arg(long, env = "GOOGLE_TOKEN_JSON", hide_env_values = true)]
    pub token_json: Option<String>,

    #[arg(long, env = "OAUTH_CALLBACK_ADDR", default_value = DEFAULT_CALLBACK_ADDR)]
    pub callback_addr: String,

    #[arg(long, env = "OAUTH_TIMEOUT_SECONDS", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub auth_timeout: u64,

    #[arg(long, env = "MAIL_FROM", default_value = DEFAULT_SENDER)]
    pub from: String,

    #[arg(long, env = "GMAIL_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(
        long,
        env = "RABBITMQ_QUEUE_NAME",
        default_value = DEFAULT_QUEUE_NAME,
        help = "Queue label shown in logs"
    )]
    pub queue_name: String,

    #[arg(long, default_value = "-", help = "JSON-lines message stream, '-' for stdin")]
    pub input: String,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn to_notifier_config(&self) -> Result<NotifierConfig> {
        if let Some(path) = &self.config {
            tracing::info!("Loading configuration from {}", path);
            return NotifierConfig::from_file(path);
        }

        Ok(NotifierConfig {
            credentials: CredentialsConfig {
                mode: self.credentials_mode,
                credentials_path: self.credentials_path.clone(),
                token_path: self.token_path.clone(),
                credentials_json: self.credentials_json.clone(),
                token_json: self.token_json.clone(),
            },
            authorization: AuthorizationConfig {
                callback_addr: self.callback_addr.clone(),
                timeout_seconds: self.auth_timeout,
            },
            mail: MailConfig {
                from: self.from.clone(),
                api_base: self.api_base.clone(),
            },
            consumer: ConsumerConfig {
                queue_name: self.queue_name.clone(),
                input: self.input.clone(),
            },
        })
    }
}
