#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::credential_source::{FileCredentialSource, InlineCredentialSource};
use crate::adapters::gmail::DEFAULT_API_BASE;
use crate::core::mail_dispatcher::DEFAULT_SENDER;
use crate::core::token_acquirer::{AcquirerSettings, DEFAULT_CALLBACK_ADDR, DEFAULT_STATE_TOKEN};
use crate::domain::ports::CredentialSource;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

pub const DEFAULT_QUEUE_NAME: &str = "booking_notifications";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    File,
    Inline,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub mode: Option<CredentialMode>,
    pub credentials_path: Option<String>,
    pub token_path: Option<String>,
    pub credentials_json: Option<String>,
    pub token_json: Option<String>,
}

impl CredentialsConfig {
    /// 未指定 mode 時，有 inline JSON 就用 inline，否則用檔案
    pub fn effective_mode(&self) -> CredentialMode {
        self.mode.unwrap_or_else(|| {
            if self
                .credentials_json
                .as_deref()
                .is_some_and(|json| !json.trim().is_empty())
            {
                CredentialMode::Inline
            } else {
                CredentialMode::File
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    #[serde(default = "default_callback_addr")]
    pub callback_addr: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            callback_addr: default_callback_addr(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_sender")]
    pub from: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_sender(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// 只用於日誌標示，目前沒有 broker adapter 會讀取
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// "-" 代表 stdin
    #[serde(default = "default_input")]
    pub input: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            input: default_input(),
        }
    }
}

fn default_callback_addr() -> String {
    DEFAULT_CALLBACK_ADDR.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_queue_name() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}

fn default_input() -> String {
    "-".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

impl NotifierConfig {
    /// 依 mode 建立對應的 credential source
    pub fn credential_source(&self) -> Result<Arc<dyn CredentialSource>> {
        let credentials = &self.credentials;
        match credentials.effective_mode() {
            CredentialMode::File => {
                let credentials_path = validation::validate_required_field(
                    "credentials.credentials_path",
                    &credentials.credentials_path,
                )?;
                let token_path =
                    validation::validate_required_field("credentials.token_path", &credentials.token_path)?;
                Ok(Arc::new(FileCredentialSource::new(
                    credentials_path.as_str(),
                    token_path.as_str(),
                )))
            }
            CredentialMode::Inline => {
                let credentials_json = validation::validate_required_field(
                    "credentials.credentials_json",
                    &credentials.credentials_json,
                )?;
                Ok(Arc::new(InlineCredentialSource::new(
                    credentials_json.clone(),
                    credentials.token_json.clone(),
                )))
            }
        }
    }

    pub fn acquirer_settings(&self) -> Result<AcquirerSettings> {
        let callback_addr = validation::validate_socket_addr(
            "authorization.callback_addr",
            &self.authorization.callback_addr,
        )?;
        Ok(AcquirerSettings {
            callback_addr,
            timeout: Duration::from_secs(self.authorization.timeout_seconds),
            state_token: DEFAULT_STATE_TOKEN.to_string(),
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        match self.credentials.effective_mode() {
            CredentialMode::File => {
                let credentials_path = validation::validate_required_field(
                    "credentials.credentials_path",
                    &self.credentials.credentials_path,
                )?;
                validation::validate_path("credentials.credentials_path", credentials_path)?;
                let token_path = validation::validate_required_field(
                    "credentials.token_path",
                    &self.credentials.token_path,
                )?;
                validation::validate_path("credentials.token_path", token_path)?;
            }
            CredentialMode::Inline => {
                let credentials_json = validation::validate_required_field(
                    "credentials.credentials_json",
                    &self.credentials.credentials_json,
                )?;
                validation::validate_non_empty_string("credentials.credentials_json", credentials_json)?;
            }
        }

        validation::validate_socket_addr(
            "authorization.callback_addr",
            &self.authorization.callback_addr,
        )?;
        validation::validate_range(
            "authorization.timeout_seconds",
            self.authorization.timeout_seconds,
            1,
            3600,
        )?;
        validation::validate_non_empty_string("mail.from", &self.mail.from)?;
        validation::validate_url("mail.api_base", &self.mail.api_base)?;
        validation::validate_non_empty_string("consumer.queue_name", &self.consumer.queue_name)?;
        validation::validate_path("consumer.input", &self.consumer.input)?;

        Ok(())
    }
}

impl Validate for NotifierConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
