use crate::adapters::gmail::{GmailClient, DEFAULT_API_BASE};
use crate::core::oauth::OAuthClient;
use crate::core::token_acquirer::{AcquirerSettings, TokenAcquirer};
use crate::domain::model::Token;
use crate::domain::ports::CredentialSource;
use crate::utils::error::{NotifierError, Result};
use std::sync::Arc;

/// 解析 client 設定與 token，必要時啟動互動授權流程
pub struct CredentialStore {
    source: Arc<dyn CredentialSource>,
    oauth: OAuthClient,
    acquirer: TokenAcquirer,
    api_base: String,
}

impl CredentialStore {
    /// 載入 client 設定；沒有可解析的設定時回傳 ConfigError
    pub async fn load(source: Arc<dyn CredentialSource>, settings: AcquirerSettings) -> Result<Self> {
        tracing::info!("Loading OAuth client configuration from {}", source.describe());
        let client_config = source.load_client_config().await.map_err(|e| match e {
            NotifierError::ConfigError { .. } | NotifierError::MissingConfigError { .. } => e,
            other => NotifierError::config(format!(
                "unable to load client configuration: {}",
                other
            )),
        })?;

        let oauth = OAuthClient::new(client_config);
        let acquirer = TokenAcquirer::new(oauth.clone(), settings);

        Ok(Self {
            source,
            oauth,
            acquirer,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn acquirer(&self) -> &TokenAcquirer {
        &self.acquirer
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// 優先使用已存的 token；缺少、格式錯誤或無法 refresh 時重新授權
    pub async fn resolve_token(&self) -> Result<Token> {
        match self.source.load_token().await {
            Ok(Some(token)) if token.is_usable() => {
                tracing::debug!("Using stored token: {:?}", token);
                return Ok(token);
            }
            Ok(Some(_)) => {
                tracing::warn!("Stored token is expired and has no refresh token, initiating OAuth flow")
            }
            Ok(None) => tracing::warn!("Token not found, initiating OAuth flow"),
            Err(e) => tracing::warn!("Stored token is invalid ({}), initiating OAuth flow", e),
        }

        self.acquirer.acquire(self.source.as_ref()).await
    }

    pub async fn obtain_client(&self) -> Result<GmailClient> {
        let token = self.resolve_token().await?;
        Ok(
            GmailClient::new(self.oauth.clone(), token, Arc::clone(&self.source))
                .with_api_base(self.api_base.clone()),
        )
    }
}
