use crate::core::oauth::OAuthClient;
use crate::domain::model::Token;
use crate::domain::ports::{CredentialSource, MailTransport};
use crate::utils::error::{NotifierError, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com";

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// 綁定 OAuth token 的 Gmail API client
///
/// token 由單一 mutex 保護；過期時在鎖內 refresh 並寫回 credential source。
pub struct GmailClient {
    http: Client,
    oauth: OAuthClient,
    token: Mutex<Token>,
    source: Arc<dyn CredentialSource>,
    api_base: String,
}

impl GmailClient {
    pub fn new(oauth: OAuthClient, token: Token, source: Arc<dyn CredentialSource>) -> Self {
        Self {
            http: Client::new(),
            oauth,
            token: Mutex::new(token),
            source,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn current_token(&self) -> Token {
        self.token.lock().await.clone()
    }

    async fn authorization_header(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            tracing::info!("Access token expired, refreshing");
            let refreshed = self.oauth.refresh(&token).await?;

            // 寫回失敗不影響這次送信
            if let Err(e) = self.source.save_token(&refreshed).await {
                tracing::warn!(
                    "Refreshed token could not be persisted to {}: {}",
                    self.source.describe(),
                    e
                );
            }
            *token = refreshed;
        }
        Ok(token.authorization_header())
    }
}

#[async_trait]
impl MailTransport for GmailClient {
    async fn send_raw(&self, raw_message: &[u8]) -> Result<String> {
        let authorization = self.authorization_header().await?;
        let encoded = base64::engine::general_purpose::URL_SAFE.encode(raw_message);
        let url = format!("{}/gmail/v1/users/me/messages/send", self.api_base);

        tracing::debug!("Sending message via {}", url);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&serde_json::json!({ "raw": encoded }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::DispatchError {
                message: format!("mail API returned {}: {}", status, body.trim()),
                source: None,
            });
        }

        let sent: SendResponse = response.json().await?;
        tracing::debug!("Mail API accepted message id={}", sent.id);
        Ok(sent.id)
    }
}
