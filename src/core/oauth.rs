use crate::domain::model::{ClientConfig, Token};
use crate::utils::error::{NotifierError, Result};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<&str>) -> Token {
        let mut token = Token::new(self.access_token);
        if let Some(token_type) = self.token_type.filter(|t| !t.is_empty()) {
            token.token_type = token_type;
        }
        // 沒有回傳新的 refresh token 時沿用舊的
        token.refresh_token = self
            .refresh_token
            .filter(|r| !r.is_empty())
            .or_else(|| previous_refresh.map(str::to_string));
        token.expiry = self
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now() + Duration::seconds(secs));
        token
    }
}

/// OAuth2 authorization-code 與 refresh-token 流程
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: ClientConfig,
    scope: String,
    http: Client,
}

impl OAuthClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: ClientConfig, http: Client) -> Self {
        Self {
            config,
            scope: GMAIL_SEND_SCOPE.to_string(),
            http,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.config.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| NotifierError::InvalidConfigValueError {
            field: "auth_uri".to_string(),
            value: self.config.auth_uri.clone(),
            reason: e.to_string(),
        })
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token> {
        tracing::debug!("Exchanging authorization code at {}", self.config.token_uri);
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;
        Ok(response.into_token(None))
    }

    pub async fn refresh(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
            NotifierError::TokenExchangeError {
                message: "token has no refresh_token".to_string(),
            }
        })?;

        tracing::debug!("Refreshing access token at {}", self.config.token_uri);
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        Ok(response.into_token(Some(refresh_token)))
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(&self.config.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifierError::TokenExchangeError {
                message: format!("token endpoint unreachable: {}", e),
            })?;

        let status = response.status();
        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| NotifierError::TokenExchangeError {
                    message: format!("token endpoint returned {} with unreadable body: {}", status, e),
                })?;

        if !status.is_success() {
            let description = body
                .get("error_description")
                .and_then(|v| v.as_str())
                .or_else(|| body.get("error").and_then(|v| v.as_str()))
                .unwrap_or("unknown error");
            tracing::warn!("Token endpoint rejected the request ({}): {}", status, description);
            return Err(NotifierError::TokenExchangeError {
                message: format!("{} ({})", description, status),
            });
        }

        serde_json::from_value(body).map_err(|e| NotifierError::TokenExchangeError {
            message: format!("unexpected token response: {}", e),
        })
    }
}
