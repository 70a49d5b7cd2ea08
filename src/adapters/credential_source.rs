use crate::domain::model::{ClientConfig, Token};
use crate::domain::ports::CredentialSource;
use crate::utils::error::{NotifierError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Deserialize)]
struct ClientSecretDocument {
    installed: Option<ClientConfig>,
    web: Option<ClientConfig>,
}

/// 解析 Google client secret 文件 (`installed` 或 `web` 區塊)
pub fn parse_client_config(json: &[u8]) -> Result<ClientConfig> {
    let document: ClientSecretDocument = serde_json::from_slice(json).map_err(|e| {
        NotifierError::config(format!("unable to parse client secret document: {}", e))
    })?;

    let config = document
        .installed
        .or(document.web)
        .ok_or_else(|| NotifierError::config("no 'installed' or 'web' credentials found"))?;

    for (field, value) in [
        ("client_id", &config.client_id),
        ("auth_uri", &config.auth_uri),
        ("token_uri", &config.token_uri),
    ] {
        if value.trim().is_empty() {
            return Err(NotifierError::config(format!(
                "client secret document has an empty '{}'",
                field
            )));
        }
    }

    Ok(config)
}

fn parse_token(json: &[u8], origin: &str) -> Result<Token> {
    let token: Token = serde_json::from_slice(json).map_err(|e| {
        tracing::debug!("Token from {} could not be decoded: {}", origin, e);
        NotifierError::SerializationError(e)
    })?;
    Ok(token)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// 從檔案讀取 client secret，token 也存放在檔案
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl FileCredentialSource {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: absolute(&credentials_path.into()),
            token_path: absolute(&token_path.into()),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    fn describe(&self) -> String {
        format!(
            "file(credentials={}, token={})",
            self.credentials_path.display(),
            self.token_path.display()
        )
    }

    async fn load_client_config(&self) -> Result<ClientConfig> {
        tracing::info!(
            "Reading client credentials from {}",
            self.credentials_path.display()
        );
        let bytes = tokio::fs::read(&self.credentials_path).await.map_err(|e| {
            NotifierError::config(format!(
                "unable to read client secret file at {}: {}",
                self.credentials_path.display(),
                e
            ))
        })?;
        parse_client_config(&bytes)
    }

    async fn load_token(&self) -> Result<Option<Token>> {
        let bytes = match tokio::fs::read(&self.token_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No token file at {}", self.token_path.display());
                return Ok(None);
            }
            Err(e) => return Err(NotifierError::IoError(e)),
        };

        let token = parse_token(&bytes, &self.token_path.display().to_string())?;
        tracing::info!("Token loaded from {}", self.token_path.display());
        Ok(Some(token))
    }

    async fn save_token(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&self.token_path, content).await?;
        restrict_permissions(&self.token_path)?;

        tracing::info!("Token saved to {}", self.token_path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// 由環境變數等 inline JSON 提供設定；新 token 只保留在記憶體並輸出給操作者
#[derive(Debug)]
pub struct InlineCredentialSource {
    credentials_json: String,
    token_json: RwLock<Option<String>>,
    token_variable: String,
}

impl InlineCredentialSource {
    pub fn new(credentials_json: impl Into<String>, token_json: Option<String>) -> Self {
        Self {
            credentials_json: credentials_json.into(),
            token_json: RwLock::new(token_json.filter(|json| !json.trim().is_empty())),
            token_variable: "GOOGLE_TOKEN_JSON".to_string(),
        }
    }

    /// 印出提示時使用的環境變數名稱
    pub fn with_token_variable(mut self, name: impl Into<String>) -> Self {
        self.token_variable = name.into();
        self
    }

    pub async fn current_token_json(&self) -> Option<String> {
        self.token_json.read().await.clone()
    }
}

#[async_trait]
impl CredentialSource for InlineCredentialSource {
    fn describe(&self) -> String {
        format!("inline(token variable={})", self.token_variable)
    }

    async fn load_client_config(&self) -> Result<ClientConfig> {
        if self.credentials_json.trim().is_empty() {
            return Err(NotifierError::MissingConfigError {
                field: "credentials_json".to_string(),
            });
        }
        parse_client_config(self.credentials_json.as_bytes())
    }

    async fn load_token(&self) -> Result<Option<Token>> {
        let guard = self.token_json.read().await;
        match guard.as_deref() {
            None => {
                tracing::debug!("No inline token configured");
                Ok(None)
            }
            Some(json) => parse_token(json.as_bytes(), &self.token_variable).map(Some),
        }
    }

    async fn save_token(&self, token: &Token) -> Result<()> {
        let json = serde_json::to_string(token)?;
        *self.token_json.write().await = Some(json.clone());

        tracing::info!(
            "New token generated; save the {} line printed on stdout",
            self.token_variable
        );
        println!("{}='{}'", self.token_variable, json);
        Ok(())
    }
}
