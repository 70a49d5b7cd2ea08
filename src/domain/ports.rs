use crate::domain::model::{ClientConfig, Token};
use crate::utils::error::Result;
use async_trait::async_trait;

/// client 設定與 token 的來源 (檔案或 inline JSON)
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// 給日誌看的簡短描述，不可包含秘密
    fn describe(&self) -> String;

    async fn load_client_config(&self) -> Result<ClientConfig>;

    /// `Ok(None)` 表示沒有 token；格式錯誤時回傳 Err
    async fn load_token(&self) -> Result<Option<Token>>;

    async fn save_token(&self, token: &Token) -> Result<()>;
}

/// 已驗證的郵件 API client
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 送出一封 RFC 5322 原始訊息，回傳遠端 message id
    async fn send_raw(&self, raw_message: &[u8]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub body: Vec<u8>,
}

impl InboundMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }
}

/// Queue 端點；回傳 None 代表來源已關閉
#[async_trait]
pub trait MessageSource: Send {
    async fn next_message(&mut self) -> Option<InboundMessage>;
}
