#![allow(dead_code)]

use async_trait::async_trait;
use booking_notifier::core::{ClientConfig, MailTransport};
use booking_notifier::utils::error::{NotifierError, Result};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

pub fn client_config(token_uri: String) -> ClientConfig {
    ClientConfig {
        client_id: "client-123.apps.googleusercontent.com".to_string(),
        client_secret: "secret-456".to_string(),
        auth_uri: "https://accounts.example.com/o/oauth2/auth".to_string(),
        token_uri,
        redirect_uris: vec!["http://localhost".to_string()],
    }
}

pub fn client_secret_json(token_uri: &str) -> String {
    serde_json::json!({
        "installed": {
            "client_id": "client-123.apps.googleusercontent.com",
            "client_secret": "secret-456",
            "auth_uri": "https://accounts.example.com/o/oauth2/auth",
            "token_uri": token_uri,
            "redirect_uris": ["http://localhost"]
        }
    })
    .to_string()
}

/// 先綁定再釋放，取得一個目前可用的本機 port
pub fn free_local_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// 模擬瀏覽器回到 callback；listener 尚未啟動時重試
pub async fn simulate_callback(addr: SocketAddr, query: &str) -> reqwest::Response {
    let url = format!("http://{}/callback?{}", addr, query);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(response) = client.get(&url).send().await {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("callback listener never came up on {addr}");
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<String>>,
    pub fail_for: Option<String>,
}

impl RecordingTransport {
    pub fn failing_for(recipient: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Some(recipient.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send_raw(&self, raw_message: &[u8]) -> Result<String> {
        let raw = String::from_utf8_lossy(raw_message).into_owned();
        if let Some(recipient) = &self.fail_for {
            if raw.contains(&format!("To: {}\r\n", recipient)) {
                return Err(NotifierError::DispatchError {
                    message: "mail API returned 503 Service Unavailable".to_string(),
                    source: None,
                });
            }
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(raw);
        Ok(format!("msg-{}", sent.len()))
    }
}
