use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 提前 10 秒視為過期，避免送出途中 token 失效
const EXPIRY_DELTA_SECS: i64 = 10;

/// Queue 送來的訂位事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub booking_id: i64,
    pub event_id: String,
    pub user_email: String,
}

/// 由 payload 推導出的純文字確認信
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutboundEmail {
    pub fn from_payload(payload: &NotificationPayload) -> Self {
        let subject = format!("Booking Confirmation for Event {}", payload.event_id);
        let body = format!(
            "\nDear User,\n\n\
             Your registration for Event {} (Booking ID: {}) was successful!\n\n\
             Thank you for booking with us. If you have any questions, feel free to contact us.\n\n\
             Best regards,\n\
             Your Event Booking Team\n",
            payload.event_id, payload.booking_id
        );

        Self {
            to: payload.user_email.clone(),
            subject,
            body,
        }
    }
}

/// OAuth2 client secret document 裡的欄位 (installed / web)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_non_empty"
    )]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn deserialize_non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// "0001-01-01T00:00:00Z" 代表沒有到期時間
fn deserialize_expiry<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|expiry| expiry.year() > 1))
}

impl Token {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            expiry: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into()).filter(|s| !s.is_empty());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_DELTA_SECS) <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// 可以直接使用，或過期但能 refresh
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && (!self.is_expired() || self.can_refresh())
    }

    pub fn authorization_header(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.access_token)
    }
}

fn mask(secret: &str) -> String {
    match secret.get(..4) {
        Some(prefix) if secret.len() > 4 => format!("{}***", prefix),
        _ => "***".to_string(),
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &mask(&self.access_token))
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_deref().map(mask))
            .field("expiry", &self.expiry)
            .finish()
    }
}
