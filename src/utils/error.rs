use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Authorization denied: {reason}")]
    AuthorizationDeniedError { reason: String },

    #[error("Authorization timed out after {timeout:?}")]
    AuthorizationTimeoutError { timeout: Duration },

    #[error("Token exchange failed: {message}")]
    TokenExchangeError { message: String },

    #[error("Invalid recipient address: {address}")]
    InvalidRecipientError { address: String },

    #[error("Mail dispatch failed: {message}")]
    DispatchError {
        message: String,
        #[source]
        source: Option<Box<NotifierError>>,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authorization,
    Recipient,
    Transport,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl NotifierError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// 將底層錯誤包裝成 DispatchError，保留原始錯誤鏈
    pub fn dispatch(source: NotifierError) -> Self {
        match source {
            already @ Self::DispatchError { .. } => already,
            other => Self::DispatchError {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::AuthorizationDeniedError { .. }
            | Self::AuthorizationTimeoutError { .. }
            | Self::TokenExchangeError { .. } => ErrorCategory::Authorization,
            Self::InvalidRecipientError { .. } => ErrorCategory::Recipient,
            Self::DispatchError { .. } | Self::HttpError(_) => ErrorCategory::Transport,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Recipient => ErrorSeverity::Low,
            ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Authorization => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 啟動階段錯誤會終止程序；單筆訊息錯誤只會被記錄
    pub fn is_fatal(&self) -> bool {
        self.severity() >= ErrorSeverity::High
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } | Self::MissingConfigError { .. } => {
                "Set GOOGLE_CREDENTIALS_PATH or GOOGLE_CREDENTIALS_JSON to a valid client secret document"
            }
            Self::InvalidConfigValueError { .. } => "Fix the reported configuration value and restart",
            Self::AuthorizationDeniedError { .. } => {
                "Open the authorization URL again and grant the gmail.send permission"
            }
            Self::AuthorizationTimeoutError { .. } => {
                "Restart the service and complete the browser authorization within the timeout"
            }
            Self::TokenExchangeError { .. } => {
                "Check the client secret and token endpoint, then authorize again"
            }
            Self::InvalidRecipientError { .. } => "Correct the userEmail field of the booking event",
            Self::DispatchError { .. } | Self::HttpError(_) => {
                "Check network connectivity and the mail API quota"
            }
            Self::IoError(_) => "Check file paths and permissions",
            Self::SerializationError(_) => "Check that the JSON documents are well-formed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Authorization => format!("Could not authorize the mail client: {}", self),
            ErrorCategory::Recipient => format!("Rejected recipient: {}", self),
            ErrorCategory::Transport => format!("Mail service unavailable: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors_are_fatal() {
        assert!(NotifierError::config("missing").is_fatal());
        assert!(NotifierError::AuthorizationTimeoutError {
            timeout: Duration::from_secs(300),
        }
        .is_fatal());
        assert!(NotifierError::AuthorizationDeniedError {
            reason: "no code".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_sub_second_timeout_message() {
        let error = NotifierError::AuthorizationTimeoutError {
            timeout: Duration::from_millis(200),
        };
        assert_eq!(error.to_string(), "Authorization timed out after 200ms");
    }

    #[test]
    fn test_per_message_errors_are_recoverable() {
        let invalid = NotifierError::InvalidRecipientError {
            address: "nope".to_string(),
        };
        assert!(!invalid.is_fatal());
        assert_eq!(invalid.severity(), ErrorSeverity::Low);

        let dispatch = NotifierError::dispatch(NotifierError::TokenExchangeError {
            message: "refresh failed".to_string(),
        });
        assert!(!dispatch.is_fatal());
        assert_eq!(dispatch.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_dispatch_does_not_double_wrap() {
        let inner = NotifierError::DispatchError {
            message: "503".to_string(),
            source: None,
        };
        match NotifierError::dispatch(inner) {
            NotifierError::DispatchError { message, source } => {
                assert_eq!(message, "503");
                assert!(source.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
