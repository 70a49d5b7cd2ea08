use crate::config::NotifierConfig;
use crate::utils::error::{NotifierError, Result};
use regex::Regex;
use std::path::Path;

impl NotifierConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            NotifierError::config(format!(
                "unable to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| NotifierError::config(format!("TOML parsing error: {}", e)))
    }
}

/// 替換環境變數 (例如 ${GOOGLE_TOKEN_PATH})；未設定的變數保持原樣
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| NotifierError::config(format!("invalid substitution pattern: {}", e)))?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialMode;
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[credentials]
mode = "file"
credentials_path = "./secrets/credentials.json"
token_path = "./secrets/token.json"

[authorization]
callback_addr = "127.0.0.1:9090"
timeout_seconds = 60

[mail]
from = "bookings@example.com"

[consumer]
queue_name = "custom_queue"
input = "./events.jsonl"
"#;

        let config = NotifierConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.credentials.effective_mode(), CredentialMode::File);
        assert_eq!(
            config.credentials.token_path.as_deref(),
            Some("./secrets/token.json")
        );
        assert_eq!(config.authorization.timeout_seconds, 60);
        assert_eq!(config.mail.from, "bookings@example.com");
        assert_eq!(config.mail.api_base, "https://gmail.googleapis.com");
        assert_eq!(config.consumer.queue_name, "custom_queue");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = NotifierConfig::from_toml_str("").unwrap();
        assert_eq!(config.authorization.callback_addr, "127.0.0.1:8085");
        assert_eq!(config.consumer.input, "-");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("NOTIFIER_TEST_TOKEN_PATH", "/tmp/notifier-token.json");

        let toml_content = r#"
[credentials]
credentials_path = "./credentials.json"
token_path = "${NOTIFIER_TEST_TOKEN_PATH}"
"#;

        let config = NotifierConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.credentials.token_path.as_deref(),
            Some("/tmp/notifier-token.json")
        );

        std::env::remove_var("NOTIFIER_TEST_TOKEN_PATH");
    }

    #[test]
    fn test_unknown_env_var_is_kept() {
        let result = substitute_env_vars("value = \"${NOTIFIER_TEST_DOES_NOT_EXIST}\"").unwrap();
        assert_eq!(result, "value = \"${NOTIFIER_TEST_DOES_NOT_EXIST}\"");
    }

    #[test]
    fn test_invalid_mode_is_config_error() {
        let result = NotifierConfig::from_toml_str("[credentials]\nmode = \"vault\"\n");
        assert!(matches!(result, Err(NotifierError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[credentials]\nmode = \"inline\"\ncredentials_json = '{\"installed\":{}}'\n")
            .unwrap();

        let config = NotifierConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.credentials.effective_mode(), CredentialMode::Inline);
    }
}
