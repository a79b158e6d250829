use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported model providers for command resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash-exp",
            Provider::OpenAI => "gpt-4o",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    /// Overrides the provider's default endpoint.
    pub llm_base_url: Option<String>,
    pub llm_timeout: Duration,
    pub completion_delay: Duration,
    pub voice_guidance: bool,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64_var(name: &str, default: u64) -> Result<u64, ConfigError> {
    match non_empty_var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of gemini, openai", other),
                ));
            }
        };

        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        let gemini_api_key = non_empty_var("GEMINI_API_KEY");

        let chat_model =
            non_empty_var("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let llm_base_url = non_empty_var("LLM_BASE_URL");

        let llm_timeout = Duration::from_secs(parse_u64_var("LLM_TIMEOUT_SECS", 60)?);
        let completion_delay = Duration::from_millis(parse_u64_var("COMPLETION_DELAY_MS", 2000)?);

        let voice_guidance = match non_empty_var("VOICE_GUIDANCE") {
            None => true,
            Some(raw) => raw.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "VOICE_GUIDANCE".to_string(),
                    format!("'{}' is not true or false", raw),
                )
            })?,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            llm_base_url,
            llm_timeout,
            completion_delay,
            voice_guidance,
            log_level,
            prompts_path,
        })
    }

    /// The credential for the selected provider, if one is configured.
    ///
    /// Without one the service runs on rule-based steps only.
    pub fn credential(&self) -> Option<&str> {
        match self.provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("CHAT_MODEL");
            env::remove_var("LLM_BASE_URL");
            env::remove_var("LLM_TIMEOUT_SECS");
            env::remove_var("COMPLETION_DELAY_MS");
            env::remove_var("VOICE_GUIDANCE");
            env::remove_var("RUST_LOG");
            env::remove_var("PROMPTS_PATH");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.chat_model, "gemini-2.0-flash-exp");
        assert_eq!(config.llm_base_url, None);
        assert_eq!(config.llm_timeout, Duration::from_secs(60));
        assert_eq!(config.completion_delay, Duration::from_millis(2000));
        assert!(config.voice_guidance);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.prompts_path, PathBuf::from("./prompts"));
        assert_eq!(config.credential(), None);
    }

    #[test]
    #[serial]
    fn test_config_openai_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "OpenAI");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.credential(), Some("test-openai-key"));
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("GEMINI_API_KEY", "custom-gemini-key");
            env::set_var("CHAT_MODEL", "gemini-1.5-pro");
            env::set_var("LLM_BASE_URL", "http://localhost:9999");
            env::set_var("LLM_TIMEOUT_SECS", "5");
            env::set_var("COMPLETION_DELAY_MS", "250");
            env::set_var("VOICE_GUIDANCE", "false");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.credential(), Some("custom-gemini-key"));
        assert_eq!(config.chat_model, "gemini-1.5-pro");
        assert_eq!(config.llm_base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(config.llm_timeout, Duration::from_secs(5));
        assert_eq!(config.completion_delay, Duration::from_millis(250));
        assert!(!config.voice_guidance);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.prompts_path, PathBuf::from("/custom/prompts"));
    }

    #[test]
    #[serial]
    fn test_config_blank_key_is_missing() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "   ");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.credential(), None);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_unknown_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "anthropic");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, msg) => {
                assert_eq!(var, "LLM_PROVIDER");
                assert!(msg.contains("anthropic"));
            }
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_numbers() {
        clear_env_vars();
        unsafe {
            env::set_var("COMPLETION_DELAY_MS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "COMPLETION_DELAY_MS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
        }
    }
}
