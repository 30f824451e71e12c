use crate::domain::error::{AppError, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-wide configuration, read once at startup and injected into each
/// component. Sources, lowest to highest precedence: built-in defaults,
/// `claims.toml`, `APP_`-prefixed environment variables (nested fields use
/// `__`, e.g. `APP_LLM__API_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Where request staging directories are created; system temp when unset.
    pub staging_root: Option<PathBuf>,
    pub llm: LlmSettings,
    pub storage: StorageSettings,
    pub smtp: SmtpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub bucket: String,
    pub access_token: Option<String>,
    /// Base URL for retrieval links when it differs from the upload endpoint.
    pub public_base_url: Option<String>,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub enabled: bool,
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            staging_root: None,
            llm: LlmSettings::default(),
            storage: StorageSettings::default(),
            smtp: SmtpSettings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: Some(1024),
            temperature: Some(0.2),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            bucket: "reimbursements".to_string(),
            access_token: None,
            public_base_url: None,
            root: "claims".to_string(),
        }
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("claims.toml"))
            .merge(Env::prefixed("APP_").split("__"))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_delivery_strategies_disabled() {
        let settings = Settings::default();
        assert!(!settings.storage.enabled);
        assert!(!settings.smtp.enabled);
        assert_eq!(settings.port, 8000);
    }
}
