use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "testdeck.toml";
pub const ENV_PREFIX: &str = "TESTDECK_";

/// Path of every backend endpoint the client calls, relative to `api_base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    pub login: String,
    pub register: String,
    pub me: String,
    pub projects: String,
    pub test_cases: String,
    pub dashboard_stats: String,
    pub dashboard_activity: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            login: "/api/v1/auth/login".to_string(),
            register: "/api/v1/auth/register".to_string(),
            me: "/api/v1/auth/me".to_string(),
            projects: "/api/v1/projects".to_string(),
            test_cases: "/api/v1/test-cases".to_string(),
            dashboard_stats: "/api/v1/dashboard/stats".to_string(),
            dashboard_activity: "/api/v1/dashboard/activity".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
    pub keyring_service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from(".testdeck/session.json"),
            keyring_service: "testdeck".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub functions_url: Option<String>,
    pub endpoints: ApiEndpoints,
    pub storage: StorageConfig,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8001".to_string(),
            functions_url: None,
            endpoints: ApiEndpoints::default(),
            storage: StorageConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `testdeck.toml`, then `TESTDECK_*` variables (`.env` included).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_base_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid api_base_url '{}': {}", self.api_base_url, e))
        })?;
        if let Some(functions_url) = &self.functions_url {
            url::Url::parse(functions_url).map_err(|e| {
                AppError::ConfigError(format!("Invalid functions_url '{}': {}", functions_url, e))
            })?;
        }
        Ok(())
    }

    /// Base URL of the function-invocation channel.
    pub fn functions_base_url(&self) -> String {
        match &self.functions_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/functions/v1", self.api_base_url.trim_end_matches('/')),
        }
    }
}
