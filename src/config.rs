use serde::Deserialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config JSON in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub listen_port: u16,
    pub model_server_url: String,
    pub predict_path: String,
    pub timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_port: 5000,
            model_server_url: "http://localhost:8000".to_string(),
            predict_path: "/predict".to_string(),
            timeout_ms: 20_000,
        }
    }
}

impl RelayConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Defaults, then the `RELAY_CONFIG` file if set, then `PORT`,
    /// `MODEL_SERVER_URL` and `PREDICT_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("RELAY_CONFIG") {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        if let Some(port) = lookup("PORT") {
            cfg.listen_port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(url) = lookup("MODEL_SERVER_URL") {
            cfg.model_server_url = url;
        }
        if let Some(ms) = lookup("PREDICT_TIMEOUT_MS") {
            cfg.timeout_ms = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PREDICT_TIMEOUT_MS",
                value: ms.clone(),
            })?;
        }

        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.model_server_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "MODEL_SERVER_URL",
                value: self.model_server_url.clone(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PREDICT_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn predict_url(&self) -> String {
        format!(
            "{}{}",
            self.model_server_url.trim_end_matches('/'),
            self.predict_path
        )
    }
}
