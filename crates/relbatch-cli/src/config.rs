use std::path::Path;
use std::time::Duration;

use relbatch_client::{BatchOptions, ClientOptions, DEFAULT_MAX_TUPLES_PER_CHUNK, WriteTarget};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub target: TargetConfig,
    pub batch: BatchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub store_id: Option<String>,
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_parallel_requests: usize,
    pub max_tuples_per_chunk: usize,
    pub max_retries: u32,
    pub retry_delay_seconds: f64,
    pub rate_limit_delay_seconds: f64,
    pub stop_on_first_error: bool,
    pub transactional: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8081".to_string(),
            api_key: None,
            timeout_seconds: 30,
            connect_timeout_seconds: 5,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel_requests: 1,
            max_tuples_per_chunk: DEFAULT_MAX_TUPLES_PER_CHUNK,
            max_retries: 3,
            retry_delay_seconds: 1.0,
            rate_limit_delay_seconds: 5.0,
            stop_on_first_error: false,
            transactional: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RELBATCH_ENDPOINT") {
            self.client.endpoint = v;
        }
        if let Ok(v) = std::env::var("RELBATCH_API_KEY") {
            self.client.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("RELBATCH_STORE_ID") {
            self.target.store_id = Some(v);
        }
        if let Ok(v) = std::env::var("RELBATCH_MODEL_ID") {
            self.target.model_id = Some(v);
        }
        if let Ok(v) = std::env::var("RELBATCH_MAX_PARALLEL_REQUESTS")
            && let Ok(n) = v.parse()
        {
            self.batch.max_parallel_requests = n;
        }
        if let Ok(v) = std::env::var("RELBATCH_MAX_TUPLES_PER_CHUNK")
            && let Ok(n) = v.parse()
        {
            self.batch.max_tuples_per_chunk = n;
        }
        if let Ok(v) = std::env::var("RELBATCH_MAX_RETRIES")
            && let Ok(n) = v.parse()
        {
            self.batch.max_retries = n;
        }
        if let Ok(v) = std::env::var("RELBATCH_RETRY_DELAY_SECONDS")
            && let Ok(n) = v.parse()
        {
            self.batch.retry_delay_seconds = n;
        }
        if let Ok(v) = std::env::var("RELBATCH_STOP_ON_FIRST_ERROR")
            && let Ok(b) = v.parse()
        {
            self.batch.stop_on_first_error = b;
        }
        if let Ok(v) = std::env::var("RELBATCH_TRANSACTIONAL")
            && let Ok(b) = v.parse()
        {
            self.batch.transactional = b;
        }
        if let Ok(v) = std::env::var("RELBATCH_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("RELBATCH_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                _ => {}
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.client.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "client.endpoint must not be empty".to_string(),
            ));
        }
        if !self.batch.rate_limit_delay_seconds.is_finite()
            || self.batch.rate_limit_delay_seconds < 0.0
        {
            return Err(ConfigError::Validation(
                "batch.rate_limit_delay_seconds must be a non-negative number".to_string(),
            ));
        }
        self.batch_options()
            .validate()
            .map_err(|e| ConfigError::Validation(format!("batch: {e}")))?;
        Ok(())
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_parallel_requests: self.batch.max_parallel_requests,
            max_tuples_per_chunk: self.batch.max_tuples_per_chunk,
            max_retries: self.batch.max_retries,
            retry_delay_seconds: self.batch.retry_delay_seconds,
            rate_limit_delay: Duration::try_from_secs_f64(self.batch.rate_limit_delay_seconds)
                .unwrap_or_default(),
            stop_on_first_error: self.batch.stop_on_first_error,
            transactional: self.batch.transactional,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_key: self.client.api_key.clone(),
            timeout: Duration::from_secs(self.client.timeout_seconds),
            connect_timeout: Duration::from_secs(self.client.connect_timeout_seconds),
        }
    }

    /// Resolves the write target, preferring explicit overrides to configured values.
    pub fn write_target(
        &self,
        store_id: Option<&str>,
        model_id: Option<&str>,
    ) -> Result<WriteTarget, ConfigError> {
        let store_id = store_id
            .or(self.target.store_id.as_deref())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "a store id is required (--store-id, target.store_id or RELBATCH_STORE_ID)"
                        .to_string(),
                )
            })?;

        let target = WriteTarget::new(store_id);
        Ok(match model_id.or(self.target.model_id.as_deref()) {
            Some(model) => target.with_model(model),
            None => target,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse TOML config: {0}")]
    ParseToml(String),

    #[error("config validation failed: {0}")]
    Validation(String),
}
