use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::backend::{AuthConfig, BackendConfig, MAX_REFRESH_MARGIN_SECS};
use super::logging::LoggingConfig;
use crate::errors::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: where the backend lives, auth behaviour and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The layered configuration sources, lowest precedence first:
/// built-in version tag, `./config.yaml`, `SUPABASE_URL`/`SUPABASE_ANON_KEY`,
/// then `FORMCOACH_*` variables with `__` as the nesting separator.
pub fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Yaml::file("config.yaml"))
        .merge(
            Env::prefixed("SUPABASE_")
                .only(&["url", "anon_key"])
                .map(|key| format!("backend.{}", key).into()),
        )
        .merge(Env::prefixed("FORMCOACH_").split("__"))
}

/// Load the configuration from the default sources.
pub fn load_config() -> Result<ConfigV1, ConfigError> {
    load_config_from(figment())
}

/// Extract and validate a configuration from the given figment.
pub fn load_config_from(figment: Figment) -> Result<ConfigV1, ConfigError> {
    let config = match figment.extract::<Config>()? {
        Config::ConfigV1(c) => c,
    };
    // handle configuration migration between versions here when necessary
    config.validate()?;
    Ok(config)
}

impl ConfigV1 {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing("backend.url"));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("backend.anon_key"));
        }
        reqwest::Url::parse(&self.backend.url).map_err(|e| ConfigError::Invalid {
            key: "backend.url",
            reason: e.to_string(),
        })?;

        let level = self.logging.level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid {
                key: "logging.level",
                reason: format!(
                    "'{}' is not one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.auth.timeout_in_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "auth.timeout_in_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.auth.refresh_margin().is_none() {
            return Err(ConfigError::Invalid {
                key: "auth.refresh_margin_secs",
                reason: format!(
                    "{} is outside 0..={}",
                    self.auth.refresh_margin_secs, MAX_REFRESH_MARGIN_SECS
                ),
            });
        }
        Ok(())
    }
}

/// The JSON schema for the configuration, pretty-printed.
pub fn config_schema() -> String {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
