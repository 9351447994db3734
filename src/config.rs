use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "dispatch";
const ENV_PREFIX: &str = "DISPATCH";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub uri: String,
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Mongo,
            uri: "mongodb://localhost:27017".to_string(),
            database: "campaign_dispatch".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub auto_advance_delay_ms: u64,
    pub default_country_code: String,
    pub handoff_log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay_ms: 3000,
            default_country_code: "39".to_string(),
            handoff_log_capacity: 50,
        }
    }
}

impl DispatchConfig {
    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Loads `dispatch.{toml,yaml,json}` from the working directory if present,
    /// then applies `DISPATCH_` environment variables on top, with `__`
    /// separating nested keys (`DISPATCH_STORAGE__BACKEND=memory`).
    pub fn load() -> Result<AppConfig, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        AppConfig::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
