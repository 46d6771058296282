use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub source: DatabaseConfig,
    pub warehouse: DatabaseConfig,
    #[serde(default)]
    pub etl: EtlConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// How a loader writes its target table.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Insert-or-update per chunk, committing after every chunk.
    ChunkedUpsert,
    /// Truncate, then COPY every chunk inside one transaction.
    #[default]
    BulkCopy,
}

impl LoadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::ChunkedUpsert => "chunked_upsert",
            LoadStrategy::BulkCopy => "bulk_copy",
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoadStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "chunked_upsert" | "upsert" => Ok(LoadStrategy::ChunkedUpsert),
            "bulk_copy" | "copy" => Ok(LoadStrategy::BulkCopy),
            other => Err(Error::InvalidInput(format!("unknown load strategy '{}'", other))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EtlConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub strategy: LoadStrategy,
    #[serde(default = "default_true")]
    pub rebuild_indexes: bool,
    #[serde(default)]
    pub halt_on_failure: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            strategy: LoadStrategy::default(),
            rebuild_indexes: true,
            halt_on_failure: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            max_page_size: default_max_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_batch_size() -> usize {
    5000
}

fn default_true() -> bool {
    true
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    4000
}

fn default_max_page_size() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info,sqlx=warn".to_string()
}

impl Settings {
    /// Layers the optional config file, `APP__*` variables and the
    /// `DATABASE_SOURCE_URL` / `DATABASE_WAREHOUSE_URL` overrides.
    pub fn new(path: &str) -> Result<Self> {
        // a missing .env is fine
        let _ = dotenvy::dotenv();

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("source.url", std::env::var("DATABASE_SOURCE_URL").ok())?
            .set_override_option(
                "warehouse.url",
                std::env::var("DATABASE_WAREHOUSE_URL").ok(),
            )?;

        Self::build(builder)
    }

    /// Parses settings from an in-memory TOML document, without environment layering.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            batch_size = settings.etl.batch_size,
            strategy = %settings.etl.strategy,
            rebuild_indexes = settings.etl.rebuild_indexes,
            "Parsed ETL settings"
        );

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.etl.batch_size == 0 {
            return Err(Error::InvalidInput("etl.batch_size must be greater than zero".into()));
        }
        if self.source.url.trim().is_empty() {
            return Err(Error::InvalidInput("source.url is empty".into()));
        }
        if self.warehouse.url.trim().is_empty() {
            return Err(Error::InvalidInput("warehouse.url is empty".into()));
        }
        Ok(())
    }
}
