use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

use crate::error::EtlError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Safari/537.36"
                .to_string(),
            request_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub bbc_base_url: String,
    pub worldfootball_base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            bbc_base_url: "https://www.bbc.com".to_string(),
            worldfootball_base_url: "https://www.worldfootball.net".to_string(),
        }
    }
}

impl SourceConfig {
    /// Points both sites at the same base URL, e.g. a local mock server.
    pub fn single(base_url: &str) -> Self {
        Self {
            bbc_base_url: base_url.to_string(),
            worldfootball_base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub connection_string: Option<String>,
    pub container: String,
    pub prefix: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            container: "premier-league".to_string(),
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LoadMode {
    #[default]
    Replace,
    Append,
}

impl FromStr for LoadMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(LoadMode::Replace),
            "append" => Ok(LoadMode::Append),
            other => Err(EtlError::Config(format!(
                "Invalid load mode '{}'. Expected 'replace' or 'append'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub load_mode: LoadMode,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            load_mode: LoadMode::Replace,
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EtlConfig {
    pub scraping: ScrapingConfig,
    pub sources: SourceConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
}

impl EtlConfig {
    pub fn from_env() -> Result<Self, EtlError> {
        let mut config = Self::default();

        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Some(timeout) = parse_var::<u64>("SCRAPER_TIMEOUT_SECS")? {
            config.scraping.request_timeout_secs = timeout;
        }
        if let Ok(url) = env::var("BBC_BASE_URL") {
            config.sources.bbc_base_url = url;
        }
        if let Ok(url) = env::var("WORLDFOOTBALL_BASE_URL") {
            config.sources.worldfootball_base_url = url;
        }

        config.storage.connection_string = env::var("AZURE_STORAGE_CONNECTION_STRING").ok();
        if let Ok(container) = env::var("AZURE_STORAGE_CONTAINER") {
            config.storage.container = container;
        }
        config.storage.prefix = env::var("BLOB_PREFIX").ok().filter(|p| !p.is_empty());

        config.database.url = env::var("AZURE_POSTGRES_CONNECTION_STRING")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok();
        if let Some(mode) = parse_var::<LoadMode>("DB_LOAD_MODE")? {
            config.database.load_mode = mode;
        }
        if let Some(max) = parse_var::<u32>("DB_MAX_CONNECTIONS")? {
            config.database.max_connections = max;
        }
        if let Some(timeout) = parse_var::<u64>("DB_CONNECT_TIMEOUT_SECS")? {
            config.database.connect_timeout_secs = timeout;
        }

        Ok(config)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>, EtlError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| EtlError::Config(format!("{}={}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
