use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

/// Store backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Bounded in-memory store (no persistence)
    #[serde(rename = "memory")]
    Memory,

    /// SQLite database file
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Samples older than this are pruned by the daily cleanup task
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./samples.db")
}

fn default_retention_days() -> u32 {
    30
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Seconds between tick starts
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Store configuration (defaults to SQLite at ./samples.db)
    pub store: Option<StoreConfig>,

    /// Query API settings (defaults to 127.0.0.1:8080)
    pub api: Option<ApiSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            store: None,
            api: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    pub bind: SocketAddr,
}

fn default_interval() -> u64 {
    15
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
