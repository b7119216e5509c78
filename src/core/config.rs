use crate::core::reconcile::PairingMode;
use crate::providers::jisdor::RowSelection;
use crate::scheduler::ScheduleConfig;
use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_CONNECTION: &str = "default";
const DATABASE_FILE: &str = "kurs_emas.db";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RateSourceConfig {
    pub url: String,
    pub container_id: String,
    pub header_rows: usize,
    pub selection: RowSelection,
}

impl Default for RateSourceConfig {
    fn default() -> Self {
        RateSourceConfig {
            url: "https://www.bi.go.id/id/statistik/informasi-kurs/jisdor/default.aspx"
                .to_string(),
            container_id: "tableData".to_string(),
            header_rows: 1,
            selection: RowSelection::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GoldSourceConfig {
    pub url: String,
    pub product_type: String,
}

impl Default for GoldSourceConfig {
    fn default() -> Self {
        GoldSourceConfig {
            url: "https://logam-mulia-api.vercel.app/prices/indogold".to_string(),
            product_type: "antam".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub rate: RateSourceConfig,
    pub gold: GoldSourceConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: 30,
            user_agent: format!("kurs-emas/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }
}

/// A named relational connection.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionProfile {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub pairing: PairingMode,
    /// Time zone used to stamp "today" on gold observations
    pub utc_offset: String,
    pub schedule: ScheduleConfig,
    pub http: HttpConfig,
    /// Name of the profile in `connections` the sink writes to
    pub connection: String,
    pub connections: HashMap<String, ConnectionProfile>,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sources: SourcesConfig::default(),
            pairing: PairingMode::default(),
            utc_offset: "+07:00".to_string(),
            schedule: ScheduleConfig::default(),
            http: HttpConfig::default(),
            connection: DEFAULT_CONNECTION.to_string(),
            connections: HashMap::new(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("id", "kurs-emas", "kurs-emas")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("id", "kurs-emas", "kurs-emas")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset
            .parse::<FixedOffset>()
            .map_err(|e| anyhow!("Invalid utc_offset '{}': {}", self.utc_offset, e))
    }

    /// Resolves the configured connection profile to a database path.
    ///
    /// The `default` profile falls back to a file in the data directory when it
    /// is not listed explicitly.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(profile) = self.connections.get(&self.connection) {
            return Ok(profile.path.clone());
        }
        if self.connection == DEFAULT_CONNECTION {
            return Ok(self.default_data_path()?.join(DATABASE_FILE));
        }
        Err(anyhow!(
            "Connection profile '{}' is not defined",
            self.connection
        ))
    }
}
