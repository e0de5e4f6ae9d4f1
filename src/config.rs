// file: src/config.rs
// description: application configuration management with toml/json support
// reference: https://docs.rs/config

use crate::error::{Result, TroviError};
use crate::scan::HashAlgorithm;
use crate::utils::validation::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable pointing at the folder holding `config.toml`.
pub const CONFIG_ENV: &str = "TROVI_CONF";
pub const CONFIG_FILENAME: &str = "config.toml";
pub const SETTINGS_FOLDER: &str = ".trovi";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hash: HashAlgorithm,
    #[serde(default)]
    pub index: Vec<IndexSpec>,
    #[serde(default)]
    pub exclude: ExclusionRules,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// One indexed root and the absolute paths excluded beneath it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSpec {
    pub folder: PathBuf,
    #[serde(default)]
    pub exclude: Vec<PathBuf>,
}

impl IndexSpec {
    /// Resolve the folder and excluded paths against the working directory.
    pub fn absolutize(&mut self) -> Result<()> {
        self.folder = absolute(&self.folder)?;
        for path in &mut self.exclude {
            *path = absolute(path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExclusionRules {
    #[serde(default)]
    pub extension: Vec<String>,
    #[serde(default)]
    pub folder: Vec<String>,
    /// Maximum file size in bytes; 0 disables the limit.
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub index: String,
    pub pipeline: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub page_size: usize,
    pub scroll_keep_alive: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 9200,
            index: "trovi".to_string(),
            pipeline: "attachment".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_ms: 250,
            page_size: 100,
            scroll_keep_alive: "1m".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub jobs: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { jobs: 32 }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        match path.map(Path::to_path_buf).or_else(Self::locate) {
            Some(path) => {
                debug!("Reading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path));
            }
            None => warn!("No configuration file found, using built-in defaults"),
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TROVI")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| TroviError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| TroviError::Config(e.to_string()))?;

        config.exclude.extension = config
            .exclude
            .extension
            .iter()
            .map(|ext| Validator::normalize_extension(ext))
            .collect();
        for spec in &mut config.index {
            spec.absolutize()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// First existing config file among `$TROVI_CONF`, `~/.trovi` and the working directory.
    pub fn locate() -> Option<PathBuf> {
        let mut candidates = Vec::new();

        match std::env::var_os(CONFIG_ENV) {
            Some(dir) => candidates.push(PathBuf::from(dir).join(CONFIG_FILENAME)),
            None => debug!("{} environment variable not set", CONFIG_ENV),
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(SETTINGS_FOLDER).join(CONFIG_FILENAME));
        }
        candidates.push(PathBuf::from(CONFIG_FILENAME));

        candidates.into_iter().find(|candidate| candidate.is_file())
    }

    /// Where `init` writes a fresh configuration.
    pub fn settings_dir() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(SETTINGS_FOLDER)))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FOLDER))
    }

    pub fn default_config() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            index: vec![IndexSpec {
                exclude: vec![home.join(SETTINGS_FOLDER)],
                folder: home,
            }],
            exclude: ExclusionRules {
                extension: [".o", ".bin", ".elf", ".zip", ".jpg", ".avi", ".mkv"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                folder: vec![".git".to_string(), ".svn".to_string()],
                size: 1_000_000,
            },
            hash: HashAlgorithm::Md5,
            backend: BackendConfig::default(),
            sync: SyncConfig::default(),
        }
    }

    /// Render as the TOML text written by `trovi init`.
    pub fn to_toml(&self) -> Result<String> {
        let body = toml::to_string_pretty(self)
            .map_err(|e| TroviError::Config(format!("Cannot render configuration: {}", e)))?;
        Ok(format!("# trovi configuration\n\n{}", body))
    }

    /// Syncing needs at least one indexed folder.
    pub fn require_folders(&self) -> Result<()> {
        if self.index.is_empty() {
            return Err(TroviError::Config(
                "No folders configured for indexing, run `trovi init` or edit the configuration"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Validator::validate_jobs(self.sync.jobs)?;
        Validator::validate_page_size(self.backend.page_size)?;
        Validator::validate_url(&self.backend.base_url())?;

        if self.backend.index.trim().is_empty() {
            return Err(TroviError::Config("backend.index must not be empty".to_string()));
        }

        for spec in &self.index {
            if let Err(e) = Validator::validate_directory(&spec.folder) {
                warn!("{}", e);
            }
        }

        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| TroviError::file(path, e))
}
