use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::OsdrError;
use crate::metadata::{DEFAULT_API_BASE, DEFAULT_SITE_BASE};

pub const CONFIG_FILE_NAME: &str = "osdr-fetch.json";

const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub site_base_url: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub metadata_timeout_secs: Option<u64>,
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    #[serde(default)]
    pub write_manifest: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api_base_url: String,
    pub site_base_url: String,
    pub output_dir: Option<String>,
    pub metadata_timeout: Duration,
    pub download_timeout: Duration,
    pub write_manifest: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            api_base_url: DEFAULT_API_BASE.to_string(),
            site_base_url: DEFAULT_SITE_BASE.to_string(),
            output_dir: None,
            metadata_timeout: Duration::from_secs(DEFAULT_METADATA_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            write_manifest: true,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, OsdrError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::candidate_paths().into_iter().find(|p| p.exists()),
        };

        let Some(config_path) = config_path else {
            return Ok(ResolvedConfig::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| OsdrError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| OsdrError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, OsdrError> {
        let defaults = ResolvedConfig::default();

        let metadata_timeout = positive_secs(config.metadata_timeout_secs, "metadata_timeout_secs")?
            .unwrap_or(defaults.metadata_timeout);
        let download_timeout = positive_secs(config.download_timeout_secs, "download_timeout_secs")?
            .unwrap_or(defaults.download_timeout);

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            api_base_url: non_blank(config.api_base_url).unwrap_or(defaults.api_base_url),
            site_base_url: non_blank(config.site_base_url).unwrap_or(defaults.site_base_url),
            output_dir: non_blank(config.output_dir),
            metadata_timeout,
            download_timeout,
            write_manifest: config.write_manifest.unwrap_or(defaults.write_manifest),
        })
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dirs) = ProjectDirs::from("", "", "osdr-fetch") {
            paths.push(dirs.config_dir().join("config.json"));
        }
        paths
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_secs(value: Option<u64>, key: &str) -> Result<Option<Duration>, OsdrError> {
    match value {
        Some(0) => Err(OsdrError::ConfigParse(format!("{key} must be positive"))),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}
