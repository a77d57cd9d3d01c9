use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/citescope/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub openalex: OpenAlexConfig,
    pub crawl: CrawlConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub data_dir: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub base_url: String,
    /// Sent as `mailto` to get into the provider's polite pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polite_email: Option<String>,
    pub timeout_secs: u64,
    /// Minimum spacing between two requests. 1000 gives the one-request-per-second mode.
    pub request_interval_ms: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub max_depth: u32,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub key_terms: usize,
    pub include_deeper_levels: bool,
    pub output_dir: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("citescope");

        Self {
            data_dir: data_dir.to_string_lossy().to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org".to_string(),
            polite_email: None,
            timeout_secs: 10,
            request_interval_ms: 100,
            max_retries: 3,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            batch_size: 5,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            key_terms: 10,
            include_deeper_levels: false,
            output_dir: "results".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/citescope/config.toml`
    pub fn config_path() -> PathBuf {
        Self::config_path_from(std::env::var("CITESCOPE_CONFIG").ok())
    }

    /// Config path given the value of `CITESCOPE_CONFIG`, if set.
    pub fn config_path_from(override_path: Option<String>) -> PathBuf {
        if let Some(path) = override_path.filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("citescope")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn set_data_dir(&mut self, path: PathBuf) {
        self.core.data_dir = path.to_string_lossy().to_string();
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Root of the depth-partitioned record store.
    pub fn records_dir(&self) -> PathBuf {
        PathBuf::from(&self.core.data_dir).join("records")
    }

    /// Where network files are written. Relative `output_dir` values live under `data_dir`.
    pub fn results_dir(&self) -> PathBuf {
        let out = PathBuf::from(&self.network.output_dir);
        if out.is_absolute() {
            out
        } else {
            PathBuf::from(&self.core.data_dir).join(out)
        }
    }
}
