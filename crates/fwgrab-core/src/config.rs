use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Config values that are well-formed TOML but unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid catalog.section_selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("invalid catalog.base_url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Where the catalog HTML comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlSource {
    /// Pre-saved catalog page on disk.
    LocalFile(PathBuf),
    /// Catalog page fetched with a single HTTP GET.
    RemoteUrl(String),
}

/// Inputs for one run: the catalog source and the directory tree to fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source: HtmlSource,
    pub destination_root: PathBuf,
}

/// libcurl transfer settings shared by the catalog fetch and firmware downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Upper bound for one whole transfer.
    pub timeout_secs: u64,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            max_redirects: 10,
            user_agent: format!("fwgrab/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }
}

/// How the catalog page is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// CSS selector for section labels placed outside the tables (headings, spans, ...).
    pub section_selector: String,
    /// Known section labels. A `<span>` outside the tables whose whole text is
    /// one of these marks a section, as on the PS3 firmware list page.
    pub section_names: Vec<String>,
    /// Base for relative links when the page was loaded from a local file.
    pub base_url: Option<String>,
}

pub const DEFAULT_SECTION_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, [data-section]";

pub const DEFAULT_SECTION_NAMES: [&str; 4] = [
    "Retail Firmwares",
    "Testkit Firmwares",
    "PS3 GEX FW",
    "DECR Firmware",
];

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            section_selector: DEFAULT_SECTION_SELECTOR.to_string(),
            section_names: DEFAULT_SECTION_NAMES.iter().map(|s| s.to_string()).collect(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Pause between consecutive downloads, in seconds (0 disables it).
    pub delay_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { delay_secs: 5 }
    }
}

impl FetchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Global configuration loaded from `~/.config/fwgrab/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FwgrabConfig {
    pub http: HttpConfig,
    pub catalog: CatalogConfig,
    pub fetch: FetchConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fwgrab")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FwgrabConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FwgrabConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FwgrabConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
