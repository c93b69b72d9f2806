//! Configuration management for Pixcrawl.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default endpoint for the image search API.
pub const DEFAULT_BASE_URL: &str = "https://pixabay.com/api/";

/// Default number of results requested per page.
pub const DEFAULT_PER_PAGE: u32 = 200;

/// Default target image count per parameter combination.
pub const DEFAULT_NUM_IMAGES: u32 = 600;

/// Default images subdirectory name.
const IMAGES_SUBDIR: &str = "images";

/// Default filename for the raw metadata table.
const METADATA_FILENAME: &str = "metadata.csv";

/// Default filename for the engineered dataset.
const DATASET_FILENAME: &str = "dataset.csv";

/// Default filename for the cleaning report sink.
const STATISTICS_FILENAME: &str = "statistics.txt";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Directory for downloaded image assets.
    pub image_dir: PathBuf,
    /// API key for the search endpoint.
    pub api_key: Option<String>,
    /// Base URL of the search endpoint.
    pub base_url: String,
    /// Results requested per page.
    pub per_page: u32,
    /// Target image count per parameter combination.
    pub num_images: u32,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Base delay between API requests in milliseconds.
    pub request_delay_ms: u64,
    /// Bounded retry count for transient network failures.
    pub max_retries: u32,
    /// Default number of asset download workers.
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/pixcrawl/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pixcrawl");

        Self {
            image_dir: data_dir.join(IMAGES_SUBDIR),
            data_dir,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            num_images: DEFAULT_NUM_IMAGES,
            request_timeout: 30,
            request_delay_ms: 500,
            max_retries: 3,
            workers: 4,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            image_dir: data_dir.join(IMAGES_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Path of the persisted raw metadata table.
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILENAME)
    }

    /// Path of the engineered dataset table.
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILENAME)
    }

    /// Path of the append-only cleaning report.
    pub fn statistics_path(&self) -> PathBuf {
        self.data_dir.join(STATISTICS_FILENAME)
    }

    /// Get the API key, failing fast when it is not configured.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no API key configured; pass --api-key, set PIXCRAWL_API_KEY, \
                     or add api_key to the config file"
                )
            })
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })?;
        fs::create_dir_all(&self.image_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create image directory '{}': {}",
                    self.image_dir.display(),
                    e
                ),
            )
        })?;
        Ok(())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Image directory path (defaults to `{data_dir}/images`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<String>,
    /// API key for the search endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the search endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Results requested per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    /// Target image count per parameter combination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_images: Option<u32>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Delay between requests in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    /// Bounded retry count for transient network failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Default number of asset download workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    /// Supports TOML, YAML, and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let mut config: Config = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            "json" => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
            _ => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.image_dir = settings.data_dir.join(IMAGES_SUBDIR);
        }
        if let Some(ref image_dir) = self.image_dir {
            settings.image_dir = self.resolve_path(image_dir, base_dir);
        }
        if let Some(ref api_key) = self.api_key {
            settings.api_key = Some(api_key.clone());
        }
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(per_page) = self.per_page {
            settings.per_page = per_page;
        }
        if let Some(num_images) = self.num_images {
            settings.num_images = num_images;
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override (--data-dir flag).
    pub data_dir: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Look for a config file in a directory.
/// Checks for pixcrawl.{ext} and config.{ext} for supported formats.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "yaml", "yml", "json"];
    let basenames = ["pixcrawl", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Load config from the appropriate source based on options.
async fn load_config_from_sources(options: &LoadOptions) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_default();
    }

    // Priority 2: Config next to the data directory
    if let Some(ref data_dir) = options.data_dir {
        if let Some(config_path) = find_config_in_dir(data_dir) {
            tracing::debug!("Found config next to data dir: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_default();
        }
    }

    // Priority 3: Config in the current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(config_path) = find_config_in_dir(&cwd) {
            tracing::debug!("Found config in CWD: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_default();
        }
    }

    Config::default()
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_config_from_sources(&options).await;

    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data-dir override takes precedence for data_dir and image_dir
    if let Some(ref data_dir) = options.data_dir {
        settings.data_dir = data_dir.clone();
        settings.image_dir = settings.data_dir.join(IMAGES_SUBDIR);
    }

    // PIXCRAWL_API_KEY environment variable takes precedence over config
    if let Some(key) = std::env::var("PIXCRAWL_API_KEY")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!("Using API key from environment");
        settings.api_key = Some(key);
    }

    (settings, config)
}
