//! Configuration management for hangul-cloud
//!
//! Handles loading and parsing of the `hangul-cloud.toml` configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Font asset settings
    #[serde(default)]
    pub font: FontConfig,

    /// Word-cloud canvas and layout settings
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Additional stop words
    #[serde(default)]
    pub stopwords: StopWordsConfig,

    /// Web dashboard settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Font asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Local path of the font file
    #[serde(default = "default_font_path")]
    pub path: PathBuf,

    /// Where to fetch the font from when `path` does not exist
    #[serde(default = "default_font_url")]
    pub url: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: default_font_path(),
            url: default_font_url(),
        }
    }
}

/// Canvas and layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_canvas_size")]
    pub width: u32,

    #[serde(default = "default_canvas_size")]
    pub height: u32,

    /// Background color as RGB
    #[serde(default = "default_background")]
    pub background: [u8; 3],

    /// Maximum number of distinct words placed
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    #[serde(default = "default_min_font_size")]
    pub min_font_size: u32,

    /// Upper bound for the largest word; the canvas height when unset
    #[serde(default)]
    pub max_font_size: Option<u32>,

    /// Shrink step when a word does not fit
    #[serde(default = "default_font_step")]
    pub font_step: u32,

    /// Probability of placing a word horizontally
    #[serde(default = "default_prefer_horizontal")]
    pub prefer_horizontal: f32,

    /// How strongly frequency differences translate to size differences (0.0 - 1.0)
    #[serde(default = "default_relative_scaling")]
    pub relative_scaling: f32,

    /// Free pixels kept around each word
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Seed for orientation and color choices
    #[serde(default)]
    pub random_seed: u64,

    /// Edge length of the image shown in the dashboard
    #[serde(default = "default_display_size")]
    pub display_size: u32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_size(),
            height: default_canvas_size(),
            background: default_background(),
            max_words: default_max_words(),
            min_font_size: default_min_font_size(),
            max_font_size: None,
            font_step: default_font_step(),
            prefer_horizontal: default_prefer_horizontal(),
            relative_scaling: default_relative_scaling(),
            margin: default_margin(),
            random_seed: 0,
            display_size: default_display_size(),
        }
    }
}

/// Stop-word configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StopWordsConfig {
    /// Words excluded in addition to the built-in sets
    #[serde(default)]
    pub extra: Vec<String>,
}

/// Web dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_font_path() -> PathBuf {
    PathBuf::from("NanumGothic.ttf")
}

fn default_font_url() -> String {
    "https://github.com/google/fonts/raw/main/ofl/nanumgothic/NanumGothic-Regular.ttf".to_string()
}

fn default_canvas_size() -> u32 {
    800
}

fn default_background() -> [u8; 3] {
    [255, 255, 255]
}

fn default_max_words() -> usize {
    200
}

fn default_min_font_size() -> u32 {
    4
}

fn default_font_step() -> u32 {
    1
}

fn default_prefer_horizontal() -> f32 {
    0.9
}

fn default_relative_scaling() -> f32 {
    0.5
}

fn default_margin() -> u32 {
    2
}

fn default_display_size() -> u32 {
    1000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hangul-cloud")
            .map(|dirs| dirs.config_dir().join("hangul-cloud.toml"))
    }

    /// Load configuration from the working directory or the user config directory
    pub fn load_from_default() -> Self {
        let workspace_path = PathBuf::from("hangul-cloud.toml");
        if workspace_path.exists() {
            match Self::load(&workspace_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {:#}", workspace_path.display(), e),
            }
        }

        if let Some(default_path) = Self::default_path() {
            if let Ok(config) = Self::load(&default_path) {
                return config;
            }
        }

        Config::default()
    }
}
