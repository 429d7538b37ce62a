//! Application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Main application configuration.
///
/// Loaded once at startup from `~/.flashchat/config.toml`; the API
/// credential comes from the environment and wins over the file. A missing
/// credential is not an error here, it surfaces at the first send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key (GEMINI_API_KEY, legacy API_KEY, or the file).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier used for every session.
    #[serde(default = "default_model")]
    pub model: String,

    /// API endpoint base.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Flashchat home directory (config and log files).
    #[serde(skip)]
    pub home: PathBuf,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            home: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir()
            .context("Could not find home directory")?
            .join(".flashchat");
        fs::create_dir_all(&home).context("Failed to create .flashchat directory")?;

        let config_path = home.join("config.toml");
        let mut config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = home;

        // The credential is read once from the environment at startup.
        if let Ok(key) = env::var("GEMINI_API_KEY").or_else(|_| env::var("API_KEY")) {
            if !key.trim().is_empty() {
                config.api_key = Some(key);
            }
        }

        Ok(config)
    }
}
