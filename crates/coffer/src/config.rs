//! Configuration management for the Coffer CLI.
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Command-line arguments
//! 2. Environment variables (COFFER_*)
//! 3. Config file (~/.config/coffer/config.toml)
//! 4. Default values

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use coffer_core::DEFAULT_ITEMS_FILE;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Storage root; the working directory when unset.
    #[serde(default)]
    pub storage_root: Option<PathBuf>,

    /// Name of the item mapping document inside the storage root.
    #[serde(default = "default_items_file")]
    pub items_file: String,

    /// Fail item requests when the mapping document is corrupt.
    #[serde(default)]
    pub strict_items: bool,

    /// Enable permissive CORS.
    #[serde(default)]
    pub cors: bool,

    /// Upload size limit in bytes.
    #[serde(default)]
    pub max_upload_bytes: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_items_file() -> String {
    DEFAULT_ITEMS_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage_root: None,
            items_file: default_items_file(),
            strict_items: false,
            cors: false,
            max_upload_bytes: None,
        }
    }
}

impl Config {
    /// Loads configuration from all sources.
    ///
    /// Reports configuration errors on stderr and falls back to defaults.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        match Self::from_figment(Self::figment(Toml::file(&config_path))) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("\x1b[33mWarning:\x1b[0m Configuration error, using defaults");
                eprintln!("  Config file: {}", config_path.display());
                eprintln!("  Error: {}", e);
                eprintln!();
                Config::default()
            },
        }
    }

    fn figment(file: impl figment::Provider) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed("COFFER_"))
    }

    fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract::<Config>()
    }

    /// Returns the path to the config file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coffer")
            .join("config.toml")
    }
}

/// Prints the current configuration and its sources.
pub fn show_config() {
    let config = Config::load();
    let config_path = Config::config_path();

    println!("Coffer Configuration");
    println!("====================\n");

    println!("Config file: {}", config_path.display());
    if config_path.exists() {
        println!("Status: Found\n");
    } else {
        println!("Status: Not found (using defaults)\n");
    }

    match toml::to_string_pretty(&config) {
        Ok(rendered) => println!("Current settings:\n{}", rendered),
        Err(e) => eprintln!("Failed to render configuration: {}", e),
    }

    println!("Environment variables:");
    for key in [
        "HOST",
        "PORT",
        "STORAGE_ROOT",
        "ITEMS_FILE",
        "STRICT_ITEMS",
        "CORS",
        "MAX_UPLOAD_BYTES",
    ] {
        println!("  COFFER_{key}");
    }
}
