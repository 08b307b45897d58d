// Configuration loading and parsing (portal.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::models::Language;

/// Environment variable that overrides `[api] base_url`.
pub const API_URL_ENV: &str = "WELLNESS_API_URL";

const CONFIG_FILE: &str = "portal.toml";
const STORE_FILE: &str = "session.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// portal.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Bot messages whose severity score reaches this value trigger the
    /// appointment prompt.
    #[serde(default = "default_severity_threshold")]
    pub severity_prompt_threshold: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            severity_prompt_threshold: default_severity_threshold(),
        }
    }
}

fn default_severity_threshold() -> f32 {
    7.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_speech_command")]
    pub command: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_speech_rate")]
    pub rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            enabled: true,
            command: default_speech_command(),
            language: Language::default(),
            rate: default_speech_rate(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_speech_command() -> String {
    "espeak-ng".to_string()
}

fn default_speech_rate() -> f32 {
    0.8
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Path of the session cache database. Empty selects the platform data
    /// directory.
    #[serde(default)]
    pub path: String,
}

impl Config {
    /// Resolve where the session cache database lives.
    pub fn store_path(&self) -> PathBuf {
        if !self.storage.path.trim().is_empty() {
            return PathBuf::from(self.storage.path.trim());
        }
        match directories::ProjectDirs::from("org", "wellness", "wellness-portal") {
            Some(dirs) => dirs.data_dir().join(STORE_FILE),
            None => PathBuf::from(STORE_FILE),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/portal.toml` relative to
/// `base_dir`, then apply the `WELLNESS_API_URL` override.
///
/// Does not copy defaults. Prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let mut config = parse_config(&text, &path)?;

    apply_api_url_override(&mut config, std::env::var(API_URL_ENV).ok());
    validate(&config)?;

    Ok(config)
}

/// Parse the TOML text of a portal.toml file. `path` is only used for error
/// reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Replace the configured base URL with `value` when it is non-blank.
pub fn apply_api_url_override(config: &mut Config, value: Option<String>) {
    if let Some(url) = value {
        let url = url.trim();
        if !url.is_empty() {
            config.api.base_url = url.to_string();
        }
    }
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.api.base_url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: format!("must start with http:// or https://, got {url}"),
        });
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "api.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    let threshold = config.chat.severity_prompt_threshold;
    if !(0.0..=10.0).contains(&threshold) {
        return Err(ConfigError::ValidationError {
            field: "chat.severity_prompt_threshold".into(),
            message: format!("must be between 0 and 10 inclusive, got {threshold}"),
        });
    }

    let rate = config.speech.rate;
    if rate <= 0.0 || rate > 2.0 {
        return Err(ConfigError::ValidationError {
            field: "speech.rate".into(),
            message: format!("must be in (0, 2], got {rate}"),
        });
    }

    if config.speech.enabled && config.speech.command.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "speech.command".into(),
            message: "must not be empty when speech is enabled".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
