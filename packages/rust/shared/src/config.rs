//! Application configuration for medsource.
//!
//! User config lives at `~/.medsource/medsource.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MedSourceError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "medsource.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".medsource";

// ---------------------------------------------------------------------------
// Config structs (matching medsource.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter (OpenAI-compatible) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Web fetch settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the SQLite database holding the structured side-effect table.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Name of the structured side-effect table.
    #[serde(default = "default_table")]
    pub table: String,

    /// Maximum rows kept by the keyword fallback.
    #[serde(default = "default_row_top_k")]
    pub row_top_k: usize,

    /// Maximum documents kept by the keyword fallback.
    #[serde(default = "default_doc_top_k")]
    pub doc_top_k: usize,

    /// Maximum rows kept from a generated query.
    #[serde(default = "default_query_row_limit")]
    pub query_row_limit: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            table: default_table(),
            row_top_k: default_row_top_k(),
            doc_top_k: default_doc_top_k(),
            query_row_limit: default_query_row_limit(),
        }
    }
}

fn default_db_path() -> String {
    "DrugData/side_effects.db".into()
}
fn default_table() -> String {
    "side_effects".into()
}
fn default_row_top_k() -> usize {
    50
}
fn default_doc_top_k() -> usize {
    5
}
fn default_query_row_limit() -> usize {
    200
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for both query generation and answer generation.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4.1".into()
}
fn default_temperature() -> f32 {
    0.2
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// User-Agent sent with every fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

impl ScrapeConfig {
    /// The fetch timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    15
}
fn default_concurrency() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; MedSideEffectsBot/1.0)".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.medsource/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MedSourceError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.medsource/medsource.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MedSourceError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MedSourceError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MedSourceError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MedSourceError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MedSourceError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(MedSourceError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}
