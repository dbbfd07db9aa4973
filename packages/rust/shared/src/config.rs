//! Application configuration for rankpages.
//!
//! User config lives at `~/.rankpages/rankpages.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RankPagesError, Result};
use crate::types::{PromptTemplate, default_prompts};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rankpages.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rankpages";

// ---------------------------------------------------------------------------
// Config structs (matching rankpages.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the ranking table comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where and how pages are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Chat-completions endpoint settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Retry policy for chat calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// One page section per prompt, in this order.
    #[serde(default = "default_prompts")]
    pub prompts: Vec<PromptTemplate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            output: OutputConfig::default(),
            chat: ChatConfig::default(),
            retry: RetryConfig::default(),
            prompts: default_prompts(),
        }
    }
}

/// What to do when the ranking table is missing from the fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTablePolicy {
    /// Log a warning and finish without writing anything.
    #[default]
    Skip,
    /// Abort the run with an error.
    Fail,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page holding the ranking table.
    #[serde(default = "default_source_url")]
    pub url: String,

    /// `id` attribute of the table element.
    #[serde(default = "default_table_id")]
    pub table_id: String,

    /// Leading rows to drop before generating pages.
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,

    /// Behaviour when the table is absent.
    #[serde(default)]
    pub missing_table: MissingTablePolicy,

    /// Timeout for the source page request.
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            table_id: default_table_id(),
            skip_rows: default_skip_rows(),
            missing_table: MissingTablePolicy::default(),
            timeout_secs: default_source_timeout(),
        }
    }
}

fn default_source_url() -> String {
    "https://www.tiobe.com/tiobe-index/".into()
}
fn default_table_id() -> String {
    "top20".into()
}
fn default_skip_rows() -> usize {
    17
}
fn default_source_timeout() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the generated pages (created if missing).
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Front-matter layout of record pages.
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Front-matter layout of the index page.
    #[serde(default = "default_layout")]
    pub index_layout: String,

    /// Whether to write `index.md` next to the pages.
    #[serde(default)]
    pub write_index: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            layout: default_layout(),
            index_layout: default_layout(),
            write_index: false,
        }
    }
}

fn default_output_dir() -> String {
    "myblog".into()
}
fn default_layout() -> String {
    "page".into()
}

/// `[chat]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// OpenAI-compatible chat-completions URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout.
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            timeout_secs: default_chat_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/o3-mini".into()
}
fn default_chat_timeout() -> u64 {
    200
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per chat call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after the first failure; doubled after each further failure.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for a single wait.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Add random jitter to each wait.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay() -> u64 {
    3_000
}
fn default_max_delay() -> u64 {
    60_000
}
fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(RankPagesError::config("source.url must not be empty"));
        }
        if self.source.table_id.trim().is_empty() {
            return Err(RankPagesError::config("source.table_id must not be empty"));
        }
        if self.output.dir.trim().is_empty() {
            return Err(RankPagesError::config("output.dir must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(RankPagesError::config("retry.max_attempts must be at least 1"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(RankPagesError::config(
                "retry.max_delay_ms must not be smaller than retry.base_delay_ms",
            ));
        }
        for prompt in &self.prompts {
            prompt.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rankpages/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RankPagesError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rankpages/rankpages.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| RankPagesError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RankPagesError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_in(&config_dir()?)
}

/// Write a default config file into `dir`, creating it if needed.
pub fn init_config_in(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| RankPagesError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| RankPagesError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RankPagesError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the chat API key env var is set and non-empty, and return it.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.chat.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(RankPagesError::config(format!(
            "chat API key not found. Set the {var_name} environment variable."
        ))),
    }
}
