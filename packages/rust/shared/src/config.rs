//! Application configuration for doccrawl.
//!
//! User config lives at `~/.doccrawl/doccrawl.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocCrawlError, Result};
use crate::types::SourceKind;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "doccrawl.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".doccrawl";

// ---------------------------------------------------------------------------
// Config structs (matching doccrawl.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory under which `<group-name>/docs.md` files are written.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// GitHub contents API settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Sitemap crawl settings.
    #[serde(default)]
    pub sitemap: SitemapConfig,

    /// Knowledge files to process, in order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            github: GithubConfig::default(),
            sitemap: SitemapConfig::default(),
            sources: default_sources(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_sources() -> Vec<SourceEntry> {
    vec![
        SourceEntry {
            knowledge_file: PathBuf::from("editorjs/.knowledge"),
            kind: SourceKind::Github,
        },
        SourceEntry {
            knowledge_file: PathBuf::from("flutter/.knowledge"),
            kind: SourceKind::Sitemap,
        },
    ]
}

/// `[[sources]]` entry: one knowledge file and the pipeline that reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Path to the knowledge file.
    pub knowledge_file: PathBuf,
    /// Pipeline kind.
    pub kind: SourceKind,
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_github_user_agent")]
    pub user_agent: String,

    /// Per-request timeout.
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay; attempt `n` waits `n * retry_delay_ms`.
    #[serde(default = "default_github_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pause after each directory listing when no token is set.
    #[serde(default = "default_listing_delay")]
    pub listing_delay_ms: u64,

    /// Pause after each directory listing when a token is set.
    #[serde(default = "default_authenticated_listing_delay")]
    pub authenticated_listing_delay_ms: u64,

    /// Pause after each successful file download.
    #[serde(default = "default_file_delay")]
    pub file_delay_ms: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            user_agent: default_github_user_agent(),
            timeout_secs: default_github_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_github_retry_delay(),
            listing_delay_ms: default_listing_delay(),
            authenticated_listing_delay_ms: default_authenticated_listing_delay(),
            file_delay_ms: default_file_delay(),
        }
    }
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_github_user_agent() -> String {
    concat!("doccrawl/", env!("CARGO_PKG_VERSION"), " (github)").into()
}
fn default_github_timeout() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    3
}
fn default_github_retry_delay() -> u64 {
    5_000
}
fn default_listing_delay() -> u64 {
    1_500
}
fn default_authenticated_listing_delay() -> u64 {
    500
}
fn default_file_delay() -> u64 {
    200
}

impl GithubConfig {
    /// Read the token from the configured environment variable.
    ///
    /// Empty values count as absent.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    /// Politeness delay after a listing, depending on whether we authenticate.
    pub fn listing_delay(&self, authenticated: bool) -> Duration {
        if authenticated {
            Duration::from_millis(self.authenticated_listing_delay_ms)
        } else {
            Duration::from_millis(self.listing_delay_ms)
        }
    }
}

/// `[sitemap]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    #[serde(default = "default_sitemap_user_agent")]
    pub user_agent: String,

    /// Per-request timeout.
    #[serde(default = "default_sitemap_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay; attempt `n` waits `n * retry_delay_ms`.
    #[serde(default = "default_sitemap_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pause between consecutive page fetches.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            user_agent: default_sitemap_user_agent(),
            timeout_secs: default_sitemap_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_sitemap_retry_delay(),
            page_delay_ms: default_page_delay(),
        }
    }
}

fn default_sitemap_user_agent() -> String {
    concat!("doccrawl/", env!("CARGO_PKG_VERSION"), " (sitemap)").into()
}
fn default_sitemap_timeout() -> u64 {
    20
}
fn default_sitemap_retry_delay() -> u64 {
    10_000
}
fn default_page_delay() -> u64 {
    1_000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.doccrawl/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocCrawlError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.doccrawl/doccrawl.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| DocCrawlError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        DocCrawlError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocCrawlError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocCrawlError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocCrawlError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.github.max_attempts == 0 || config.sitemap.max_attempts == 0 {
        return Err(DocCrawlError::config("max_attempts must be at least 1"));
    }
    Ok(())
}
