//! Application configuration for sitedocs.
//!
//! User config lives at `~/.sitedocs/sitedocs.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteDocsError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitedocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitedocs";

// ---------------------------------------------------------------------------
// Config structs (matching sitedocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sitemap crawler settings.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Markdown-to-PDF settings.
    #[serde(default)]
    pub pdf: PdfSection,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Directory the markdown files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum number of page fetches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout.
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures (0 = fail fast).
    #[serde(default)]
    pub retries: u32,

    /// Base backoff between retries; attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Delay before each page request.
    #[serde(default)]
    pub rate_limit_ms: u64,

    /// Drop lines containing e-mail addresses or phone numbers.
    #[serde(default)]
    pub scrub_contacts: bool,

    /// Override for the User-Agent header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            concurrency: default_concurrency(),
            timeout_secs: default_crawl_timeout(),
            retries: 0,
            retry_backoff_ms: default_retry_backoff(),
            rate_limit_ms: 0,
            scrub_contacts: false,
            user_agent: None,
        }
    }
}

fn default_output_dir() -> String {
    "results".into()
}
fn default_concurrency() -> u32 {
    10
}
fn default_crawl_timeout() -> u64 {
    30
}
fn default_retry_backoff() -> u64 {
    500
}

/// `[pdf]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfSection {
    /// External HTML-to-PDF program.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Arguments for the engine. HTML goes to stdin, PDF is read from stdout.
    #[serde(default = "default_engine_args")]
    pub engine_args: Vec<String>,

    /// Per-document render timeout.
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,

    /// Whether `**` matches across directories.
    #[serde(default = "default_true")]
    pub recursive: bool,
}

impl Default for PdfSection {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            engine_args: default_engine_args(),
            timeout_secs: default_render_timeout(),
            recursive: true,
        }
    }
}

fn default_engine() -> String {
    "weasyprint".into()
}
fn default_engine_args() -> Vec<String> {
    vec!["-".into(), "-".into()]
}
fn default_render_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Output directory for markdown files.
    pub output_dir: PathBuf,
    /// Maximum concurrent HTTP requests.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for transient failures.
    pub retries: u32,
    /// Base retry backoff.
    pub retry_backoff: Duration,
    /// Delay before each page request.
    pub rate_limit: Duration,
    /// Drop contact-detail lines from the markdown.
    pub scrub_contacts: bool,
    /// User-Agent header value.
    pub user_agent: String,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let c = &config.crawl;
        Self {
            output_dir: PathBuf::from(&c.output_dir),
            concurrency: c.concurrency as usize,
            timeout: Duration::from_secs(c.timeout_secs),
            retries: c.retries,
            retry_backoff: Duration::from_millis(c.retry_backoff_ms),
            rate_limit: Duration::from_millis(c.rate_limit_ms),
            scrub_contacts: c.scrub_contacts,
            user_agent: c.user_agent.clone().unwrap_or_else(default_user_agent),
        }
    }
}

impl CrawlConfig {
    /// Reject values that would stall or disable the crawl.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SiteDocsError::config("concurrency must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(SiteDocsError::config("crawl timeout must be positive"));
        }
        Ok(())
    }
}

/// Runtime PDF conversion configuration.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Engine program name or path.
    pub engine: String,
    /// Engine arguments.
    pub engine_args: Vec<String>,
    /// Per-document render timeout.
    pub timeout: Duration,
    /// `**` crosses directories.
    pub recursive: bool,
    /// Optional directory that receives every PDF.
    pub output_dir: Option<PathBuf>,
    /// Treat every input as a literal file path.
    pub single: bool,
}

impl From<&AppConfig> for PdfConfig {
    fn from(config: &AppConfig) -> Self {
        let p = &config.pdf;
        Self {
            engine: p.engine.clone(),
            engine_args: p.engine_args.clone(),
            timeout: Duration::from_secs(p.timeout_secs),
            recursive: p.recursive,
            output_dir: None,
            single: false,
        }
    }
}

impl PdfConfig {
    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            return Err(SiteDocsError::config("pdf engine must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(SiteDocsError::config("render timeout must be positive"));
        }
        Ok(())
    }
}

/// User-Agent sent with every request unless overridden.
pub fn default_user_agent() -> String {
    concat!("sitedocs/", env!("CARGO_PKG_VERSION")).to_string()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitedocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitedocs/sitedocs.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SiteDocsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteDocsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}
