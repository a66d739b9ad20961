//! Shared types, error model, and configuration for sitedocs.
//!
//! This crate is the foundation depended on by all other sitedocs crates.
//! It provides:
//! - [`SiteDocsError`] — the unified error type
//! - Domain types ([`SitemapEntry`], [`PageDocument`], [`MarkdownFile`], [`PdfOutput`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`PdfConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSection, PdfConfig, PdfSection, config_dir, config_file_path,
    default_user_agent, load_config, load_config_from,
};
pub use error::{Result, SiteDocsError};
pub use types::{MAX_SLUG_LEN, MarkdownFile, PageDocument, PdfOutput, SitemapEntry, slugify_url};
