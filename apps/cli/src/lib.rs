//! sitedocs command-line front ends.
//!
//! Two binaries share this library:
//! - `sitedocs-crawl` ([`crawl`]) — sitemap → directory of Markdown files
//! - `md2pdf` ([`convert`]) — Markdown files → PDF documents

pub mod convert;
pub mod crawl;
pub mod logging;

use std::path::Path;

use sitedocs_shared::{AppConfig, Result, load_config, load_config_from};

/// Load the config file given with `--config`, or the default one.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => load_config_from(p),
        None => load_config(),
    }
}
