//! Sitemap-driven page crawler.
//!
//! This crate provides:
//! - [`Crawler`] — fetches every page listed in a sitemap with bounded
//!   concurrency and writes one Markdown file per page
//! - [`CrawlReport`] — per-run summary of saved and failed pages
//! - [`ProgressReporter`] — per-page callbacks for progress display

pub mod engine;
pub mod progress;

pub use engine::{CrawlReport, Crawler, PageFailure, SavedPage};
pub use progress::{ProgressReporter, SilentProgress};
