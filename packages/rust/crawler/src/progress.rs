//! Progress callbacks for a crawl run.

use std::path::Path;

use crate::engine::CrawlReport;

/// Receives per-page events while a crawl runs.
///
/// Events are delivered from the task driving the crawl, in completion
/// order. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// Called once the page list is known, before any page is fetched.
    fn started(&self, _total: usize) {}
    /// Called when a page was converted and written.
    fn page_saved(&self, _url: &str, _path: &Path) {}
    /// Called when a page was skipped because of an error.
    fn page_failed(&self, _url: &str, _error: &str) {}
    /// Called when every page has been handled.
    fn done(&self, _report: &CrawlReport) {}
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {}
