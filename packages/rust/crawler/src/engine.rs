//! Bounded-concurrency page fetcher.
//!
//! The crawler reads the page list from a sitemap, then fetches pages with at
//! most `concurrency` requests in flight, converts each body to Markdown and
//! writes it to the output directory. A failing page is recorded and skipped;
//! it never aborts the other fetches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sitedocs_markdown::ConvertOptions;
use sitedocs_shared::{CrawlConfig, PageDocument, Result, SiteDocsError, SitemapEntry};
use sitedocs_sitemap::{SitemapOptions, collect_page_urls, fetch};

use crate::progress::ProgressReporter;

/// Largest page body the crawler accepts.
const MAX_PAGE_SIZE: u64 = 20 * 1024 * 1024;

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// A page that was converted and written.
#[derive(Debug, Clone)]
pub struct SavedPage {
    pub url: String,
    pub path: PathBuf,
}

/// A page that was skipped, with the reason.
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub url: String,
    pub error: String,
}

/// Summary of a completed crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Pages scheduled (unique sitemap URLs).
    pub attempted: usize,
    /// Pages written to disk, in completion order.
    pub saved: Vec<SavedPage>,
    /// Pages skipped because of an error.
    pub failed: Vec<PageFailure>,
    /// Highest number of fetches observed in flight at once.
    pub peak_in_flight: usize,
    /// Wall-clock duration of the fetch phase.
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Whether any page failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Sitemap crawler with a counting limiter on in-flight requests.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
}

impl Crawler {
    /// Create a crawler. Fails on an invalid config.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let client = fetch::build_client(&config.user_agent, config.timeout)?;
        Ok(Self { config, client })
    }

    /// Crawl every page listed in the sitemap at `sitemap_url`.
    ///
    /// An unreachable or malformed sitemap is an error. Per-page failures are
    /// collected in the report.
    #[instrument(skip_all, fields(sitemap = %sitemap_url))]
    pub async fn crawl(
        &self,
        sitemap_url: &Url,
        progress: &dyn ProgressReporter,
    ) -> Result<CrawlReport> {
        let opts = SitemapOptions {
            timeout: self.config.timeout,
            user_agent: self.config.user_agent.clone(),
            ..SitemapOptions::default()
        };
        let entries = collect_page_urls(sitemap_url, &opts).await?;
        self.fetch_pages(entries, progress).await
    }

    /// Fetch, convert and write the given pages.
    ///
    /// Fails only when the output directory cannot be created.
    pub async fn fetch_pages(
        &self,
        entries: Vec<SitemapEntry>,
        progress: &dyn ProgressReporter,
    ) -> Result<CrawlReport> {
        let start = Instant::now();
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| SiteDocsError::io(output_dir, e))?;

        let pages = PageDocument::plan(entries);
        let mut report = CrawlReport {
            attempted: pages.len(),
            ..CrawlReport::default()
        };

        info!(
            pages = pages.len(),
            concurrency = self.config.concurrency,
            retries = self.config.retries,
            output = %output_dir.display(),
            "starting crawl"
        );
        progress.started(pages.len());

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let gauge = Arc::new(InFlightGauge::default());
        let worker = Arc::new(PageWorker {
            client: self.client.clone(),
            config: self.config.clone(),
            gauge: gauge.clone(),
        });
        let mut tasks: JoinSet<(String, Result<PathBuf>)> = JoinSet::new();

        for page in pages {
            // Drain finished pages while the limiter is exhausted so progress
            // keeps flowing.
            while semaphore.available_permits() == 0 {
                match tasks.join_next().await {
                    Some(joined) => record(&mut report, joined, progress),
                    None => break,
                }
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| SiteDocsError::validation("fetch limiter closed"))?;
            let worker = worker.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let url = page.url.to_string();
                let result = worker.process(&page).await;
                (url, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            record(&mut report, joined, progress);
        }

        report.peak_in_flight = gauge.peak();
        report.elapsed = start.elapsed();

        info!(
            saved = report.saved.len(),
            failed = report.failed.len(),
            peak_in_flight = report.peak_in_flight,
            duration_ms = report.elapsed.as_millis(),
            "crawl completed"
        );
        progress.done(&report);

        Ok(report)
    }
}

fn record(
    report: &mut CrawlReport,
    joined: std::result::Result<(String, Result<PathBuf>), tokio::task::JoinError>,
    progress: &dyn ProgressReporter,
) {
    match joined {
        Ok((url, Ok(path))) => {
            progress.page_saved(&url, &path);
            report.saved.push(SavedPage { url, path });
        }
        Ok((url, Err(e))) => {
            warn!(%url, error = %e, "page skipped");
            let error = e.to_string();
            progress.page_failed(&url, &error);
            report.failed.push(PageFailure { url, error });
        }
        Err(e) => {
            warn!(error = %e, "fetch task aborted");
            let error = e.to_string();
            progress.page_failed("unknown", &error);
            report.failed.push(PageFailure {
                url: "unknown".into(),
                error,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// In-flight gauge
// ---------------------------------------------------------------------------

/// Counts fetches currently on the wire and remembers the maximum.
#[derive(Debug, Default)]
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a InFlightGauge);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Per-page work
// ---------------------------------------------------------------------------

/// State shared by every fetch task.
struct PageWorker {
    client: Client,
    config: CrawlConfig,
    gauge: Arc<InFlightGauge>,
}

impl PageWorker {
    /// Fetch one page, convert it and write `{slug}.md`.
    async fn process(&self, page: &PageDocument) -> Result<PathBuf> {
        let html = self.fetch_with_retry(&page.url).await?;

        let converted = sitedocs_markdown::convert(
            &html,
            &ConvertOptions {
                source_url: page.url.to_string(),
                title: None,
                fetched_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
                scrub_contacts: self.config.scrub_contacts,
            },
        );

        let path = self.config.output_dir.join(page.file_name());
        write_page(&path, &converted.markdown).await?;

        debug!(
            url = %page.url,
            path = %path.display(),
            words = converted.word_count,
            "page saved"
        );
        Ok(path)
    }

    /// GET the page, retrying transient failures with linear backoff.
    async fn fetch_with_retry(&self, url: &Url) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            if !self.config.rate_limit.is_zero() {
                tokio::time::sleep(self.config.rate_limit).await;
            }

            let result = {
                let _in_flight = self.gauge.enter();
                fetch::fetch_text(&self.client, url, MAX_PAGE_SIZE).await
            };

            match result {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    let delay = self.config.retry_backoff * attempt;
                    warn!(
                        %url,
                        attempt,
                        max = self.config.retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn write_page(path: &Path, markdown: &str) -> Result<()> {
    tokio::fs::write(path, markdown)
        .await
        .map_err(|e| SiteDocsError::io(path, e))
}
