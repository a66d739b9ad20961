//! Sitemap discovery: fetch a sitemap, parse it, and list its page URLs.
//!
//! A crawl starts from a `sitemap.xml` URL. The document is fetched once and
//! read as a one-pass stream of `<loc>` entries. Sitemap indexes are followed
//! to their child sitemaps.

pub mod fetch;
mod parser;

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use reqwest::Client;
use sitedocs_shared::{Result, SitemapEntry, default_user_agent};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use parser::{SitemapKind, SitemapUrls, parse_sitemap};

/// Sitemaps protocol limit for an uncompressed sitemap file (50 MB).
pub const MAX_SITEMAP_SIZE: u64 = 50 * 1024 * 1024;

/// Default timeout in seconds for fetching a sitemap.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How many levels of nested sitemap indexes are followed.
const DEFAULT_MAX_INDEX_DEPTH: usize = 3;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for sitemap discovery.
#[derive(Debug, Clone)]
pub struct SitemapOptions {
    /// Timeout for each sitemap request.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Nested index levels to follow (0 = do not follow indexes).
    pub max_index_depth: usize,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            max_index_depth: DEFAULT_MAX_INDEX_DEPTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Fetch a sitemap and start parsing it.
///
/// Fails with a network error if the sitemap cannot be fetched and with a
/// parse error if the body is not a sitemap document. Entries are read lazily
/// from the returned iterator.
#[instrument(skip(client), fields(url = %url))]
pub async fn fetch_sitemap(client: &Client, url: &Url) -> Result<SitemapUrls> {
    let body = fetch::fetch_text(client, url, MAX_SITEMAP_SIZE).await?;
    debug!(bytes = body.len(), "sitemap fetched");
    parse_sitemap(body)
}

/// Collect every page URL reachable from a sitemap.
///
/// A `<urlset>` yields its entries directly. A `<sitemapindex>` is followed
/// breadth-first to its child sitemaps, up to `max_index_depth` levels; a
/// child sitemap that fails to load is logged and skipped. The root sitemap
/// failing is an error. Page URLs are returned de-duplicated in document order.
#[instrument(skip_all, fields(url = %url))]
pub async fn collect_page_urls(url: &Url, opts: &SitemapOptions) -> Result<Vec<SitemapEntry>> {
    let client = fetch::build_client(&opts.user_agent, opts.timeout)?;

    let mut pages = Vec::new();
    let mut seen_pages = HashSet::new();
    let mut seen_sitemaps = HashSet::from([url.as_str().to_owned()]);
    let mut queue = VecDeque::from([(url.clone(), 0usize)]);

    while let Some((sitemap_url, depth)) = queue.pop_front() {
        let is_root = depth == 0;

        let result = read_sitemap(&client, &sitemap_url).await;
        let (kind, entries) = match result {
            Ok(ok) => ok,
            Err(e) if is_root => return Err(e),
            Err(e) => {
                warn!(url = %sitemap_url, error = %e, "skipping child sitemap");
                continue;
            }
        };

        match kind {
            SitemapKind::UrlSet => {
                for entry in entries {
                    if seen_pages.insert(entry.url.as_str().to_owned()) {
                        pages.push(entry);
                    }
                }
            }
            SitemapKind::Index if depth < opts.max_index_depth => {
                debug!(url = %sitemap_url, children = entries.len(), "following sitemap index");
                for entry in entries {
                    if seen_sitemaps.insert(entry.url.as_str().to_owned()) {
                        queue.push_back((entry.url, depth + 1));
                    }
                }
            }
            SitemapKind::Index => {
                warn!(url = %sitemap_url, depth, "sitemap index nested too deeply, ignoring");
            }
        }
    }

    info!(pages = pages.len(), "sitemap discovery complete");
    Ok(pages)
}

/// Fetch one sitemap and drain its entries, failing on the first bad entry.
async fn read_sitemap(client: &Client, url: &Url) -> Result<(SitemapKind, Vec<SitemapEntry>)> {
    let urls = fetch_sitemap(client, url).await?;
    let kind = urls.kind();
    let entries = urls.collect::<Result<Vec<_>>>()?;
    Ok((kind, entries))
}
