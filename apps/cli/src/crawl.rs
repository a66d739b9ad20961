//! `sitedocs-crawl`: arguments, progress display and summary.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitedocs_crawler::{CrawlReport, Crawler, ProgressReporter};
use sitedocs_shared::{AppConfig, CrawlConfig};
use tracing::info;
use url::Url;

use crate::load_app_config;
use crate::logging::LogFormat;

/// Crawl a website's sitemap and save every page as a Markdown file.
#[derive(Parser, Debug)]
#[command(name = "sitedocs-crawl", version, long_about = None)]
pub struct CrawlArgs {
    /// Sitemap URL, e.g. https://example.com/sitemap.xml.
    #[arg(short = 'w', long = "website")]
    pub website: String,

    /// Output directory for the Markdown files [default: results].
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of pages fetched at once [default: 10].
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Per-request timeout in seconds [default: 30].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Retries for transient failures (timeouts, 5xx, 429) [default: 0].
    #[arg(long)]
    pub retries: Option<u32>,

    /// Drop lines containing e-mail addresses or phone numbers.
    #[arg(long)]
    pub scrub_contacts: bool,

    /// Config file (defaults to ~/.sitedocs/sitedocs.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format: text (default) or json.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl CrawlArgs {
    /// Merge flags over the config file: flag > file > default.
    pub fn crawl_config(&self, app: &AppConfig) -> CrawlConfig {
        let mut config = CrawlConfig::from(app);
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(c) = self.concurrency {
            config.concurrency = c as usize;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(r) = self.retries {
            config.retries = r;
        }
        if self.scrub_contacts {
            config.scrub_contacts = true;
        }
        config
    }
}

/// Run a crawl. Per-page failures still exit 0.
pub async fn run(args: CrawlArgs) -> Result<ExitCode> {
    let app = load_app_config(args.config.as_deref())?;
    let config = args.crawl_config(&app);
    config.validate()?;

    let sitemap_url = parse_sitemap_url(&args.website)?;
    let output_dir = config.output_dir.clone();

    info!(
        sitemap = %sitemap_url,
        output = %output_dir.display(),
        concurrency = config.concurrency,
        "crawling sitemap"
    );

    let crawler = Crawler::new(config)?;
    let progress = CliProgress::new();
    let report = match crawler.crawl(&sitemap_url, &progress).await {
        Ok(report) => report,
        Err(e) => {
            progress.clear();
            return Err(e.into());
        }
    };

    print_summary(&report, &output_dir);
    Ok(ExitCode::SUCCESS)
}

fn parse_sitemap_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| eyre!("invalid sitemap URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(eyre!("unsupported scheme '{other}' in sitemap URL '{raw}'")),
    }
}

fn print_summary(report: &CrawlReport, output_dir: &Path) {
    println!();
    println!("  Crawl finished");
    println!("  Pages:   {}", report.attempted);
    println!("  Saved:   {}", report.saved.len());
    println!("  Failed:  {}", report.failed.len());
    println!("  Output:  {}", output_dir.display());
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress bar on stderr plus one stdout line per page. The bar stays
/// hidden until the page list is known.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    /// Remove the bar when the crawl stops before `done`.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("fetching pages");
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn page_saved(&self, url: &str, path: &Path) {
        self.bar
            .suspend(|| println!("  saved   {url} -> {}", path.display()));
        self.bar.inc(1);
    }

    fn page_failed(&self, url: &str, error: &str) {
        self.bar.suspend(|| println!("  failed  {url}: {error}"));
        self.bar.inc(1);
    }

    fn done(&self, _report: &CrawlReport) {
        self.bar.finish_and_clear();
    }
}
