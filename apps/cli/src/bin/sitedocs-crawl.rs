//! sitedocs-crawl — save every page of a sitemap as Markdown.

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use sitedocs_cli::crawl::{self, CrawlArgs};
use sitedocs_cli::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let args = CrawlArgs::parse();
    init_tracing(args.verbose, args.log_format);
    crawl::run(args).await
}
