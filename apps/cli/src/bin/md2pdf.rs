//! md2pdf — convert Markdown files to PDF.

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use sitedocs_cli::convert::{self, ConvertArgs};
use sitedocs_cli::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let args = ConvertArgs::parse();
    init_tracing(args.verbose, args.log_format);
    convert::run(args).await
}
