//! `md2pdf`: arguments, per-file output and exit status.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use sitedocs_pdf::{CommandEngine, ConvertProgress, ConvertReport, Converter, DiscoverOptions, discover};
use sitedocs_shared::{AppConfig, PdfConfig, SiteDocsError};
use tracing::info;

use crate::load_app_config;
use crate::logging::LogFormat;

/// Convert Markdown files to formatted PDF documents.
#[derive(Parser, Debug)]
#[command(name = "md2pdf", version, long_about = None)]
pub struct ConvertArgs {
    /// Markdown files or glob patterns (e.g. '*.md', 'docs/**/*.md').
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Directory for the PDF files (defaults to next to each input).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Treat every input as a single file path rather than a pattern.
    #[arg(short, long)]
    pub single: bool,

    /// Let `**` match only one directory level.
    #[arg(long)]
    pub no_recursive: bool,

    /// Per-document render timeout in seconds [default: 120].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

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

impl ConvertArgs {
    /// Merge flags over the config file: flag > file > default.
    pub fn pdf_config(&self, app: &AppConfig) -> PdfConfig {
        let mut config = PdfConfig::from(app);
        config.output_dir = self.output.clone();
        config.single = self.single;
        if self.no_recursive {
            config.recursive = false;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Run a conversion. Exits non-zero only when no input matched any file.
pub async fn run(args: ConvertArgs) -> Result<ExitCode> {
    let app = load_app_config(args.config.as_deref())?;
    let config = args.pdf_config(&app);
    config.validate()?;

    let discovery = discover(
        &args.inputs,
        DiscoverOptions {
            recursive: config.recursive,
            single: config.single,
        },
    );
    info!(
        inputs = args.inputs.len(),
        files = discovery.files.len(),
        engine = %config.engine,
        "converting markdown to pdf"
    );

    let converter = Converter::new(CommandEngine::from_config(&config), config.output_dir.clone());
    let report = converter.run(discovery, &ConsoleProgress).await?;

    print_summary(&report);
    Ok(exit_code(&report))
}

fn exit_code(report: &ConvertReport) -> ExitCode {
    if report.nothing_matched() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_summary(report: &ConvertReport) {
    println!();
    println!("  Converted: {}", report.converted.len());
    println!("  Failed:    {}", report.failed.len());
    println!("  Unmatched: {}", report.unmatched.len());
    println!();
}

/// One stdout line per input.
struct ConsoleProgress;

impl ConvertProgress for ConsoleProgress {
    fn unmatched(&self, error: &SiteDocsError) {
        println!("{error}");
    }

    fn converted(&self, input: &Path, output: &Path) {
        println!(
            "Successfully converted {} to {}",
            input.display(),
            output.display()
        );
    }

    fn failed(&self, input: &Path, error: &SiteDocsError) {
        println!("Error converting {}: {error}", input.display());
    }
}
