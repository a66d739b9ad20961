//! Sequential markdown → PDF conversion.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sitedocs_shared::{MarkdownFile, PdfOutput, Result, SiteDocsError};
use tracing::{info, instrument, warn};

use crate::discover::Discovery;
use crate::engine::PdfEngine;
use crate::render;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A file that was converted.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// A file that could not be converted.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub input: PathBuf,
    pub error: String,
}

/// Summary of one converter run.
#[derive(Debug, Default)]
pub struct ConvertReport {
    /// Messages for inputs that matched no files.
    pub unmatched: Vec<String>,
    pub converted: Vec<ConvertedFile>,
    pub failed: Vec<FileFailure>,
}

impl ConvertReport {
    /// True when not a single input produced a file to convert.
    pub fn nothing_matched(&self) -> bool {
        self.converted.is_empty() && self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per-item callbacks for a conversion run. All methods default to no-ops.
pub trait ConvertProgress {
    fn unmatched(&self, _error: &SiteDocsError) {}
    fn converted(&self, _input: &Path, _output: &Path) {}
    fn failed(&self, _input: &Path, _error: &SiteDocsError) {}
}

/// No-op progress for headless/test usage.
pub struct SilentProgress;

impl ConvertProgress for SilentProgress {}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Converts markdown files one at a time with a [`PdfEngine`].
pub struct Converter<E> {
    engine: E,
    output_dir: Option<PathBuf>,
}

impl<E: PdfEngine> Converter<E> {
    /// PDFs go to `output_dir` when given, otherwise next to each input.
    pub fn new(engine: E, output_dir: Option<PathBuf>) -> Self {
        Self { engine, output_dir }
    }

    /// Convert every discovered file. A failing file is reported and
    /// skipped; only an uncreatable output directory is an error.
    #[instrument(skip_all, fields(files = discovery.files.len()))]
    pub async fn run(
        &self,
        discovery: Discovery,
        progress: &dyn ConvertProgress,
    ) -> Result<ConvertReport> {
        let mut report = ConvertReport::default();

        for err in &discovery.unmatched {
            progress.unmatched(err);
            report.unmatched.push(err.to_string());
        }

        if discovery.files.is_empty() {
            return Ok(report);
        }

        if let Some(dir) = &self.output_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SiteDocsError::io(dir, e))?;
        }

        let mut outputs_seen: HashSet<PathBuf> = HashSet::new();

        for file in &discovery.files {
            let target = file.pdf_path(self.output_dir.as_deref());
            if !outputs_seen.insert(target.clone()) {
                warn!(
                    input = %file.path.display(),
                    output = %target.display(),
                    "output path already written in this run, overwriting"
                );
            }

            match self.convert_file(file, &target).await {
                Ok(out) => {
                    progress.converted(&file.path, &out.path);
                    report.converted.push(ConvertedFile {
                        input: file.path.clone(),
                        output: out.path,
                    });
                }
                Err(e) => {
                    warn!(input = %file.path.display(), error = %e, "conversion failed");
                    progress.failed(&file.path, &e);
                    report.failed.push(FileFailure {
                        input: file.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            converted = report.converted.len(),
            failed = report.failed.len(),
            unmatched = report.unmatched.len(),
            "conversion finished"
        );
        Ok(report)
    }

    /// Read, render and write a single file.
    pub async fn convert_file(&self, file: &MarkdownFile, target: &Path) -> Result<PdfOutput> {
        let markdown = tokio::fs::read_to_string(&file.path)
            .await
            .map_err(|e| SiteDocsError::io(&file.path, e))?;

        let html = render::render_document(&file.display_name(), &markdown);
        let bytes = self.engine.render(&html).await?;

        tokio::fs::write(target, &bytes)
            .await
            .map_err(|e| SiteDocsError::io(target, e))?;

        Ok(PdfOutput {
            path: target.to_path_buf(),
            bytes,
        })
    }
}
