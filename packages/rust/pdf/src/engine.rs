//! HTML → PDF rendering engines.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use sitedocs_shared::{PdfConfig, Result, SiteDocsError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Magic bytes every PDF file starts with.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Turns a complete HTML document into PDF bytes.
pub trait PdfEngine {
    fn render(&self, html: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Renders by piping HTML into an external program and reading the PDF
/// from its stdout (`weasyprint - -` by default).
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new(&config.engine, config.engine_args.clone(), config.timeout)
    }
}

impl PdfEngine for CommandEngine {
    #[instrument(skip_all, fields(engine = %self.program))]
    async fn render(&self, html: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SiteDocsError::Render(format!("failed to start `{}`: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SiteDocsError::Render("engine stdin unavailable".into()))?;
        let input = html.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                SiteDocsError::Render(format!(
                    "`{}` timed out after {}s",
                    self.program,
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| SiteDocsError::Render(format!("failed to wait for `{}`: {e}", self.program)))?;

        if let Ok(Err(e)) = writer.await {
            debug!(error = %e, "engine closed stdin before reading all input");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SiteDocsError::Render(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        if !output.stdout.starts_with(PDF_MAGIC) {
            return Err(SiteDocsError::Render(format!(
                "`{}` did not produce a PDF ({} bytes of other output)",
                self.program,
                output.stdout.len()
            )));
        }

        debug!(bytes = output.stdout.len(), "pdf rendered");
        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandEngine {
        CommandEngine::new("sh", vec!["-c".into(), script.into()], timeout)
    }

    #[tokio::test]
    async fn pdf_from_stdout_is_returned() {
        let engine = sh("cat > /dev/null; printf '%%PDF-1.7 fake'", Duration::from_secs(5));
        let bytes = engine.render("<html></html>").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7 fake");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let engine = sh("cat > /dev/null; echo 'font not found' >&2; exit 3", Duration::from_secs(5));
        let err = engine.render("<html></html>").await.unwrap_err();
        assert!(matches!(err, SiteDocsError::Render(_)));
        assert!(err.to_string().contains("font not found"), "{err}");
    }

    #[tokio::test]
    async fn non_pdf_output_is_rejected() {
        let engine = sh("cat", Duration::from_secs(5));
        let err = engine.render("<html></html>").await.unwrap_err();
        assert!(err.to_string().contains("did not produce a PDF"), "{err}");
    }

    #[tokio::test]
    async fn slow_engine_times_out() {
        let engine = sh("sleep 5", Duration::from_millis(200));
        let err = engine.render("<html></html>").await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[tokio::test]
    async fn missing_program_is_render_error() {
        let engine = CommandEngine::new("sitedocs-no-such-engine", vec![], Duration::from_secs(1));
        let err = engine.render("<html></html>").await.unwrap_err();
        assert!(err.to_string().contains("failed to start"), "{err}");
    }
}
