//! End-to-end runs of the `md2pdf` binary.

use std::path::Path;
use std::process::{Command, Output};

fn md2pdf(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_md2pdf"))
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn empty_docs_dir_exits_non_zero() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("docs")).unwrap();
    let pattern = format!("{}/docs/*.md", tmp.path().display());

    let output = md2pdf(tmp.path(), &[&pattern]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no files found matching pattern"), "stdout: {stdout}");
}

#[test]
fn missing_single_file_exits_non_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope.md").display().to_string();

    let output = md2pdf(tmp.path(), &["-s", &missing]);
    assert!(!output.status.success());
}

#[cfg(unix)]
mod with_fake_engine {
    use super::*;

    /// Config whose engine swallows the HTML and prints a tiny fake PDF;
    /// documents containing `BROKEN` make it fail.
    fn write_config(dir: &Path) -> String {
        let path = dir.join("sitedocs.toml");
        std::fs::write(
            &path,
            r#"[pdf]
engine = "sh"
engine_args = ["-c", "if grep -q BROKEN; then echo 'cannot render' >&2; exit 1; fi; printf '%%PDF-1.4 fake'"]
"#,
        )
        .unwrap();
        path.display().to_string()
    }

    #[test]
    fn converts_matches_into_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(docs.join("nested")).unwrap();
        std::fs::write(docs.join("a.md"), "# A\n").unwrap();
        std::fs::write(docs.join("nested").join("b.md"), "# B\n").unwrap();
        std::fs::write(docs.join("notes.txt"), "skip").unwrap();

        let config = write_config(tmp.path());
        let pattern = format!("{}/**/*.md", docs.display());
        let out = tmp.path().join("pdf").display().to_string();

        let output = md2pdf(tmp.path(), &["--config", &config, &pattern, "-o", &out]);

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "stdout: {stdout}");
        let a = std::fs::read(tmp.path().join("pdf").join("a.pdf")).unwrap();
        assert!(a.starts_with(b"%PDF"));
        assert!(tmp.path().join("pdf").join("b.pdf").is_file());
        assert!(stdout.contains("Converted: 2"), "stdout: {stdout}");
    }

    #[test]
    fn render_failure_is_reported_but_exit_is_zero() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("good.md"), "# Good\n").unwrap();
        std::fs::write(tmp.path().join("bad.md"), "# BROKEN\n").unwrap();

        let config = write_config(tmp.path());
        let pattern = format!("{}/*.md", tmp.path().display());

        let output = md2pdf(tmp.path(), &["--config", &config, &pattern]);

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "stdout: {stdout}");
        assert!(tmp.path().join("good.pdf").is_file());
        assert!(!tmp.path().join("bad.pdf").exists());
        assert!(stdout.contains("Error converting"), "stdout: {stdout}");
        assert!(stdout.contains("cannot render"), "stdout: {stdout}");
    }
}
