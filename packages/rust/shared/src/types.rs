//! Core domain types shared by the crawler and the PDF converter.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Maximum slug length in characters (before any `-N` collision suffix).
pub const MAX_SLUG_LEN: usize = 200;

// ---------------------------------------------------------------------------
// SitemapEntry
// ---------------------------------------------------------------------------

/// A page URL read from a sitemap `<loc>` element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SitemapEntry {
    pub url: Url,
}

impl std::fmt::Display for SitemapEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

// ---------------------------------------------------------------------------
// PageDocument
// ---------------------------------------------------------------------------

/// A page scheduled for crawling, with the file name it will be written to.
#[derive(Debug, Clone)]
pub struct PageDocument {
    /// Source URL.
    pub url: Url,
    /// Base file name without extension, unique within one crawl.
    pub slug: String,
}

impl PageDocument {
    /// File name inside the output directory.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.slug)
    }

    /// Build documents for a list of entries, de-duplicating URLs and
    /// assigning `-2`, `-3`, ... suffixes to colliding slugs in input order.
    pub fn plan(entries: impl IntoIterator<Item = SitemapEntry>) -> Vec<PageDocument> {
        let mut seen_urls = HashSet::new();
        let mut used_slugs = HashSet::new();
        let mut docs = Vec::new();

        for entry in entries {
            if !seen_urls.insert(entry.url.as_str().to_owned()) {
                continue;
            }
            let base = slugify_url(&entry.url);
            let mut slug = base.clone();
            let mut n = 2;
            while used_slugs.contains(&slug) {
                slug = format!("{base}-{n}");
                n += 1;
            }
            used_slugs.insert(slug.clone());
            docs.push(PageDocument {
                url: entry.url,
                slug,
            });
        }

        docs
    }
}

/// Derive a filesystem-safe base name from a URL path.
///
/// `https://x.com/a` → `a`, `https://x.com/guide/intro.html` → `guide_intro`,
/// `https://x.com/` → `index`.
pub fn slugify_url(url: &Url) -> String {
    static UNSAFE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("slug regex"));

    let path = url.path().trim_matches('/');
    let path = path
        .strip_suffix(".html")
        .or_else(|| path.strip_suffix(".htm"))
        .unwrap_or(path);

    let slug = UNSAFE_RE.replace_all(path, "_");
    let slug = slug.trim_matches('_');

    if slug.is_empty() {
        return "index".to_string();
    }
    slug.chars().take(MAX_SLUG_LEN).collect()
}

// ---------------------------------------------------------------------------
// MarkdownFile / PdfOutput
// ---------------------------------------------------------------------------

/// A markdown document discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkdownFile {
    pub path: PathBuf,
}

impl MarkdownFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the PDF for this file goes: `<dir>/<stem>.pdf` when an output
    /// directory is given, otherwise next to the input.
    pub fn pdf_path(&self, output_dir: Option<&Path>) -> PathBuf {
        match output_dir {
            Some(dir) => {
                let stem = self
                    .path
                    .file_stem()
                    .map(|s| s.to_os_string())
                    .unwrap_or_else(|| "output".into());
                let mut name = stem;
                name.push(".pdf");
                dir.join(name)
            }
            None => self.path.with_extension("pdf"),
        }
    }

    /// File name used as the HTML document title.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Rendered PDF bytes and their destination.
#[derive(Debug, Clone)]
pub struct PdfOutput {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}
