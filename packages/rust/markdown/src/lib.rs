//! HTML-to-Markdown conversion and cleanup passes.
//!
//! Converts fetched HTML pages to Markdown using the `htmd` crate, then applies
//! a series of cleanup passes to normalize headings, whitespace, code blocks,
//! and links. Conversion is permissive: malformed HTML yields best-effort
//! output rather than an error.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use cleanup::CleanupOptions;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The final Markdown content (with frontmatter).
    pub markdown: String,
    /// Extracted or inferred page title.
    pub title: String,
    /// Approximate word count of the body, code blocks excluded.
    pub word_count: usize,
}

/// Options for the HTML-to-Markdown conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Page URL, used for resolving relative links and in the frontmatter.
    pub source_url: String,
    /// Override title (if `None`, taken from the first H1).
    pub title: Option<String>,
    /// RFC 3339 timestamp for the `fetched_at` frontmatter field.
    pub fetched_at: Option<String>,
    /// Drop lines with e-mail addresses or phone numbers.
    pub scrub_contacts: bool,
}

/// Tags whose content never makes it into the Markdown.
const SKIPPED_TAGS: [&str; 6] = ["script", "style", "nav", "iframe", "noscript", "svg"];

/// Content containers tried in order before falling back to `<body>`.
const CONTENT_SELECTORS: [&str; 7] = [
    "article .markdown",
    ".vp-doc",
    ".markdown-section",
    "[role=\"main\"]",
    "article",
    "main",
    ".content",
];

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert an HTML page to clean Markdown with frontmatter.
///
/// 1. Extract the content container (stripping site chrome)
/// 2. Swap `<table>` elements for placeholders rendered as Markdown tables
/// 3. Convert HTML → Markdown via `htmd`
/// 4. Run the cleanup pipeline
/// 5. Prepend YAML frontmatter
///
/// Identical input and options always produce identical output.
#[instrument(skip_all, fields(url = %opts.source_url))]
pub fn convert(html: &str, opts: &ConvertOptions) -> ConvertResult {
    let content_html = extract_content_html(html);
    let (content_html, tables) = extract_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    let raw_markdown = match converter.convert(&content_html) {
        Ok(md) => md,
        Err(e) => {
            warn!(error = %e, "htmd conversion failed, falling back to plain text");
            plain_text(&content_html)
        }
    };
    let raw_markdown = restore_tables(raw_markdown, &tables);

    debug!(raw_len = raw_markdown.len(), tables = tables.len(), "htmd conversion complete");

    let base_url = Url::parse(&opts.source_url).ok();
    let cleaned = cleanup::run_pipeline(
        &raw_markdown,
        base_url.as_ref(),
        CleanupOptions {
            scrub_contacts: opts.scrub_contacts,
        },
    );

    let title = opts
        .title
        .clone()
        .or_else(|| extract_title_from_markdown(&cleaned))
        .unwrap_or_else(|| "Untitled".to_string());

    let word_count = count_words(&cleaned);
    let frontmatter = build_frontmatter(&opts.source_url, &title, opts.fetched_at.as_deref());
    let markdown = format!("{frontmatter}\n{cleaned}");

    debug!(%title, word_count, final_len = markdown.len(), "conversion complete");

    ConvertResult {
        markdown,
        title,
        word_count,
    }
}

// ---------------------------------------------------------------------------
// Content extraction
// ---------------------------------------------------------------------------

/// Inner HTML of the main content container, or of `<body>`.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel_str in CONTENT_SELECTORS.iter().chain(std::iter::once(&"body")) {
        let Ok(selector) = Selector::parse(sel_str) else {
            continue;
        };
        if let Some(el) = doc.select(&selector).next() {
            return el.inner_html();
        }
    }

    html.to_string()
}

/// Text content of an HTML fragment, one block per line.
fn plain_text(html: &str) -> String {
    let frag = Html::parse_fragment(html);
    frag.root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn table_placeholder(index: usize) -> String {
    format!("sitedocstableplaceholder{index}x")
}

/// Replace each top-level `<table>` with a text placeholder and return the
/// Markdown rendering of every table, in order. Nested tables stay inside
/// their outer table; an unclosed table is left for htmd.
fn extract_tables(html: &str) -> (String, Vec<String>) {
    static TABLE_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<(/?)table\b[^>]*>").expect("valid regex"));

    let mut out = String::with_capacity(html.len());
    let mut tables = Vec::new();
    let mut copied = 0;
    let mut depth = 0usize;
    let mut open_at = 0;

    for caps in TABLE_TAG_RE.captures_iter(html) {
        let Some(tag) = caps.get(0) else { continue };
        if caps[1].is_empty() {
            if depth == 0 {
                open_at = tag.start();
            }
            depth += 1;
        } else if depth > 0 {
            depth -= 1;
            if depth == 0 {
                let source = &html[open_at..tag.end()];
                out.push_str(&html[copied..open_at]);
                out.push_str(&format!("<p>{}</p>", table_placeholder(tables.len())));
                tables.push(render_table(source));
                copied = tag.end();
            }
        }
    }
    out.push_str(&html[copied..]);

    (out, tables)
}

fn render_table(source: &str) -> String {
    let frag = Html::parse_fragment(source);
    Selector::parse("table")
        .ok()
        .and_then(|sel| frag.select(&sel).next().map(|t| table_to_markdown(&t)))
        .unwrap_or_default()
}

fn restore_tables(mut md: String, tables: &[String]) -> String {
    for (i, table) in tables.iter().enumerate() {
        md = md.replacen(&table_placeholder(i), table, 1);
    }
    md
}

/// Nearest ancestor element named `name`.
fn closest<'a>(el: &ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == name)
}

/// Render one `<table>` as a GitHub-style Markdown table. The first row is
/// the header; rows are padded to the widest row. Rows of nested tables are
/// folded into the text of the cell that holds them.
fn table_to_markdown(table: &ElementRef) -> String {
    let (Ok(tr_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return String::new();
    };

    let mut rows: Vec<Vec<String>> = table
        .select(&tr_sel)
        .filter(|tr| closest(tr, "table").is_some_and(|t| t.id() == table.id()))
        .map(|tr| {
            tr.select(&cell_sel)
                .filter(|cell| closest(cell, "tr").is_some_and(|r| r.id() == tr.id()))
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .replace('|', "\\|")
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let line = |cells: &[String]| format!("| {} |", cells.join(" | "));
    let mut out = vec![line(&rows[0]), line(&vec!["---".to_string(); width])];
    out.extend(rows[1..].iter().map(|r| line(r)));
    format!("\n\n{}\n\n", out.join("\n"))
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Extract title from the first H1 in the Markdown text.
fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Count words in the Markdown body, ignoring fenced code.
fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    CODE_BLOCK_RE
        .replace_all(md, "")
        .split_whitespace()
        .filter(|w| !w.chars().all(|c| c == '#'))
        .count()
}

/// Build a YAML frontmatter block.
fn build_frontmatter(source_url: &str, title: &str, fetched_at: Option<&str>) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("source_url: \"{}\"\n", escape_yaml_string(source_url)));
    fm.push_str(&format!("title: \"{}\"\n", escape_yaml_string(title)));
    if let Some(ts) = fetched_at {
        fm.push_str(&format!("fetched_at: \"{ts}\"\n"));
    }
    fm.push_str("---\n");
    fm
}

fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
