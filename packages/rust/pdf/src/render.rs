//! Markdown → standalone HTML document.

use comrak::{Options, markdown_to_html};

/// Stylesheet embedded in every document: A4-friendly margins and
/// GitHub-like headings, code blocks and tables.
const STYLESHEET: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
    line-height: 1.6;
    margin: 2cm;
    max-width: 21cm;
}
h1, h2, h3, h4, h5, h6 { margin-top: 1.5em; margin-bottom: 0.5em; color: #333; }
h1 { font-size: 2.2em; border-bottom: 1px solid #eee; padding-bottom: 0.3em; }
h2 { font-size: 1.8em; border-bottom: 1px solid #eee; padding-bottom: 0.3em; }
h3 { font-size: 1.5em; }
h4 { font-size: 1.3em; }
p { margin-bottom: 1em; }
code {
    background-color: #f6f8fa;
    border-radius: 3px;
    font-family: monospace;
    padding: 0.2em 0.4em;
    font-size: 85%;
}
pre {
    background-color: #f6f8fa;
    border-radius: 3px;
    font-family: monospace;
    padding: 16px;
    overflow: auto;
    font-size: 85%;
}
pre code { padding: 0; background: none; }
blockquote { margin: 0; padding-left: 1em; border-left: 4px solid #ddd; color: #666; }
table { border-collapse: collapse; width: 100%; margin-bottom: 1em; }
table, th, td { border: 1px solid #ddd; }
th, td { padding: 8px 12px; text-align: left; }
th { background-color: #f6f8fa; }
img { max-width: 100%; }
a { color: #0366d6; text-decoration: none; }
ul, ol { padding-left: 2em; }
li { margin-bottom: 0.25em; }
"#;

/// Render a markdown body to an HTML fragment. A leading `---` frontmatter
/// block is dropped.
pub fn markdown_to_fragment(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.extension.header_ids = Some(String::new());
    options.extension.front_matter_delimiter = Some("---".to_string());
    options.render.hardbreaks = true;
    // Crawled pages may carry inline HTML the converter left in place.
    options.render.unsafe_ = true;

    markdown_to_html(markdown, &options)
}

/// Wrap an HTML fragment in a full document with the built-in stylesheet.
pub fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLESHEET}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title)
    )
}

/// Markdown text to a complete HTML document titled `title`.
pub fn render_document(title: &str, markdown: &str) -> String {
    html_document(title, &markdown_to_fragment(markdown))
}

fn escape_html(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    // Writing into a Vec cannot fail.
    let _ = comrak::html::escape(&mut out, s.as_bytes());
    String::from_utf8_lossy(&out).into_owned()
}
