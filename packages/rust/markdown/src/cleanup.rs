//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each pass is a `&str -> String` function applied in order. Line filters
//! never touch the inside of fenced code blocks.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Toggles for the optional passes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CleanupOptions {
    /// Drop lines with e-mail addresses or phone numbers.
    pub scrub_contacts: bool,
}

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>, opts: CleanupOptions) -> String {
    let mut result = normalize_headings(md);
    result = collapse_blank_lines(&result);
    result = fix_code_fence_languages(&result);
    result = strip_layout_tags(&result);
    result = drop_malformed_link_lines(&result);
    if opts.scrub_contacts {
        result = drop_contact_lines(&result);
    }
    result = resolve_links(&result, base_url);
    result = trim_line_ends(&result);
    ensure_trailing_newline(&result)
}

// ---------------------------------------------------------------------------
// Line helpers
// ---------------------------------------------------------------------------

/// Apply `f` to every line outside fenced code blocks.
fn map_prose_lines(md: &str, mut f: impl FnMut(&str) -> Option<String>) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push(line.to_string());
        } else if in_fence {
            out.push(line.to_string());
        } else if let Some(mapped) = f(line) {
            out.push(mapped);
        }
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep the first H1; demote later ones to H2.
fn normalize_headings(md: &str) -> String {
    let mut seen_h1 = false;
    map_prose_lines(md, |line| {
        if let Some(text) = line.strip_prefix("# ") {
            if seen_h1 {
                return Some(format!("## {text}"));
            }
            seen_h1 = true;
        }
        Some(line.to_string())
    })
}

// ---------------------------------------------------------------------------
// Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ blank lines into exactly 2.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").into_owned()
}

// ---------------------------------------------------------------------------
// Code fences
// ---------------------------------------------------------------------------

/// Turn class-style fence info strings (`language-js`, `lang-py`) into plain ones.
fn fix_code_fence_languages(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    LANG_PREFIX_RE.replace_all(md, "```$1").into_owned()
}

// ---------------------------------------------------------------------------
// Leftover HTML
// ---------------------------------------------------------------------------

/// Remove layout tags that `htmd` passes through, keeping their text.
fn strip_layout_tags(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary)(?:\s[^>]*)?>",
        )
        .expect("valid regex")
    });

    map_prose_lines(md, |line| Some(LAYOUT_TAG_RE.replace_all(line, "").into_owned()))
}

// ---------------------------------------------------------------------------
// Line filters
// ---------------------------------------------------------------------------

/// Drop lines carrying broken autolinks such as `<https:/www.example.com/x>`,
/// which some site builders emit for social links.
fn drop_malformed_link_lines(md: &str) -> String {
    static MALFORMED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<https?:/[^/>][^>]*>").expect("valid regex"));

    map_prose_lines(md, |line| {
        (!MALFORMED_RE.is_match(line)).then(|| line.to_string())
    })
}

/// Drop lines containing e-mail addresses or North-American style phone numbers.
fn drop_contact_lines(md: &str) -> String {
    static EMAIL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid regex"));
    static PHONE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\d{3}[.\-]?\d{3}[.\-]?\d{4}").expect("valid regex"));

    map_prose_lines(md, |line| {
        let contact = EMAIL_RE.is_match(line) || PHONE_RE.is_match(line);
        (!contact).then(|| line.to_string())
    })
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Resolve relative link targets against the page URL. Images are left alone.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let bang = &caps[1];
            let text = &caps[2];
            let href = &caps[3];

            let keep = !bang.is_empty()
                || href.starts_with('#')
                || href.contains("://")
                || href.starts_with("mailto:")
                || href.starts_with("tel:");
            if keep {
                return caps[0].to_string();
            }

            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Ensure the file ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    format!("{}\n", md.trim_end_matches('\n'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_h1_is_demoted() {
        let input = "# Title\n\nSome text\n\n# Another Title\n\nMore text";
        assert_eq!(
            normalize_headings(input),
            "# Title\n\nSome text\n\n## Another Title\n\nMore text"
        );
    }

    #[test]
    fn h1_inside_code_fence_is_untouched() {
        let input = "# Title\n\n```sh\n# a shell comment\n```";
        assert_eq!(normalize_headings(input), input);
    }

    #[test]
    fn blank_line_runs_collapse() {
        assert_eq!(collapse_blank_lines("Line 1\n\n\n\n\nLine 2"), "Line 1\n\n\nLine 2");
        assert_eq!(collapse_blank_lines("Line 1\n\nLine 2"), "Line 1\n\nLine 2");
    }

    #[test]
    fn fence_language_prefix_is_stripped() {
        let input = "```language-javascript\nconsole.log('hi');\n```";
        assert!(fix_code_fence_languages(input).starts_with("```javascript\n"));
    }

    #[test]
    fn layout_tags_are_removed_outside_code() {
        let input = "<div class=\"note\">Important info</div>\n\n```html\n<div>Preserved</div>\n```";
        let result = strip_layout_tags(input);
        assert!(result.starts_with("Important info\n"));
        assert!(result.contains("<div>Preserved</div>"));
    }

    #[test]
    fn malformed_link_lines_are_dropped() {
        let input = "* [ Instagram ](https://x.com/p/<https:/www.instagram.com/acme/>)\n\
                     Keep me <https://www.example.com/ok>\n\
                     [](<https:/www.canva.com/design>)\n\
                     Last line";
        let result = drop_malformed_link_lines(input);
        assert_eq!(result, "Keep me <https://www.example.com/ok>\nLast line");
    }

    #[test]
    fn contact_lines_are_dropped() {
        let input = "Intro\nWrite to sales@example.com today\nCall 555-123-4567\nOutro";
        assert_eq!(drop_contact_lines(input), "Intro\nOutro");
    }

    #[test]
    fn contact_scrub_is_opt_in() {
        let input = "Write to sales@example.com\n";
        let base = Url::parse("https://example.com/").unwrap();

        let kept = run_pipeline(input, Some(&base), CleanupOptions::default());
        assert!(kept.contains("sales@example.com"));

        let scrubbed = run_pipeline(input, Some(&base), CleanupOptions { scrub_contacts: true });
        assert!(!scrubbed.contains("sales@example.com"));
    }

    #[test]
    fn relative_links_resolve_against_page() {
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        assert_eq!(
            resolve_links("[Next](/api/reference)", Some(&base)),
            "[Next](https://docs.example.com/api/reference)"
        );
        assert_eq!(
            resolve_links("[Sibling](setup)", Some(&base)),
            "[Sibling](https://docs.example.com/guide/setup)"
        );
    }

    #[test]
    fn absolute_anchor_and_image_links_untouched() {
        let base = Url::parse("https://docs.example.com/page").unwrap();
        for input in [
            "[Link](https://other.com/page)",
            "[Section](#section-1)",
            "![Logo](/img/logo.png)",
            "[Mail](mailto:docs@example.com)",
        ] {
            assert_eq!(resolve_links(input, Some(&base)), input);
        }
    }

    #[test]
    fn trailing_whitespace_and_newlines_normalized() {
        assert_eq!(trim_line_ends("Line 1   \nLine 2\t"), "Line 1\nLine 2");
        assert_eq!(ensure_trailing_newline("Content"), "Content\n");
        assert_eq!(ensure_trailing_newline("Content\n\n\n"), "Content\n");
    }

    #[test]
    fn full_pipeline_cleans_markdown() {
        let input = "# Title\n\n\n\n\n\n## Section\n\n<div>Some content</div>\n\n```language-python\nprint('hi')\n```\n\nEnd";
        let base = Url::parse("https://example.com/page").unwrap();
        let result = run_pipeline(input, Some(&base), CleanupOptions::default());

        assert!(!result.contains("\n\n\n\n"));
        assert!(result.contains("```python"));
        assert!(!result.contains("<div>"));
        assert!(result.contains("Some content"));
        assert!(result.ends_with("End\n"));
    }
}
