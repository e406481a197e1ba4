//! HTML to Markdown-flavoured text conversion.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("valid blank-run regex")
});

const SKIPPED: &[&str] = &["script", "style", "noscript", "head", "template", "svg", "iframe"];

const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "blockquote",
    "table", "tr", "ul", "ol", "dl", "figure", "form", "body", "html",
];

/// Converts fetched markup into text suitable for a model prompt.
pub trait TextConverter: Send + Sync {
    /// Converts `raw` to text.
    fn convert(&self, raw: &str) -> String;
}

/// `scraper`-backed converter emitting ATX headings and `- ` list items.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextConverter;

impl HtmlTextConverter {
    /// Creates a converter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TextConverter for HtmlTextConverter {
    fn convert(&self, raw: &str) -> String {
        let document = Html::parse_document(raw);
        let mut out = String::with_capacity(raw.len() / 2);
        walk(document.root_element(), &mut out);
        tidy(&out)
    }
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    render_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return;
    }

    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = inline_text(element);
            if !text.is_empty() {
                out.push_str("\n\n");
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        "br" => out.push('\n'),
        "hr" => out.push_str("\n\n---\n\n"),
        "li" => {
            out.push_str("\n- ");
            out.push_str(&inline_text(element));
        }
        "pre" => {
            let code: String = element.text().collect();
            out.push_str("\n\n```\n");
            out.push_str(code.trim_end());
            out.push_str("\n```\n\n");
        }
        "a" => {
            let text = inline_text(element);
            match element.value().attr("href") {
                Some(href) if !text.is_empty() && !href.starts_with('#') => {
                    out.push('[');
                    out.push_str(&text);
                    out.push_str("](");
                    out.push_str(href);
                    out.push(')');
                }
                _ => out.push_str(&text),
            }
        }
        "strong" | "b" => wrap_inline(element, "**", out),
        "em" | "i" => wrap_inline(element, "*", out),
        _ if BLOCKS.contains(&name) => {
            out.push_str("\n\n");
            walk(element, out);
            out.push_str("\n\n");
        }
        _ => walk(element, out),
    }
}

fn wrap_inline(element: ElementRef<'_>, marker: &str, out: &mut String) {
    let text = inline_text(element);
    if !text.is_empty() {
        out.push_str(marker);
        out.push_str(&text);
        out.push_str(marker);
    }
}

fn inline_text(element: ElementRef<'_>) -> String {
    let mut buffer = String::new();
    walk(element, &mut buffer);
    buffer.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text(out: &mut String, text: &str) {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let leading = text.starts_with(char::is_whitespace);
    let trailing = text.ends_with(char::is_whitespace);

    if collapsed.is_empty() {
        if leading && !out.ends_with(char::is_whitespace) && !out.is_empty() {
            out.push(' ');
        }
        return;
    }
    if leading && !out.ends_with(char::is_whitespace) && !out.is_empty() {
        out.push(' ');
    }
    out.push_str(&collapsed);
    if trailing {
        out.push(' ');
    }
}

fn tidy(text: &str) -> String {
    let trimmed_lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = trimmed_lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(html: &str) -> String {
        HtmlTextConverter::new().convert(html)
    }

    #[test]
    fn test_headings_are_atx() {
        let text = convert("<html><body><h1>Title</h1><h3>Sub <em>part</em></h3></body></html>");
        assert_eq!(text, "# Title\n\n### Sub *part*");
    }

    #[test]
    fn test_scripts_and_head_are_dropped() {
        let text = convert(
            "<html><head><title>T</title><style>p{}</style></head>\
             <body><script>var x = 1;</script><p>Visible</p></body></html>",
        );
        assert_eq!(text, "Visible");
    }

    #[test]
    fn test_paragraphs_and_lists() {
        let text = convert("<p>First   line</p><ul><li>one</li><li>two</li></ul><p>Last</p>");
        assert_eq!(text, "First line\n\n- one\n- two\n\nLast");
    }

    #[test]
    fn test_links_keep_target() {
        let text = convert(r#"<p>See <a href="https://a.example">this page</a>.</p>"#);
        assert_eq!(text, "See [this page](https://a.example).");
    }
}
