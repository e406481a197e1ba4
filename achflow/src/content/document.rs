//! Rendering of curated documents for prompt consumption.

use crate::cache::Document;
use serde_json::Value;

fn metadata_text(document: &Document, key: &str) -> String {
    match document.metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Renders a curated document as self-contained Markdown.
///
/// Layout: `# title`, the source link, keywords, the summary as a
/// blockquote, a `---` rule, then the cleaned content. The result is trimmed
/// and ends with exactly one newline.
#[must_use]
pub fn format_curated_document(url: &str, document: &Document) -> String {
    let title = metadata_text(document, "title");
    let keywords = metadata_text(document, "keywords");
    let summary = metadata_text(document, "summary").replace('\n', "\n>");

    let rendered = format!(
        "# {title}\n\n\
         **URL**: [{url}]({url})\n\n\
         **Keywords**: {keywords}\n\n\
         **Summary**:\n\n\
         > {summary}\n\n\
         ---\n\n\
         {content}",
        content = document.content,
    );

    let mut out = rendered.trim().to_string();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Metadata;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_format_curated_document() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!("On Things"));
        metadata.insert("keywords".into(), json!(["alpha", "beta"]));
        metadata.insert("summary".into(), json!("Line one.\nLine two."));
        let document = Document::new(metadata, "Body text.\n\n");

        let rendered = format_curated_document("https://a.example", &document);

        assert_eq!(
            rendered,
            "# On Things\n\n\
             **URL**: [https://a.example](https://a.example)\n\n\
             **Keywords**: alpha, beta\n\n\
             **Summary**:\n\n\
             > Line one.\n>Line two.\n\n\
             ---\n\n\
             Body text.\n"
        );
    }

    #[test]
    fn test_missing_metadata_renders_empty_fields() {
        let rendered = format_curated_document("u", &Document::new(Metadata::new(), "c"));
        assert!(rendered.starts_with("# \n\n**URL**: [u](u)"));
        assert!(rendered.ends_with("---\n\nc\n"));
    }
}
