//! Document format transformation.
//!
//! Conversions are dispatched through an explicit (source, target) table.
//! When no direct entry exists the transformer attempts a two-hop conversion
//! through markdown as the canonical intermediate; pairs that still have no
//! route (pdf, docx) fail with an unsupported-conversion error.

use std::fmt;

use pulldown_cmark::{html, Event, Options, Parser, TagEnd};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{DocascodeError, Result};

/// Supported document formats (closed enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Html,
    Json,
    Text,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Html => "html",
            DocumentFormat::Json => "json",
            DocumentFormat::Text => "text",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" => Ok(DocumentFormat::Markdown),
            "html" => Ok(DocumentFormat::Html),
            "json" => Ok(DocumentFormat::Json),
            "text" => Ok(DocumentFormat::Text),
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            other => Err(DocascodeError::InvalidInput(format!(
                "Unknown document format: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type ConvertFn = fn(&DocumentTransformer, &str, &Map<String, Value>) -> Result<String>;

/// Transform documents between formats.
#[derive(Debug, Default)]
pub struct DocumentTransformer;

impl DocumentTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Convert `content` from `source` to `target` format.
    ///
    /// Identity conversions return the content unchanged. Unroutable pairs
    /// (anything involving pdf or docx) fail with
    /// [`DocascodeError::Unsupported`].
    pub fn transform(
        &self,
        content: &str,
        source: DocumentFormat,
        target: DocumentFormat,
        options: &Map<String, Value>,
    ) -> Result<String> {
        if source == target {
            return Ok(content.to_string());
        }

        if let Some(convert) = direct_conversion(source, target) {
            log::debug!("Transforming {} -> {}", source, target);
            return convert(self, content, options);
        }

        // Two-hop fallback through markdown as the canonical intermediate.
        if let (Some(to_md), Some(from_md)) = (
            direct_conversion(source, DocumentFormat::Markdown),
            direct_conversion(DocumentFormat::Markdown, target),
        ) {
            log::debug!("Transforming {} -> markdown -> {}", source, target);
            let intermediate = to_md(self, content, options)?;
            return from_md(self, &intermediate, options);
        }

        Err(DocascodeError::Unsupported(format!(
            "Unsupported transformation: {} -> {}",
            source, target
        )))
    }

    // --- Markdown transformations ---

    fn markdown_to_html(&self, content: &str, options: &Map<String, Value>) -> Result<String> {
        let mut cmark_options = Options::empty();
        cmark_options.insert(Options::ENABLE_TABLES);
        cmark_options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(content, cmark_options);
        let mut body = String::new();
        html::push_html(&mut body, parser);

        if options
            .get("full_document")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let title = options
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Document");
            let css = options.get("css").and_then(Value::as_str).unwrap_or("");
            return Ok(format!(
                r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
                line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; }}
        code {{ background: #f4f4f4; padding: 2px 6px; border-radius: 3px; }}
        pre {{ background: #f4f4f4; padding: 15px; border-radius: 5px; overflow-x: auto; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
        th {{ background-color: #f4f4f4; }}
        {css}
    </style>
</head>
<body>
{body}
</body>
</html>"#
            ));
        }

        Ok(body)
    }

    fn markdown_to_text(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let parser = Parser::new(content);
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();

        for event in parser {
            match event {
                Event::Text(text) | Event::Code(text) => current.push_str(&text),
                Event::SoftBreak | Event::HardBreak => current.push(' '),
                Event::End(
                    TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
                ) => {
                    if !current.trim().is_empty() {
                        lines.push(current.trim().to_string());
                    }
                    current.clear();
                }
                _ => {}
            }
        }
        if !current.trim().is_empty() {
            lines.push(current.trim().to_string());
        }

        Ok(lines.join("\n"))
    }

    fn markdown_to_json(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let mut sections: Vec<Value> = Vec::new();
        let mut heading: Option<(usize, String)> = None;
        let mut body: Vec<&str> = Vec::new();

        let flush =
            |heading: &mut Option<(usize, String)>, body: &mut Vec<&str>, sections: &mut Vec<Value>| {
                let text = body.join("\n").trim().to_string();
                match heading.take() {
                    Some((level, title)) => sections.push(json!({
                        "type": "heading",
                        "level": level,
                        "title": title,
                        "content": text,
                    })),
                    None => {
                        if !text.is_empty() {
                            sections.push(json!({"type": "content", "content": text}));
                        }
                    }
                }
                body.clear();
            };

        for line in content.lines() {
            let stripped = line.trim();
            if stripped.starts_with('#') {
                flush(&mut heading, &mut body, &mut sections);
                let level = stripped.chars().take_while(|c| *c == '#').count();
                let title = stripped.trim_start_matches('#').trim().to_string();
                heading = Some((level, title));
            } else {
                body.push(line);
            }
        }
        flush(&mut heading, &mut body, &mut sections);

        let result = json!({"format": "markdown", "sections": sections});
        Ok(serde_json::to_string_pretty(&result)?)
    }

    // --- HTML transformations ---

    fn html_to_markdown(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let mut reader = Reader::from_str(content);
        let mut buf = Vec::new();
        let mut out = String::new();
        let mut skip_depth = 0usize;
        // (is_ordered, next item index) per open list
        let mut list_stack: Vec<(bool, usize)> = Vec::new();
        let mut link_href: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(XmlEvent::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if skip_depth > 0 {
                        skip_depth += 1;
                        continue;
                    }
                    match name.as_str() {
                        "script" | "style" => skip_depth = 1,
                        "h1" => out.push_str("\n# "),
                        "h2" => out.push_str("\n## "),
                        "h3" => out.push_str("\n### "),
                        "strong" | "b" => out.push_str("**"),
                        "em" | "i" => out.push('*'),
                        "code" => out.push('`'),
                        "a" => {
                            let href = e
                                .attributes()
                                .filter_map(|a| a.ok())
                                .find(|a| a.key.as_ref() == b"href")
                                .map(|a| String::from_utf8_lossy(&a.value).to_string())
                                .unwrap_or_default();
                            link_href = Some(href);
                            out.push('[');
                        }
                        "ul" => list_stack.push((false, 1)),
                        "ol" => list_stack.push((true, 1)),
                        "li" => match list_stack.last_mut() {
                            Some((true, idx)) => {
                                out.push_str(&format!("\n{}. ", idx));
                                *idx += 1;
                            }
                            _ => out.push_str("\n- "),
                        },
                        "p" | "div" | "blockquote" | "pre" => out.push('\n'),
                        _ => {}
                    }
                }
                Ok(XmlEvent::Empty(e)) => {
                    if skip_depth > 0 {
                        continue;
                    }
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name == "br" || name == "hr" {
                        out.push('\n');
                    }
                }
                Ok(XmlEvent::Text(e)) => {
                    if skip_depth > 0 {
                        continue;
                    }
                    out.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(XmlEvent::End(e)) => {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                        continue;
                    }
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "h1" | "h2" | "h3" | "p" | "div" | "blockquote" | "pre" => out.push('\n'),
                        "strong" | "b" => out.push_str("**"),
                        "em" | "i" => out.push('*'),
                        "code" => out.push('`'),
                        "a" => {
                            let href = link_href.take().unwrap_or_default();
                            out.push_str(&format!("]({})", href));
                        }
                        "ul" | "ol" => {
                            list_stack.pop();
                            out.push('\n');
                        }
                        _ => {}
                    }
                }
                Ok(XmlEvent::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(DocascodeError::InvalidInput(format!(
                        "Failed to parse HTML: {}",
                        e
                    )))
                }
            }
            buf.clear();
        }

        Ok(collapse_blank_lines(&out))
    }

    fn html_to_text(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let mut reader = Reader::from_str(content);
        let mut buf = Vec::new();
        let mut lines: Vec<String> = Vec::new();
        let mut skip_depth = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(XmlEvent::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if skip_depth > 0 || name == "script" || name == "style" {
                        skip_depth += 1;
                    }
                }
                Ok(XmlEvent::Text(e)) => {
                    if skip_depth == 0 {
                        let text = String::from_utf8_lossy(e.as_ref()).trim().to_string();
                        if !text.is_empty() {
                            lines.push(text);
                        }
                    }
                }
                Ok(XmlEvent::End(_)) => {
                    skip_depth = skip_depth.saturating_sub(1);
                }
                Ok(XmlEvent::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(DocascodeError::InvalidInput(format!(
                        "Failed to parse HTML: {}",
                        e
                    )))
                }
            }
            buf.clear();
        }

        Ok(lines.join("\n"))
    }

    fn html_to_json(&self, content: &str, options: &Map<String, Value>) -> Result<String> {
        let markdown = self.html_to_markdown(content, options)?;
        self.markdown_to_json(&markdown, options)
    }

    // --- Text transformations ---

    fn text_to_markdown(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in content.lines() {
            let stripped = line.trim();
            if stripped.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join(" "));
                    current.clear();
                }
            } else {
                current.push(stripped);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join(" "));
        }

        Ok(paragraphs.join("\n\n"))
    }

    fn text_to_html(&self, content: &str, options: &Map<String, Value>) -> Result<String> {
        let markdown = self.text_to_markdown(content, options)?;
        self.markdown_to_html(&markdown, options)
    }

    fn text_to_json(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let lines: Vec<&str> = content.lines().collect();
        let result = json!({"format": "text", "lines": lines, "content": content});
        Ok(serde_json::to_string_pretty(&result)?)
    }

    // --- JSON transformations ---

    fn json_to_markdown(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        let Ok(data) = serde_json::from_str::<Value>(content) else {
            return Ok(format!("```json\n{}\n```", content));
        };

        // Our structured sections format round-trips back to markdown
        if let Some(sections) = data.get("sections").and_then(Value::as_array) {
            let mut parts: Vec<String> = Vec::new();
            for section in sections {
                if section.get("type").and_then(Value::as_str) == Some("heading") {
                    let level = section.get("level").and_then(Value::as_u64).unwrap_or(1) as usize;
                    let title = section.get("title").and_then(Value::as_str).unwrap_or("");
                    parts.push(format!("{} {}\n", "#".repeat(level), title));
                }
                if let Some(text) = section.get("content").and_then(Value::as_str) {
                    if !text.is_empty() {
                        parts.push(format!("{}\n", text));
                    }
                }
            }
            return Ok(parts.join("\n").trim().to_string());
        }

        Ok(format!(
            "```json\n{}\n```",
            serde_json::to_string_pretty(&data)?
        ))
    }

    fn json_to_html(&self, content: &str, options: &Map<String, Value>) -> Result<String> {
        let markdown = self.json_to_markdown(content, options)?;
        self.markdown_to_html(&markdown, options)
    }

    fn json_to_text(&self, content: &str, _options: &Map<String, Value>) -> Result<String> {
        match serde_json::from_str::<Value>(content) {
            Ok(data) => Ok(serde_json::to_string_pretty(&data)?),
            Err(_) => Ok(content.to_string()),
        }
    }
}

/// Direct conversion table keyed by (source, target).
fn direct_conversion(source: DocumentFormat, target: DocumentFormat) -> Option<ConvertFn> {
    use DocumentFormat::*;
    match (source, target) {
        (Markdown, Html) => Some(DocumentTransformer::markdown_to_html),
        (Markdown, Text) => Some(DocumentTransformer::markdown_to_text),
        (Markdown, Json) => Some(DocumentTransformer::markdown_to_json),
        (Html, Markdown) => Some(DocumentTransformer::html_to_markdown),
        (Html, Text) => Some(DocumentTransformer::html_to_text),
        (Html, Json) => Some(DocumentTransformer::html_to_json),
        (Text, Markdown) => Some(DocumentTransformer::text_to_markdown),
        (Text, Html) => Some(DocumentTransformer::text_to_html),
        (Text, Json) => Some(DocumentTransformer::text_to_json),
        (Json, Markdown) => Some(DocumentTransformer::json_to_markdown),
        (Json, Html) => Some(DocumentTransformer::json_to_html),
        (Json, Text) => Some(DocumentTransformer::json_to_text),
        _ => None,
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    let mut prev_blank = false;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            if !prev_blank {
                cleaned.push("");
            }
            prev_blank = true;
        } else {
            cleaned.push(line);
            prev_blank = false;
        }
    }
    cleaned.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_options() -> Map<String, Value> {
        Map::new()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(DocumentFormat::parse("Markdown").unwrap(), DocumentFormat::Markdown);
        assert!(DocumentFormat::parse("rtf").is_err());
    }

    #[test]
    fn test_identity_transform() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform("# Hi", DocumentFormat::Markdown, DocumentFormat::Markdown, &no_options())
            .unwrap();
        assert_eq!(out, "# Hi");
    }

    #[test]
    fn test_markdown_to_html() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform(
                "# Hello\n\nThis is **bold**.",
                DocumentFormat::Markdown,
                DocumentFormat::Html,
                &no_options(),
            )
            .unwrap();
        assert!(out.contains("<h1>Hello</h1>"));
        assert!(out.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_markdown_to_html_full_document() {
        let transformer = DocumentTransformer::new();
        let mut options = Map::new();
        options.insert("full_document".to_string(), json!(true));
        options.insert("title".to_string(), json!("My Doc"));
        let out = transformer
            .transform("# Hello", DocumentFormat::Markdown, DocumentFormat::Html, &options)
            .unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<title>My Doc</title>"));
    }

    #[test]
    fn test_markdown_to_text_strips_formatting() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform(
                "# Title\n\nSome **bold** and `code`.",
                DocumentFormat::Markdown,
                DocumentFormat::Text,
                &no_options(),
            )
            .unwrap();
        assert_eq!(out, "Title\nSome bold and code.");
    }

    #[test]
    fn test_markdown_to_json_sections() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform(
                "# Title\n\nIntro text.\n\n## Sub\n\nMore.",
                DocumentFormat::Markdown,
                DocumentFormat::Json,
                &no_options(),
            )
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["format"], "markdown");
        let sections = parsed["sections"].as_array().unwrap();
        assert_eq!(sections[0]["type"], "heading");
        assert_eq!(sections[0]["level"], 1);
        assert_eq!(sections[0]["title"], "Title");
        assert_eq!(sections[0]["content"], "Intro text.");
        assert_eq!(sections[1]["title"], "Sub");
    }

    #[test]
    fn test_json_sections_round_trip_to_markdown() {
        let transformer = DocumentTransformer::new();
        let source = "# Title\n\nIntro text.\n\n## Sub\n\nMore.";
        let as_json = transformer
            .transform(source, DocumentFormat::Markdown, DocumentFormat::Json, &no_options())
            .unwrap();
        let back = transformer
            .transform(&as_json, DocumentFormat::Json, DocumentFormat::Markdown, &no_options())
            .unwrap();
        assert!(back.contains("# Title"));
        assert!(back.contains("## Sub"));
        assert!(back.contains("Intro text."));
    }

    #[test]
    fn test_html_to_markdown() {
        let transformer = DocumentTransformer::new();
        let html = "<h1>Title</h1><p>Some <strong>bold</strong> and <a href=\"https://example.com\">a link</a>.</p>";
        let out = transformer
            .transform(html, DocumentFormat::Html, DocumentFormat::Markdown, &no_options())
            .unwrap();
        assert!(out.contains("# Title"));
        assert!(out.contains("**bold**"));
        assert!(out.contains("[a link](https://example.com)"));
    }

    #[test]
    fn test_html_to_markdown_lists() {
        let transformer = DocumentTransformer::new();
        let html = "<ul><li>one</li><li>two</li></ul><ol><li>first</li><li>second</li></ol>";
        let out = transformer
            .transform(html, DocumentFormat::Html, DocumentFormat::Markdown, &no_options())
            .unwrap();
        assert!(out.contains("- one"));
        assert!(out.contains("- two"));
        assert!(out.contains("1. first"));
        assert!(out.contains("2. second"));
    }

    #[test]
    fn test_html_to_text_skips_script() {
        let transformer = DocumentTransformer::new();
        let html = "<html><head><script>alert(1)</script></head><body><p>Visible</p></body></html>";
        let out = transformer
            .transform(html, DocumentFormat::Html, DocumentFormat::Text, &no_options())
            .unwrap();
        assert_eq!(out, "Visible");
    }

    #[test]
    fn test_text_to_markdown_paragraphs() {
        let transformer = DocumentTransformer::new();
        let text = "line one\nline two\n\nsecond paragraph\n";
        let out = transformer
            .transform(text, DocumentFormat::Text, DocumentFormat::Markdown, &no_options())
            .unwrap();
        assert_eq!(out, "line one line two\n\nsecond paragraph");
    }

    #[test]
    fn test_text_to_json() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform("a\nb", DocumentFormat::Text, DocumentFormat::Json, &no_options())
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["format"], "text");
        assert_eq!(parsed["lines"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_json_to_markdown_arbitrary_json_becomes_code_block() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform(
                r#"{"a": 1}"#,
                DocumentFormat::Json,
                DocumentFormat::Markdown,
                &no_options(),
            )
            .unwrap();
        assert!(out.starts_with("```json"));
    }

    #[test]
    fn test_json_to_markdown_invalid_json_wrapped_raw() {
        let transformer = DocumentTransformer::new();
        let out = transformer
            .transform("not json", DocumentFormat::Json, DocumentFormat::Markdown, &no_options())
            .unwrap();
        assert_eq!(out, "```json\nnot json\n```");
    }

    #[test]
    fn test_pdf_unsupported() {
        let transformer = DocumentTransformer::new();
        let err = transformer
            .transform("x", DocumentFormat::Pdf, DocumentFormat::Markdown, &no_options())
            .unwrap_err();
        assert!(matches!(err, DocascodeError::Unsupported(_)));
        assert!(err.to_string().contains("pdf -> markdown"));

        let err = transformer
            .transform("x", DocumentFormat::Markdown, DocumentFormat::Docx, &no_options())
            .unwrap_err();
        assert!(err.to_string().contains("markdown -> docx"));
    }
}
