//! Turning free-form model output into an [`ArticleDraft`].
//!
//! Models are asked for bare JSON but routinely wrap it in code fences or
//! surround it with commentary. Extraction slices from the first `{` to the
//! last `}` and parses whatever is in between; only when that fails are the
//! fences stripped and the slice retried, so fenced code inside string
//! values survives. Unrelated braces in the surrounding prose can still
//! defeat the slice; in that case, and in every other failure, the draft degrades to fixed
//! fallback text instead of failing.

use bw_core::ArticleDraft;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const DEFAULT_TOPIC: &str = "The Future of Web Development";
pub const FALLBACK_CONTENT: &str =
    "We are currently unable to generate the full content for this article. Please check back later.";
pub const DEFAULT_TAGS: [&str; 2] = ["Technology", "Software"];
pub const MAX_TAGS: usize = 3;

const COMBINED_FALLBACK_TITLE: &str = "Exploring Technology";
const COMBINED_FIELD_EXCERPT: &str = "A comprehensive guide.";
const COMBINED_PARSE_EXCERPT: &str = "A comprehensive guide to technology.";

const LABELS: [&str; 3] = ["title:", "excerpt:", "article:"];

pub fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}

fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    match text.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => text[label.len()..].trim_start(),
        _ => text,
    }
}

/// Remove the usual LLM artifacts from a short piece of text: one
/// surrounding quote on each side, then a leading `Title:`, `Excerpt:` or
/// `Article:` label, then surrounding whitespace.
pub fn clean_text(text: &str) -> String {
    const QUOTES: &[char] = &['"', '\''];

    let mut text = text;
    if let Some(rest) = text.strip_prefix(QUOTES) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(QUOTES) {
        text = rest;
    }
    for label in LABELS {
        text = strip_label(text, label);
    }
    text.trim().to_string()
}

/// Drop ```` ```json ```` markers (and the newline after them) and bare
/// ```` ``` ```` markers (and the newline before them).
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("```json") {
            rest = after.strip_prefix('\n').unwrap_or(after);
        } else if let Some(after) = rest.strip_prefix("\n```") {
            rest = after;
        } else if let Some(after) = rest.strip_prefix("```") {
            rest = after;
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    out
}

/// Everything from the first `{` through the last `}`. Text without such a
/// pair is returned as is.
fn brace_slice(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &text[start..=end],
        _ => text,
    }
}

/// The candidate JSON text once fences are removed.
pub fn extract_json_slice(text: &str) -> String {
    brace_slice(&strip_code_fences(text)).to_string()
}

/// Parse the model output as a JSON object. Anything else is `None`.
pub fn parse_json_object(raw: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(brace_slice(raw)) {
        return Some(map);
    }

    let candidate = extract_json_slice(raw);
    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            warn!("Model output parsed as JSON but is not an object");
            debug!("Parsed value: {}", other);
            None
        }
        Err(e) => {
            warn!("Failed to parse model output as JSON: {}", e);
            debug!("Raw response: {}", raw);
            None
        }
    }
}

/// Non-empty string value for `key` after [`clean_text`].
fn cleaned_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

fn raw_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn tags_field(data: &Map<String, Value>) -> Vec<String> {
    match data.get("tags").and_then(Value::as_array) {
        Some(tags) => tags
            .iter()
            .filter_map(Value::as_str)
            .take(MAX_TAGS)
            .map(str::to_string)
            .collect(),
        None => default_tags(),
    }
}

/// Build a draft for an article written about `topic`.
pub fn parse_article_draft(raw: &str, topic: &str) -> ArticleDraft {
    let Some(data) = parse_json_object(raw) else {
        return ArticleDraft {
            topic: Some(topic.to_string()),
            title: format!("Exploring {}", topic),
            excerpt: format!("A comprehensive guide to {}.", topic),
            content: FALLBACK_CONTENT.to_string(),
            tags: default_tags(),
        };
    };

    ArticleDraft {
        topic: Some(topic.to_string()),
        title: cleaned_field(&data, "title").unwrap_or_else(|| format!("Exploring {}", topic)),
        excerpt: cleaned_field(&data, "excerpt").unwrap_or_else(|| format!("A guide to {}", topic)),
        content: raw_field(&data, "content")
            .unwrap_or_else(|| format!("Content generation failed for {}", topic)),
        tags: tags_field(&data),
    }
}

/// Build a draft from a response in which the model also chose the topic.
pub fn parse_topic_and_article(raw: &str) -> ArticleDraft {
    let Some(data) = parse_json_object(raw) else {
        return ArticleDraft {
            topic: Some(DEFAULT_TOPIC.to_string()),
            title: COMBINED_FALLBACK_TITLE.to_string(),
            excerpt: COMBINED_PARSE_EXCERPT.to_string(),
            content: FALLBACK_CONTENT.to_string(),
            tags: default_tags(),
        };
    };

    ArticleDraft {
        topic: Some(cleaned_field(&data, "topic").unwrap_or_else(|| DEFAULT_TOPIC.to_string())),
        title: cleaned_field(&data, "title").unwrap_or_else(|| COMBINED_FALLBACK_TITLE.to_string()),
        excerpt: cleaned_field(&data, "excerpt")
            .unwrap_or_else(|| COMBINED_FIELD_EXCERPT.to_string()),
        content: raw_field(&data, "content").unwrap_or_else(|| FALLBACK_CONTENT.to_string()),
        tags: tags_field(&data),
    }
}
