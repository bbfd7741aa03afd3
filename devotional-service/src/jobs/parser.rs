//! Turns raw generated text into validated records.
//!
//! Parsing is two-stage: the fence-stripped text as a whole, then the span
//! from the first `{` to the last `}`. The second stage is a lossy recovery
//! for prose wrapped around the object, not a grammar.

use crate::models::{DevotionalContent, NewPassage};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Raw generated text kept in log details.
pub const RAW_PREVIEW_CHARS: usize = 1000;
/// Parsed object preview kept in log details.
pub const PARSED_PREVIEW_CHARS: usize = 500;

pub const PASSAGE_READING_TIME_FALLBACK: i32 = 1;
pub const DEVOTIONAL_READING_TIME_FALLBACK: i32 = 5;

const LINE_BREAK: &str = "<br>";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Generated text contains no parseable JSON")]
    Unparseable { cleaned: String },

    #[error("Generated JSON is not an object")]
    NotAnObject { parsed: Value },

    #[error("Missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<String>, parsed: Value },
}

impl ParseError {
    /// Truncated JSON text of whatever was parsed, if anything.
    pub fn parsed_preview(&self) -> Option<String> {
        match self {
            ParseError::Unparseable { .. } => None,
            ParseError::NotAnObject { parsed } | ParseError::MissingFields { parsed, .. } => {
                Some(truncate(&parsed.to_string(), PARSED_PREVIEW_CHARS))
            }
        }
    }

    pub fn missing_fields(&self) -> &[String] {
        match self {
            ParseError::MissingFields { fields, .. } => fields,
            _ => &[],
        }
    }
}

/// Remove every "```json" and "```" marker, then trim.
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse generated text into a JSON object.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let cleaned = strip_fences(raw);

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(_) => match brace_span(&cleaned).and_then(|span| serde_json::from_str(span).ok()) {
            Some(value) => value,
            None => return Err(ParseError::Unparseable { cleaned }),
        },
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::NotAnObject { parsed: other }),
    }
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// A field as trimmed text. Absent or null is empty; other scalars and
/// nested values use their JSON text.
pub fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// A text field with every line break replaced by `<br>`.
pub fn multiline_field(object: &Map<String, Value>, key: &str) -> String {
    text_field(object, key)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .replace('\n', LINE_BREAK)
}

/// Reading time in minutes; `fallback` when absent, non-numeric or not positive.
pub fn reading_time(object: &Map<String, Value>, fallback: i32) -> i32 {
    let minutes = match object.get("reading_time_estimate") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match minutes {
        Some(m) if m.is_finite() && m >= 0.5 && m <= i32::MAX as f64 => m.round() as i32,
        _ => fallback,
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn missing(errors: &ValidationErrors, parsed: Map<String, Value>) -> ParseError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    ParseError::MissingFields {
        fields,
        parsed: Value::Object(parsed),
    }
}

/// Parse a generated passage. Requires `verse_reference` and `verse_text`.
pub fn parse_passage(raw: &str) -> Result<NewPassage, ParseError> {
    let object = parse_object(raw)?;

    let passage = NewPassage {
        verse_reference: text_field(&object, "verse_reference"),
        verse_text: multiline_field(&object, "verse_text"),
        reading_time_estimate: reading_time(&object, PASSAGE_READING_TIME_FALLBACK),
    };

    match passage.validate() {
        Ok(()) => Ok(passage),
        Err(errors) => Err(missing(&errors, object)),
    }
}

/// Parse a generated devotional. Requires `title`, `description`,
/// `verse_reference` and `verse_text`.
pub fn parse_devotional(raw: &str) -> Result<DevotionalContent, ParseError> {
    let object = parse_object(raw)?;

    let content = DevotionalContent {
        title: text_field(&object, "title"),
        description: text_field(&object, "description"),
        verse_reference: text_field(&object, "verse_reference"),
        verse_text: multiline_field(&object, "verse_text"),
        reflection: text_field(&object, "reflection"),
        application: text_field(&object, "application"),
        prayer: text_field(&object, "prayer"),
        reading_time_estimate: reading_time(&object, DEVOTIONAL_READING_TIME_FALLBACK),
    };

    match content.validate() {
        Ok(()) => Ok(content),
        Err(errors) => Err(missing(&errors, object)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn fenced_json_is_parsed() {
        let raw = "```json\n{\"verse_reference\": \"Tiago 1:5\", \"verse_text\": \"1. Se algum de vós\"}\n```";
        let passage = parse_passage(raw).unwrap();
        assert_eq!(passage.verse_reference, "Tiago 1:5");
        assert_eq!(passage.reading_time_estimate, PASSAGE_READING_TIME_FALLBACK);
    }

    #[test]
    fn prose_around_the_object_is_recovered() {
        let raw = "Aqui está a passagem: {\"verse_reference\": \"Neemias 8:10\", \"verse_text\": \"1. A alegria do Senhor\", \"reading_time_estimate\": 2} Espero que ajude!";
        let passage = parse_passage(raw).unwrap();
        assert_eq!(passage.verse_reference, "Neemias 8:10");
        assert_eq!(passage.reading_time_estimate, 2);
    }

    #[test]
    fn text_without_braces_is_unparseable() {
        let err = parse_object("sorry, I cannot help with that").unwrap_err();
        assert!(matches!(err, ParseError::Unparseable { .. }));
        assert_eq!(err.parsed_preview(), None);
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = parse_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject { .. }));
    }

    #[test]
    fn missing_text_body_fails_validation() {
        let err = parse_passage(r#"{"verse_reference": "Salmos 46:1", "verse_text": "   "}"#)
            .unwrap_err();
        assert_eq!(err.missing_fields(), ["verse_text".to_string()]);
        assert!(err.parsed_preview().unwrap().contains("Salmos 46:1"));
    }

    #[test]
    fn devotional_reports_every_missing_field() {
        let err = parse_devotional(r#"{"title": "Raízes", "verse_text": "texto"}"#).unwrap_err();
        assert_eq!(
            err.missing_fields(),
            ["description".to_string(), "verse_reference".to_string()]
        );
    }

    #[test]
    fn newlines_become_line_break_markers() {
        let raw = json!({
            "verse_reference": "Habacuque 3:17-18",
            "verse_text": "1. Ainda que a figueira não floresça,\r\n2. todavia eu me alegro no Senhor\n"
        })
        .to_string();
        let passage = parse_passage(&raw).unwrap();
        assert_eq!(
            passage.verse_text,
            "1. Ainda que a figueira não floresça,<br>2. todavia eu me alegro no Senhor"
        );
        assert!(!passage.verse_text.contains('\n'));
    }

    #[test]
    fn non_string_fields_are_coerced() {
        let obj = object(json!({
            "title": 42,
            "description": true,
            "reflection": null,
            "application": ["a", "b"]
        }));
        assert_eq!(text_field(&obj, "title"), "42");
        assert_eq!(text_field(&obj, "description"), "true");
        assert_eq!(text_field(&obj, "reflection"), "");
        assert_eq!(text_field(&obj, "prayer"), "");
        assert_eq!(text_field(&obj, "application"), r#"["a","b"]"#);
    }

    #[test]
    fn reading_time_falls_back_when_unusable() {
        assert_eq!(reading_time(&object(json!({"reading_time_estimate": 3})), 5), 3);
        assert_eq!(reading_time(&object(json!({"reading_time_estimate": "4"})), 5), 4);
        assert_eq!(reading_time(&object(json!({"reading_time_estimate": 2.6})), 5), 3);
        assert_eq!(reading_time(&object(json!({"reading_time_estimate": "cinco"})), 5), 5);
        assert_eq!(reading_time(&object(json!({"reading_time_estimate": 0})), 1), 1);
        assert_eq!(reading_time(&object(json!({})), 1), 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("oração", 4), "oraç");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
