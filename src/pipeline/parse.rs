//! Extraction of generated items from a provider response

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("response contained no JSON")]
    NoJson,

    #[error("response JSON has no item list")]
    MissingItems,

    #[error("response contained an empty item list")]
    Empty,
}

const ITEM_KEYS: [&str; 3] = ["flashcards", "questions", "items"];

/// Remove a surrounding markdown code fence, if any
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, e.g. ```json
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Find the outermost JSON object or array embedded in prose
fn extract_embedded(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn item_list(value: Value) -> Result<Vec<Value>, ParseError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => ITEM_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or(ParseError::MissingItems),
        _ => Err(ParseError::MissingItems),
    }
}

/// Parse the items of one unit and tag each with its position
pub fn parse_items(text: &str, unit_index: usize) -> Result<Vec<Value>, ParseError> {
    let body = strip_fence(text);
    let value = serde_json::from_str::<Value>(body)
        .ok()
        .or_else(|| extract_embedded(body))
        .ok_or(ParseError::NoJson)?;

    let items = item_list(value)?;
    if items.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let mut object = match item {
                Value::Object(object) => object,
                other => {
                    let mut object = Map::new();
                    object.insert("content".to_string(), other);
                    object
                }
            };
            object.insert("unit_index".to_string(), Value::from(unit_index));
            object.insert("id".to_string(), Value::from(format!("{}-{}", unit_index, position + 1)));
            Value::Object(object)
        })
        .collect())
}
