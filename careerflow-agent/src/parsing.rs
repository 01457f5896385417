//! Structured-output extraction from free-form model text.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Every top-level JSON object embedded in `text`, in order of appearance.
///
/// Tolerates surrounding prose and markdown fences; braces inside JSON
/// strings are ignored when matching.
pub fn extract_json_objects(text: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(begin) = start.take()
                    && let Ok(value) = serde_json::from_str::<Value>(&text[begin..=idx])
                    && value.is_object()
                {
                    objects.push(value);
                }
            }
            _ => {}
        }
    }

    objects
}

/// First embedded object that deserializes into `T`.
pub fn first_object_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract_json_objects(text)
        .into_iter()
        .find_map(|value| serde_json::from_value(value).ok())
}
