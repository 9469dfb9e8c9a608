use serde_json::Value;

use crate::error::{ReaderError, Result};
use crate::formats::Entry;
use crate::source::CorpusSource;

/// Fetches one sub-chapter and normalizes it to an ordered entry list.
///
/// An empty list is a valid sub-chapter, not a failure.
pub async fn load_entries(source: &dyn CorpusSource, file: &str) -> Result<Vec<Entry>> {
    let payload = source
        .fetch_json(file)
        .await
        .map_err(|err| ReaderError::subchapter(file, format!("{err:#}")))?;
    let entries = normalize_payload(payload);
    tracing::debug!(file, entries = entries.len(), "loaded sub-chapter");
    Ok(entries)
}

/// Like [`load_entries`], but a failure degrades to an empty list.
pub async fn load_entries_or_empty(source: &dyn CorpusSource, file: &str) -> Vec<Entry> {
    match load_entries(source, file).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(file, %err, "sub-chapter fetch failed; treating as empty");
            Vec::new()
        }
    }
}

/// Accepts either a bare array or `{ "baits": [...] }`. Anything else has no
/// entries.
pub fn normalize_payload(payload: Value) -> Vec<Entry> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("baits") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(local_index, item)| entry_from_value(local_index, &item))
        .collect()
}

fn entry_from_value(local_index: usize, item: &Value) -> Entry {
    let default_id = local_index as i64 + 1;
    Entry {
        id: item.get("id").and_then(id_from_value).unwrap_or(default_id),
        primary_text: text_field(item, "indo").unwrap_or_default(),
        secondary_text: text_field(item, "inggris").unwrap_or_default(),
        title: text_field(item, "title").filter(|s| !s.is_empty()),
        description: text_field(item, "description").filter(|s| !s.is_empty()),
    }
}

pub(crate) fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn text_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
