use std::collections::HashMap;

use anyhow::Context as _;
use serde_json::{Map, Value};

use crate::entries::id_from_value;
use crate::error::ReaderError;
use crate::formats::{EditedText, Entry};

/// Persisted edits keyed by entry id, as stored under `editedBaits`.
///
/// Values stay raw so one corrupt record never hides the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRecords {
    records: Map<String, Value>,
}

impl EditRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the stored JSON for display. Anything but an object is treated
    /// as no edits.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match Self::parse_stored(raw) {
            Ok(edits) => edits,
            Err(err) => {
                tracing::warn!(%err, "ignoring stored edits");
                Self::default()
            }
        }
    }

    /// Strict decode for read-modify-write. Rewriting an unreadable blob
    /// would drop every earlier edit, so it is an error here.
    pub fn parse_stored(raw: Option<&str>) -> anyhow::Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        match serde_json::from_str::<Value>(raw).context("stored edits are not valid json")? {
            Value::Object(records) => Ok(Self { records }),
            other => anyhow::bail!("stored edits are not an object: {other}"),
        }
    }

    pub fn to_stored(&self) -> String {
        Value::Object(self.records.clone()).to_string()
    }

    pub fn insert(&mut self, id: i64, text: EditedText) {
        let value = serde_json::json!({
            "indo": text.primary_text,
            "inggris": text.secondary_text,
        });
        self.records.insert(id.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.decoded().contains_key(&id)
    }

    /// Well-formed records keyed by numeric id. Corrupt ones are logged and
    /// skipped.
    pub fn decoded(&self) -> HashMap<i64, EditedText> {
        let mut decoded = HashMap::new();
        for (key, value) in &self.records {
            match decode_record(key, value) {
                Ok(Some((id, text))) => {
                    decoded.insert(id, text);
                }
                Ok(None) => {
                    tracing::debug!(key, "stored edit key is not an entry id; skipping");
                }
                Err(err) => {
                    tracing::warn!(%err, "skipping stored edit");
                }
            }
        }
        decoded
    }
}

fn decode_record(key: &str, value: &Value) -> Result<Option<(i64, EditedText)>, ReaderError> {
    let Some(id) = id_from_value(&Value::String(key.to_owned())) else {
        return Ok(None);
    };
    let text = serde_json::from_value::<EditedText>(value.clone()).map_err(|err| {
        ReaderError::MalformedStoredEdit {
            id: key.to_owned(),
            reason: err.to_string(),
        }
    })?;
    Ok(Some((id, text)))
}

/// Returns a copy of `entries` with stored edits applied. Order is kept and
/// entries without an edit pass through unchanged.
pub fn apply_edits(entries: &[Entry], edits: &EditRecords) -> Vec<Entry> {
    let decoded = edits.decoded();
    entries
        .iter()
        .map(|entry| {
            let mut entry = entry.clone();
            if let Some(text) = decoded.get(&entry.id) {
                entry.primary_text = text.primary_text.clone();
                entry.secondary_text = text.secondary_text.clone();
            }
            entry
        })
        .collect()
}
