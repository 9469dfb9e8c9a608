use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "files")]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(rename = "bab")]
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "subbabs", default)]
    pub subchapters: Vec<SubchapterRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubchapterRef {
    pub file: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One bait. `primary_text` is the Indonesian rendering, `secondary_text`
/// the English one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    #[serde(rename = "indo")]
    pub primary_text: String,
    #[serde(rename = "inggris")]
    pub secondary_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedText {
    #[serde(rename = "indo")]
    pub primary_text: String,
    #[serde(rename = "inggris")]
    pub secondary_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub entry_id: i64,
    pub primary_text: String,
    pub secondary_text: String,
    pub title: String,
    pub description: String,
    pub chapter_number: i64,
    pub chapter_title: String,
    pub subchapter_title: String,
    pub file: String,
    pub subchapter_index: usize,
    pub local_index: usize,
}

/// Address of one sub-chapter inside the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    pub chapter_number: i64,
    pub subchapter_index: usize,
    #[serde(default)]
    pub title: String,
}

/// Persisted under the `lastRead` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRead {
    pub file: String,
    pub bab: i64,
    pub index: usize,
}

impl From<&Position> for LastRead {
    fn from(position: &Position) -> Self {
        Self {
            file: position.file.clone(),
            bab: position.chapter_number,
            index: position.subchapter_index,
        }
    }
}

/// 1-based number of an entry across the whole corpus.
pub fn global_number(offset: usize, local_index: usize) -> usize {
    offset + local_index + 1
}
