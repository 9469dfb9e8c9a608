use futures::future::join_all;
use tokio::sync::OnceCell;

use crate::entries::load_entries_or_empty;
use crate::error::Result;
use crate::formats::{Entry, IndexRecord, Manifest};
use crate::manifest::load_manifest;
use crate::source::CorpusSource;

/// Most records a single query returns. There is no next page.
pub const RESULT_CAP: usize = 300;

/// Flattens the corpus into index records in (chapter, sub-chapter, local
/// index) order. `entries` holds one list per sub-chapter in manifest order.
pub fn flatten(manifest: &Manifest, entries: Vec<Vec<Entry>>) -> Vec<IndexRecord> {
    let mut per_subchapter = entries.into_iter();
    let mut records = Vec::new();

    for chapter in &manifest.chapters {
        for (subchapter_index, subchapter) in chapter.subchapters.iter().enumerate() {
            let subchapter_entries = per_subchapter.next().unwrap_or_default();
            for (local_index, entry) in subchapter_entries.into_iter().enumerate() {
                records.push(IndexRecord {
                    entry_id: entry.id,
                    primary_text: entry.primary_text,
                    secondary_text: entry.secondary_text,
                    title: entry.title.unwrap_or_default(),
                    description: entry.description.unwrap_or_default(),
                    chapter_number: chapter.number,
                    chapter_title: chapter.title.clone(),
                    subchapter_title: subchapter.title.clone(),
                    file: subchapter.file.clone(),
                    subchapter_index,
                    local_index,
                });
            }
        }
    }

    records
}

/// Loads the manifest once, then every sub-chapter concurrently. A
/// sub-chapter that fails to load contributes no records.
pub async fn build_index(
    source: &dyn CorpusSource,
    manifest_locator: &str,
) -> Result<Vec<IndexRecord>> {
    let manifest = load_manifest(source, manifest_locator).await?;
    let fetches = manifest
        .chapters
        .iter()
        .flat_map(|chapter| chapter.subchapters.iter())
        .map(|subchapter| load_entries_or_empty(source, &subchapter.file));
    let entries = join_all(fetches).await;

    let records = flatten(&manifest, entries);
    tracing::info!(
        subchapters = manifest.subchapter_count(),
        records = records.len(),
        "built search index"
    );
    Ok(records)
}

/// Case-insensitive substring match over both texts, the title and the id.
pub fn matches(record: &IndexRecord, needle_lower: &str) -> bool {
    record.primary_text.to_lowercase().contains(needle_lower)
        || record.secondary_text.to_lowercase().contains(needle_lower)
        || record.title.to_lowercase().contains(needle_lower)
        || record.entry_id.to_string().contains(needle_lower)
}

/// First `cap` matches of `query`, in index order. A blank query matches
/// nothing.
pub fn filter(records: &[IndexRecord], query: &str, cap: usize) -> Vec<IndexRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|record| matches(record, &needle))
        .take(cap)
        .cloned()
        .collect()
}

/// One index build per session. A failed build is retried on the next call.
#[derive(Debug, Default)]
pub struct IndexMemo {
    records: OnceCell<Vec<IndexRecord>>,
}

impl IndexMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_build(
        &self,
        source: &dyn CorpusSource,
        manifest_locator: &str,
    ) -> Result<&[IndexRecord]> {
        let records = self
            .records
            .get_or_try_init(|| build_index(source, manifest_locator))
            .await?;
        Ok(records.as_slice())
    }

    pub fn is_built(&self) -> bool {
        self.records.initialized()
    }
}
