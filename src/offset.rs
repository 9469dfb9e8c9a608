use futures::future::join_all;

use crate::entries::load_entries_or_empty;
use crate::formats::Manifest;
use crate::source::CorpusSource;

/// Files that precede `(target_chapter, target_subchapter_index)` in
/// traversal order.
///
/// Chapters are matched by number. Traversal stops at the first chapter whose
/// number equals the target; a chapter with a larger number that appears
/// before the match contributes nothing.
pub fn preceding_files(
    manifest: &Manifest,
    target_chapter: i64,
    target_subchapter_index: usize,
) -> Vec<&str> {
    let mut files = Vec::new();
    for chapter in &manifest.chapters {
        if chapter.number < target_chapter {
            files.extend(chapter.subchapters.iter().map(|s| s.file.as_str()));
        } else if chapter.number == target_chapter {
            files.extend(
                chapter
                    .subchapters
                    .iter()
                    .take(target_subchapter_index)
                    .map(|s| s.file.as_str()),
            );
            break;
        } else {
            tracing::warn!(
                chapter = chapter.number,
                target_chapter,
                "chapter numbers are not ascending; skipping chapter in offset"
            );
        }
    }
    files
}

/// Number of entries before the target sub-chapter.
///
/// Preceding sub-chapters are fetched concurrently; one that fails to load
/// counts as empty.
pub async fn compute_offset(
    source: &dyn CorpusSource,
    manifest: &Manifest,
    target_chapter: i64,
    target_subchapter_index: usize,
) -> usize {
    let files = preceding_files(manifest, target_chapter, target_subchapter_index);
    let counts = join_all(
        files
            .iter()
            .map(|file| async move { load_entries_or_empty(source, file).await.len() }),
    )
    .await;

    let offset = counts.into_iter().sum();
    tracing::debug!(
        target_chapter,
        target_subchapter_index,
        preceding = files.len(),
        offset,
        "computed global offset"
    );
    offset
}
