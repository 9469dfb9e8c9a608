use std::sync::Arc;

use crate::cache::{Subchapter, SubchapterCache};
use crate::entries::load_entries;
use crate::error::{ReaderError, Result};
use crate::formats::{EditedText, Entry, LastRead, Manifest, Position};
use crate::manifest::load_manifest;
use crate::navigation::{self, Step};
use crate::offset::compute_offset;
use crate::overlay::{EditRecords, apply_edits};
use crate::source::SharedSource;
use crate::state_store::{self, StateStore};

/// Short user-facing messages (toasts in a UI, stderr in the CLI).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(text = message, "notify");
    }
}

/// All reader state for one session: manifest memo, sub-chapter cache and
/// the current position.
pub struct ReaderSession {
    source: SharedSource,
    manifest_locator: String,
    manifest: Option<Manifest>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    cache: SubchapterCache,
    current: Option<Position>,
}

impl ReaderSession {
    pub fn new(
        source: SharedSource,
        manifest_locator: impl Into<String>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            source,
            manifest_locator: manifest_locator.into(),
            manifest: None,
            store,
            notifier: Arc::new(LogNotifier),
            cache: SubchapterCache::new(),
            current: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn current(&self) -> Option<&Position> {
        self.current.as_ref()
    }

    pub fn cache(&self) -> &SubchapterCache {
        &self.cache
    }

    pub async fn manifest(&mut self) -> Result<&Manifest> {
        if self.manifest.is_none() {
            match load_manifest(self.source.as_ref(), &self.manifest_locator).await {
                Ok(manifest) => self.manifest = Some(manifest),
                Err(err) => {
                    tracing::error!(%err, "manifest load failed");
                    self.notifier.notify("Could not load the table of contents.");
                    return Err(err);
                }
            }
        }
        self.manifest
            .as_ref()
            .ok_or_else(|| ReaderError::CorruptedManifestShape("manifest missing".to_owned()))
    }

    /// Loads a sub-chapter, from the cache when it was loaded before.
    ///
    /// The first load computes the offset, fetches the entries and applies
    /// stored edits; later loads reuse that result untouched.
    pub async fn load_subchapter(&mut self, position: Position) -> Result<&Subchapter> {
        let file = position.file.clone();
        let cached = self.cache.contains(&file);
        if self.current.as_ref().is_some_and(|current| current.file == file) {
            self.notifier.notify("This sub-chapter is already open.");
        }

        let position = if cached {
            self.cache
                .get(&file)
                .map(|s| s.position.clone())
                .unwrap_or(position)
        } else {
            let subchapter = match self.fetch_subchapter(position).await {
                Ok(subchapter) => subchapter,
                Err(err) => {
                    tracing::error!(file, %err, "sub-chapter load failed");
                    self.notifier.notify("Could not load this sub-chapter.");
                    return Err(err);
                }
            };
            let position = subchapter.position.clone();
            let empty = subchapter.is_empty();
            self.cache.put(subchapter);
            if empty {
                self.notifier.notify("This sub-chapter has no entries.");
            }
            position
        };

        if cached {
            tracing::debug!(file, "sub-chapter served from cache");
        }
        self.remember(&position).await;
        self.current = Some(position);

        self.cache
            .get(&file)
            .ok_or_else(|| ReaderError::subchapter(&file, "missing from cache after load"))
    }

    async fn fetch_subchapter(&mut self, requested: Position) -> Result<Subchapter> {
        let source = Arc::clone(&self.source);
        let manifest = self.manifest().await?;
        let position = resolve_position(manifest, requested)?;

        let offset = compute_offset(
            source.as_ref(),
            manifest,
            position.chapter_number,
            position.subchapter_index,
        )
        .await;
        let entries = load_entries(source.as_ref(), &position.file).await?;
        let edits = self.edits().await;
        let entries = apply_edits(&entries, &edits);

        tracing::info!(
            file = position.file,
            chapter = position.chapter_number,
            subchapter = position.subchapter_index,
            offset,
            entries = entries.len(),
            "loaded sub-chapter"
        );
        Ok(Subchapter {
            position,
            entries,
            offset,
        })
    }

    async fn edits(&self) -> EditRecords {
        match state_store::load_edits(self.store.as_ref()).await {
            Ok(edits) => edits,
            Err(err) => {
                tracing::warn!(?err, "reading stored edits failed; loading without edits");
                EditRecords::new()
            }
        }
    }

    async fn remember(&self, position: &Position) {
        if let Err(err) =
            state_store::save_last_read(self.store.as_ref(), &LastRead::from(position)).await
        {
            tracing::warn!(?err, "saving lastRead failed");
        }
    }

    /// Entries of `file` without opening it: no cache entry, no `lastRead`.
    pub async fn preview(&mut self, file: &str) -> Result<Vec<Entry>> {
        let source = Arc::clone(&self.source);
        if self.manifest().await?.position_of_file(file).is_none() {
            return Err(ReaderError::subchapter(file, "not listed in the manifest"));
        }
        load_entries(source.as_ref(), file).await
    }

    pub async fn go_to(&mut self, chapter: i64, subchapter_index: usize) -> Result<&Subchapter> {
        let position = self.manifest().await?.position(chapter, subchapter_index)?;
        self.load_subchapter(position).await
    }

    pub async fn open_first(&mut self) -> Result<Option<&Subchapter>> {
        let Some(position) = self.manifest().await?.first_position() else {
            return Ok(None);
        };
        self.load_subchapter(position).await.map(Some)
    }

    /// Reopens the last read sub-chapter, or the first one.
    pub async fn resume(&mut self) -> Result<Option<&Subchapter>> {
        let last_read = state_store::load_last_read(self.store.as_ref()).await?;
        let Some(last_read) = last_read else {
            return self.open_first().await;
        };
        let position = Position {
            file: last_read.file,
            chapter_number: last_read.bab,
            subchapter_index: last_read.index,
            title: String::new(),
        };
        self.load_subchapter(position).await.map(Some)
    }

    /// Moves forward; `Ok(None)` at the end of the corpus.
    pub async fn next(&mut self) -> Result<Option<&Subchapter>> {
        self.step(navigation::next).await
    }

    /// Moves back; `Ok(None)` at the start of the corpus.
    pub async fn prev(&mut self) -> Result<Option<&Subchapter>> {
        self.step(navigation::prev).await
    }

    async fn step(
        &mut self,
        direction: fn(&Manifest, &Position) -> Step,
    ) -> Result<Option<&Subchapter>> {
        let Some(current) = self.current.clone() else {
            return self.open_first().await;
        };
        let step = direction(self.manifest().await?, &current);
        match step {
            Step::Within(position) => self.load_subchapter(position).await.map(Some),
            Step::Chapter {
                position,
                chapter_title,
            } => {
                self.notifier.notify(&format!("{chapter_title} begins"));
                self.load_subchapter(position).await.map(Some)
            }
            Step::End => {
                self.notifier.notify("No more sub-chapters in this direction.");
                Ok(None)
            }
        }
    }

    /// Persists an edit and updates cached entries in place.
    ///
    /// Returns how many cached entries changed.
    pub async fn save_edit(
        &mut self,
        id: i64,
        primary_text: &str,
        secondary_text: &str,
    ) -> Result<usize> {
        let text = EditedText {
            primary_text: primary_text.trim().to_owned(),
            secondary_text: secondary_text.trim().to_owned(),
        };

        let mut edits = state_store::load_edits_for_update(self.store.as_ref()).await?;
        edits.insert(id, text.clone());
        state_store::save_edits(self.store.as_ref(), &edits).await?;

        let mut updated = 0;
        for entry in self.cache.entries_mut(id) {
            entry.primary_text = text.primary_text.clone();
            entry.secondary_text = text.secondary_text.clone();
            updated += 1;
        }
        tracing::info!(id, updated, "saved edit");
        self.notifier.notify("Entry saved locally.");
        Ok(updated)
    }

    pub async fn is_edited(&self, id: i64) -> Result<bool> {
        Ok(state_store::load_edits(self.store.as_ref()).await?.contains(id))
    }

    pub async fn toggle_bookmark(&self, id: i64) -> Result<bool> {
        Ok(state_store::toggle_bookmark(self.store.as_ref(), id).await?)
    }

    pub async fn bookmarks(&self) -> Result<Vec<i64>> {
        Ok(state_store::load_bookmarks(self.store.as_ref()).await?)
    }

    /// Flips the displayed language of one entry; `true` shows the secondary
    /// text.
    pub async fn toggle_language(&self, id: i64) -> Result<bool> {
        Ok(state_store::toggle_language(self.store.as_ref(), id).await?)
    }

    pub async fn shows_secondary(&self, id: i64) -> Result<bool> {
        let state = state_store::load_language_state(self.store.as_ref()).await?;
        Ok(state.get(&id.to_string()).copied().unwrap_or(false))
    }
}

/// Trusts the file reference over stale chapter/index numbers.
fn resolve_position(manifest: &Manifest, requested: Position) -> Result<Position> {
    let matches_manifest = manifest
        .chapter(requested.chapter_number)
        .and_then(|(_, chapter)| chapter.subchapters.get(requested.subchapter_index))
        .is_some_and(|s| s.file == requested.file);
    if matches_manifest {
        let mut position = requested;
        if position.title.is_empty() {
            position.title = manifest
                .position(position.chapter_number, position.subchapter_index)?
                .title;
        }
        return Ok(position);
    }

    manifest
        .position_of_file(&requested.file)
        .ok_or(ReaderError::PositionNotFound {
            chapter: requested.chapter_number,
            subchapter_index: requested.subchapter_index,
        })
}
