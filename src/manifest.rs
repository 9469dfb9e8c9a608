use serde_json::Value;

use crate::error::{ReaderError, Result};
use crate::formats::{Chapter, Manifest, Position};
use crate::source::CorpusSource;

/// Fetches and decodes the corpus manifest. Not cached here.
pub async fn load_manifest(source: &dyn CorpusSource, locator: &str) -> Result<Manifest> {
    let value = source
        .fetch_json(locator)
        .await
        .map_err(|err| ReaderError::ManifestUnavailable {
            locator: locator.to_owned(),
            reason: format!("{err:#}"),
        })?;

    let manifest = parse_manifest(value)?;
    tracing::debug!(
        locator,
        chapters = manifest.chapters.len(),
        subchapters = manifest.subchapter_count(),
        "loaded manifest"
    );
    Ok(manifest)
}

pub fn parse_manifest(value: Value) -> Result<Manifest> {
    let Value::Object(mut object) = value else {
        return Err(ReaderError::CorruptedManifestShape(
            "manifest root is not an object".to_owned(),
        ));
    };
    let Some(files) = object.remove("files") else {
        return Err(ReaderError::CorruptedManifestShape(
            "missing `files`".to_owned(),
        ));
    };
    if !files.is_array() {
        return Err(ReaderError::CorruptedManifestShape(
            "`files` is not an array".to_owned(),
        ));
    }

    let chapters: Vec<Chapter> = serde_json::from_value(files)
        .map_err(|err| ReaderError::CorruptedManifestShape(format!("decode chapters: {err}")))?;
    Ok(Manifest { chapters })
}

impl Manifest {
    pub fn subchapter_count(&self) -> usize {
        self.chapters.iter().map(|c| c.subchapters.len()).sum()
    }

    /// First chapter carrying `number`, by numeric equality.
    pub fn chapter(&self, number: i64) -> Option<(usize, &Chapter)> {
        self.chapters
            .iter()
            .enumerate()
            .find(|(_, chapter)| chapter.number == number)
    }

    pub fn position(&self, chapter_number: i64, subchapter_index: usize) -> Result<Position> {
        let subchapter = self
            .chapter(chapter_number)
            .and_then(|(_, chapter)| chapter.subchapters.get(subchapter_index))
            .ok_or(ReaderError::PositionNotFound {
                chapter: chapter_number,
                subchapter_index,
            })?;
        Ok(Position {
            file: subchapter.file.clone(),
            chapter_number,
            subchapter_index,
            title: subchapter.title.clone(),
        })
    }

    /// Locates a sub-chapter by its file reference.
    pub fn position_of_file(&self, file: &str) -> Option<Position> {
        self.chapters.iter().find_map(|chapter| {
            chapter
                .subchapters
                .iter()
                .position(|s| s.file == file)
                .map(|index| Position {
                    file: file.to_owned(),
                    chapter_number: chapter.number,
                    subchapter_index: index,
                    title: chapter.subchapters[index].title.clone(),
                })
        })
    }

    pub fn first_position(&self) -> Option<Position> {
        let chapter = self.chapters.first()?;
        let subchapter = chapter.subchapters.first()?;
        Some(Position {
            file: subchapter.file.clone(),
            chapter_number: chapter.number,
            subchapter_index: 0,
            title: subchapter.title.clone(),
        })
    }
}
