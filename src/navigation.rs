use crate::formats::{Manifest, Position};

/// Where a next/previous step lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Another sub-chapter of the same chapter.
    Within(Position),
    /// The first (or last) sub-chapter of a neighbouring chapter.
    Chapter { position: Position, chapter_title: String },
    /// No further sub-chapter in that direction.
    End,
}

impl Step {
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Within(position) | Self::Chapter { position, .. } => Some(position),
            Self::End => None,
        }
    }
}

pub fn next(manifest: &Manifest, current: &Position) -> Step {
    let Some((chapter_index, chapter)) = manifest.chapter(current.chapter_number) else {
        return Step::End;
    };
    let subchapter_index = locate(manifest, current);

    if let Some(index) = subchapter_index
        && index + 1 < chapter.subchapters.len()
    {
        let subchapter = &chapter.subchapters[index + 1];
        return Step::Within(Position {
            file: subchapter.file.clone(),
            chapter_number: chapter.number,
            subchapter_index: index + 1,
            title: subchapter.title.clone(),
        });
    }

    match manifest.chapters.get(chapter_index + 1) {
        Some(next_chapter) => match next_chapter.subchapters.first() {
            Some(first) => Step::Chapter {
                position: Position {
                    file: first.file.clone(),
                    chapter_number: next_chapter.number,
                    subchapter_index: 0,
                    title: first.title.clone(),
                },
                chapter_title: next_chapter.title.clone(),
            },
            None => Step::End,
        },
        None => Step::End,
    }
}

pub fn prev(manifest: &Manifest, current: &Position) -> Step {
    let Some((chapter_index, chapter)) = manifest.chapter(current.chapter_number) else {
        return Step::End;
    };

    if let Some(index) = locate(manifest, current)
        && index > 0
    {
        let subchapter = &chapter.subchapters[index - 1];
        return Step::Within(Position {
            file: subchapter.file.clone(),
            chapter_number: chapter.number,
            subchapter_index: index - 1,
            title: subchapter.title.clone(),
        });
    }

    let Some(prev_chapter) = chapter_index
        .checked_sub(1)
        .and_then(|i| manifest.chapters.get(i))
    else {
        return Step::End;
    };
    match prev_chapter.subchapters.last() {
        Some(last) => Step::Chapter {
            position: Position {
                file: last.file.clone(),
                chapter_number: prev_chapter.number,
                subchapter_index: prev_chapter.subchapters.len() - 1,
                title: last.title.clone(),
            },
            chapter_title: prev_chapter.title.clone(),
        },
        None => Step::End,
    }
}

/// Index of the current file inside its chapter. The file reference wins over
/// the stored index when both are present.
fn locate(manifest: &Manifest, current: &Position) -> Option<usize> {
    let (_, chapter) = manifest.chapter(current.chapter_number)?;
    chapter
        .subchapters
        .iter()
        .position(|s| s.file == current.file)
        .or_else(|| {
            (current.subchapter_index < chapter.subchapters.len())
                .then_some(current.subchapter_index)
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::manifest::parse_manifest;

    fn manifest() -> Manifest {
        parse_manifest(json!({
            "files": [
                {"bab": 1, "title": "Bab Satu", "subbabs": [
                    {"file": "b1s1.json", "title": "a"},
                    {"file": "b1s2.json", "title": "b"}
                ]},
                {"bab": 2, "title": "Bab Dua", "subbabs": [
                    {"file": "b2s1.json", "title": "c"}
                ]}
            ]
        }))
        .expect("manifest")
    }

    #[test]
    fn next_walks_within_then_across_chapters() {
        let manifest = manifest();
        let start = manifest.position(1, 0).expect("start");

        let step = next(&manifest, &start);
        assert!(matches!(&step, Step::Within(p) if p.file == "b1s2.json"));

        let step = next(&manifest, step.position().expect("position"));
        match &step {
            Step::Chapter {
                position,
                chapter_title,
            } => {
                assert_eq!(position.file, "b2s1.json");
                assert_eq!(chapter_title, "Bab Dua");
            }
            other => panic!("unexpected step: {other:?}"),
        }

        assert_eq!(next(&manifest, step.position().expect("position")), Step::End);
    }

    #[test]
    fn prev_lands_on_last_subchapter_of_previous_chapter() {
        let manifest = manifest();
        let start = manifest.position(2, 0).expect("start");
        let step = prev(&manifest, &start);
        assert_eq!(step.position().map(|p| p.file.as_str()), Some("b1s2.json"));
        assert_eq!(
            step.position().map(|p| p.subchapter_index),
            Some(1)
        );

        let first = manifest.position(1, 0).expect("first");
        assert_eq!(prev(&manifest, &first), Step::End);
    }
}
