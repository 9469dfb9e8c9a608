use std::collections::HashMap;

use crate::formats::{Entry, Position, global_number};

/// A loaded sub-chapter: entries with edits already applied, plus the number
/// of corpus entries before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subchapter {
    pub position: Position,
    pub entries: Vec<Entry>,
    pub offset: usize,
}

impl Subchapter {
    /// Zero entries is a valid state and is rendered differently from a
    /// failure.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn numbered(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(local_index, entry)| (global_number(self.offset, local_index), entry))
    }
}

/// Session-lifetime memo of loaded sub-chapters, keyed by file reference.
/// Never invalidated.
#[derive(Debug, Default)]
pub struct SubchapterCache {
    loaded: HashMap<String, Subchapter>,
}

impl SubchapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file: &str) -> Option<&Subchapter> {
        self.loaded.get(file)
    }

    pub fn get_mut(&mut self, file: &str) -> Option<&mut Subchapter> {
        self.loaded.get_mut(file)
    }

    pub fn contains(&self, file: &str) -> bool {
        self.loaded.contains_key(file)
    }

    /// Stores the first load for `file`; a later put for the same file keeps
    /// the earlier one.
    pub fn put(&mut self, subchapter: Subchapter) -> &mut Subchapter {
        self.loaded
            .entry(subchapter.position.file.clone())
            .or_insert(subchapter)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Every cached entry carrying `id`, across sub-chapters.
    pub fn entries_mut(&mut self, id: i64) -> impl Iterator<Item = &mut Entry> {
        self.loaded
            .values_mut()
            .flat_map(|subchapter| subchapter.entries.iter_mut())
            .filter(move |entry| entry.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subchapter(file: &str, offset: usize, texts: &[&str]) -> Subchapter {
        Subchapter {
            position: Position {
                file: file.to_owned(),
                chapter_number: 1,
                subchapter_index: 0,
                title: String::new(),
            },
            entries: texts
                .iter()
                .enumerate()
                .map(|(i, text)| Entry {
                    id: i as i64 + 1,
                    primary_text: (*text).to_owned(),
                    secondary_text: String::new(),
                    title: None,
                    description: None,
                })
                .collect(),
            offset,
        }
    }

    #[test]
    fn first_put_wins() {
        let mut cache = SubchapterCache::new();
        cache.put(subchapter("a.json", 5, &["x"]));
        cache.put(subchapter("a.json", 9, &["y", "z"]));
        let cached = cache.get("a.json").expect("cached");
        assert_eq!(cached.offset, 5);
        assert_eq!(cached.entries.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn numbered_uses_offset() {
        let cached = subchapter("a.json", 5, &["x", "y"]);
        let numbers: Vec<usize> = cached.numbered().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![6, 7]);
        assert!(!cached.is_empty());
    }

    #[test]
    fn entries_mut_reaches_cached_entries() {
        let mut cache = SubchapterCache::new();
        cache.put(subchapter("a.json", 0, &["x", "y"]));
        for entry in cache.entries_mut(2) {
            entry.primary_text = "edited".to_owned();
        }
        assert_eq!(cache.get("a.json").expect("cached").entries[1].primary_text, "edited");
    }
}
