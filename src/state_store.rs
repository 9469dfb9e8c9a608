use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::formats::LastRead;
use crate::overlay::EditRecords;

pub const EDITED_BAITS: &str = "editedBaits";
pub const LAST_READ: &str = "lastRead";
pub const BAIT_LANG_STATE: &str = "baitLangState";
pub const BOOKMARKS: &str = "bookmarks";

/// Durable string key-value store local to the device.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
}

/// All keys live in one JSON object file, rewritten atomically on each set.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let mut values = read_values(&self.path)
            .await
            .with_context(|| format!("read: {}", self.path.display()))?;
        Ok(values.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = read_values(&self.path)
            .await
            .with_context(|| format!("read: {}", self.path.display()))?;
        values.insert(key.to_owned(), value);
        write_json_atomic(&self.path, &values)
            .await
            .with_context(|| format!("write: {}", self.path.display()))
    }
}

async fn read_values(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    };
    let values = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(values)
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.values.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Edits for display; an unreadable blob reads as no edits.
pub async fn load_edits(store: &dyn StateStore) -> anyhow::Result<EditRecords> {
    let raw = store.get(EDITED_BAITS).await?;
    Ok(EditRecords::from_stored(raw.as_deref()))
}

/// Edits for a read-modify-write; an unreadable blob is an error so it is
/// never overwritten.
pub async fn load_edits_for_update(store: &dyn StateStore) -> anyhow::Result<EditRecords> {
    let raw = store.get(EDITED_BAITS).await?;
    EditRecords::parse_stored(raw.as_deref())
        .with_context(|| format!("refusing to overwrite unreadable {EDITED_BAITS}"))
}

pub async fn save_edits(store: &dyn StateStore, edits: &EditRecords) -> anyhow::Result<()> {
    store.set(EDITED_BAITS, edits.to_stored()).await
}

/// A corrupt `lastRead` reads as absent.
pub async fn load_last_read(store: &dyn StateStore) -> anyhow::Result<Option<LastRead>> {
    let Some(raw) = store.get(LAST_READ).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(last_read) => Ok(last_read),
        Err(err) => {
            tracing::warn!(%err, "ignoring unreadable lastRead");
            Ok(None)
        }
    }
}

pub async fn save_last_read(store: &dyn StateStore, last_read: &LastRead) -> anyhow::Result<()> {
    let raw = serde_json::to_string(last_read).context("serialize lastRead")?;
    store.set(LAST_READ, raw).await
}

/// An unreadable list reads as no bookmarks.
pub async fn load_bookmarks(store: &dyn StateStore) -> anyhow::Result<Vec<i64>> {
    let Some(raw) = store.get(BOOKMARKS).await? else {
        return Ok(Vec::new());
    };
    match parse_bookmarks(&raw) {
        Ok(bookmarks) => Ok(bookmarks),
        Err(err) => {
            tracing::warn!(%err, "ignoring unreadable bookmarks");
            Ok(Vec::new())
        }
    }
}

fn parse_bookmarks(raw: &str) -> anyhow::Result<Vec<i64>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("bookmarks are not a json array")?;
    Ok(values
        .iter()
        .filter_map(crate::entries::id_from_value)
        .collect())
}

/// Adds or removes `id`; returns whether it is now bookmarked.
///
/// Fails without writing when the stored list is unreadable.
pub async fn toggle_bookmark(store: &dyn StateStore, id: i64) -> anyhow::Result<bool> {
    let mut bookmarks = match store.get(BOOKMARKS).await? {
        Some(raw) => parse_bookmarks(&raw)
            .with_context(|| format!("refusing to overwrite unreadable {BOOKMARKS}"))?,
        None => Vec::new(),
    };
    let bookmarked = match bookmarks.iter().position(|b| *b == id) {
        Some(index) => {
            bookmarks.remove(index);
            false
        }
        None => {
            bookmarks.push(id);
            true
        }
    };
    let raw = serde_json::to_string(&bookmarks).context("serialize bookmarks")?;
    store.set(BOOKMARKS, raw).await?;
    Ok(bookmarked)
}

/// Per-entry display language; `true` means the secondary text is shown.
pub async fn load_language_state(store: &dyn StateStore) -> anyhow::Result<HashMap<String, bool>> {
    let Some(raw) = store.get(BAIT_LANG_STATE).await? else {
        return Ok(HashMap::new());
    };
    match serde_json::from_str(&raw) {
        Ok(state) => Ok(state),
        Err(err) => {
            tracing::warn!(%err, "ignoring unreadable baitLangState");
            Ok(HashMap::new())
        }
    }
}

/// Fails without writing when the stored state is unreadable.
pub async fn toggle_language(store: &dyn StateStore, id: i64) -> anyhow::Result<bool> {
    let mut state: HashMap<String, bool> = match store.get(BAIT_LANG_STATE).await? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("refusing to overwrite unreadable {BAIT_LANG_STATE}"))?,
        None => HashMap::new(),
    };
    let key = id.to_string();
    let secondary = !state.get(&key).copied().unwrap_or(false);
    state.insert(key, secondary);
    let raw = serde_json::to_string(&state).context("serialize baitLangState")?;
    store.set(BAIT_LANG_STATE, raw).await?;
    Ok(secondary)
}
