use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::index::RESULT_CAP;

/// Where index builds and queries run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// On the caller's task.
    Inline,
    /// In the isolated worker task, reached by message passing.
    Worker,
}

impl ExecutionMode {
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let Ok(raw) = std::env::var("BAITREADER_SEARCH_MODE") else {
            return Ok(None);
        };
        Self::parse(&raw).map(Some).with_context(|| {
            format!("invalid BAITREADER_SEARCH_MODE={raw:?}. expected one of: inline, worker")
        })
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "inline" => Ok(Self::Inline),
            "worker" => Ok(Self::Worker),
            other => anyhow::bail!("unsupported execution mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Corpus root: an http(s) base URL or a local directory.
    #[serde(default = "default_corpus_root")]
    pub corpus_root: String,

    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// File backing the durable key-value state.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_search_mode")]
    pub search_mode: ExecutionMode,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_poll_ms")]
    pub ready_poll_ms: u64,

    #[serde(default = "default_result_cap")]
    pub result_cap: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_corpus_root() -> String {
    ".".to_owned()
}

fn default_manifest() -> String {
    "assets/data/index.json".to_owned()
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".baitreader/state.json")
}

fn default_search_mode() -> ExecutionMode {
    ExecutionMode::Worker
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_poll_ms() -> u64 {
    80
}

fn default_result_cap() -> usize {
    RESULT_CAP
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            corpus_root: default_corpus_root(),
            manifest: default_manifest(),
            state_file: default_state_file(),
            search_mode: default_search_mode(),
            debounce_ms: default_debounce_ms(),
            ready_poll_ms: default_poll_ms(),
            result_cap: default_result_cap(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl ReaderConfig {
    /// Reads a YAML config file; missing keys take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        serde_yaml::from_str(&yaml).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
