use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use url::Url;

/// Where manifest and sub-chapter payloads come from.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn fetch_json(&self, locator: &str) -> anyhow::Result<Value>;
}

pub type SharedSource = Arc<dyn CorpusSource>;

/// Builds a source from a root that is either an http(s) URL or a directory.
pub fn from_root(root: &str, timeout: Duration) -> anyhow::Result<SharedSource> {
    if root.starts_with("http://") || root.starts_with("https://") {
        let base = Url::parse(root).with_context(|| format!("parse corpus url: {root}"))?;
        return Ok(Arc::new(HttpSource::new(base, timeout)?));
    }
    Ok(Arc::new(FsSource::new(root)))
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build corpus http client")?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
        })
    }

    fn resolve(&self, locator: &str) -> anyhow::Result<Url> {
        self.base
            .join(locator)
            .with_context(|| format!("join {locator} onto {}", self.base))
    }
}

#[async_trait]
impl CorpusSource for HttpSource {
    async fn fetch_json(&self, locator: &str) -> anyhow::Result<Value> {
        let url = self.resolve(locator)?;
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, "baitreader/0.1")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("decode json from {url}"))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    let path = url.path().to_owned();
    if !path.ends_with('/') {
        url.set_path(&format!("{path}/"));
    }
    url
}

#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, locator: &str) -> anyhow::Result<PathBuf> {
        resolve_under(&self.root, locator)
    }
}

#[async_trait]
impl CorpusSource for FsSource {
    async fn fetch_json(&self, locator: &str) -> anyhow::Result<Value> {
        let path = self.resolve(locator)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse json: {}", path.display()))
    }
}

fn resolve_under(root: &Path, locator: &str) -> anyhow::Result<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in locator.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            anyhow::bail!("locator must not contain '..': {locator}");
        }
        path = path.join(segment);
    }
    Ok(path)
}

/// In-memory corpus. Counts fetches per locator.
#[derive(Debug, Default)]
pub struct StaticSource {
    documents: HashMap<String, Value>,
    fetches: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, locator: &str, document: Value) -> Self {
        self.documents.insert(normalize_locator(locator), document);
        self
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fetch_count(&self, locator: &str) -> usize {
        let fetches = self.fetches.lock().unwrap_or_else(|e| e.into_inner());
        fetches
            .get(&normalize_locator(locator))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        let fetches = self.fetches.lock().unwrap_or_else(|e| e.into_inner());
        fetches.values().sum()
    }
}

#[async_trait]
impl CorpusSource for StaticSource {
    async fn fetch_json(&self, locator: &str) -> anyhow::Result<Value> {
        let key = normalize_locator(locator);
        {
            let mut fetches = self.fetches.lock().unwrap_or_else(|e| e.into_inner());
            *fetches.entry(key.clone()).or_default() += 1;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.documents
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such document: {locator}"))
    }
}

fn normalize_locator(locator: &str) -> String {
    locator.trim_start_matches("./").to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_under_skips_dot_segments() -> anyhow::Result<()> {
        let path = resolve_under(Path::new("/corpus"), "./assets/data/bab1/sub1.json")?;
        assert_eq!(path, PathBuf::from("/corpus/assets/data/bab1/sub1.json"));
        Ok(())
    }

    #[test]
    fn resolve_under_rejects_parent_segments() {
        let err = resolve_under(Path::new("/corpus"), "../etc/passwd")
            .unwrap_err()
            .to_string();
        assert!(err.contains("'..'"));
    }

    #[test]
    fn http_source_joins_relative_locators() -> anyhow::Result<()> {
        let source = HttpSource::new(
            Url::parse("http://127.0.0.1:8080/reader")?,
            Duration::from_secs(1),
        )?;
        assert_eq!(
            source.resolve("./assets/data/index.json")?.as_str(),
            "http://127.0.0.1:8080/reader/assets/data/index.json"
        );
        Ok(())
    }

    #[tokio::test]
    async fn static_source_counts_fetches_with_or_without_dot_prefix() -> anyhow::Result<()> {
        let source = StaticSource::new().with_document("a.json", serde_json::json!([]));
        source.fetch_json("./a.json").await?;
        source.fetch_json("a.json").await?;
        assert_eq!(source.fetch_count("a.json"), 2);
        assert!(source.fetch_json("missing.json").await.is_err());
        assert_eq!(source.total_fetches(), 3);
        Ok(())
    }
}
