//! Configuration URL persistence and the fetched NG word configuration.
//!
//! [`ConfigStore`] is the only writer of both the persisted URL and the
//! in-memory configuration.  The configuration is fetched once per process:
//! after the first successful fetch every caller gets the same `Arc`.
//! Failed fetches are not remembered, so the next call goes back to the
//! network.  Two calls racing before the first completes may both fetch;
//! the document is deterministic so the duplicate request is harmless.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigFetchError, GuardError};
use crate::locale::Locale;

const COMMON_KEY: &str = "common";

/// NG word configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub hosts: HashSet<String>,
    #[serde(default)]
    pub target_words: TargetWords,
}

/// `common` is always present; other keys are host names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetWords {
    #[serde(default)]
    pub common: Vec<String>,
    #[serde(flatten)]
    pub hosts: HashMap<String, Vec<String>>,
}

impl Configuration {
    pub fn is_target_host(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Common words followed by the host's own words, each in list order.
    pub fn words_for(&self, host: &str) -> Vec<String> {
        let mut words = self.target_words.common.clone();
        if host != COMMON_KEY {
            if let Some(extra) = self.target_words.hosts.get(host) {
                words.extend(extra.iter().cloned());
            }
        }
        words
    }
}

/// Durable string store keyed by name (the page's local storage).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    /// Store `value` under `key`.  A write that cannot be persisted is
    /// logged and leaves the previous value in place.
    fn set(&self, key: &str, value: &str);
}

/// Process-local store.  Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), value.to_owned());
        }
    }
}

/// Store persisted as a flat JSON object in one file.  Every write rewrites
/// the whole file; the store holds a handful of keys at most.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Load `path` if it exists.  A missing file is an empty store; an
    /// unreadable or corrupt one is an error.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file '{}'", path.display()))?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse store file '{}': invalid JSON", path.display())
                })?
            }
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(entries).map_err(std::io::Error::other)?;
        fs::write(&self.path, json)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let previous = entries.insert(key.to_owned(), value.to_owned());
        if let Err(e) = self.flush(&entries) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist store file");
            // Keep memory in line with what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
        }
    }
}

/// Response to a GET as seen by the config store.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> anyhow::Result<HttpResponse>;
}

/// `reqwest` backed fetcher.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &str) -> anyhow::Result<HttpResponse> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}

pub struct ConfigStore {
    storage: Arc<dyn KeyValueStore>,
    http: Arc<dyn HttpFetch>,
    storage_key: String,
    locale: Locale,
    cached: RwLock<Option<Arc<Configuration>>>,
}

impl ConfigStore {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        http: Arc<dyn HttpFetch>,
        storage_key: impl Into<String>,
        locale: Locale,
    ) -> Self {
        Self {
            storage,
            http,
            storage_key: storage_key.into(),
            locale,
            cached: RwLock::new(None),
        }
    }

    pub fn url(&self) -> Option<String> {
        self.storage.get(&self.storage_key)
    }

    pub fn is_url_empty(&self) -> bool {
        self.url().is_none()
    }

    /// Persist `candidate` if it is an absolute URL.  Anything else is
    /// dropped without error, leaving the stored value as it was.
    pub fn set_url(&self, candidate: &str) {
        if is_valid_url(candidate) {
            self.storage.set(&self.storage_key, candidate);
            tracing::info!(url = %candidate, "configuration URL stored");
        } else {
            tracing::debug!(candidate = %candidate, "ignoring invalid configuration URL");
        }
    }

    /// The cached configuration, if a fetch has succeeded.
    pub fn cached(&self) -> Option<Arc<Configuration>> {
        self.cached.read().ok().and_then(|c| c.clone())
    }

    pub async fn fetch(&self) -> Result<Arc<Configuration>, ConfigFetchError> {
        if let Some(config) = self.cached() {
            return Ok(config);
        }
        let Some(url) = self.url() else {
            return Err(self.fetch_error("configuration URL is not set"));
        };
        tracing::debug!(url = %url, "fetching configuration");
        let resp = self
            .http
            .get(&url)
            .await
            .map_err(|e| self.fetch_error(format!("request failed: {e:#}")))?;
        if !resp.is_success() {
            return Err(self.fetch_error(format!("unexpected HTTP status {}", resp.status)));
        }
        let config: Configuration = serde_json::from_str(&resp.body)
            .map_err(|e| self.fetch_error(format!("malformed configuration: {e}")))?;
        let config = Arc::new(config);
        if let Ok(mut slot) = self.cached.write() {
            // A concurrent fetch may have landed first; keep that one.
            let config = slot.get_or_insert_with(|| config.clone()).clone();
            tracing::info!(hosts = config.hosts.len(), "configuration loaded");
            return Ok(config);
        }
        Ok(config)
    }

    pub fn is_target_host(&self, host: &str) -> Result<bool, GuardError> {
        self.cached()
            .map(|c| c.is_target_host(host))
            .ok_or(GuardError::ConfigNotLoaded)
    }

    pub fn words_for(&self, host: &str) -> Result<Vec<String>, GuardError> {
        self.cached()
            .map(|c| c.words_for(host))
            .ok_or(GuardError::ConfigNotLoaded)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn fetch_error(&self, detail: impl Into<String>) -> ConfigFetchError {
        let err = ConfigFetchError::new(self.locale.fetch_error_message(), detail);
        tracing::warn!(detail = %err.detail(), "configuration fetch failed");
        err
    }
}

fn is_valid_url(candidate: &str) -> bool {
    reqwest::Url::parse(candidate.trim()).is_ok()
}
