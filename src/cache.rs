use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::display::Display;
use crate::logging;
use crate::model::FetchKind;

pub static FETCH_CACHE_FILE: &str = "fetch_cache.json";

pub const DEFAULT_COOLDOWN_SECONDS: u64 = 300;

#[derive(Error, Debug)]
pub enum FetchCacheError {
    #[error("check existence of '{path}': {source}")]
    CheckFileExistence {
        path: String,
        source: std::io::Error,
    },
    #[error("read file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
    #[error("deserialize json content of '{path}': {source}")]
    JSONDeserialization {
        path: String,
        source: serde_json::Error,
    },
    #[error("serialize json content of '{path}': {source}")]
    JSONSerialization {
        path: String,
        source: serde_json::Error,
    },
    #[error("write file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKey {
    pub kind: FetchKind,
    pub region_id: i32,
    pub item_id: i32,
}

impl FetchKey {
    pub fn new(kind: FetchKind, region_id: i32, item_id: i32) -> Self {
        Self {
            kind,
            region_id,
            item_id,
        }
    }
}

impl std::fmt::Display for FetchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of item '{}' in region '{}'",
            self.kind, self.item_id, self.region_id
        )
    }
}

pub type FetchTimes = HashMap<FetchKey, DateTime<Utc>>;

/// Durable home of the fetch cache: read once at start, rewritten wholesale on every change.
#[async_trait]
pub trait FetchCacheStore: Send + Sync {
    async fn load(&self) -> Result<FetchTimes, FetchCacheError>;
    async fn save(&self, entries: &FetchTimes) -> Result<(), FetchCacheError>;
}

#[derive(Serialize, Deserialize, Debug)]
struct FetchCacheFile {
    entries: Vec<FetchCacheEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
struct FetchCacheEntry {
    #[serde(flatten)]
    key: FetchKey,
    last_attempt_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FSFetchCacheStore {
    path: PathBuf,
}

impl FSFetchCacheStore {
    pub fn new(cache_directory: PathBuf) -> Self {
        let mut path = cache_directory;
        path.push(FETCH_CACHE_FILE);
        logging::trace!("Fetch cache file: {}", path.to_display());
        Self { path }
    }
}

#[async_trait]
impl FetchCacheStore for FSFetchCacheStore {
    async fn load(&self) -> Result<FetchTimes, FetchCacheError> {
        let exists = tokio::fs::try_exists(&self.path).await.map_err(|source| {
            FetchCacheError::CheckFileExistence {
                path: self.path.to_display(),
                source,
            }
        })?;
        if !exists {
            logging::trace!("No fetch cache found: '{}'", self.path.to_display());
            return Ok(FetchTimes::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchCacheError::ReadFile {
                path: self.path.to_display(),
                source,
            })?;
        let file: FetchCacheFile = serde_json::from_str(&content).map_err(|source| {
            FetchCacheError::JSONDeserialization {
                path: self.path.to_display(),
                source,
            }
        })?;
        logging::debug!("Fetch cache loaded: {} entries", file.entries.len());
        Ok(file
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.last_attempt_at))
            .collect())
    }

    async fn save(&self, entries: &FetchTimes) -> Result<(), FetchCacheError> {
        let mut entries: Vec<FetchCacheEntry> = entries
            .iter()
            .map(|(key, last_attempt_at)| FetchCacheEntry {
                key: *key,
                last_attempt_at: *last_attempt_at,
            })
            .collect();
        entries.sort_by_key(|entry| {
            (
                entry.key.kind.to_string(),
                entry.key.region_id,
                entry.key.item_id,
            )
        });

        let content = serde_json::to_string(&FetchCacheFile { entries }).map_err(|source| {
            FetchCacheError::JSONSerialization {
                path: self.path.to_display(),
                source,
            }
        })?;

        // Rename over the previous file so a crash never leaves half a cache behind.
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|source| FetchCacheError::WriteFile {
                path: tmp_path.to_display(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| FetchCacheError::WriteFile {
                path: self.path.to_display(),
                source,
            })?;
        logging::trace!("Fetch cache saved: '{}'", self.path.to_display());
        Ok(())
    }
}

/// Advisory throttle on remote calls.
///
/// Losing it costs at most one redundant fetch per key, so every I/O failure is logged
/// and treated as "fetch needed".
pub struct FetchCache {
    entries: Mutex<FetchTimes>,
    store: Box<dyn FetchCacheStore>,
    cooldown: Duration,
}

impl FetchCache {
    pub async fn load(store: Box<dyn FetchCacheStore>, cooldown: Duration) -> Self {
        let entries = match store.load().await {
            Ok(entries) => entries,
            Err(e) => {
                logging::warning!("Fetch cache could not be loaded, starting empty: {}", e);
                FetchTimes::new()
            }
        };
        Self {
            entries: Mutex::new(entries),
            store,
            cooldown,
        }
    }

    pub async fn should_fetch(&self, key: &FetchKey, now: DateTime<Utc>) -> bool {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(last_attempt_at) if now - *last_attempt_at < self.cooldown => {
                logging::info!("Skipping fetch of {} due to cache", key);
                false
            }
            _ => true,
        }
    }

    /// Upserts the fetch time and synchronously persists the whole cache.
    pub async fn record_fetch(&self, key: FetchKey, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.insert(key, now);
        // The lock is held while saving: only one writer touches the file at a time.
        if let Err(e) = self.store.save(&entries).await {
            logging::warning!("Fetch cache could not be saved after fetching {}: {}", key, e);
        }
    }

    pub async fn last_fetch(&self, key: &FetchKey) -> Option<DateTime<Utc>> {
        self.entries.lock().await.get(key).copied()
    }
}
