//! Recently used headlines, fed back to the content service to avoid repeats.
//!
//! Bounded and shared across jobs behind an `Arc`. When opened over a blob store the
//! list is loaded once at startup and written back after every new headline, so
//! repeats are avoided across restarts. The stored form is a JSON array, oldest first.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::storage::{BlobStore, JSON_CONTENT_TYPE};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Blob key of the persisted history, at the store root.
pub const HISTORY_KEY: &str = "used_headlines.json";

struct Persistence {
    store: Arc<dyn BlobStore>,
    key: String,
}

pub struct ContentHistory {
    capacity: usize,
    headlines: RwLock<VecDeque<String>>,
    persistence: Option<Persistence>,
}

impl ContentHistory {
    /// In-memory history, lost on restart.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            headlines: RwLock::new(VecDeque::new()),
            persistence: None,
        }
    }

    /// History backed by `store` under `key`.
    ///
    /// A missing, unreadable or corrupt object starts an empty history; the next
    /// recorded headline overwrites it.
    pub async fn open(store: Arc<dyn BlobStore>, key: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut headlines = VecDeque::new();

        match store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(stored) => {
                    for headline in stored {
                        let headline = headline.trim();
                        if !headline.is_empty() && !headlines.iter().any(|h| h == headline) {
                            headlines.push_back(headline.to_string());
                        }
                    }
                    while headlines.len() > capacity {
                        headlines.pop_front();
                    }
                    info!(key, loaded = headlines.len(), "Headline history loaded");
                }
                Err(e) => warn!(key, "Headline history is not a JSON string list, starting empty: {e}"),
            },
            Ok(None) => info!(key, "No headline history yet"),
            Err(e) => warn!(key, "Headline history could not be read, starting empty: {e}"),
        }

        Self {
            capacity,
            headlines: RwLock::new(headlines),
            persistence: Some(Persistence {
                store,
                key: key.to_string(),
            }),
        }
    }

    /// Up to `limit` headlines, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<String> {
        self.headlines
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Records a headline. Blank and already-known headlines are ignored.
    /// Returns true when the headline was added.
    ///
    /// A failed write to the backing store is logged; the headline stays in memory.
    pub async fn record(&self, headline: &str) -> bool {
        let headline = headline.trim();
        if headline.is_empty() {
            return false;
        }

        // Held across the write so snapshots reach the store in order.
        let mut headlines = self.headlines.write().await;
        if headlines.iter().any(|h| h == headline) {
            return false;
        }
        if headlines.len() == self.capacity {
            headlines.pop_front();
        }
        headlines.push_back(headline.to_string());

        if let Some(persistence) = &self.persistence {
            let snapshot: Vec<&String> = headlines.iter().collect();
            match serde_json::to_vec_pretty(&snapshot) {
                Ok(body) => {
                    if let Err(e) = persistence
                        .store
                        .put(&persistence.key, Bytes::from(body), JSON_CONTENT_TYPE)
                        .await
                    {
                        warn!(key = %persistence.key, "Headline history not saved: {e}");
                    }
                }
                Err(e) => warn!(key = %persistence.key, "Headline history not serialized: {e}"),
            }
        }
        true
    }
}

impl Default for ContentHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
