//! Short-lived reply cache
//!
//! Only single-turn, short user questions are cached. The cache is never
//! authoritative: a miss or an evicted entry just means one more upstream call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::CacheConfig;
use crate::upstream::{ChatMessage, Role};

/// Separator between model and question in a cache key
const KEY_SEPARATOR: char = '\u{1f}';

/// Key-value store for completed reply text
///
/// Behind a trait so the HTTP layer can be tested with a store it controls.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: String, value: String);
}

/// Cache key for a request, or `None` when the request is not eligible
///
/// Eligible requests consist of exactly one user message whose trimmed text
/// is non-empty and at most `max_question_chars` characters long.
pub fn cache_key(model: &str, messages: &[ChatMessage], max_question_chars: usize) -> Option<String> {
    let [message] = messages else {
        return None;
    };
    if message.role != Role::User {
        return None;
    }

    let question = message.content.trim();
    if question.is_empty() || question.chars().count() > max_question_chars {
        return None;
    }

    Some(format!("{}{}{}", model, KEY_SEPARATOR, question))
}

struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

/// In-process cache with a TTL and an entry cap
pub struct MemoryCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_seconds), config.max_entries)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    async fn set(&self, key: String, value: String) {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(evicted_key_len = oldest.len(), "Reply cache full, evicting oldest entry");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

/// Cache used when caching is disabled
pub struct DisabledCache;

#[async_trait]
impl ResponseCache for DisabledCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: String, _value: String) {}
}
