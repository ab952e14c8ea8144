//! Bounded hypothesis cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::workflow::Hypothesis;

pub const DEFAULT_CAPACITY: usize = 256;

/// LRU cache of finished hypotheses keyed by request hash (see
/// [`HypothesisRequest::cache_key`](crate::workflow::HypothesisRequest::cache_key)).
pub struct HypothesisCache {
    inner: Mutex<LruCache<String, Arc<Hypothesis>>>,
}

impl HypothesisCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Hypothesis>> {
        self.inner.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: impl Into<String>, hypothesis: Arc<Hypothesis>) {
        self.inner.lock().await.put(key.into(), hypothesis);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for HypothesisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enriched::EnrichedTerms;

    fn hyp(term: &str) -> Arc<Hypothesis> {
        Arc::new(Hypothesis {
            key: term.to_string(),
            term: term.to_string(),
            html: format!("about {term}"),
            plain_text: format!("about {term}"),
            enriched: EnrichedTerms::default(),
            model: "gpt-4o".to_string(),
            generated_at: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let cache = HypothesisCache::new(2);
        cache.insert("a", hyp("a")).await;
        cache.insert("b", hyp("b")).await;
        assert!(cache.get("a").await.is_some());
        cache.insert("c", hyp("c")).await;
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("a").await.is_some());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_still_holds_one() {
        let cache = HypothesisCache::new(0);
        cache.insert("a", hyp("a")).await;
        assert!(!cache.is_empty().await);
    }
}
