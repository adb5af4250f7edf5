use crate::core::cache::{KeyValueCollection, Store};
use crate::core::rates::{RateSource, RateTable};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

const RATES_COLLECTION: &str = "rates";

/// Keeps archived day tables across runs. A published archive day never
/// changes, so entries have no expiry. Latest tables are never stored.
pub struct CachingRateSource<S: RateSource> {
    inner: S,
    cache: Arc<dyn KeyValueCollection>,
}

impl<S: RateSource> CachingRateSource<S> {
    /// Uses the persistent `rates` collection of `store`, or a memory one when
    /// the store has no backing keyspace.
    pub fn new(inner: S, store: &dyn Store) -> Self {
        let cache = store
            .get_collection(RATES_COLLECTION, true)
            .or_else(|| store.get_collection(RATES_COLLECTION, false))
            .unwrap_or_else(|| {
                Arc::new(crate::store::memory::MemoryCollection::new()) as Arc<dyn KeyValueCollection>
            });
        Self::with_collection(inner, cache)
    }

    pub fn with_collection(inner: S, cache: Arc<dyn KeyValueCollection>) -> Self {
        CachingRateSource { inner, cache }
    }

    fn cache_key(&self, date: NaiveDate) -> String {
        format!("{}:{}", self.inner.reference_currency(), date.format("%Y-%m-%d"))
    }
}

#[async_trait]
impl<S: RateSource> RateSource for CachingRateSource<S> {
    fn reference_currency(&self) -> &str {
        self.inner.reference_currency()
    }

    async fn fetch_rates(&self, date: Option<NaiveDate>) -> Option<RateTable> {
        let Some(day) = date else {
            return self.inner.fetch_rates(None).await;
        };

        let key = self.cache_key(day);
        if let Some(cached) = self.cache.get(key.as_bytes()).await {
            match serde_json::from_slice::<RateTable>(&cached) {
                Ok(table) => return Some(table),
                Err(e) => debug!("Discarding unreadable cached rates for {}: {}", key, e),
            }
        }

        let table = self.inner.fetch_rates(date).await?;
        match serde_json::to_vec(&table) {
            Ok(bytes) => self.cache.put(key.as_bytes(), &bytes).await,
            Err(e) => debug!("Could not serialize rates for {}: {}", key, e),
        }
        Some(table)
    }
}
