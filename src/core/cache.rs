//! Key-value storage abstractions used by caching rate sources

use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    async fn put(&self, key: &[u8], value: &[u8]);
}

pub trait Store: Send + Sync {
    /// Returns the named collection, creating it on first use. Persistent
    /// collections are only available when the store has a backing keyspace.
    fn get_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>>;
}
