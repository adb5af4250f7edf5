pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

enum Collection {
    Memory(Arc<MemoryCollection>),
    Disk(Arc<DiskCollection>),
}

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Collection>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens the store under `path/cache`. When the keyspace cannot be opened
    /// the store still works, but only hands out memory collections.
    pub fn open(path: &Path) -> Self {
        let cache_dir = path.join("cache");
        let keyspace = match fjall::Config::new(&cache_dir).open() {
            Ok(keyspace) => Some(keyspace),
            Err(e) => {
                warn!(
                    "Could not open cache at {}: {}. Falling back to memory",
                    cache_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    fn create_collection(&self, name: &str, persist: bool) -> Option<Collection> {
        if !persist {
            return Some(Collection::Memory(Arc::new(MemoryCollection::new())));
        }
        let keyspace = self.keyspace.as_ref()?;
        match keyspace.open_partition(name, PartitionCreateOptions::default()) {
            Ok(partition) => Some(Collection::Disk(Arc::new(DiskCollection::new(partition)))),
            Err(e) => {
                warn!("Failed to open partition {}: {}", name, e);
                None
            }
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        let mut collections = self.collections.write().ok()?;
        if !collections.contains_key(name) {
            let collection = self.create_collection(name, persist)?;
            debug!("Created collection {}", name);
            collections.insert(name.to_string(), collection);
        }

        match collections.get(name)? {
            Collection::Disk(c) if persist => Some(Arc::clone(c) as Arc<dyn KeyValueCollection>),
            Collection::Memory(c) if !persist => {
                Some(Arc::clone(c) as Arc<dyn KeyValueCollection>)
            }
            _ => None,
        }
    }
}
