use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::PartitionHandle;
use tracing::debug;

/// Collection persisted in a fjall partition. Values are stored as given and
/// never expire.
pub struct DiskCollection {
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.partition.get(key)?.map(|raw| raw.to_vec());
        match value {
            Some(_) => debug!("Cache HIT for key: {}", String::from_utf8_lossy(key)),
            None => debug!("Cache MISS for key: {}", String::from_utf8_lossy(key)),
        }
        Ok(value)
    }

    fn write(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.partition.insert(key, value)?;
        debug!("Cache PUT for key: {}", String::from_utf8_lossy(key));
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.read(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) {
        if let Err(e) = self.write(key, value) {
            debug!("DiskCollection put error: {}", e);
        }
    }
}
