use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Error;

use super::{Collection, Record, RecordStore};

/// Keeps every collection in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = (Collection, Vec<Record>)>) -> MemoryStore {
        MemoryStore {
            collections: RwLock::new(records.into_iter().collect()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, collection: Collection) -> Result<Vec<Record>, Error> {
        let collections = self.collections.read().await;

        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    #[tracing::instrument(skip(self, records))]
    async fn replace(&self, collection: Collection, records: Vec<Record>) -> Result<(), Error> {
        self.collections.write().await.insert(collection, records);

        Ok(())
    }
}
