use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod file;
pub mod memory;
pub mod mongo;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A single stored record. Records are open JSON objects so fields this
/// service does not model survive a rewrite.
pub type Record = Map<String, Value>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Campaigns,
    Senders,
    Contacts,
    Logs,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Campaigns,
        Collection::Senders,
        Collection::Contacts,
        Collection::Logs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Campaigns => "campaigns",
            Collection::Senders => "senders",
            Collection::Contacts => "contacts",
            Collection::Logs => "logs",
        }
    }
}

/// Named-collection persistence. There are no transactions: `replace`
/// overwrites the whole collection and the last writer wins.
#[async_trait]
pub trait RecordStore: Debug + Send + Sync {
    async fn load(&self, collection: Collection) -> Result<Vec<Record>, Error>;

    async fn replace(&self, collection: Collection, records: Vec<Record>) -> Result<(), Error>;

    /// Checks that the backend is reachable and writable.
    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[tracing::instrument]
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, Error> {
    let store: Arc<dyn RecordStore> = match config {
        StorageConfig::Memory => Arc::new(MemoryStore::new()),
        StorageConfig::File { path } => Arc::new(FileStore::open(path).await?),
        StorageConfig::Mongo { uri, database } => {
            Arc::new(MongoStore::connect(uri, database).await?)
        }
    };

    store.ping().await?;
    info!("opened record store: {:?}", store);

    Ok(store)
}

pub fn decode_record<T: DeserializeOwned>(record: &Record) -> Result<T, Error> {
    let value = serde_json::from_value(Value::Object(record.clone()))?;

    Ok(value)
}

/// Decodes every well-formed record, skipping (and reporting) the rest.
pub fn decode_records<T: DeserializeOwned>(collection: Collection, records: &[Record]) -> Vec<T> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match decode_record(record) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    collection = collection.name(),
                    index,
                    "skipping malformed record: {}",
                    err
                );
                None
            }
        })
        .collect()
}

pub fn encode_record<T: Serialize>(value: &T) -> Result<Record, Error> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        other => Err(Error::ExistentialState(format!(
            "expected a record to encode as an object, got {}",
            other
        ))),
    }
}

/// Position of the record whose `id` field matches `id`.
pub fn position_of(records: &[Record], id: &str) -> Option<usize> {
    records.iter().position(|record| match record.get("id") {
        Some(Value::String(value)) => value == id,
        Some(Value::Number(value)) => value.to_string() == id,
        _ => false,
    })
}

/// Removes the `id` field from an incoming record and parses it. A missing,
/// null or blank id reads as `None`.
pub fn take_id<T: TypedIdMarker>(record: &mut Record) -> Result<Option<TypedId<T>>, Error> {
    match record.remove("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.trim().is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|_| Error::InvalidId {
                id: value.to_string(),
            }),
    }
}
