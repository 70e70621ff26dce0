use async_trait::async_trait;
use mongodb::options::ReplaceOptions;
use mongodb::{bson, Client, Database};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;

use super::{Collection, Record, RecordStore};

const COLLECTIONS: &str = "collections";

/// Each named collection is one document so a replace is a single atomic
/// write and record order is preserved.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct StoredCollection {
    #[serde(rename = "_id")]
    name: String,
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct MongoStore {
    collections: mongodb::Collection<StoredCollection>,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<MongoStore, Error> {
        info!("connecting to db: {}", uri);
        let db = Client::with_uri_str(uri).await?.database(database);

        Ok(MongoStore::new(db))
    }

    pub fn new(db: Database) -> MongoStore {
        MongoStore {
            collections: db.collection(COLLECTIONS),
            db,
        }
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, collection: Collection) -> Result<Vec<Record>, Error> {
        let stored = self
            .collections
            .find_one(bson::doc! { "_id": collection.name() }, None)
            .await?;

        Ok(stored.map(|stored| stored.records).unwrap_or_default())
    }

    #[tracing::instrument(skip(self, records))]
    async fn replace(&self, collection: Collection, records: Vec<Record>) -> Result<(), Error> {
        let stored = StoredCollection {
            name: collection.name().to_owned(),
            records,
        };
        let options = ReplaceOptions::builder().upsert(true).build();

        self.collections
            .replace_one(bson::doc! { "_id": collection.name() }, &stored, options)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        // ping the database to ensure connection is established
        self.db.run_command(bson::doc! { "ping": 1 }, None).await?;

        Ok(())
    }
}
