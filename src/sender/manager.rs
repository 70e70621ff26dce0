use serde_json::Value;
use tracing::info;

use crate::database::{
    decode_records, encode_record, position_of, Collection, Record, RecordStore,
};
use crate::error::Error;

use super::{SenderId, SenderNode};

#[tracing::instrument(skip(store))]
pub async fn get_senders(store: &dyn RecordStore) -> Result<Vec<SenderNode>, Error> {
    let records = store.load(Collection::Senders).await?;

    Ok(decode_records(Collection::Senders, &records))
}

/// Adds a sender to the pool under a freshly generated id.
#[tracing::instrument(skip(store, body))]
pub async fn create_sender(store: &dyn RecordStore, mut body: Record) -> Result<SenderNode, Error> {
    // ids are always generated here
    body.remove("id");

    let name = match body.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => return Err(Error::MissingField { field: "name" }),
    };

    let sender = SenderNode {
        id: SenderId::new(),
        name,
        settings: body,
    };

    let mut records = store.load(Collection::Senders).await?;
    records.push(encode_record(&sender)?);
    store.replace(Collection::Senders, records).await?;

    info!(sender_id = %sender.id, name = %sender.name, "created sender");

    Ok(sender)
}

#[tracing::instrument(skip(store))]
pub async fn delete_sender(store: &dyn RecordStore, sender_id: SenderId) -> Result<(), Error> {
    let mut records = store.load(Collection::Senders).await?;
    let index = position_of(&records, sender_id.as_str())
        .ok_or_else(|| Error::SenderDoesNotExist {
            sender_id: sender_id.clone(),
        })?;

    records.remove(index);
    store.replace(Collection::Senders, records).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::database::test::{record, MockStore};
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn can_create_sender() {
        let mut store = MockStore::new();
        let called_replace = Arc::new(Mutex::new(false));
        let called_replace_clone = Arc::clone(&called_replace);
        store.on_load = Box::new(|_| Ok(vec![record(json!({ "id": "s1", "name": "Old" }))]));
        store.on_replace = Box::new(move |collection, records| {
            *called_replace_clone.lock().unwrap() = true;
            assert_eq!(collection, Collection::Senders);
            assert_eq!(records.len(), 2);
            assert_eq!(records[1].get("host"), Some(&json!("smtp.example.com")));
            Ok(())
        });

        let sender = create_sender(
            &store,
            record(json!({ "id": "s1", "name": "Primary", "host": "smtp.example.com" })),
        )
        .await
        .unwrap();

        assert_eq!(sender.name, "Primary");
        assert!(sender.id.as_str().starts_with("SND-"));
        assert!(
            *called_replace.lock().unwrap(),
            "store.replace was not called"
        );
    }

    #[tokio::test]
    async fn senders_need_a_name() {
        let store = MockStore::new();

        let result = create_sender(&store, record(json!({ "host": "smtp.example.com" }))).await;

        assert_eq!(result.unwrap_err(), Error::MissingField { field: "name" });
    }

    #[tokio::test]
    async fn listing_skips_malformed_senders() {
        let store = MemoryStore::with_records(vec![(
            Collection::Senders,
            vec![
                record(json!({ "id": "s1", "name": "Primary" })),
                record(json!({ "id": "s2" })),
            ],
        )]);

        let senders = get_senders(&store).await.unwrap();

        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].id.as_str(), "s1");
    }

    #[tokio::test]
    async fn deleting_missing_sender_fails() {
        let store = MemoryStore::new();

        let result = delete_sender(&store, "s1".parse().unwrap()).await;

        assert_eq!(
            result.unwrap_err(),
            Error::SenderDoesNotExist {
                sender_id: "s1".parse().unwrap()
            }
        );
    }
}
