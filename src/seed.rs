use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::campaign::{Campaign, CampaignId, CampaignStats, CampaignStatus};
use crate::contact::{Contact, ContactId, ContactStatus};
use crate::database::{decode_records, encode_record, Collection, Record, RecordStore};
use crate::error::Error;
use crate::sender::{SenderId, SenderNode};

/// Fills empty collections with a small demo data set. Collections that
/// already hold records are left alone.
#[tracing::instrument(skip(store))]
pub async fn seed(store: &dyn RecordStore) -> Result<(), Error> {
    if store.load(Collection::Senders).await?.is_empty() {
        let senders = vec![
            sender("Primary Relay", "smtp.mailrelay.example", 587),
            sender("Backup Relay", "smtp.backup.example", 2525),
        ];
        write(store, Collection::Senders, &senders).await?;
    }

    if store.load(Collection::Contacts).await?.is_empty() {
        let contacts = vec![
            contact("ada@example.com", "Ada Lovelace", "vip"),
            contact("grace@example.com", "Grace Hopper", "newsletter"),
            contact("alan@example.com", "Alan Turing", "newsletter"),
        ];
        write(store, Collection::Contacts, &contacts).await?;
    }

    if store.load(Collection::Campaigns).await?.is_empty() {
        let senders: Vec<SenderNode> =
            decode_records(Collection::Senders, &store.load(Collection::Senders).await?);

        let mut extra = Record::new();
        extra.insert(
            "body".to_owned(),
            json!("<h1>Welcome aboard</h1><p>Thanks for signing up.</p>"),
        );
        let campaign = Campaign {
            id: CampaignId::new(),
            name: "Welcome Series".to_string(),
            subject: "Welcome to OmniSend".to_string(),
            status: CampaignStatus::Draft,
            sender_pool_ids: senders.into_iter().map(|sender| sender.id).collect(),
            contacts: vec![],
            stats: CampaignStats::default(),
            created_at: Some(Utc::now()),
            extra,
        };
        write(store, Collection::Campaigns, &[campaign]).await?;
    }

    Ok(())
}

fn sender(name: &str, host: &str, port: u16) -> SenderNode {
    let mut settings = Record::new();
    settings.insert("host".to_owned(), json!(host));
    settings.insert("port".to_owned(), json!(port));
    settings.insert("user".to_owned(), json!("mailer"));

    SenderNode {
        id: SenderId::new(),
        name: name.to_string(),
        settings,
    }
}

fn contact(email: &str, name: &str, group: &str) -> Contact {
    Contact {
        id: ContactId::new(),
        email: email.to_string(),
        name: name.to_string(),
        group: group.to_string(),
        status: ContactStatus::Active,
        extra: Record::new(),
    }
}

async fn write<T: serde::Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    values: &[T],
) -> Result<(), Error> {
    let records = values
        .iter()
        .map(encode_record)
        .collect::<Result<Vec<_>, _>>()?;

    info!(collection = collection.name(), count = records.len(), "seeding");
    store.replace(collection, records).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::test::record;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn seeds_empty_collections() {
        let store = MemoryStore::new();

        seed(&store).await.unwrap();

        let senders: Vec<SenderNode> =
            decode_records(Collection::Senders, &store.load(Collection::Senders).await.unwrap());
        let contacts: Vec<Contact> =
            decode_records(Collection::Contacts, &store.load(Collection::Contacts).await.unwrap());
        let campaigns: Vec<Campaign> = decode_records(
            Collection::Campaigns,
            &store.load(Collection::Campaigns).await.unwrap(),
        );
        assert_eq!(senders.len(), 2);
        assert_eq!(contacts.len(), 3);
        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].status, CampaignStatus::Draft);
        assert_eq!(
            campaigns[0].sender_pool_ids,
            senders.iter().map(|s| s.id.clone()).collect::<Vec<_>>()
        );
        assert!(store.load(Collection::Logs).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leaves_populated_collections_alone() {
        let existing = vec![record(json!({ "id": "s1", "name": "Mine" }))];
        let store = MemoryStore::with_records(vec![(Collection::Senders, existing.clone())]);

        seed(&store).await.unwrap();

        assert_eq!(store.load(Collection::Senders).await.unwrap(), existing);
        let campaigns = store.load(Collection::Campaigns).await.unwrap();
        assert_eq!(campaigns[0].get("senderPoolIds"), Some(&json!(["s1"])));
    }
}
