use chrono::Local;
use serde_json::Value;
use tracing::{info, warn};

use crate::database::{
    decode_records, encode_record, position_of, Collection, Record, RecordStore,
};
use crate::error::Error;

use super::{Contact, ContactId};

#[tracing::instrument(skip(store))]
pub async fn get_contacts(store: &dyn RecordStore) -> Result<Vec<Contact>, Error> {
    let records = store.load(Collection::Contacts).await?;

    Ok(decode_records(Collection::Contacts, &records))
}

#[tracing::instrument(skip(store, body))]
pub async fn create_contact(store: &dyn RecordStore, body: Record) -> Result<Contact, Error> {
    let contact = prepare_contact(body)?.ok_or(Error::MissingField { field: "email" })?;

    let mut records = store.load(Collection::Contacts).await?;
    records.push(encode_record(&contact)?);
    store.replace(Collection::Contacts, records).await?;

    info!(contact_id = %contact.id, "created contact");

    Ok(contact)
}

/// Appends every well-formed entry that has an email, returning how many
/// were added. Malformed entries are skipped with a warning.
#[tracing::instrument(skip(store, entries), fields(entries = entries.len()))]
pub async fn import_contacts(store: &dyn RecordStore, entries: Vec<Record>) -> Result<usize, Error> {
    let mut imported = vec![];
    for (index, entry) in entries.into_iter().enumerate() {
        match prepare_contact(entry) {
            Ok(Some(contact)) => imported.push(encode_record(&contact)?),
            Ok(None) => {}
            Err(err) => warn!(index, "skipping malformed contact: {}", err),
        }
    }

    let count = imported.len();
    if count > 0 {
        let mut records = store.load(Collection::Contacts).await?;
        records.extend(imported);
        store.replace(Collection::Contacts, records).await?;
    }

    info!(count, "imported contacts");

    Ok(count)
}

#[tracing::instrument(skip(store))]
pub async fn delete_contact(store: &dyn RecordStore, contact_id: ContactId) -> Result<(), Error> {
    let mut records = store.load(Collection::Contacts).await?;
    let index = position_of(&records, contact_id.as_str())
        .ok_or_else(|| Error::ContactDoesNotExist {
            contact_id: contact_id.clone(),
        })?;

    records.remove(index);
    store.replace(Collection::Contacts, records).await?;

    Ok(())
}

/// Builds a new contact from a submitted entry, or `None` if it has no
/// email. The contact gets a fresh id and an `added` timestamp. Null fields
/// count as absent.
fn prepare_contact(mut entry: Record) -> Result<Option<Contact>, Error> {
    entry.retain(|_, value| !value.is_null());

    let email = match entry.get("email") {
        Some(Value::String(email)) if !email.trim().is_empty() => email.trim().to_owned(),
        _ => return Ok(None),
    };

    entry.insert("id".to_owned(), Value::from(ContactId::new().to_string()));
    entry.insert("email".to_owned(), Value::from(email));
    entry.insert(
        "added".to_owned(),
        Value::from(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    );

    let contact = serde_json::from_value(Value::Object(entry))
        .map_err(|reason| Error::MalformedRecord { reason })?;

    Ok(Some(contact))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::contact::ContactStatus;
    use crate::database::test::{record, MockStore};
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn contacts_need_an_email() {
        let store = MockStore::new();

        let missing = create_contact(&store, record(json!({ "name": "Ann" }))).await;
        let blank = create_contact(&store, record(json!({ "email": " " }))).await;

        assert_eq!(missing.unwrap_err(), Error::MissingField { field: "email" });
        assert_eq!(blank.unwrap_err(), Error::MissingField { field: "email" });
    }

    #[tokio::test]
    async fn created_contacts_get_an_id_and_timestamp() {
        let store = MemoryStore::new();

        let contact = create_contact(
            &store,
            record(json!({ "id": "k1", "email": "ann@example.com", "name": "Ann", "city": "Oslo" })),
        )
        .await
        .unwrap();

        assert!(contact.id.as_str().starts_with("CNT-"));
        assert_eq!(contact.status, ContactStatus::Active);
        assert_eq!(contact.extra.get("city"), Some(&json!("Oslo")));
        assert!(contact.extra.contains_key("added"));
        assert_eq!(get_contacts(&store).await.unwrap(), vec![contact]);
    }

    #[tokio::test]
    async fn import_skips_entries_without_email() {
        let store = MemoryStore::with_records(vec![(
            Collection::Contacts,
            vec![record(json!({ "id": "k1", "email": "old@example.com" }))],
        )]);

        let imported = import_contacts(
            &store,
            vec![
                record(json!({ "email": "a@example.com", "group": "vip" })),
                record(json!({ "name": "No Email" })),
                record(json!({ "email": "" })),
                record(json!({ "email": "b@example.com" })),
            ],
        )
        .await
        .unwrap();

        assert_eq!(imported, 2);
        let emails: Vec<_> = get_contacts(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|contact| contact.email)
            .collect();
        assert_eq!(
            emails,
            vec!["old@example.com", "a@example.com", "b@example.com"]
        );
    }

    #[tokio::test]
    async fn import_skips_malformed_entries() {
        let store = MemoryStore::new();

        let imported = import_contacts(
            &store,
            vec![
                record(json!({ "email": "a@x.com" })),
                record(json!({ "email": "b@x.com", "name": null })),
                record(json!({ "email": "c@x.com", "status": "Active" })),
                record(json!({ "email": "d@x.com", "group": ["vip"] })),
            ],
        )
        .await
        .unwrap();

        assert_eq!(imported, 2);
        let contacts = get_contacts(&store).await.unwrap();
        let emails: Vec<_> = contacts.iter().map(|contact| contact.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
        assert_eq!(contacts[1].name, "");
    }

    #[tokio::test]
    async fn empty_import_does_not_write() {
        let store = MockStore::new();

        let imported = import_contacts(&store, vec![record(json!({ "name": "x" }))])
            .await
            .unwrap();

        assert_eq!(imported, 0);
    }

    #[tokio::test]
    async fn deleting_missing_contact_fails() {
        let store = MemoryStore::new();

        let result = delete_contact(&store, "k1".parse().unwrap()).await;

        assert!(matches!(result, Err(Error::ContactDoesNotExist { .. })));
    }
}
