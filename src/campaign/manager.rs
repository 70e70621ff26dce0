use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::database::{position_of, take_id, Collection, Record, RecordStore};
use crate::error::Error;
use crate::sender::SenderId;

use super::{Campaign, CampaignId, CampaignStats, CampaignStatus};

/// Looks a campaign up in an already loaded collection.
pub fn find_campaign(records: &[Record], campaign_id: &CampaignId) -> Result<Record, Error> {
    let index = locate(records, campaign_id)?;

    Ok(records[index].clone())
}

/// Creates or updates a campaign from an editor submission.
///
/// An id that matches a stored campaign merges the submitted fields into
/// it; counters and the creation time are never taken from the submission.
#[tracing::instrument(skip(store, body))]
pub async fn save_campaign(store: &dyn RecordStore, mut body: Record) -> Result<Record, Error> {
    let campaign_id = take_id::<Campaign>(&mut body)?;
    let status = take_status(&mut body)?;
    let pool = take_sender_pool(&mut body)?;
    body.remove("stats");
    body.remove("createdAt");
    body.remove("created_at");

    let mut records = store.load(Collection::Campaigns).await?;
    let existing = campaign_id
        .as_ref()
        .and_then(|campaign_id| position_of(&records, campaign_id.as_str()));

    let index = match (existing, campaign_id) {
        (Some(index), Some(campaign_id)) => {
            let record = &mut records[index];
            if let (Some(current), Some(next)) = (stored_status(record), status) {
                if !current.can_transition_to(next) {
                    return Err(Error::IllegalStatusTransition {
                        campaign_id,
                        from: current,
                        to: next,
                    });
                }
            }

            record.extend(body);
            if let Some(status) = status {
                record.insert("status".to_owned(), serde_json::to_value(status)?);
            }
            if let Some(pool) = pool {
                record.remove("smtpPoolIds");
                record.insert("senderPoolIds".to_owned(), serde_json::to_value(pool)?);
            }

            index
        }
        (_, campaign_id) => {
            let mut record = Record::new();
            record.insert(
                "id".to_owned(),
                serde_json::to_value(campaign_id.unwrap_or_else(CampaignId::new))?,
            );
            record.insert("name".to_owned(), Value::from(""));
            record.insert("subject".to_owned(), Value::from(""));
            record.insert("contacts".to_owned(), Value::Array(vec![]));
            record.extend(body);
            record.insert(
                "status".to_owned(),
                serde_json::to_value(status.unwrap_or(CampaignStatus::Draft))?,
            );
            record.insert(
                "senderPoolIds".to_owned(),
                serde_json::to_value(pool.unwrap_or_default())?,
            );
            record.insert(
                "stats".to_owned(),
                serde_json::to_value(CampaignStats::default())?,
            );
            record.insert("createdAt".to_owned(), Value::from(Utc::now().to_rfc3339()));

            records.push(record);
            records.len() - 1
        }
    };

    let record = records[index].clone();
    let campaign = parse(&record)?;

    store.replace(Collection::Campaigns, records).await?;
    info!(campaign_id = %campaign.id, status = %campaign.status, "saved campaign");

    Ok(record)
}

#[tracing::instrument(skip(store))]
pub async fn transition_campaign(
    store: &dyn RecordStore,
    campaign_id: CampaignId,
    next: CampaignStatus,
) -> Result<Record, Error> {
    let mut records = store.load(Collection::Campaigns).await?;
    let index = locate(&records, &campaign_id)?;

    let campaign = parse(&records[index])?;
    if !campaign.status.can_transition_to(next) {
        return Err(Error::IllegalStatusTransition {
            campaign_id,
            from: campaign.status,
            to: next,
        });
    }

    records[index].insert("status".to_owned(), serde_json::to_value(next)?);
    let record = records[index].clone();

    store.replace(Collection::Campaigns, records).await?;
    info!(%campaign_id, from = %campaign.status, to = %next, "changed campaign status");

    Ok(record)
}

/// Zeroes every counter of a campaign.
#[tracing::instrument(skip(store))]
pub async fn reset_campaign_stats(
    store: &dyn RecordStore,
    campaign_id: CampaignId,
) -> Result<Record, Error> {
    let mut records = store.load(Collection::Campaigns).await?;
    let index = locate(&records, &campaign_id)?;

    records[index].insert(
        "stats".to_owned(),
        serde_json::to_value(CampaignStats::default())?,
    );
    let record = records[index].clone();

    store.replace(Collection::Campaigns, records).await?;

    Ok(record)
}

#[tracing::instrument(skip(store))]
pub async fn delete_campaign(store: &dyn RecordStore, campaign_id: CampaignId) -> Result<(), Error> {
    let mut records = store.load(Collection::Campaigns).await?;
    let index = locate(&records, &campaign_id)?;

    records.remove(index);
    store.replace(Collection::Campaigns, records).await?;

    Ok(())
}

fn locate(records: &[Record], campaign_id: &CampaignId) -> Result<usize, Error> {
    position_of(records, campaign_id.as_str()).ok_or_else(|| Error::CampaignDoesNotExist {
        campaign_id: campaign_id.clone(),
    })
}

fn parse(record: &Record) -> Result<Campaign, Error> {
    serde_json::from_value(Value::Object(record.clone()))
        .map_err(|reason| Error::MalformedRecord { reason })
}

fn stored_status(record: &Record) -> Option<CampaignStatus> {
    record
        .get("status")
        .and_then(|status| serde_json::from_value(status.clone()).ok())
}

fn take_status(body: &mut Record) -> Result<Option<CampaignStatus>, Error> {
    match body.remove("status") {
        None | Some(Value::Null) => Ok(None),
        Some(status) => serde_json::from_value(status)
            .map(Some)
            .map_err(|reason| Error::InvalidField {
                field: "status",
                reason,
            }),
    }
}

/// Reads the sender pool under either of its names, dropping repeats.
fn take_sender_pool(body: &mut Record) -> Result<Option<Vec<SenderId>>, Error> {
    let value = match (body.remove("senderPoolIds"), body.remove("smtpPoolIds")) {
        (Some(value), _) | (None, Some(value)) => value,
        (None, None) => return Ok(None),
    };

    let ids: Vec<SenderId> =
        serde_json::from_value(value).map_err(|reason| Error::InvalidField {
            field: "senderPoolIds",
            reason,
        })?;

    let mut pool = Vec::with_capacity(ids.len());
    for id in ids {
        if !pool.contains(&id) {
            pool.push(id);
        }
    }

    Ok(Some(pool))
}
