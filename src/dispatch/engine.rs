use std::sync::Arc;

use chrono::Local;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityLog, DeliveryStatus, LogEntry, LogEntryId};
use crate::campaign::{Campaign, CampaignId, CampaignStatus};
use crate::config::{DispatchConfig, RecipientScope};
use crate::contact::Contact;
use crate::database::{decode_record, decode_records, Collection, Record, RecordStore};
use crate::error::Error;
use crate::sender::{SenderId, SenderNode};

use super::policy::{self, CompletionPolicy};
use super::rotation::{self, Rotation};

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Dispatched(Delivery),
    Stalled(Stall),
}

impl TickOutcome {
    /// Number of campaigns advanced: 0 or 1.
    pub fn processed(&self) -> u32 {
        match self {
            TickOutcome::Dispatched(_) => 1,
            TickOutcome::Stalled(_) => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub campaign_id: CampaignId,
    pub entry: LogEntry,
    /// The oldest log entry, if the append pushed it out
    pub evicted: Option<LogEntry>,
    /// Whether the completion policy finished the campaign on this tick
    pub completed: bool,
}

/// Normal conditions under which a tick makes no progress. They are
/// re-evaluated on the next tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Stall {
    NoSendingCampaign,
    EmptySenderPool {
        campaign_id: CampaignId,
    },
    DanglingSender {
        campaign_id: CampaignId,
        sender_id: SenderId,
    },
    NoRecipients {
        campaign_id: CampaignId,
    },
}

/// Performs simulated deliveries, one per tick.
///
/// The engine keeps no record state between ticks: every tick reloads the
/// collections it needs, so a failed tick leaves nothing behind in memory.
/// It is not safe to run two ticks against the same store concurrently;
/// [`Dispatcher`](super::Dispatcher) serializes them.
#[derive(Debug)]
pub struct Engine {
    store: Arc<dyn RecordStore>,
    rotation: Box<dyn Rotation>,
    policy: Box<dyn CompletionPolicy>,
    recipients: RecipientScope,
    success_rate: f64,
    rng: StdRng,
}

impl Engine {
    pub fn new(store: Arc<dyn RecordStore>, config: &DispatchConfig) -> Result<Engine, Error> {
        if !(0.0..=1.0).contains(&config.success_rate) {
            return Err(Error::InvalidConfig(format!(
                "success rate {} is not a probability",
                config.success_rate
            )));
        }

        Ok(Engine {
            store,
            rotation: rotation::from_config(config.rotation),
            policy: policy::from_config(config.completion),
            recipients: config.recipients,
            success_rate: config.success_rate,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_rng(mut self, rng: StdRng) -> Engine {
        self.rng = rng;
        self
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    /// Advances at most one sending campaign by one simulated delivery.
    ///
    /// Stalls are reported through the outcome, never as errors. An error
    /// means the store could not be read or written.
    #[tracing::instrument(skip(self))]
    pub async fn tick(&mut self) -> Result<TickOutcome, Error> {
        let campaign_records = self.store.load(Collection::Campaigns).await?;
        let (index, mut campaign) = match first_sending(&campaign_records) {
            Some(found) => found,
            None => return Ok(stalled(Stall::NoSendingCampaign)),
        };
        let campaign_id = campaign.id.clone();

        if campaign.sender_pool_ids.is_empty() {
            return Ok(stalled(Stall::EmptySenderPool { campaign_id }));
        }

        let senders: Vec<SenderNode> = decode_records(
            Collection::Senders,
            &self.store.load(Collection::Senders).await?,
        );
        if senders.is_empty() {
            return Ok(stalled(Stall::EmptySenderPool { campaign_id }));
        }

        let sender_id =
            match self
                .rotation
                .select(&campaign.id, &campaign.sender_pool_ids, &mut self.rng)
            {
                Some(sender_id) => sender_id.clone(),
                None => return Ok(stalled(Stall::EmptySenderPool { campaign_id })),
            };
        let sender = match senders.iter().find(|sender| sender.id == sender_id) {
            Some(sender) => sender,
            None => {
                return Ok(stalled(Stall::DanglingSender {
                    campaign_id,
                    sender_id,
                }))
            }
        };

        let contacts: Vec<Contact> = decode_records(
            Collection::Contacts,
            &self.store.load(Collection::Contacts).await?,
        );
        let audience = audience(self.recipients, &campaign, &contacts);
        let contact = match audience.choose(&mut self.rng) {
            Some(contact) => *contact,
            None => return Ok(stalled(Stall::NoRecipients { campaign_id })),
        };

        let status = if self.rng.gen_bool(self.success_rate) {
            DeliveryStatus::Success
        } else {
            DeliveryStatus::Failed
        };

        let entry = LogEntry {
            id: LogEntryId::new(),
            sender_name: sender.name.clone(),
            sender_id: Some(sender.id.clone()),
            recipient: contact.email.clone(),
            subject: campaign.subject.clone(),
            status,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            campaign_id: campaign_id.clone(),
        };

        let mut log = ActivityLog::from_records(&self.store.load(Collection::Logs).await?);
        let evicted = log.append(entry.clone());

        campaign.stats.record(status);
        let completed = self.policy.is_complete(&campaign, audience.len());

        let mut updated_records = campaign_records.clone();
        let record = &mut updated_records[index];
        // counters the engine does not track are left as stored
        let mut stats = match record.remove("stats") {
            Some(Value::Object(stats)) => stats,
            _ => Record::new(),
        };
        stats.insert("sent".to_owned(), Value::from(campaign.stats.sent));
        stats.insert("failed".to_owned(), Value::from(campaign.stats.failed));
        record.insert("stats".to_owned(), Value::Object(stats));
        if completed {
            record.insert(
                "status".to_owned(),
                serde_json::to_value(CampaignStatus::Completed)?,
            );
        }

        self.persist(campaign_records, updated_records, log.to_records()?)
            .await?;

        info!(
            campaign_id = %campaign_id,
            sender = %entry.sender_name,
            recipient = %entry.recipient,
            status = ?entry.status,
            completed,
            "dispatched"
        );

        Ok(TickOutcome::Dispatched(Delivery {
            campaign_id,
            entry,
            evicted,
            completed,
        }))
    }

    /// Writes campaigns then logs. The two writes are not atomic together;
    /// if the log write fails the previous campaigns are written back so the
    /// failed tick leaves no counter change behind, as far as the store
    /// allows.
    async fn persist(
        &self,
        previous_campaigns: Vec<Record>,
        campaigns: Vec<Record>,
        logs: Vec<Record>,
    ) -> Result<(), Error> {
        self.store.replace(Collection::Campaigns, campaigns).await?;

        if let Err(err) = self.store.replace(Collection::Logs, logs).await {
            warn!("log write failed, restoring campaigns: {}", err);
            if let Err(restore_err) = self
                .store
                .replace(Collection::Campaigns, previous_campaigns)
                .await
            {
                error!("failed to restore campaigns: {}", restore_err);
            }

            return Err(err);
        }

        Ok(())
    }
}

fn stalled(stall: Stall) -> TickOutcome {
    debug!("tick stalled: {:?}", stall);
    TickOutcome::Stalled(stall)
}

/// The first campaign, in collection order, that is sending and well formed.
fn first_sending(records: &[Record]) -> Option<(usize, Campaign)> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.get("status").and_then(Value::as_str) == Some("sending"))
        .find_map(|(index, record)| match decode_record::<Campaign>(record) {
            Ok(campaign) => Some((index, campaign)),
            Err(err) => {
                warn!(index, "skipping malformed sending campaign: {}", err);
                None
            }
        })
}

/// Contacts the campaign may be delivered to under `scope`.
pub fn audience<'a>(
    scope: RecipientScope,
    campaign: &Campaign,
    contacts: &'a [Contact],
) -> Vec<&'a Contact> {
    match scope {
        RecipientScope::Assigned if !campaign.contacts.is_empty() => contacts
            .iter()
            .filter(|contact| campaign.contacts.contains(&contact.id))
            .collect(),
        RecipientScope::Assigned | RecipientScope::All => contacts.iter().collect(),
    }
}
