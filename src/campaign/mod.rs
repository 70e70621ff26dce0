use std::fmt::{self, Display};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::activity::DeliveryStatus;
use crate::contact::ContactId;
use crate::database::Record;
use crate::sender::SenderId;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type CampaignId = TypedId<Campaign>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub status: CampaignStatus,
    #[serde(default, alias = "smtpPoolIds")]
    pub sender_pool_ids: Vec<SenderId>,
    /// Contacts assigned to this campaign; empty means the whole book.
    #[serde(default)]
    pub contacts: Vec<ContactId>,
    #[serde(default)]
    pub stats: CampaignStats,
    #[serde(
        default,
        alias = "created_at",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Editor fields the dispatcher does not interpret.
    #[serde(flatten)]
    pub extra: Record,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}

impl Campaign {
    pub fn is_dispatchable(&self) -> bool {
        self.status == CampaignStatus::Sending
    }
}

// Older records carry `Y-m-d H:i:s` local timestamps; anything unreadable is
// dropped rather than rejecting the whole campaign.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer).unwrap_or(None);

    Ok(raw.and_then(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S").map(|at| at.and_utc())
            })
            .ok()
    }))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Paused,
    Completed,
}

impl CampaignStatus {
    /// Whether an editor may move a campaign from `self` to `next`.
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Sending)
                | (Scheduled, Draft)
                | (Scheduled, Sending)
                | (Sending, Paused)
                | (Sending, Completed)
                | (Paused, Sending)
                | (Paused, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == CampaignStatus::Completed
    }
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
        };

        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct CampaignStats {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub opened: u64,
    #[serde(default)]
    pub clicked: u64,
}

impl CampaignStats {
    pub fn record(&mut self, status: DeliveryStatus) {
        match status {
            DeliveryStatus::Success => self.sent = self.sent.saturating_add(1),
            DeliveryStatus::Failed => self.failed = self.failed.saturating_add(1),
        }
    }

    pub fn attempts(&self) -> u64 {
        self.sent.saturating_add(self.failed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::decode_record;
    use crate::database::test::record;

    #[test]
    fn counters_saturate_at_the_maximum() {
        let mut stats = CampaignStats {
            sent: u64::MAX,
            failed: 2,
            ..CampaignStats::default()
        };

        stats.record(DeliveryStatus::Success);
        stats.record(DeliveryStatus::Failed);

        assert_eq!(stats.sent, u64::MAX);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.attempts(), u64::MAX);
    }

    #[test]
    fn lifecycle_only_moves_forward_or_pauses() {
        use CampaignStatus::*;

        assert!(Draft.can_transition_to(Scheduled));
        assert!(Scheduled.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(Sending));
        assert!(!Completed.can_transition_to(Draft));
        assert!(!Paused.can_transition_to(Draft));
        assert!(!Sending.can_transition_to(Scheduled));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn decodes_console_records() {
        let campaign: Campaign = decode_record(&record(json!({
            "id": "c1",
            "name": "Launch",
            "subject": "Hello",
            "status": "sending",
            "smtpPoolIds": ["s1", "s2"],
            "body": "<p>hi</p>",
            "stats": { "sent": 3, "failed": 1 }
        })))
        .unwrap();

        assert_eq!(campaign.id.as_str(), "c1");
        assert!(campaign.is_dispatchable());
        assert_eq!(campaign.sender_pool_ids.len(), 2);
        assert!(campaign.contacts.is_empty());
        assert_eq!(campaign.stats.attempts(), 4);
        assert_eq!(campaign.stats.opened, 0);
        assert_eq!(campaign.extra.get("body"), Some(&json!("<p>hi</p>")));
    }

    #[test]
    fn legacy_creation_timestamps_are_read() {
        let campaign: Campaign = decode_record(&record(json!({
            "id": "c1",
            "name": "Launch",
            "subject": "Hello",
            "status": "draft",
            "created_at": "2024-03-01 10:15:00"
        })))
        .unwrap();

        assert_eq!(
            campaign.created_at.map(|at| at.to_rfc3339()),
            Some("2024-03-01T10:15:00+00:00".to_string())
        );
    }

    #[test]
    fn campaigns_without_a_status_are_malformed() {
        let result = decode_record::<Campaign>(&record(json!({
            "id": "c1",
            "name": "Launch",
            "subject": "Hello"
        })));

        assert!(result.is_err());
    }

    #[test]
    fn unknown_status_is_malformed() {
        let result = decode_record::<Campaign>(&record(json!({
            "id": "c1",
            "name": "Launch",
            "subject": "Hello",
            "status": "exploding"
        })));

        assert!(result.is_err());
    }
}
