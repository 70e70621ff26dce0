use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::database::{decode_records, encode_record, Collection, Record};
use crate::error::Error;
use crate::sender::SenderId;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod endpoints;
pub use endpoints::*;

/// Maximum number of entries the activity log retains.
pub const LOG_CAPACITY: usize = 50;

pub type LogEntryId = TypedId<LogEntry>;

/// One simulated delivery. Entries are immutable once written.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogEntryId,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<SenderId>,
    pub recipient: String,
    pub subject: String,
    pub status: DeliveryStatus,
    /// Local wall-clock time, `HH:MM:SS`
    pub timestamp: String,
    pub campaign_id: CampaignId,
}

impl TypedIdMarker for LogEntry {
    fn tag() -> &'static str {
        "LOG"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

/// Bounded, most-recent-first sequence of log entries.
///
/// New entries go in at the head; once the log holds more than its capacity
/// the tail (oldest) entry is dropped.
#[derive(Clone, Debug)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new() -> ActivityLog {
        ActivityLog::with_capacity(LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> ActivityLog {
        ActivityLog {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Rebuilds the log from stored records, skipping malformed ones. Only
    /// the most recent `LOG_CAPACITY` entries are kept.
    pub fn from_records(records: &[Record]) -> ActivityLog {
        let mut log = ActivityLog::new();
        log.entries.extend(
            decode_records::<LogEntry>(Collection::Logs, records)
                .into_iter()
                .take(LOG_CAPACITY),
        );
        log
    }

    /// Inserts `entry` at the head and returns the entry evicted from the
    /// tail, if any.
    pub fn append(&mut self, entry: LogEntry) -> Option<LogEntry> {
        self.entries.push_front(entry);

        let mut evicted = None;
        while self.entries.len() > self.capacity {
            evicted = self.entries.pop_back();
        }

        evicted
    }

    /// Entries from most to least recent.
    pub fn read_all(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries.into()
    }

    pub fn to_records(&self) -> Result<Vec<Record>, Error> {
        self.entries.iter().map(encode_record).collect()
    }
}

impl Default for ActivityLog {
    fn default() -> ActivityLog {
        ActivityLog::new()
    }
}
