use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::activity::{ActivityLog, LogEntry};
use crate::campaign::{self, CampaignId, CampaignStatus};
use crate::contact::{self, Contact, ContactId};
use crate::database::{Collection, Record, RecordStore};
use crate::error::Error;
use crate::sender::{self, SenderId, SenderNode};

use super::engine::{Engine, TickOutcome};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, Error>>;

/// Campaigns and activity log as of the last completed write.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub campaigns: Vec<Record>,
    pub logs: Vec<LogEntry>,
}

impl Snapshot {
    async fn load(store: &dyn RecordStore) -> Result<Snapshot, Error> {
        let campaigns = store.load(Collection::Campaigns).await?;
        let logs = ActivityLog::from_records(&store.load(Collection::Logs).await?);

        Ok(Snapshot {
            campaigns,
            logs: logs.into_entries(),
        })
    }
}

#[derive(Debug)]
enum Command {
    Tick(Reply<TickOutcome>),
    SaveCampaign(Record, Reply<Record>),
    TransitionCampaign(CampaignId, CampaignStatus, Reply<Record>),
    ResetCampaignStats(CampaignId, Reply<Record>),
    DeleteCampaign(CampaignId, Reply<()>),
    CreateSender(Record, Reply<SenderNode>),
    DeleteSender(SenderId, Reply<()>),
    CreateContact(Record, Reply<Contact>),
    ImportContacts(Vec<Record>, Reply<usize>),
    DeleteContact(ContactId, Reply<()>),
}

/// Handle to the task that owns the dispatch engine.
///
/// Every mutation, ticks included, goes through one task and runs to
/// completion before the next starts. Campaign and log reads are answered
/// from the snapshot published after each write.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    store: Arc<dyn RecordStore>,
}

impl Dispatcher {
    /// Spawns the worker task. Must be called within a tokio runtime.
    pub async fn start(engine: Engine) -> Result<Dispatcher, Error> {
        let store = engine.store();
        let snapshot = Snapshot::load(&*store).await?;
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(snapshot));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let worker = Worker {
            engine,
            store: Arc::clone(&store),
            snapshots: snapshot_tx,
        };
        tokio::spawn(worker.run(command_rx));

        Ok(Dispatcher {
            commands: command_tx,
            snapshots: snapshot_rx,
            store,
        })
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Direct store access for reads that need no snapshot.
    pub fn store(&self) -> &dyn RecordStore {
        &*self.store
    }

    pub async fn tick(&self) -> Result<TickOutcome, Error> {
        self.request(Command::Tick).await
    }

    pub async fn save_campaign(&self, body: Record) -> Result<Record, Error> {
        self.request(|reply| Command::SaveCampaign(body, reply))
            .await
    }

    pub async fn transition_campaign(
        &self,
        campaign_id: CampaignId,
        status: CampaignStatus,
    ) -> Result<Record, Error> {
        self.request(|reply| Command::TransitionCampaign(campaign_id, status, reply))
            .await
    }

    pub async fn reset_campaign_stats(&self, campaign_id: CampaignId) -> Result<Record, Error> {
        self.request(|reply| Command::ResetCampaignStats(campaign_id, reply))
            .await
    }

    pub async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<(), Error> {
        self.request(|reply| Command::DeleteCampaign(campaign_id, reply))
            .await
    }

    pub async fn create_sender(&self, body: Record) -> Result<SenderNode, Error> {
        self.request(|reply| Command::CreateSender(body, reply))
            .await
    }

    pub async fn delete_sender(&self, sender_id: SenderId) -> Result<(), Error> {
        self.request(|reply| Command::DeleteSender(sender_id, reply))
            .await
    }

    pub async fn create_contact(&self, body: Record) -> Result<Contact, Error> {
        self.request(|reply| Command::CreateContact(body, reply))
            .await
    }

    pub async fn import_contacts(&self, entries: Vec<Record>) -> Result<usize, Error> {
        self.request(|reply| Command::ImportContacts(entries, reply))
            .await
    }

    pub async fn delete_contact(&self, contact_id: ContactId) -> Result<(), Error> {
        self.request(|reply| Command::DeleteContact(contact_id, reply))
            .await
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, Error> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::DispatcherUnavailable)?;

        response.await.map_err(|_| Error::DispatcherUnavailable)?
    }
}

struct Worker {
    engine: Engine,
    store: Arc<dyn RecordStore>,
    snapshots: watch::Sender<Arc<Snapshot>>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("dispatch worker started");

        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }

        info!("dispatch worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        let store = &*self.store;

        match command {
            Command::Tick(reply) => {
                let result = self.engine.tick().await;
                // a failed tick may still have written, so always refresh
                if !matches!(result, Ok(TickOutcome::Stalled(_))) {
                    self.publish().await;
                }
                respond(reply, result);
            }
            Command::SaveCampaign(body, reply) => {
                let result = campaign::manager::save_campaign(store, body).await;
                self.publish().await;
                respond(reply, result);
            }
            Command::TransitionCampaign(campaign_id, status, reply) => {
                let result =
                    campaign::manager::transition_campaign(store, campaign_id, status).await;
                self.publish().await;
                respond(reply, result);
            }
            Command::ResetCampaignStats(campaign_id, reply) => {
                let result = campaign::manager::reset_campaign_stats(store, campaign_id).await;
                self.publish().await;
                respond(reply, result);
            }
            Command::DeleteCampaign(campaign_id, reply) => {
                let result = campaign::manager::delete_campaign(store, campaign_id).await;
                self.publish().await;
                respond(reply, result);
            }
            Command::CreateSender(body, reply) => {
                respond(reply, sender::manager::create_sender(store, body).await);
            }
            Command::DeleteSender(sender_id, reply) => {
                respond(reply, sender::manager::delete_sender(store, sender_id).await);
            }
            Command::CreateContact(body, reply) => {
                respond(reply, contact::manager::create_contact(store, body).await);
            }
            Command::ImportContacts(entries, reply) => {
                respond(reply, contact::manager::import_contacts(store, entries).await);
            }
            Command::DeleteContact(contact_id, reply) => {
                respond(reply, contact::manager::delete_contact(store, contact_id).await);
            }
        }
    }

    /// Reloads campaigns and logs and publishes them. The previous snapshot
    /// stays in place if the store cannot be read.
    async fn publish(&self) {
        match Snapshot::load(&*self.store).await {
            Ok(snapshot) => {
                self.snapshots.send_replace(Arc::new(snapshot));
            }
            Err(err) => warn!("failed to refresh snapshot: {}", err),
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T, Error>) {
    if reply.send(result).is_err() {
        debug!("requester went away before the reply");
    }
}

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    use super::*;
    use crate::activity::tests::entry;
    use crate::activity::LOG_CAPACITY;
    use crate::campaign::Campaign;
    use crate::config::DispatchConfig;
    use crate::database::test::record;
    use crate::database::{decode_record, encode_record, MemoryStore};

    async fn dispatcher(store: Arc<MemoryStore>) -> Dispatcher {
        let engine = Engine::new(store, &DispatchConfig::default())
            .unwrap()
            .with_rng(StdRng::seed_from_u64(3));

        Dispatcher::start(engine).await.unwrap()
    }

    fn sending_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_records(vec![
            (
                Collection::Campaigns,
                vec![record(json!({ "id": "c1", "status": "sending", "senderPoolIds": ["s1"] }))],
            ),
            (
                Collection::Senders,
                vec![record(json!({ "id": "s1", "name": "Primary" }))],
            ),
            (
                Collection::Contacts,
                vec![record(json!({ "id": "k1", "email": "a@x.com" }))],
            ),
        ]))
    }

    #[tokio::test]
    async fn concurrent_ticks_lose_no_updates() {
        let store = sending_store();
        let dispatcher = dispatcher(Arc::clone(&store)).await;

        let ticks = (0..40).map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.tick().await })
        });
        for result in join_all(ticks).await {
            assert_eq!(result.unwrap().unwrap().processed(), 1);
        }

        let campaigns = store.load(Collection::Campaigns).await.unwrap();
        let campaign: Campaign = decode_record(&campaigns[0]).unwrap();
        assert_eq!(campaign.stats.attempts(), 40);
        assert_eq!(dispatcher.snapshot().logs.len(), 40);
    }

    #[tokio::test]
    async fn snapshot_follows_writes() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = dispatcher(store).await;
        assert!(dispatcher.snapshot().campaigns.is_empty());

        let saved = dispatcher
            .save_campaign(record(json!({ "name": "Launch" })))
            .await
            .unwrap();

        assert_eq!(dispatcher.snapshot().campaigns, vec![saved]);
    }

    #[tokio::test]
    async fn stalled_ticks_leave_the_snapshot_alone() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = dispatcher(store).await;
        let before = dispatcher.snapshot();

        let outcome = dispatcher.tick().await.unwrap();

        assert_eq!(outcome.processed(), 0);
        assert!(Arc::ptr_eq(&before, &dispatcher.snapshot()));
    }

    #[tokio::test]
    async fn editor_writes_interleave_with_ticks() {
        let store = sending_store();
        let dispatcher = dispatcher(Arc::clone(&store)).await;

        dispatcher.tick().await.unwrap();
        dispatcher
            .transition_campaign("c1".parse().unwrap(), CampaignStatus::Paused)
            .await
            .unwrap();
        let outcome = dispatcher.tick().await.unwrap();

        assert_eq!(outcome.processed(), 0);
        let snapshot = dispatcher.snapshot();
        let campaign: Campaign = decode_record(&snapshot.campaigns[0]).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Paused);
        assert_eq!(campaign.stats.attempts(), 1);
        assert_eq!(snapshot.logs.len(), 1);
    }

    #[tokio::test]
    async fn oversized_stored_log_is_served_at_capacity() {
        let logs = (0..60)
            .rev()
            .map(|n| encode_record(&entry(n)).unwrap())
            .collect();
        let store = Arc::new(MemoryStore::with_records(vec![(Collection::Logs, logs)]));
        let dispatcher = dispatcher(store).await;

        let snapshot = dispatcher.snapshot();

        assert_eq!(snapshot.logs.len(), LOG_CAPACITY);
        assert_eq!(snapshot.logs[0], entry(59));
        assert_eq!(snapshot.logs[LOG_CAPACITY - 1], entry(10));
    }

    #[tokio::test]
    async fn write_errors_reach_the_caller() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = dispatcher(store).await;

        let result = dispatcher.delete_sender("s1".parse().unwrap()).await;

        assert_eq!(
            result.unwrap_err(),
            Error::SenderDoesNotExist {
                sender_id: "s1".parse().unwrap()
            }
        );
    }
}
