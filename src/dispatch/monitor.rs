use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::Dispatcher;

/// Ticks the dispatcher every `period` until the returned task is aborted.
/// Failed ticks are reported and the loop carries on.
pub fn spawn_autotick(dispatcher: Dispatcher, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match dispatcher.tick().await {
                Ok(outcome) => debug!(processed = outcome.processed(), "autotick"),
                Err(err) => warn!("autotick failed: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::DispatchConfig;
    use crate::database::test::{record, MockStore};
    use crate::database::{Collection, MemoryStore, RecordStore};
    use crate::dispatch::Engine;
    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn ticks_on_every_period() {
        let store = Arc::new(MemoryStore::with_records(vec![
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
        ]));
        let engine = Engine::new(store.clone(), &DispatchConfig::default()).unwrap();
        let dispatcher = Dispatcher::start(engine).await.unwrap();

        let handle = spawn_autotick(dispatcher.clone(), Duration::from_millis(3000));
        // the first tick fires immediately, then one per period
        time::sleep(Duration::from_millis(9500)).await;
        handle.abort();

        assert_eq!(dispatcher.snapshot().logs.len(), 4);
        assert_eq!(store.load(Collection::Logs).await.unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_after_a_failed_tick() {
        let mut store = MockStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        store.on_load = Box::new(move |collection| {
            if collection == Collection::Campaigns {
                // the first load comes from the initial snapshot
                if calls_clone.fetch_add(1, Ordering::SeqCst) == 1 {
                    return Err(Error::StoreUnavailable { collection });
                }
            }
            Ok(vec![])
        });
        let engine = Engine::new(Arc::new(store), &DispatchConfig::default()).unwrap();
        let dispatcher = Dispatcher::start(engine).await.unwrap();

        let handle = spawn_autotick(dispatcher, Duration::from_millis(1000));
        time::sleep(Duration::from_millis(2500)).await;
        handle.abort();

        // one snapshot load, one failing tick and its refresh, two stalled ticks
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
