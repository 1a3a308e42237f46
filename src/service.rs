//! Store service: runs the [`PolicyStore`] on a single tokio task.
//!
//! Every read, edit and external-change event is a message on one queue,
//! so mutations of a policy table never interleave. Settings-provider
//! observers only enqueue [`StoreRequest::ExternalChange`]; they never
//! touch the store themselves.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::PolicyId;
use crate::constants::service::QUEUE_CAPACITY;
use crate::error::{StoreError, StoreResult};
use crate::notifier::{ListenerId, PolicyListener};
use crate::store::PolicyStore;
use crate::table::FactorSnapshot;

type Reply<T> = oneshot::Sender<T>;

/// Messages handled by the store task
enum StoreRequest {
    GetTitle(String, Reply<StoreResult<String>>),
    GetValue(String, Reply<StoreResult<i64>>),
    Snapshot(PolicyId, Reply<Vec<FactorSnapshot>>),
    RawSettings(PolicyId, Reply<String>),
    Update {
        policy: Option<PolicyId>,
        key: String,
        value: i64,
        reply: Reply<StoreResult<()>>,
    },
    Reset(PolicyId, Reply<StoreResult<()>>),
    /// The provider reported a change; no reply
    ExternalChange(PolicyId),
    /// Ask the provider to look for outside changes
    Poll(Reply<StoreResult<()>>),
    Shutdown,
}

/// Clonable handle to the store task
#[derive(Clone)]
pub struct StoreHandle {
    requests: mpsc::Sender<StoreRequest>,
    // Provider observers use this side; unbounded so they never block
    external: mpsc::UnboundedSender<PolicyId>,
    notifier: crate::notifier::ChangeNotifier,
}

pub struct StoreService;

impl StoreService {
    /// Move `store` onto its own task. Must be called inside a tokio runtime.
    pub fn spawn(mut store: PolicyStore) -> (StoreHandle, JoinHandle<()>) {
        let (requests_tx, requests_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (external_tx, external_rx) = mpsc::unbounded_channel();

        let observer_tx = external_tx.clone();
        store.watch_provider(Arc::new(move |settings_id: &str| {
            match PolicyId::from_settings_id(settings_id) {
                Some(policy) => {
                    // Closed only during shutdown
                    let _ = observer_tx.send(policy);
                }
                None => debug!(settings_id, "ignoring change to unrelated setting"),
            }
        }));

        let handle = StoreHandle {
            requests: requests_tx,
            external: external_tx,
            notifier: store.notifier().clone(),
        };
        let task = tokio::spawn(run(store, requests_rx, external_rx));
        (handle, task)
    }
}

async fn run(
    mut store: PolicyStore,
    mut requests: mpsc::Receiver<StoreRequest>,
    mut external: mpsc::UnboundedReceiver<PolicyId>,
) {
    info!("store service started");
    loop {
        // Drain provider events first so a request sees the latest values
        let request = tokio::select! {
            biased;
            Some(policy) = external.recv() => StoreRequest::ExternalChange(policy),
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        if !handle_request(&mut store, request) {
            break;
        }
    }
    info!("store service stopped");
}

/// Returns false when the service should stop
fn handle_request(store: &mut PolicyStore, request: StoreRequest) -> bool {
    match request {
        StoreRequest::GetTitle(key, reply) => {
            let _ = reply.send(store.get_title(&key).map(str::to_string));
        }
        StoreRequest::GetValue(key, reply) => {
            let _ = reply.send(store.get_current_value(&key));
        }
        StoreRequest::Snapshot(policy, reply) => {
            let _ = reply.send(store.snapshot(policy));
        }
        StoreRequest::RawSettings(policy, reply) => {
            let _ = reply.send(store.raw_settings(policy).to_string());
        }
        StoreRequest::Update { policy, key, value, reply } => {
            let result = match policy {
                Some(policy) => store.update_policy_value(policy, &key, value),
                None => store.update_value(&key, value),
            };
            if let Err(e) = &result {
                warn!(key = %key, value, error = %e, "factor update failed");
            }
            let _ = reply.send(result);
        }
        StoreRequest::Reset(policy, reply) => {
            let _ = reply.send(store.reset_to_defaults(policy));
        }
        StoreRequest::ExternalChange(policy) => {
            store.on_external_change(policy);
        }
        StoreRequest::Poll(reply) => {
            let result = store.poll_provider().map_err(|e| {
                warn!(error = %e, "settings poll failed");
                StoreError::Provider(e)
            });
            let _ = reply.send(result);
        }
        StoreRequest::Shutdown => return false,
    }
    true
}

impl StoreHandle {
    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> StoreRequest) -> StoreResult<T> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(make(tx))
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    pub async fn get_title(&self, key: &str) -> StoreResult<String> {
        self.call(|reply| StoreRequest::GetTitle(key.to_string(), reply)).await?
    }

    pub async fn get_current_value(&self, key: &str) -> StoreResult<i64> {
        self.call(|reply| StoreRequest::GetValue(key.to_string(), reply)).await?
    }

    pub async fn snapshot(&self, policy: PolicyId) -> StoreResult<Vec<FactorSnapshot>> {
        self.call(|reply| StoreRequest::Snapshot(policy, reply)).await
    }

    pub async fn raw_settings(&self, policy: PolicyId) -> StoreResult<String> {
        self.call(|reply| StoreRequest::RawSettings(policy, reply)).await
    }

    pub async fn update_value(&self, key: &str, value: i64) -> StoreResult<()> {
        self.call(|reply| StoreRequest::Update {
            policy: None,
            key: key.to_string(),
            value,
            reply,
        })
        .await?
    }

    pub async fn update_policy_value(
        &self,
        policy: PolicyId,
        key: &str,
        value: i64,
    ) -> StoreResult<()> {
        self.call(|reply| StoreRequest::Update {
            policy: Some(policy),
            key: key.to_string(),
            value,
            reply,
        })
        .await?
    }

    pub async fn reset_to_defaults(&self, policy: PolicyId) -> StoreResult<()> {
        self.call(|reply| StoreRequest::Reset(policy, reply)).await?
    }

    pub async fn poll_provider(&self) -> StoreResult<()> {
        self.call(StoreRequest::Poll).await?
    }

    /// Queue an external-change event as if the provider had reported it
    pub fn external_change(&self, policy: PolicyId) -> StoreResult<()> {
        self.external.send(policy).map_err(|_| StoreError::Closed)
    }

    pub fn subscribe(&self, listener: Arc<dyn PolicyListener>) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub async fn shutdown(&self) {
        let _ = self.requests.send(StoreRequest::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::units::CAKES_PER_ARC;
    use crate::notifier::tests::Recorder;
    use crate::notifier::ChangeNotifier;
    use crate::provider::MemorySettings;

    const AM: &str = "tare_alarm_manager_constants";
    const JS: &str = "tare_job_scheduler_constants";

    fn spawn_with(settings: &MemorySettings) -> (StoreHandle, JoinHandle<()>) {
        let store =
            PolicyStore::load(Box::new(settings.clone()), ChangeNotifier::new(), CAKES_PER_ARC);
        StoreService::spawn(store)
    }

    #[tokio::test]
    async fn test_reads_through_handle() {
        let settings = MemorySettings::with_value(AM, "am_max_satiated_balance=4A");
        let (handle, _task) = spawn_with(&settings);

        assert_eq!(
            handle.get_current_value("am_max_satiated_balance").await.unwrap(),
            4 * CAKES_PER_ARC
        );
        assert_eq!(
            handle.get_title("am_max_satiated_balance").await.unwrap(),
            "Max satiated balance"
        );
        assert!(handle.get_title("nope").await.unwrap_err().is_unknown_key());

        let snapshot = handle.snapshot(PolicyId::AlarmManager).await.unwrap();
        assert_eq!(snapshot.iter().filter(|f| f.is_overridden()).count(), 1);
    }

    #[tokio::test]
    async fn test_update_echo_notifies_once() {
        let settings = MemorySettings::new();
        let (handle, _task) = spawn_with(&settings);
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone());

        handle
            .update_value("js_max_satiated_balance", 2 * CAKES_PER_ARC)
            .await
            .unwrap();
        // The write's echo is queued; a later round trip guarantees it was handled
        let raw = handle.raw_settings(PolicyId::JobScheduler).await.unwrap();

        assert_eq!(raw, "js_max_satiated_balance=2A");
        assert_eq!(settings.value(JS).as_deref(), Some("js_max_satiated_balance=2A"));
        assert_eq!(recorder.seen(), vec![PolicyId::JobScheduler]);
    }

    #[tokio::test]
    async fn test_external_edit_is_marshalled_to_store_task() {
        let settings = MemorySettings::new();
        let (handle, _task) = spawn_with(&settings);
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone());

        settings.set_external(AM, "am_hard_consumption_limit=9A");

        assert_eq!(
            handle.get_current_value("am_hard_consumption_limit").await.unwrap(),
            9 * CAKES_PER_ARC
        );
        assert_eq!(recorder.seen(), vec![PolicyId::AlarmManager]);
    }

    #[tokio::test]
    async fn test_spurious_change_event_is_harmless() {
        let settings = MemorySettings::with_value(AM, "am_hard_consumption_limit=9A");
        let (handle, _task) = spawn_with(&settings);
        let recorder = Arc::new(Recorder::default());
        handle.subscribe(recorder.clone());

        settings.touch(AM);
        handle.external_change(PolicyId::AlarmManager).unwrap();

        assert_eq!(
            handle.get_current_value("am_hard_consumption_limit").await.unwrap(),
            9 * CAKES_PER_ARC
        );
        assert!(recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn test_policy_scoped_update_and_reset() {
        let settings = MemorySettings::new();
        let (handle, _task) = spawn_with(&settings);

        let err = handle
            .update_policy_value(PolicyId::AlarmManager, "js_max_satiated_balance", 1)
            .await
            .unwrap_err();
        assert!(err.is_unknown_key());

        handle
            .update_policy_value(PolicyId::AlarmManager, "am_max_satiated_balance", 1)
            .await
            .unwrap();
        assert_eq!(settings.value(AM).as_deref(), Some("am_max_satiated_balance=1ck"));

        handle.reset_to_defaults(PolicyId::AlarmManager).await.unwrap();
        assert_eq!(settings.value(AM).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_is_silent() {
        let settings = MemorySettings::new();
        let (handle, _task) = spawn_with(&settings);
        let recorder = Arc::new(Recorder::default());
        let id = handle.subscribe(recorder.clone());
        assert!(handle.unsubscribe(id));

        handle.update_value("am_max_satiated_balance", 1).await.unwrap();
        assert!(recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let settings = MemorySettings::new();
        let (handle, task) = spawn_with(&settings);

        handle.shutdown().await;
        task.await.unwrap();

        let err = handle.get_current_value("am_max_satiated_balance").await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
