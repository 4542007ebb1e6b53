// De punta a punta: lo escrito sin red se reenvía al volver la conexión.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{json, Value};

use trashdrop_pwa::services::LocalTask;
use trashdrop_pwa::{
    AutoSync, BagRegistration, ConnectivityHub, FlushReport, MemoryStore, MutationKind, MutationPayload,
    MutationService, NetworkStatus, OfflineQueue, Payload, Spawn, Submitter, SyncError,
    SyncResult, SyncService, SyncStateWrapper,
};

/// Backend de prueba que rechaza las bolsas de `rejected`
#[derive(Default)]
struct FakeBackend {
    rejected: RefCell<Vec<String>>,
    received: RefCell<Vec<Payload>>,
}

impl FakeBackend {
    fn rejecting(bag_id: &str) -> Self {
        let backend = Self::default();
        backend.rejected.borrow_mut().push(bag_id.to_string());
        backend
    }
}

#[async_trait(?Send)]
impl Submitter for FakeBackend {
    async fn register_bag(&self, payload: &Payload) -> SyncResult<Value> {
        self.received.borrow_mut().push(payload.clone());
        let bag_id = payload["bagId"].as_str().unwrap_or_default().to_string();
        if self.rejected.borrow().contains(&bag_id) {
            return Err(SyncError::NetworkFailure("HTTP 409: bag already registered".into()));
        }
        Ok(json!({ "id": format!("bag-{}", bag_id), "status": "registered" }))
    }

    async fn award_points(&self, _payload: &Payload) -> SyncResult<Value> {
        Ok(json!({ "ok": true }))
    }

    async fn redeem_reward(&self, _payload: &Payload) -> SyncResult<Value> {
        Ok(json!({ "ok": true }))
    }
}

/// Junta las tareas lanzadas; el test decide cuándo corren
#[derive(Default)]
struct QueuedSpawner {
    tasks: RefCell<Vec<LocalTask>>,
}

impl QueuedSpawner {
    async fn run_all(&self) {
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                if tasks.is_empty() {
                    None
                } else {
                    Some(tasks.remove(0))
                }
            };
            match next {
                Some(task) => task.await,
                None => break,
            }
        }
    }
}

impl Spawn for QueuedSpawner {
    fn spawn(&self, task: LocalTask) {
        self.tasks.borrow_mut().push(task);
    }
}

#[tokio::test]
async fn offline_bags_are_replayed_on_reconnect() {
    let store = Rc::new(MemoryStore::new());
    let queue = OfflineQueue::new(store.clone());
    let backend = Rc::new(FakeBackend::rejecting("BAG-2"));
    let hub = ConnectivityHub::new(NetworkStatus::Offline);
    let spawner = Rc::new(QueuedSpawner::default());

    let state = SyncStateWrapper::new();
    let reports: Rc<RefCell<Vec<FlushReport>>> = Rc::new(RefCell::new(Vec::new()));
    state.on_report({
        let reports = reports.clone();
        move |report: &FlushReport| reports.borrow_mut().push(report.clone())
    });

    let sync = Rc::new(SyncService::new(queue.clone(), backend.clone(), state));
    let writes = MutationService::new(queue.clone(), backend.clone(), Rc::new(hub.clone()));
    let _auto = AutoSync::start(sync.clone(), Rc::new(hub.clone()), spawner.clone(), None);

    for bag_id in ["BAG-1", "BAG-2", "BAG-3"] {
        let bag = BagRegistration::scanned_now(bag_id, "plastic");
        let response = writes.register_bag(&bag).await.unwrap();
        assert!(response.offline_queued);
        assert_eq!(response.data["bagId"], json!(bag_id));
    }
    assert!(backend.received.borrow().is_empty());
    assert_eq!(queue.pending_count().await.unwrap(), 3);

    hub.set_status(NetworkStatus::Online);
    spawner.run_all().await;

    let expected = FlushReport { synced: 2, failed: 1, pending: 0, permanently_failed: 0 };
    assert_eq!(reports.borrow().as_slice(), &[expected]);

    let sent: Vec<String> = backend
        .received
        .borrow()
        .iter()
        .map(|p| p["bagId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(sent, ["BAG-1", "BAG-2", "BAG-3"]);

    let pending = queue.list_pending(None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].payload["bagId"], json!("BAG-2"));
    assert_eq!(pending[0].sync_attempts, 1);
    assert!(pending[0].last_error.as_deref().unwrap().contains("409"));

    // Las bolsas sincronizadas se borran, la rechazada se queda
    assert_eq!(store.len(), 1);
    assert!(!sync.state().is_flushing());
}

#[tokio::test]
async fn rejected_record_gives_up_after_attempt_cap() {
    let store = Rc::new(MemoryStore::new());
    let queue = OfflineQueue::with_max_attempts(store, 2);
    let backend = Rc::new(FakeBackend::rejecting("BAG-9"));
    let sync = SyncService::new(queue.clone(), backend, SyncStateWrapper::new());

    let bag = BagRegistration::scanned_now("BAG-9", "glass");
    queue
        .enqueue(MutationKind::BagRegistration, bag.to_payload().unwrap())
        .await
        .unwrap();

    let first = sync.flush().await.unwrap();
    assert_eq!(first.report().unwrap().permanently_failed, 0);

    let second = sync.flush().await.unwrap();
    assert_eq!(second.report().unwrap().permanently_failed, 1);

    assert_eq!(queue.pending_count().await.unwrap(), 0);
    let failed = queue.list_failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].sync_attempts, 2);

    // Nada más que reenviar
    let third = sync.flush_if_pending().await.unwrap();
    assert!(third.is_none());

    assert!(queue.discard(failed[0].id).await.unwrap());
    assert!(queue.list_failed().await.unwrap().is_empty());
}

#[tokio::test]
async fn unsubscribed_auto_sync_ignores_reconnects() {
    let queue = OfflineQueue::new(Rc::new(MemoryStore::new()));
    let backend = Rc::new(FakeBackend::default());
    let hub = ConnectivityHub::new(NetworkStatus::Offline);
    let spawner = Rc::new(QueuedSpawner::default());
    let sync = Rc::new(SyncService::new(queue, backend, SyncStateWrapper::new()));

    let auto = AutoSync::start(sync, Rc::new(hub.clone()), spawner.clone(), None);
    assert_eq!(hub.subscriber_count(), 1);
    drop(auto);
    assert_eq!(hub.subscriber_count(), 0);

    hub.set_status(NetworkStatus::Online);
    assert!(spawner.tasks.borrow().is_empty());
}
