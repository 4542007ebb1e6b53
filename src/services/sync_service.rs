// ============================================================================
// SYNC SERVICE - reenvía la cola offline al backend
// ============================================================================
// Un solo pase de flush a la vez. Cada pase trabaja sobre una foto de los
// registros pendientes, intenta cada uno una vez en orden de inserción y no
// se detiene por un fallo aislado. Sin sesión el pase se corta sin gastar
// intentos.
// ============================================================================

use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{SyncError, SyncResult};
use crate::models::sync::{FlushOutcome, FlushReport};
use crate::services::offline_queue::{FailureOutcome, OfflineQueue};
use crate::services::submitter::Submitter;
use crate::state::SyncStateWrapper;

pub struct SyncService {
    queue: OfflineQueue,
    submitter: Rc<dyn Submitter>,
    state: SyncStateWrapper,
}

/// Devuelve el estado a Idle al terminar el pase, termine como termine
struct FlushGuard<'a>(&'a SyncStateWrapper);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.end_flush();
    }
}

impl SyncService {
    pub fn new(queue: OfflineQueue, submitter: Rc<dyn Submitter>, state: SyncStateWrapper) -> Self {
        Self {
            queue,
            submitter,
            state,
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn state(&self) -> &SyncStateWrapper {
        &self.state
    }

    /// Ejecuta un pase, o devuelve `Coalesced` si ya hay uno en curso.
    pub async fn flush(&self) -> SyncResult<FlushOutcome> {
        if !self.state.try_begin_flush() {
            log::info!("🔄 [SYNC] flush ya en curso, se ignora el disparo");
            return Ok(FlushOutcome::Coalesced);
        }
        let _guard = FlushGuard(&self.state);

        let report = self.run_pass().await?;
        if !report.is_empty() {
            log::info!("📤 [SYNC] pase terminado: {}", report.summary());
        }
        self.state.publish_report(report.clone());
        Ok(FlushOutcome::Completed(report))
    }

    /// Solo hace flush si hay algo esperando (arranque, reintento periódico)
    pub async fn flush_if_pending(&self) -> SyncResult<Option<FlushOutcome>> {
        if self.queue.pending_count().await? == 0 {
            log::debug!("📭 [SYNC] nada pendiente");
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    async fn run_pass(&self) -> SyncResult<FlushReport> {
        let snapshot = self.queue.list_pending(None).await?;
        let mut report = FlushReport::default();
        if snapshot.is_empty() {
            return Ok(report);
        }

        log::info!("🔄 [SYNC] reenviando {} mutaciones encoladas", snapshot.len());

        let mut attempted: HashSet<u64> = HashSet::new();
        for mutation in &snapshot {
            match self.submitter.submit(mutation.kind, &mutation.payload).await {
                Ok(_) => {
                    attempted.insert(mutation.id);
                    // El backend ya la tiene; si falla la actualización local
                    // solo significa que se volverá a enviar
                    if let Err(e) = self.queue.record_success(mutation.id).await {
                        log::error!("❌ [SYNC] #{} aceptada pero no marcada: {}", mutation.id, e);
                    }
                    report.synced += 1;
                }
                Err(SyncError::Unauthenticated(reason)) => {
                    // Sin sesión ningún registro puede pasar; el resto espera
                    // al próximo token sin gastar intentos
                    log::warn!("🔐 [SYNC] sin sesión, pase interrumpido: {}", reason);
                    break;
                }
                Err(e) => {
                    attempted.insert(mutation.id);
                    report.failed += 1;
                    match self.queue.record_failure(mutation.id, &e.to_string()).await {
                        Ok(FailureOutcome::PermanentlyFailed { attempts }) => {
                            report.permanently_failed += 1;
                            log::error!(
                                "❌ [SYNC] {}",
                                SyncError::PermanentFailure { id: mutation.id, attempts }
                            );
                        }
                        Ok(_) => {}
                        Err(store_err) => {
                            log::error!("❌ [SYNC] no se pudo registrar el fallo de #{}: {}", mutation.id, store_err);
                        }
                    }
                }
            }
        }

        report.pending = match self.queue.list_pending(None).await {
            Ok(pending) => pending.iter().filter(|m| !attempted.contains(&m.id)).count(),
            Err(e) => {
                log::error!("❌ [SYNC] no se pudieron contar las pendientes: {}", e);
                0
            }
        };

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BagRegistration, Collection, MutationKind, MutationPayload, Payload, PointsAward,
        QueuedMutation, SyncState,
    };
    use crate::services::queue_store::{
        decode_record, decode_records, MemoryStore, QueueStore, UnavailableStore,
    };
    use crate::services::test_support::ScriptedSubmitter;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::cell::Cell;

    fn service(submitter: ScriptedSubmitter) -> (Rc<ScriptedSubmitter>, SyncService) {
        let submitter = Rc::new(submitter);
        let queue = OfflineQueue::new(Rc::new(MemoryStore::new()));
        let service = SyncService::new(queue, submitter.clone(), SyncStateWrapper::new());
        (submitter, service)
    }

    async fn queue_awards(service: &SyncService, n: i64) -> Vec<u64> {
        let mut ids = Vec::new();
        for points in 1..=n {
            let payload = PointsAward {
                request_id: format!("REQ-{}", points),
                points,
                reason: "pickup".into(),
            }
            .to_payload()
            .unwrap();
            ids.push(service.queue().enqueue(MutationKind::PointsAward, payload).await.unwrap());
        }
        ids
    }

    #[tokio::test]
    async fn one_bad_record_does_not_block_the_rest() {
        let (_, service) = service(ScriptedSubmitter::new().fail_call(3));
        let ids = queue_awards(&service, 5).await;

        let outcome = service.flush().await.unwrap();

        assert_eq!(
            outcome,
            FlushOutcome::Completed(FlushReport { synced: 4, failed: 1, pending: 0, permanently_failed: 0 })
        );
        let mut synced = 0;
        for id in &ids {
            let record = service.queue().find(*id).await.unwrap().unwrap();
            if record.synced {
                synced += 1;
            } else {
                assert_eq!(record.id, ids[2]);
                assert_eq!(record.sync_attempts, 1);
            }
        }
        assert_eq!(synced, 4);
    }

    #[tokio::test]
    async fn records_are_replayed_in_insertion_order() {
        let (submitter, service) = service(ScriptedSubmitter::new());
        let bag = BagRegistration::scanned_now("BAG-1", "plastic").to_payload().unwrap();
        queue_awards(&service, 1).await;
        service.queue().enqueue(MutationKind::BagRegistration, bag).await.unwrap();
        queue_awards(&service, 1).await;

        service.flush().await.unwrap();

        let kinds: Vec<MutationKind> = submitter.calls.borrow().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![MutationKind::PointsAward, MutationKind::BagRegistration, MutationKind::PointsAward]
        );
    }

    #[tokio::test]
    async fn second_trigger_during_a_pass_is_coalesced() {
        let (submitter, service) = service(ScriptedSubmitter::new().yielding());
        queue_awards(&service, 3).await;

        let (first, second) = tokio::join!(service.flush(), service.flush());

        let outcomes = [first.unwrap(), second.unwrap()];
        let coalesced = outcomes.iter().filter(|o| **o == FlushOutcome::Coalesced).count();
        let synced: usize = outcomes.iter().filter_map(|o| o.report()).map(|r| r.synced).sum();
        assert_eq!(coalesced, 1);
        assert_eq!(synced, 3);
        assert_eq!(submitter.call_count(), 3);
        assert_eq!(service.state().get_sync_state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn five_failed_passes_park_the_record() {
        let (submitter, service) = service(ScriptedSubmitter::new());
        submitter.set_unreachable(true);
        let ids = queue_awards(&service, 1).await;

        for _ in 0..4 {
            let report = service.flush().await.unwrap();
            assert_eq!(report.report().map(|r| r.permanently_failed), Some(0));
        }
        let last = service.flush().await.unwrap();
        assert_eq!(last.report().map(|r| r.permanently_failed), Some(1));

        assert!(service.queue().list_pending(None).await.unwrap().is_empty());
        let parked = service.queue().find(ids[0]).await.unwrap().unwrap();
        assert!(parked.permanently_failed);
        assert_eq!(parked.sync_attempts, 5);

        // Un sexto pase ya no tiene nada que intentar
        let idle = service.flush().await.unwrap();
        assert_eq!(idle.report().map(|r| r.attempted()), Some(0));
        assert_eq!(submitter.call_count(), 5);
    }

    #[tokio::test]
    async fn each_attempt_counts_once() {
        let (submitter, service) = service(ScriptedSubmitter::new());
        submitter.set_unreachable(true);
        let ids = queue_awards(&service, 2).await;

        service.flush().await.unwrap();
        service.flush().await.unwrap();

        for id in ids {
            assert_eq!(service.queue().find(id).await.unwrap().unwrap().sync_attempts, 2);
        }
    }

    #[tokio::test]
    async fn completed_passes_are_published() {
        let (_, service) = service(ScriptedSubmitter::new().fail_call(1));
        queue_awards(&service, 2).await;
        let toasts = Rc::new(Cell::new(0));
        service.state().on_report({
            let toasts = toasts.clone();
            move |report| {
                assert_eq!(report.summary(), "1 synced, 1 failed");
                toasts.set(toasts.get() + 1);
            }
        });

        service.flush().await.unwrap();

        assert_eq!(toasts.get(), 1);
        assert!(service.state().get_last_report().is_some());
    }

    #[tokio::test]
    async fn flush_if_pending_skips_empty_queue() {
        let (submitter, service) = service(ScriptedSubmitter::new());
        assert_eq!(service.flush_if_pending().await.unwrap(), None);
        assert_eq!(submitter.call_count(), 0);
    }

    #[tokio::test]
    async fn storage_failure_at_pass_start_releases_the_guard() {
        let submitter: Rc<dyn Submitter> = Rc::new(ScriptedSubmitter::new());
        let queue = OfflineQueue::new(Rc::new(UnavailableStore::new("quota exceeded")));
        let service = SyncService::new(queue, submitter, SyncStateWrapper::new());

        let err = service.flush().await.unwrap_err();

        assert!(matches!(err, SyncError::StorageUnavailable(_)));
        assert_eq!(service.state().get_sync_state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn accepted_award_records_its_attempt() {
        let (_, service) = service(ScriptedSubmitter::new());
        let ids = queue_awards(&service, 1).await;

        service.flush().await.unwrap();

        let record = service.queue().find(ids[0]).await.unwrap().unwrap();
        assert!(record.synced);
        assert_eq!(record.sync_attempts, 1);
    }

    #[tokio::test]
    async fn signed_out_pass_spends_no_attempts() {
        let (submitter, service) = service(ScriptedSubmitter::new());
        submitter.set_signed_out(true);
        let ids = queue_awards(&service, 3).await;

        for _ in 0..6 {
            let outcome = service.flush().await.unwrap();
            let report = outcome.report().unwrap();
            assert_eq!(report.attempted(), 0);
            assert_eq!(report.pending, 3);
        }

        for id in &ids {
            let record = service.queue().find(*id).await.unwrap().unwrap();
            assert_eq!(record.sync_attempts, 0);
            assert!(record.is_pending());
        }

        submitter.set_signed_out(false);
        let outcome = service.flush().await.unwrap();
        assert_eq!(outcome.report().map(|r| r.synced), Some(3));
    }

    /// Registra una bolsa nueva en la cola durante la primera llamada
    struct EnqueueingSubmitter {
        queue: OfflineQueue,
        calls: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl Submitter for EnqueueingSubmitter {
        async fn register_bag(&self, _payload: &Payload) -> SyncResult<Value> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == 1 {
                let late = BagRegistration::scanned_now("BAG-LATE", "metal").to_payload()?;
                self.queue.enqueue(MutationKind::BagRegistration, late).await?;
            }
            Ok(json!({ "ok": true }))
        }

        async fn award_points(&self, _payload: &Payload) -> SyncResult<Value> {
            Ok(json!({ "ok": true }))
        }

        async fn redeem_reward(&self, _payload: &Payload) -> SyncResult<Value> {
            Ok(json!({ "ok": true }))
        }
    }

    #[tokio::test]
    async fn records_enqueued_mid_pass_wait_for_the_next_one() {
        let queue = OfflineQueue::new(Rc::new(MemoryStore::new()));
        let submitter = Rc::new(EnqueueingSubmitter { queue: queue.clone(), calls: Cell::new(0) });
        let service = SyncService::new(queue.clone(), submitter.clone(), SyncStateWrapper::new());
        let first = BagRegistration::scanned_now("BAG-1", "plastic").to_payload().unwrap();
        queue.enqueue(MutationKind::BagRegistration, first).await.unwrap();

        let outcome = service.flush().await.unwrap();

        assert_eq!(
            outcome,
            FlushOutcome::Completed(FlushReport { synced: 1, failed: 0, pending: 1, permanently_failed: 0 })
        );
        assert_eq!(submitter.calls.get(), 1);
        let left = queue.list_pending(None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].payload["bagId"], json!("BAG-LATE"));
        assert_eq!(left[0].sync_attempts, 0);

        // El siguiente pase sí la envía
        let next = service.flush().await.unwrap();
        assert_eq!(next.report().map(|r| r.synced), Some(1));
        assert_eq!(submitter.calls.get(), 2);
    }

    /// Store que guarda JSON crudo, como los backends del navegador
    #[derive(Default)]
    struct RawJsonStore {
        next_id: Cell<u64>,
        records: std::cell::RefCell<std::collections::BTreeMap<(Collection, u64), Value>>,
    }

    impl RawJsonStore {
        fn put_raw(&self, collection: Collection, id: u64, raw: Value) {
            self.next_id.set(self.next_id.get().max(id));
            self.records.borrow_mut().insert((collection, id), raw);
        }
    }

    #[async_trait(?Send)]
    impl QueueStore for RawJsonStore {
        async fn insert(&self, mut mutation: QueuedMutation) -> SyncResult<u64> {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            mutation.id = id;
            let raw = serde_json::to_value(&mutation)?;
            self.records.borrow_mut().insert((mutation.collection(), id), raw);
            Ok(id)
        }

        async fn update(&self, mutation: &QueuedMutation) -> SyncResult<()> {
            let raw = serde_json::to_value(mutation)?;
            self.records.borrow_mut().insert((mutation.collection(), mutation.id), raw);
            Ok(())
        }

        async fn get(&self, collection: Collection, id: u64) -> SyncResult<Option<QueuedMutation>> {
            let raw = self.records.borrow().get(&(collection, id)).cloned();
            Ok(raw.and_then(|raw| decode_record(collection, raw)))
        }

        async fn remove(&self, collection: Collection, id: u64) -> SyncResult<()> {
            self.records.borrow_mut().remove(&(collection, id));
            Ok(())
        }

        async fn scan(&self, collection: Collection) -> SyncResult<Vec<QueuedMutation>> {
            let raw: Vec<Value> = self
                .records
                .borrow()
                .range((collection, 0)..=(collection, u64::MAX))
                .map(|(_, raw)| raw.clone())
                .collect();
            Ok(decode_records(collection, raw))
        }

        fn backend(&self) -> &'static str {
            "raw-json"
        }
    }

    #[tokio::test]
    async fn unreadable_record_does_not_stop_the_queue() {
        let store = Rc::new(RawJsonStore::default());
        store.put_raw(
            Collection::BagsQueue,
            1,
            json!({ "id": 1, "kind": "bag_registration", "payload": "cut off mid-wri" }),
        );
        let submitter = Rc::new(ScriptedSubmitter::new());
        let queue = OfflineQueue::new(store.clone());
        let service = SyncService::new(queue.clone(), submitter.clone(), SyncStateWrapper::new());
        let bag = BagRegistration::scanned_now("BAG-OK", "paper").to_payload().unwrap();
        queue.enqueue(MutationKind::BagRegistration, bag).await.unwrap();
        let award_ids = queue_awards(&service, 1).await;

        let outcome = service.flush().await.unwrap();

        assert_eq!(outcome.report().map(|r| (r.synced, r.failed)), Some((2, 0)));
        assert_eq!(submitter.call_count(), 2);
        assert!(queue.find(award_ids[0]).await.unwrap().unwrap().synced);
        // El registro ilegible sigue guardado, intacto
        assert!(store.records.borrow().contains_key(&(Collection::BagsQueue, 1)));
    }
}
