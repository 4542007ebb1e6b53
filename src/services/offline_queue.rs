// ============================================================================
// OFFLINE QUEUE - mutaciones pendientes sobre un QueueStore durable
// ============================================================================

use std::rc::Rc;

use crate::error::SyncResult;
use crate::models::{Collection, MutationKind, Payload, QueuedMutation};
use crate::services::queue_store::QueueStore;
use crate::utils::constants::MAX_SYNC_ATTEMPTS;

/// Resultado de `record_failure`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    WillRetry { attempts: u32 },
    PermanentlyFailed { attempts: u32 },
    /// El registro ya no estaba (sincronizado o descartado)
    Missing,
}

#[derive(Clone)]
pub struct OfflineQueue {
    store: Rc<dyn QueueStore>,
    max_attempts: u32,
}

impl OfflineQueue {
    pub fn new(store: Rc<dyn QueueStore>) -> Self {
        Self::with_max_attempts(store, MAX_SYNC_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Rc<dyn QueueStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Escribe de forma durable una mutación pendiente y devuelve su id.
    pub async fn enqueue(&self, kind: MutationKind, payload: Payload) -> SyncResult<u64> {
        let id = self.store.insert(QueuedMutation::new(kind, payload)).await?;
        log::info!("💾 [QUEUE] {:?} encolada como #{} ({})", kind, id, self.store.backend());
        Ok(id)
    }

    /// Registros pendientes (ni sincronizados ni descartados por fallos) en
    /// orden de inserción.
    pub async fn list_pending(&self, kind: Option<MutationKind>) -> SyncResult<Vec<QueuedMutation>> {
        let mut pending = self
            .scan_where(kind, |mutation| mutation.is_pending())
            .await?;
        pending.retain(|mutation| kind.map_or(true, |k| mutation.kind == k));
        Ok(pending)
    }

    pub async fn pending_count(&self) -> SyncResult<usize> {
        Ok(self.list_pending(None).await?.len())
    }

    /// Registros aparcados al llegar al tope de intentos, para revisión manual.
    pub async fn list_failed(&self) -> SyncResult<Vec<QueuedMutation>> {
        self.scan_where(None, |mutation| mutation.permanently_failed).await
    }

    /// Marca un registro como aceptado por el backend. Las bolsas se borran,
    /// el resto queda marcado. Ids desconocidos o ya sincronizados: no-op.
    pub async fn mark_synced(&self, id: u64) -> SyncResult<()> {
        let Some(mutation) = self.find(id).await? else {
            log::debug!("🗑️ [QUEUE] #{} ya no existe, nada que marcar", id);
            return Ok(());
        };
        self.finish_synced(mutation).await
    }

    /// Intento de reenvío aceptado: cuenta el intento, lo persiste y luego
    /// marca o borra como `mark_synced`.
    pub async fn record_success(&self, id: u64) -> SyncResult<()> {
        let Some(mut mutation) = self.find(id).await? else {
            log::debug!("🗑️ [QUEUE] #{} ya no existe, nada que marcar", id);
            return Ok(());
        };
        if mutation.synced {
            return Ok(());
        }

        mutation.sync_attempts += 1;
        self.store.update(&mutation).await?;
        self.finish_synced(mutation).await
    }

    async fn finish_synced(&self, mut mutation: QueuedMutation) -> SyncResult<()> {
        if mutation.synced {
            return Ok(());
        }

        let id = mutation.id;
        if mutation.kind.deletes_on_sync() {
            self.store.remove(mutation.collection(), id).await?;
        } else {
            mutation.synced = true;
            mutation.last_error = None;
            self.store.update(&mutation).await?;
        }
        log::info!("✅ [QUEUE] #{} sincronizada", id);
        Ok(())
    }

    /// Cuenta un intento fallido. Al llegar al tope el registro queda aparcado
    /// como fallido definitivo; aquí nunca se borra.
    pub async fn record_failure(&self, id: u64, error: &str) -> SyncResult<FailureOutcome> {
        let Some(mut mutation) = self.find(id).await? else {
            return Ok(FailureOutcome::Missing);
        };

        mutation.sync_attempts += 1;
        mutation.last_error = Some(error.to_string());
        let attempts = mutation.sync_attempts;
        if attempts >= self.max_attempts {
            mutation.permanently_failed = true;
        }
        self.store.update(&mutation).await?;

        if mutation.permanently_failed {
            log::error!("⛔ [QUEUE] #{} abandonada tras {} intentos: {}", id, attempts, error);
            Ok(FailureOutcome::PermanentlyFailed { attempts })
        } else {
            log::warn!("⚠️ [QUEUE] #{} intento {}/{} fallido: {}", id, attempts, self.max_attempts, error);
            Ok(FailureOutcome::WillRetry { attempts })
        }
    }

    /// Borra un registro para siempre, sea cual sea su estado.
    pub async fn discard(&self, id: u64) -> SyncResult<bool> {
        match self.find(id).await? {
            Some(mutation) => {
                self.store.remove(mutation.collection(), id).await?;
                log::info!("🗑️ [QUEUE] #{} descartada", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Borra los registros guardados con `synced = true`. Devuelve cuántos.
    pub async fn purge_synced(&self) -> SyncResult<usize> {
        let synced = self.scan_where(None, |mutation| mutation.synced).await?;
        for mutation in &synced {
            self.store.remove(mutation.collection(), mutation.id).await?;
        }
        Ok(synced.len())
    }

    pub async fn find(&self, id: u64) -> SyncResult<Option<QueuedMutation>> {
        for collection in Collection::ALL {
            if let Some(mutation) = self.store.get(collection, id).await? {
                return Ok(Some(mutation));
            }
        }
        Ok(None)
    }

    async fn scan_where<F>(&self, kind: Option<MutationKind>, keep: F) -> SyncResult<Vec<QueuedMutation>>
    where
        F: Fn(&QueuedMutation) -> bool,
    {
        let collections: Vec<Collection> = match kind {
            Some(kind) => vec![kind.collection()],
            None => Collection::ALL.to_vec(),
        };

        let mut records = Vec::new();
        for collection in collections {
            records.extend(self.store.scan(collection).await?.into_iter().filter(|m| keep(m)));
        }
        // Los ids salen de una sola secuencia: orden de id = orden de inserción
        records.sort_by_key(|mutation| mutation.id);
        Ok(records)
    }
}
