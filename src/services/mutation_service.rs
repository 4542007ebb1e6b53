// ============================================================================
// MUTATION SERVICE - escrituras online/offline
// ============================================================================
// Online: envío directo, se encola si falla. Offline: se encola sin tocar la
// red. El llamador siempre recibe un WriteResponse con la misma forma.
// ============================================================================

use std::rc::Rc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::SyncResult;
use crate::models::{
    BagRegistration, MutationKind, MutationPayload, Payload, PointsAward, RewardRedemption,
    WriteResponse,
};
use crate::services::network_monitor::Connectivity;
use crate::services::offline_queue::OfflineQueue;
use crate::services::submitter::Submitter;

#[derive(Clone)]
pub struct MutationService {
    queue: OfflineQueue,
    submitter: Rc<dyn Submitter>,
    connectivity: Rc<dyn Connectivity>,
}

impl MutationService {
    pub fn new(
        queue: OfflineQueue,
        submitter: Rc<dyn Submitter>,
        connectivity: Rc<dyn Connectivity>,
    ) -> Self {
        Self {
            queue,
            submitter,
            connectivity,
        }
    }

    pub async fn register_bag(&self, bag: &BagRegistration) -> SyncResult<WriteResponse> {
        self.write(bag).await
    }

    pub async fn award_points(&self, award: &PointsAward) -> SyncResult<WriteResponse> {
        self.write(award).await
    }

    pub async fn redeem_reward(&self, redemption: &RewardRedemption) -> SyncResult<WriteResponse> {
        self.write(redemption).await
    }

    /// Solo puede fallar la codificación del payload; los problemas de red o
    /// almacenamiento terminan en respuesta encolada u optimista.
    pub async fn write<P: MutationPayload>(&self, payload: &P) -> SyncResult<WriteResponse> {
        let body = payload.to_payload()?;
        Ok(self.write_payload(P::KIND, body).await)
    }

    pub async fn write_payload(&self, kind: MutationKind, body: Payload) -> WriteResponse {
        if self.connectivity.is_online() {
            match self.submitter.submit(kind, &body).await {
                Ok(data) => {
                    log::info!("✅ [WRITE] {:?} aceptada por el backend", kind);
                    return WriteResponse::remote(data);
                }
                Err(e) => {
                    log::warn!("⚠️ [WRITE] {:?} falló online, se encola: {}", kind, e);
                }
            }
        } else {
            log::info!("📴 [WRITE] sin red, se encola {:?}", kind);
        }

        self.queue_or_optimistic(kind, body).await
    }

    async fn queue_or_optimistic(&self, kind: MutationKind, body: Payload) -> WriteResponse {
        let local_id = format!("offline-{}", Uuid::new_v4());

        let queue_id = match self.queue.enqueue(kind, body.clone()).await {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("❌ [WRITE] {:?} no se pudo guardar, respuesta optimista: {}", kind, e);
                None
            }
        };

        let mut data = body;
        data.insert("id".to_string(), Value::String(local_id.clone()));
        data.insert("offlineQueued".to_string(), Value::Bool(true));

        WriteResponse {
            data: Value::Object(data),
            offline_queued: true,
            local_id: Some(local_id),
            queue_id,
        }
    }
}
