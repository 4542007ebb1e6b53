use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncResult;
use crate::models::{MutationKind, Payload};

/// Lado remoto de la cola: una llamada por tipo de mutación.
///
/// `Ok` significa que el endpoint aceptó la mutación (2xx) y trae su cuerpo
/// JSON. `Err(Unauthenticated)` no cuenta como intento; cualquier otro `Err`
/// sí.
#[async_trait(?Send)]
pub trait Submitter {
    async fn register_bag(&self, payload: &Payload) -> SyncResult<Value>;

    async fn award_points(&self, payload: &Payload) -> SyncResult<Value>;

    async fn redeem_reward(&self, payload: &Payload) -> SyncResult<Value>;

    async fn submit(&self, kind: MutationKind, payload: &Payload) -> SyncResult<Value> {
        match kind {
            MutationKind::BagRegistration => self.register_bag(payload).await,
            MutationKind::PointsAward => self.award_points(payload).await,
            MutationKind::RewardRedemption => self.redeem_reward(payload).await,
        }
    }
}
