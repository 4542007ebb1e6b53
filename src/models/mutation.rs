// ============================================================================
// MUTACIONES ENCOLADAS - escrituras a la espera de confirmación del backend
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};
use crate::utils::constants::{
    AWARD_POINTS_ENDPOINT, BAGS_QUEUE, POINTS_REDEMPTIONS_QUEUE, REDEEM_REWARD_ENDPOINT,
    REGISTER_BAG_ENDPOINT,
};

/// Cuerpo de la mutación según su tipo; se envía tal cual al endpoint.
pub type Payload = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    BagRegistration,
    PointsAward,
    RewardRedemption,
}

impl MutationKind {
    pub const ALL: [MutationKind; 3] = [
        MutationKind::BagRegistration,
        MutationKind::PointsAward,
        MutationKind::RewardRedemption,
    ];

    pub fn collection(self) -> Collection {
        match self {
            MutationKind::BagRegistration => Collection::BagsQueue,
            MutationKind::PointsAward | MutationKind::RewardRedemption => {
                Collection::PointsRedemptionsQueue
            }
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            MutationKind::BagRegistration => REGISTER_BAG_ENDPOINT,
            MutationKind::PointsAward => AWARD_POINTS_ENDPOINT,
            MutationKind::RewardRedemption => REDEEM_REWARD_ENDPOINT,
        }
    }

    /// Las bolsas se borran al sincronizar; puntos y canjes se quedan con
    /// `synced = true` hasta la purga.
    pub fn deletes_on_sync(self) -> bool {
        matches!(self, MutationKind::BagRegistration)
    }
}

/// Colecciones del store local, una por dominio de mutación.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    BagsQueue,
    PointsRedemptionsQueue,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::BagsQueue, Collection::PointsRedemptionsQueue];

    pub fn name(self) -> &'static str {
        match self {
            Collection::BagsQueue => BAGS_QUEUE,
            Collection::PointsRedemptionsQueue => POINTS_REDEMPTIONS_QUEUE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMutation {
    pub id: u64,
    pub kind: MutationKind,
    pub payload: Payload,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub sync_attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub synced: bool,
    #[serde(default)]
    pub permanently_failed: bool,
}

impl QueuedMutation {
    /// Registro nuevo, aún sin persistir. El store asigna el id al insertar.
    pub fn new(kind: MutationKind, payload: Payload) -> Self {
        Self {
            id: 0,
            kind,
            payload,
            created_at: Utc::now(),
            sync_attempts: 0,
            last_error: None,
            synced: false,
            permanently_failed: false,
        }
    }

    /// Visible para el reenvío
    pub fn is_pending(&self) -> bool {
        !self.synced && !self.permanently_failed
    }

    pub fn collection(&self) -> Collection {
        self.kind.collection()
    }
}

// ============================================================================
// PAYLOADS TIPADOS
// ============================================================================

/// Cuerpo tipado que se encola con un tipo fijo.
pub trait MutationPayload: Serialize {
    const KIND: MutationKind;

    fn to_payload(&self) -> SyncResult<Payload> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(SyncError::Serialization(format!(
                "{:?} payload must be a JSON object, got {}",
                Self::KIND,
                other
            ))),
        }
    }
}

/// Cuerpo de `POST /api/bags/register`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BagRegistration {
    pub bag_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(rename = "type")]
    pub waste_type: String,
    /// Los scripts de la página pueden omitirlo; entonces vale "ahora"
    #[serde(rename = "scanned_at", default = "Utc::now")]
    pub scanned_at: DateTime<Utc>,
}

impl BagRegistration {
    pub fn scanned_now(bag_id: impl Into<String>, waste_type: impl Into<String>) -> Self {
        Self {
            bag_id: bag_id.into(),
            request_id: None,
            waste_type: waste_type.into(),
            scanned_at: Utc::now(),
        }
    }

    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl MutationPayload for BagRegistration {
    const KIND: MutationKind = MutationKind::BagRegistration;
}

/// Cuerpo de `POST /api/points/award`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsAward {
    pub request_id: String,
    pub points: i64,
    pub reason: String,
}

impl MutationPayload for PointsAward {
    const KIND: MutationKind = MutationKind::PointsAward;
}

/// Cuerpo de `POST /api/points/redeem`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRedemption {
    pub reward_id: String,
}

impl MutationPayload for RewardRedemption {
    const KIND: MutationKind = MutationKind::RewardRedemption;
}
