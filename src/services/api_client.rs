// ============================================================================
// API CLIENT - SOLO HTTP (sin estado salvo el token bearer)
// ============================================================================
// Nada de lógica de negocio: los tres POST que la cola reenvía.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use gloo_net::http::Request;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::models::{MutationKind, Payload};
use crate::services::submitter::Submitter;

/// Submitter sobre fetch para la API de TrashDrop
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    access_token: Rc<RefCell<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: Rc::new(RefCell::new(None)),
        }
    }

    /// Token de la sesión del backend de auth; `None` al cerrar sesión
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.borrow_mut() = token.filter(|t| !t.is_empty());
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.borrow().is_some()
    }

    async fn post(&self, kind: MutationKind, payload: &Payload) -> SyncResult<Value> {
        let url = format!("{}{}", self.base_url, kind.endpoint());
        // Sin token no se toca la red
        let token = self
            .access_token
            .borrow()
            .clone()
            .ok_or_else(|| SyncError::Unauthenticated("no access token".to_string()))?;

        log::debug!("📤 [API] POST {}", url);

        let response = Request::post(&url)
            .header("Authorization", &format!("Bearer {}", token))
            .json(payload)
            .map_err(|e| SyncError::Serialization(format!("Request build error: {}", e)))?
            .send()
            .await
            .map_err(|e| SyncError::NetworkFailure(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::NetworkFailure(format!("Read error: {}", e)))?;

        if status == 401 {
            return Err(SyncError::Unauthenticated(format!("HTTP 401: {}", body)));
        }
        if !response.ok() {
            return Err(SyncError::NetworkFailure(format!("HTTP {}: {}", status, body)));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| SyncError::NetworkFailure(format!("Parse error: {}", e)))
    }
}

#[async_trait(?Send)]
impl Submitter for ApiClient {
    async fn register_bag(&self, payload: &Payload) -> SyncResult<Value> {
        self.post(MutationKind::BagRegistration, payload).await
    }

    async fn award_points(&self, payload: &Payload) -> SyncResult<Value> {
        self.post(MutationKind::PointsAward, payload).await
    }

    async fn redeem_reward(&self, payload: &Payload) -> SyncResult<Value> {
        self.post(MutationKind::RewardRedemption, payload).await
    }
}
