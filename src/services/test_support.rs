// Dobles de prueba compartidos por los tests de servicios

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{SyncError, SyncResult};
use crate::models::{MutationKind, Payload};
use crate::services::submitter::Submitter;

/// Submitter que registra cada llamada y falla las llamadas indicadas.
#[derive(Default)]
pub struct ScriptedSubmitter {
    pub calls: RefCell<Vec<(MutationKind, Payload)>>,
    failing_calls: RefCell<HashSet<usize>>,
    unreachable: Cell<bool>,
    signed_out: Cell<bool>,
    yield_before_reply: Cell<bool>,
}

impl ScriptedSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Falla la llamada n (empezando en 1) con un HTTP 500
    pub fn fail_call(self, n: usize) -> Self {
        self.failing_calls.borrow_mut().insert(n);
        self
    }

    /// Todas las llamadas fallan como si no hubiera red
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.set(unreachable);
    }

    /// Cede una vez por llamada para que los llamadores concurrentes avancen
    pub fn yielding(self) -> Self {
        self.yield_before_reply.set(true);
        self
    }

    /// Todas las llamadas responden como sin token de sesión
    pub fn set_signed_out(&self, signed_out: bool) {
        self.signed_out.set(signed_out);
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    async fn reply(&self, kind: MutationKind, payload: &Payload) -> SyncResult<Value> {
        let n = {
            let mut calls = self.calls.borrow_mut();
            calls.push((kind, payload.clone()));
            calls.len()
        };
        if self.yield_before_reply.get() {
            tokio::task::yield_now().await;
        }
        if self.signed_out.get() {
            return Err(SyncError::Unauthenticated("no access token".into()));
        }
        if self.unreachable.get() {
            return Err(SyncError::NetworkFailure("Failed to fetch".into()));
        }
        if self.failing_calls.borrow().contains(&n) {
            return Err(SyncError::NetworkFailure("HTTP 500: Internal Server Error".into()));
        }
        Ok(json!({ "id": format!("srv-{}", n), "kind": kind }))
    }
}

#[async_trait(?Send)]
impl Submitter for ScriptedSubmitter {
    async fn register_bag(&self, payload: &Payload) -> SyncResult<Value> {
        self.reply(MutationKind::BagRegistration, payload).await
    }

    async fn award_points(&self, payload: &Payload) -> SyncResult<Value> {
        self.reply(MutationKind::PointsAward, payload).await
    }

    async fn redeem_reward(&self, payload: &Payload) -> SyncResult<Value> {
        self.reply(MutationKind::RewardRedemption, payload).await
    }
}

/// Submitter cuyas llamadas nunca resuelven, como una request colgada
pub struct HangingSubmitter;

#[async_trait(?Send)]
impl Submitter for HangingSubmitter {
    async fn register_bag(&self, _payload: &Payload) -> SyncResult<Value> {
        std::future::pending().await
    }

    async fn award_points(&self, _payload: &Payload) -> SyncResult<Value> {
        std::future::pending().await
    }

    async fn redeem_reward(&self, _payload: &Payload) -> SyncResult<Value> {
        std::future::pending().await
    }
}
