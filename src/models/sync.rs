use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Máquina de estados del reenvío. Solo corre un pase a la vez.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    #[default]
    Idle,
    Flushing,
}

/// Resultado agregado de un pase (para el toast "N synced, M failed")
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub synced: usize,
    pub failed: usize,
    /// Pendientes que no entraron en el pase (encoladas mientras corría)
    pub pending: usize,
    /// Fallos de este pase que llegaron al tope de intentos
    pub permanently_failed: usize,
}

impl FlushReport {
    pub fn attempted(&self) -> usize {
        self.synced + self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }

    pub fn summary(&self) -> String {
        let mut text = format!("{} synced, {} failed", self.synced, self.failed);
        if self.permanently_failed > 0 {
            text.push_str(&format!(" ({} gave up)", self.permanently_failed));
        }
        text
    }
}

/// Qué terminó haciendo un disparo de flush
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    Completed(FlushReport),
    /// Ya corría otro pase; este disparo se ignoró
    Coalesced,
}

impl FlushOutcome {
    pub fn report(&self) -> Option<&FlushReport> {
        match self {
            FlushOutcome::Completed(report) => Some(report),
            FlushOutcome::Coalesced => None,
        }
    }
}

/// Respuesta de una escritura. Directas y encoladas tienen la misma forma,
/// la UI no necesita distinguirlas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    /// Cuerpo remoto, o el payload encolado más un `id` provisional
    pub data: Value,
    pub offline_queued: bool,
    /// Id provisional para escrituras que no llegaron al backend
    pub local_id: Option<String>,
    /// Id en la cola; `None` si no se envió ni se guardó
    pub queue_id: Option<u64>,
}

impl WriteResponse {
    pub fn remote(data: Value) -> Self {
        Self {
            data,
            offline_queued: false,
            local_id: None,
            queue_id: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.offline_queued || self.queue_id.is_some()
    }
}
