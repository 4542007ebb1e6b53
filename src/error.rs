use thiserror::Error;

/// Errores de la cola offline, sus stores y los submitters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// No se pudo abrir o escribir el store durable. La escritura responde
    /// de forma optimista, sin encolar.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Endpoint inalcanzable o respuesta no exitosa.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Sin sesión (no hay token o el backend respondió 401). No cuenta como
    /// intento: el registro espera a que haya token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// La mutación llegó al tope de intentos y ya no se reintenta sola.
    #[error("mutation {id} permanently failed after {attempts} attempts")]
    PermanentFailure { id: u64, attempts: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
