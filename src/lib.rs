// ============================================================================
// TRASHDROP PWA - NÚCLEO DE SYNC OFFLINE
// ============================================================================
// - Models: mutaciones encoladas, reportes de flush, respuestas de escritura
// - Services: cola offline, reenvío, escrituras, disparadores de auto-sync
// - State: estado de sync compartido con Rc<RefCell>
// - App (solo wasm): cableado del navegador y el handle JS `TrashDropSync`
// ============================================================================

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(target_arch = "wasm32")]
mod app;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use models::{
    BagRegistration, Collection, FlushOutcome, FlushReport, MutationKind, MutationPayload,
    Payload, PointsAward, QueuedMutation, RewardRedemption, SyncState, WriteResponse,
};
pub use services::{
    AutoSync, Connectivity, ConnectivityHub, FailureOutcome, ManualScheduler, MemoryStore,
    MutationService, NetworkStatus, OfflineQueue, QueueStore, Scheduler, Spawn, Submitter,
    SyncService, UnavailableStore,
};
pub use state::SyncStateWrapper;

#[cfg(target_arch = "wasm32")]
pub use app::TrashDropSync;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let config = SyncConfig::from_env();
    let level = if config.is_logging_enabled() {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    wasm_logger::init(wasm_logger::Config::new(level));
    log::info!("🚀 TrashDrop sync offline ({})", config.environment);

    Ok(())
}
