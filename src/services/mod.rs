// ============================================================================
// SERVICES - cola offline, reenvío y escrituras
// ============================================================================
// Los servicios independientes de plataforma van detrás de los traits
// QueueStore, Submitter, Connectivity y Scheduler; los adaptadores del
// navegador los implementan.
// ============================================================================

pub mod auto_sync;
pub mod mutation_service;
pub mod network_monitor;
pub mod offline_queue;
pub mod queue_store;
pub mod scheduler;
pub mod submitter;
pub mod sync_service;

#[cfg(target_arch = "wasm32")]
pub mod api_client;
#[cfg(target_arch = "wasm32")]
pub mod indexeddb;
#[cfg(target_arch = "wasm32")]
pub mod local_store;

#[cfg(test)]
mod test_support;

pub use auto_sync::AutoSync;
pub use mutation_service::MutationService;
pub use network_monitor::{Connectivity, ConnectivityHub, NetworkStatus, Subscription};
pub use offline_queue::{FailureOutcome, OfflineQueue};
pub use queue_store::{MemoryStore, QueueStore, UnavailableStore};
pub use scheduler::{LocalTask, ManualScheduler, Scheduler, Spawn, TimerHandle};
pub use submitter::Submitter;
pub use sync_service::SyncService;

#[cfg(target_arch = "wasm32")]
pub use api_client::ApiClient;
#[cfg(target_arch = "wasm32")]
pub use indexeddb::IndexedDbStore;
#[cfg(target_arch = "wasm32")]
pub use local_store::LocalStorageStore;
#[cfg(target_arch = "wasm32")]
pub use network_monitor::BrowserNetworkMonitor;
#[cfg(target_arch = "wasm32")]
pub use scheduler::{BrowserScheduler, BrowserSpawner};
