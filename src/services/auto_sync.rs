// ============================================================================
// AUTO SYNC - decide cuándo empieza un pase de flush
// ============================================================================
// Disparadores:
// - cada transición offline -> online
// - arranque, si hay red y algo pendiente
// - reintento periódico opcional mientras haya red
// Los disparos solapados los agrupa SyncService.
// ============================================================================

use std::rc::Rc;

use crate::services::network_monitor::{Connectivity, NetworkStatus, Subscription};
use crate::services::scheduler::{Scheduler, Spawn, TimerHandle};
use crate::services::sync_service::SyncService;

/// Mantiene vivos los disparadores; al soltarlo se detiene el flush automático.
pub struct AutoSync {
    _subscription: Subscription,
    _retry_timer: Option<TimerHandle>,
}

impl AutoSync {
    pub fn start(
        service: Rc<SyncService>,
        connectivity: Rc<dyn Connectivity>,
        spawner: Rc<dyn Spawn>,
        retry: Option<(&dyn Scheduler, u32)>,
    ) -> Self {
        let online = connectivity.is_online();
        service.state().set_online(online);

        let subscription = connectivity.on_connectivity_change(Rc::new({
            let service = service.clone();
            let spawner = spawner.clone();
            move |status: NetworkStatus| {
                service.state().set_online(status == NetworkStatus::Online);
                if status == NetworkStatus::Online {
                    log::info!("🌐 [AUTO-SYNC] conexión restablecida, vaciando la cola");
                    spawn_flush(&service, spawner.as_ref(), false);
                }
            }
        }));

        let retry_timer = retry.map(|(scheduler, interval_ms)| {
            log::info!("⏰ [AUTO-SYNC] reintentando pendientes cada {}s", interval_ms / 1000);
            let service = service.clone();
            let spawner = spawner.clone();
            let connectivity = connectivity.clone();
            scheduler.schedule_repeating(
                interval_ms,
                Rc::new(move || {
                    if connectivity.is_online() {
                        spawn_flush(&service, spawner.as_ref(), true);
                    }
                }),
            )
        });

        if online {
            spawn_flush(&service, spawner.as_ref(), true);
        }

        log::info!("🚀 [AUTO-SYNC] iniciado (online: {})", online);
        Self {
            _subscription: subscription,
            _retry_timer: retry_timer,
        }
    }
}

fn spawn_flush(service: &Rc<SyncService>, spawner: &dyn Spawn, only_if_pending: bool) {
    let service = service.clone();
    spawner.spawn(Box::pin(async move {
        let result = if only_if_pending {
            service.flush_if_pending().await.map(|_| ())
        } else {
            service.flush().await.map(|_| ())
        };
        if let Err(e) = result {
            log::error!("❌ [AUTO-SYNC] flush fallido: {}", e);
        }
    }));
}
