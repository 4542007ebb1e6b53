// ============================================================================
// APP - cableado de los servicios de sync offline y la fachada JS
// ============================================================================

use std::rc::Rc;

use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{window, CustomEvent, CustomEventInit};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{BagRegistration, FlushOutcome, FlushReport, PointsAward, RewardRedemption};
use crate::services::{
    ApiClient, AutoSync, BrowserNetworkMonitor, BrowserScheduler, BrowserSpawner, Connectivity,
    IndexedDbStore, LocalStorageStore, MutationService, OfflineQueue, QueueStore, Scheduler,
    SyncService, UnavailableStore,
};
use crate::state::SyncStateWrapper;
use crate::utils::constants::{OFFLINE_DB_VERSION, SYNC_COMPLETE_EVENT};
use crate::utils::js::{from_js, to_js};

/// Aplicación principal: dueña de los servicios mientras viva la página
pub struct App {
    api: ApiClient,
    monitor: Rc<BrowserNetworkMonitor>,
    sync: Rc<SyncService>,
    writes: MutationService,
    _auto_sync: AutoSync,
}

impl App {
    pub async fn init(config: SyncConfig) -> Self {
        let store = open_store(&config).await;
        let queue = OfflineQueue::with_max_attempts(store, config.max_sync_attempts);

        let api = ApiClient::new(config.backend_url());
        let monitor = Rc::new(BrowserNetworkMonitor::new());
        let state = SyncStateWrapper::new();
        state.on_report(dispatch_report);

        let sync = Rc::new(SyncService::new(queue.clone(), Rc::new(api.clone()), state));
        let writes = MutationService::new(queue, Rc::new(api.clone()), monitor.clone());

        let scheduler = BrowserScheduler;
        let auto_sync = AutoSync::start(
            sync.clone(),
            monitor.clone(),
            Rc::new(BrowserSpawner),
            config
                .retry_interval_ms()
                .map(|ms| (&scheduler as &dyn Scheduler, ms)),
        );

        log::info!(
            "🚀 [APP] sync offline listo ({}, backend {})",
            sync.queue().backend(),
            config.backend_url()
        );

        Self {
            api,
            monitor,
            sync,
            writes,
            _auto_sync: auto_sync,
        }
    }
}

/// Primero IndexedDB, luego localStorage; si ambos fallan, las escrituras
/// responden de forma optimista sin encolar.
async fn open_store(config: &SyncConfig) -> Rc<dyn QueueStore> {
    match IndexedDbStore::open(&config.offline_db_name, OFFLINE_DB_VERSION).await {
        Ok(store) => return Rc::new(store),
        Err(e) => log::warn!("⚠️ [APP] IndexedDB no disponible, usando localStorage: {}", e),
    }
    match LocalStorageStore::open() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            log::error!("❌ [APP] sin almacenamiento durable, no se encolará nada: {}", e);
            Rc::new(UnavailableStore::new(e.to_string()))
        }
    }
}

/// Entrega el reporte a la página como `trashdrop:sync-complete` para el toast
fn dispatch_report(report: &FlushReport) {
    if report.is_empty() {
        return;
    }
    let Some(window) = window() else { return };

    let detail = match to_js(report) {
        Ok(detail) => detail,
        Err(e) => {
            log::error!("❌ [APP] no se pudo codificar el reporte: {}", e);
            return;
        }
    };
    let init = CustomEventInit::new();
    init.set_detail(&detail);
    match CustomEvent::new_with_event_init_dict(SYNC_COMPLETE_EVENT, &init) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(e) => log::error!("❌ [APP] no se pudo crear el evento de sync: {:?}", e),
    }
}

fn to_js_error(e: SyncError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ============================================================================
// FACHADA JS
// ============================================================================

/// Handle expuesto a los scripts de la página
#[wasm_bindgen]
pub struct TrashDropSync {
    app: Rc<App>,
}

#[wasm_bindgen]
impl TrashDropSync {
    /// Abre el store offline y arranca el auto-sync
    pub async fn init() -> TrashDropSync {
        let app = App::init(SyncConfig::from_env()).await;
        TrashDropSync { app: Rc::new(app) }
    }

    /// Los pases sin token se cortan sin gastar intentos; al iniciar sesión
    /// se reenvía lo que quedó esperando.
    #[wasm_bindgen(js_name = setAccessToken)]
    pub fn set_access_token(&self, token: Option<String>) {
        self.app.api.set_access_token(token);
        if self.app.api.has_access_token() && self.app.monitor.is_online() {
            let sync = self.app.sync.clone();
            spawn_local(async move {
                if let Err(e) = sync.flush_if_pending().await {
                    log::error!("❌ [APP] flush tras iniciar sesión falló: {}", e);
                }
            });
        }
    }

    #[wasm_bindgen(js_name = isOnline)]
    pub fn is_online(&self) -> bool {
        self.app.monitor.is_online()
    }

    /// `{ bagId, requestId?, type, scanned_at? }`
    #[wasm_bindgen(js_name = registerBag)]
    pub fn register_bag(&self, bag: JsValue) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let bag: BagRegistration = from_js(&bag).map_err(to_js_error)?;
            let response = app.writes.register_bag(&bag).await.map_err(to_js_error)?;
            to_js(&response).map_err(to_js_error)
        })
    }

    /// `{ requestId, points, reason }`
    #[wasm_bindgen(js_name = awardPoints)]
    pub fn award_points(&self, award: JsValue) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let award: PointsAward = from_js(&award).map_err(to_js_error)?;
            let response = app.writes.award_points(&award).await.map_err(to_js_error)?;
            to_js(&response).map_err(to_js_error)
        })
    }

    /// `{ rewardId }`
    #[wasm_bindgen(js_name = redeemReward)]
    pub fn redeem_reward(&self, redemption: JsValue) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let redemption: RewardRedemption = from_js(&redemption).map_err(to_js_error)?;
            let response = app.writes.redeem_reward(&redemption).await.map_err(to_js_error)?;
            to_js(&response).map_err(to_js_error)
        })
    }

    /// Resuelve con el reporte, o `null` si ya había un flush en curso
    pub fn flush(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            match app.sync.flush().await.map_err(to_js_error)? {
                FlushOutcome::Completed(report) => to_js(&report).map_err(to_js_error),
                FlushOutcome::Coalesced => Ok(JsValue::NULL),
            }
        })
    }

    #[wasm_bindgen(js_name = pendingCount)]
    pub fn pending_count(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let count = app.sync.queue().pending_count().await.map_err(to_js_error)?;
            Ok(JsValue::from_f64(count as f64))
        })
    }

    /// Registros abandonados tras el tope de intentos
    #[wasm_bindgen(js_name = failedMutations)]
    pub fn failed_mutations(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let failed = app.sync.queue().list_failed().await.map_err(to_js_error)?;
            to_js(&failed).map_err(to_js_error)
        })
    }

    /// Descarta un registro para siempre; resuelve si existía
    pub fn discard(&self, id: f64) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let removed = app.sync.queue().discard(id as u64).await.map_err(to_js_error)?;
            Ok(JsValue::from_bool(removed))
        })
    }
}
