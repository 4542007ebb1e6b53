// ============================================================================
// INDEXEDDB QUEUE STORE
// ============================================================================
// Object stores:
//   bags_queue, points_redemptions_queue  registros con clave `id`
//   meta                                  la secuencia de ids compartida
// Las requests se convierten en futures esperando sus eventos DOM.
// ============================================================================

use async_trait::async_trait;
use js_sys::{Array, Function, Promise};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    window, Event, EventTarget, IdbDatabase, IdbObjectStoreParameters, IdbOpenDbRequest,
    IdbRequest, IdbTransaction, IdbTransactionMode, IdbVersionChangeEvent,
};

use crate::error::{SyncError, SyncResult};
use crate::models::{Collection, QueuedMutation};
use crate::services::queue_store::{decode_record, decode_records, QueueStore};
use crate::utils::constants::{ID_SEQUENCE_KEY, META_STORE};
use crate::utils::js::{describe_js_error, from_js, to_js};

pub struct IndexedDbStore {
    db: IdbDatabase,
}

impl IndexedDbStore {
    /// Abre (y la primera vez crea) la base de datos offline.
    pub async fn open(name: &str, version: u32) -> SyncResult<Self> {
        let factory = window()
            .and_then(|w| w.indexed_db().ok().flatten())
            .ok_or_else(|| SyncError::StorageUnavailable("IndexedDB not available".to_string()))?;

        let request = factory.open_with_u32(name, version).map_err(storage_error)?;

        let on_upgrade = Closure::<dyn FnMut(IdbVersionChangeEvent)>::new({
            let request = request.clone();
            move |_event: IdbVersionChangeEvent| {
                if let Err(e) = create_object_stores(&request) {
                    log::error!("❌ [IDB] error al actualizar el esquema: {}", describe_js_error(&e));
                }
            }
        });
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let opened = await_request(&request).await;
        request.set_onupgradeneeded(None);

        let db: IdbDatabase = opened?
            .dyn_into()
            .map_err(|_| SyncError::StorageUnavailable("open did not return a database".to_string()))?;

        log::info!("✅ [IDB] base de datos '{}' v{} abierta", name, version);
        Ok(Self { db })
    }

    fn transaction(&self, stores: &[&str], mode: IdbTransactionMode) -> SyncResult<IdbTransaction> {
        let names: Array = stores.iter().map(|name| JsValue::from_str(name)).collect();
        self.db
            .transaction_with_str_sequence_and_mode(&names, mode)
            .map_err(storage_error)
    }
}

#[async_trait(?Send)]
impl QueueStore for IndexedDbStore {
    async fn insert(&self, mut mutation: QueuedMutation) -> SyncResult<u64> {
        let collection = mutation.collection().name();
        let tx = self.transaction(&[META_STORE, collection], IdbTransactionMode::Readwrite)?;
        let meta = tx.object_store(META_STORE).map_err(storage_error)?;
        let records = tx.object_store(collection).map_err(storage_error)?;

        let sequence_key = JsValue::from_str(ID_SEQUENCE_KEY);
        let last = await_request(&meta.get(&sequence_key).map_err(storage_error)?).await?;
        let id = last.as_f64().map_or(0, |n| n as u64) + 1;
        mutation.id = id;

        let value = to_js(&mutation)?;
        await_request(&records.put(&value).map_err(storage_error)?).await?;
        await_request(
            &meta
                .put_with_key(&JsValue::from_f64(id as f64), &sequence_key)
                .map_err(storage_error)?,
        )
        .await?;
        await_commit(&tx).await?;
        Ok(id)
    }

    async fn update(&self, mutation: &QueuedMutation) -> SyncResult<()> {
        let collection = mutation.collection().name();
        let tx = self.transaction(&[collection], IdbTransactionMode::Readwrite)?;
        let records = tx.object_store(collection).map_err(storage_error)?;

        let value = to_js(mutation)?;
        await_request(&records.put(&value).map_err(storage_error)?).await?;
        await_commit(&tx).await
    }

    async fn get(&self, collection: Collection, id: u64) -> SyncResult<Option<QueuedMutation>> {
        let tx = self.transaction(&[collection.name()], IdbTransactionMode::Readonly)?;
        let records = tx.object_store(collection.name()).map_err(storage_error)?;

        let found = await_request(&records.get(&key(id)).map_err(storage_error)?).await?;
        if found.is_undefined() || found.is_null() {
            return Ok(None);
        }
        let raw: Value = from_js(&found)?;
        Ok(decode_record(collection, raw))
    }

    async fn remove(&self, collection: Collection, id: u64) -> SyncResult<()> {
        let tx = self.transaction(&[collection.name()], IdbTransactionMode::Readwrite)?;
        let records = tx.object_store(collection.name()).map_err(storage_error)?;

        // Borrar una clave inexistente no falla
        await_request(&records.delete(&key(id)).map_err(storage_error)?).await?;
        await_commit(&tx).await
    }

    async fn scan(&self, collection: Collection) -> SyncResult<Vec<QueuedMutation>> {
        let tx = self.transaction(&[collection.name()], IdbTransactionMode::Readonly)?;
        let records = tx.object_store(collection.name()).map_err(storage_error)?;

        // getAll devuelve por clave ascendente; cada registro se decodifica
        // por separado
        let all = await_request(&records.get_all().map_err(storage_error)?).await?;
        let mut raw = Vec::new();
        for value in Array::from(&all).iter() {
            match from_js::<Value>(&value) {
                Ok(record) => raw.push(record),
                Err(e) => log::error!("❌ [IDB] registro no serializable en '{}', se omite: {}", collection.name(), e),
            }
        }
        Ok(decode_records(collection, raw))
    }

    fn backend(&self) -> &'static str {
        "indexeddb"
    }
}

fn key(id: u64) -> JsValue {
    JsValue::from_f64(id as f64)
}

fn storage_error(e: JsValue) -> SyncError {
    SyncError::StorageUnavailable(describe_js_error(&e))
}

fn create_object_stores(request: &IdbOpenDbRequest) -> Result<(), JsValue> {
    let db: IdbDatabase = request.result()?.unchecked_into();
    let existing = db.object_store_names();

    for collection in Collection::ALL {
        if !existing.contains(collection.name()) {
            let params = IdbObjectStoreParameters::new();
            params.set_key_path(&JsValue::from_str("id"));
            db.create_object_store_with_optional_parameters(collection.name(), &params)?;
            log::info!("🗄️ [IDB] object store '{}' creado", collection.name());
        }
    }
    if !existing.contains(META_STORE) {
        db.create_object_store(META_STORE)?;
    }
    Ok(())
}

/// Espera el `success` de una request y devuelve su resultado
async fn await_request(request: &IdbRequest) -> SyncResult<JsValue> {
    if let Err(event) = next_event(request, "success", &["error"]).await {
        let reason = request
            .error()
            .ok()
            .flatten()
            .map(|e| e.message())
            .unwrap_or(event);
        return Err(SyncError::StorageUnavailable(reason));
    }
    request.result().map_err(storage_error)
}

/// Espera a que la transacción haga commit
async fn await_commit(tx: &IdbTransaction) -> SyncResult<()> {
    next_event(tx, "complete", &["error", "abort"])
        .await
        .map_err(|event| {
            let reason = tx.error().map(|e| e.message()).unwrap_or(event);
            SyncError::StorageUnavailable(reason)
        })
}

/// Resuelve con el primer evento `success`; falla con el tipo de evento ante
/// cualquiera de `failures`. Luego quita los listeners.
async fn next_event(target: &EventTarget, success: &str, failures: &[&str]) -> Result<(), String> {
    let mut settle: Option<(Function, Function)> = None;
    let promise = Promise::new(&mut |resolve, reject| settle = Some((resolve, reject)));
    let (resolve, reject) = settle.ok_or_else(|| "promise executor did not run".to_string())?;

    let on_success = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
        let _ = resolve.call0(&JsValue::NULL);
    });
    let on_failure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(&event.type_()));
    });

    target
        .add_event_listener_with_callback(success, on_success.as_ref().unchecked_ref())
        .map_err(|e| describe_js_error(&e))?;
    for name in failures {
        target
            .add_event_listener_with_callback(name, on_failure.as_ref().unchecked_ref())
            .map_err(|e| describe_js_error(&e))?;
    }

    let outcome = JsFuture::from(promise).await;

    let _ = target.remove_event_listener_with_callback(success, on_success.as_ref().unchecked_ref());
    for name in failures {
        let _ = target.remove_event_listener_with_callback(name, on_failure.as_ref().unchecked_ref());
    }

    outcome.map(|_| ()).map_err(|e| describe_js_error(&e))
}
