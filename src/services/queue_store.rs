// ============================================================================
// QUEUE STORE - almacenamiento durable detrás de la cola offline
// ============================================================================
// Backends: IndexedDB y localStorage en el navegador, memoria para tests.
// Cada método se espera antes de la siguiente llamada al store; en el hilo
// único de la UI no corre nada entre medio, así que no hace falta bloquear.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::models::{Collection, QueuedMutation};

#[async_trait(?Send)]
pub trait QueueStore {
    /// Asigna el siguiente id (único entre colecciones), lo pone en el
    /// registro y lo escribe. Devuelve el id asignado.
    async fn insert(&self, mutation: QueuedMutation) -> SyncResult<u64>;

    /// Sobrescribe un registro existente.
    async fn update(&self, mutation: &QueuedMutation) -> SyncResult<()>;

    async fn get(&self, collection: Collection, id: u64) -> SyncResult<Option<QueuedMutation>>;

    /// Borrar un id desconocido no es error.
    async fn remove(&self, collection: Collection, id: u64) -> SyncResult<()>;

    /// Registros legibles de la colección, por id ascendente. Los que no se
    /// pueden decodificar se omiten (ver `decode_records`).
    async fn scan(&self, collection: Collection) -> SyncResult<Vec<QueuedMutation>>;

    /// Nombre corto del backend para logs
    fn backend(&self) -> &'static str;
}

// ============================================================================
// DECODIFICACIÓN REGISTRO A REGISTRO
// ============================================================================

/// Decodifica un registro guardado. `None` si está corrupto o es de otra
/// versión; queda en el store pero no bloquea al resto.
pub fn decode_record(collection: Collection, raw: Value) -> Option<QueuedMutation> {
    let id = record_id(&raw);
    match serde_json::from_value::<QueuedMutation>(raw) {
        Ok(mutation) => Some(mutation),
        Err(e) => {
            log::error!(
                "❌ [STORE] registro ilegible en '{}' (id {:?}), se omite: {}",
                collection.name(),
                id,
                e
            );
            None
        }
    }
}

/// Decodifica cada registro por separado y ordena por id
pub fn decode_records(collection: Collection, raw: Vec<Value>) -> Vec<QueuedMutation> {
    let mut records: Vec<QueuedMutation> = raw
        .into_iter()
        .filter_map(|value| decode_record(collection, value))
        .collect();
    records.sort_by_key(|mutation| mutation.id);
    records
}

/// Id de un registro sin decodificarlo entero
pub fn record_id(raw: &Value) -> Option<u64> {
    raw.get("id").and_then(Value::as_u64)
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Store en proceso. Se pierde al recargar; para tests y para usar el núcleo
/// de sync fuera del navegador.
#[derive(Default)]
pub struct MemoryStore {
    next_id: Cell<u64>,
    records: RefCell<BTreeMap<(Collection, u64), QueuedMutation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// La secuencia empieza después de `last_id`
    pub fn starting_after(last_id: u64) -> Self {
        Self {
            next_id: Cell::new(last_id),
            records: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl QueueStore for MemoryStore {
    async fn insert(&self, mut mutation: QueuedMutation) -> SyncResult<u64> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        mutation.id = id;
        self.records
            .borrow_mut()
            .insert((mutation.collection(), id), mutation);
        Ok(id)
    }

    async fn update(&self, mutation: &QueuedMutation) -> SyncResult<()> {
        self.records
            .borrow_mut()
            .insert((mutation.collection(), mutation.id), mutation.clone());
        Ok(())
    }

    async fn get(&self, collection: Collection, id: u64) -> SyncResult<Option<QueuedMutation>> {
        Ok(self.records.borrow().get(&(collection, id)).cloned())
    }

    async fn remove(&self, collection: Collection, id: u64) -> SyncResult<()> {
        self.records.borrow_mut().remove(&(collection, id));
        Ok(())
    }

    async fn scan(&self, collection: Collection) -> SyncResult<Vec<QueuedMutation>> {
        Ok(self
            .records
            .borrow()
            .range((collection, 0)..=(collection, u64::MAX))
            .map(|(_, mutation)| mutation.clone())
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// UNAVAILABLE STORE
// ============================================================================

/// Sustituto cuando no se pudo abrir ningún store durable. Todo falla con
/// `StorageUnavailable` y la escritura pasa a la respuesta optimista.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn fail<T>(&self) -> SyncResult<T> {
        Err(SyncError::StorageUnavailable(self.reason.clone()))
    }
}

#[async_trait(?Send)]
impl QueueStore for UnavailableStore {
    async fn insert(&self, _mutation: QueuedMutation) -> SyncResult<u64> {
        self.fail()
    }

    async fn update(&self, _mutation: &QueuedMutation) -> SyncResult<()> {
        self.fail()
    }

    async fn get(&self, _collection: Collection, _id: u64) -> SyncResult<Option<QueuedMutation>> {
        self.fail()
    }

    async fn remove(&self, _collection: Collection, _id: u64) -> SyncResult<()> {
        self.fail()
    }

    async fn scan(&self, _collection: Collection) -> SyncResult<Vec<QueuedMutation>> {
        self.fail()
    }

    fn backend(&self) -> &'static str {
        "unavailable"
    }
}
