// ============================================================================
// LOCALSTORAGE QUEUE STORE - fallback cuando IndexedDB no abre
// ============================================================================
// Un array JSON por colección bajo el nombre de la colección, más la
// secuencia de ids compartida. Se reescribe entero en cada cambio; la cola es
// pequeña. Se guarda como `Value` para que un registro ilegible no se pierda
// al reescribir ni impida leer los demás.
// ============================================================================

use async_trait::async_trait;
use gloo_storage::errors::StorageError;
use gloo_storage::{LocalStorage, Storage};
use serde_json::Value;
use web_sys::window;

use crate::error::{SyncError, SyncResult};
use crate::models::{Collection, QueuedMutation};
use crate::services::queue_store::{decode_record, decode_records, record_id, QueueStore};
use crate::utils::constants::ID_SEQUENCE_KEY;

pub struct LocalStorageStore {
    _private: (),
}

impl LocalStorageStore {
    /// Falla si no hay localStorage o está bloqueado (modo privado, políticas)
    pub fn open() -> SyncResult<Self> {
        let available = window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .is_some();
        if !available {
            return Err(SyncError::StorageUnavailable(
                "localStorage not available".to_string(),
            ));
        }
        Ok(Self { _private: () })
    }

    fn load_raw(&self, collection: Collection) -> SyncResult<Vec<Value>> {
        match LocalStorage::get::<Vec<Value>>(collection.name()) {
            Ok(records) => Ok(records),
            Err(StorageError::KeyNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(map_storage_error(e)),
        }
    }

    fn save_raw(&self, collection: Collection, records: &[Value]) -> SyncResult<()> {
        LocalStorage::set(collection.name(), records).map_err(map_storage_error)
    }

    fn next_id(&self) -> SyncResult<u64> {
        let last = match LocalStorage::get::<u64>(ID_SEQUENCE_KEY) {
            Ok(last) => last,
            Err(StorageError::KeyNotFound(_)) => 0,
            Err(e) => return Err(map_storage_error(e)),
        };
        Ok(last + 1)
    }
}

fn map_storage_error(e: StorageError) -> SyncError {
    match e {
        StorageError::SerdeError(e) => SyncError::Serialization(e.to_string()),
        other => SyncError::StorageUnavailable(other.to_string()),
    }
}

#[async_trait(?Send)]
impl QueueStore for LocalStorageStore {
    async fn insert(&self, mut mutation: QueuedMutation) -> SyncResult<u64> {
        let collection = mutation.collection();
        let id = self.next_id()?;
        mutation.id = id;

        let mut records = self.load_raw(collection)?;
        records.push(serde_json::to_value(&mutation)?);
        self.save_raw(collection, &records)?;
        LocalStorage::set(ID_SEQUENCE_KEY, id).map_err(map_storage_error)?;
        Ok(id)
    }

    async fn update(&self, mutation: &QueuedMutation) -> SyncResult<()> {
        let collection = mutation.collection();
        let value = serde_json::to_value(mutation)?;
        let mut records = self.load_raw(collection)?;
        match records.iter_mut().find(|r| record_id(r) == Some(mutation.id)) {
            Some(slot) => *slot = value,
            None => {
                records.push(value);
                records.sort_by_key(|r| record_id(r).unwrap_or(0));
            }
        }
        self.save_raw(collection, &records)
    }

    async fn get(&self, collection: Collection, id: u64) -> SyncResult<Option<QueuedMutation>> {
        Ok(self
            .load_raw(collection)?
            .into_iter()
            .find(|r| record_id(r) == Some(id))
            .and_then(|raw| decode_record(collection, raw)))
    }

    async fn remove(&self, collection: Collection, id: u64) -> SyncResult<()> {
        let mut records = self.load_raw(collection)?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() != before {
            self.save_raw(collection, &records)?;
        }
        Ok(())
    }

    async fn scan(&self, collection: Collection) -> SyncResult<Vec<QueuedMutation>> {
        Ok(decode_records(collection, self.load_raw(collection)?))
    }

    fn backend(&self) -> &'static str {
        "localstorage"
    }
}
