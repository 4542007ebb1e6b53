// Puente JSON entre tipos serde y valores JS

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::JsValue;

use crate::error::{SyncError, SyncResult};

pub fn to_js<T: Serialize + ?Sized>(value: &T) -> SyncResult<JsValue> {
    let json = serde_json::to_string(value)?;
    js_sys::JSON::parse(&json).map_err(|e| SyncError::Serialization(describe_js_error(&e)))
}

pub fn from_js<T: DeserializeOwned>(value: &JsValue) -> SyncResult<T> {
    let json: String = js_sys::JSON::stringify(value)
        .map_err(|e| SyncError::Serialization(describe_js_error(&e)))?
        .into();
    Ok(serde_json::from_str(&json)?)
}

/// Texto legible de un valor JS lanzado (Error, DOMException o string)
pub fn describe_js_error(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
