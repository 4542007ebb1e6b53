/// URL base del backend, fijada en compilación:
/// - Desarrollo: http://localhost:3000 (por defecto)
/// - Producción: variable de entorno BACKEND_URL
pub const BACKEND_URL: &str = match option_env!("BACKEND_URL") {
    Some(url) => url,
    None => "http://localhost:3000",
};

/// Intentos máximos de una mutación antes de aparcarla como fallida.
pub const MAX_SYNC_ATTEMPTS: u32 = 5;

pub const OFFLINE_DB_NAME: &str = "trashdrop_offline";
pub const OFFLINE_DB_VERSION: u32 = 1;

pub const BAGS_QUEUE: &str = "bags_queue";
pub const POINTS_REDEMPTIONS_QUEUE: &str = "points_redemptions_queue";
pub const META_STORE: &str = "meta";
pub const ID_SEQUENCE_KEY: &str = "queue_id_sequence";

pub const REGISTER_BAG_ENDPOINT: &str = "/api/bags/register";
pub const AWARD_POINTS_ENDPOINT: &str = "/api/points/award";
pub const REDEEM_REWARD_ENDPOINT: &str = "/api/points/redeem";

/// Evento de window con el reporte JSON para el toast de la página
pub const SYNC_COMPLETE_EVENT: &str = "trashdrop:sync-complete";
