use std::env;
use std::fs;
use std::path::Path;

// Ajustes que src/config.rs lee con option_env!
const FORWARDED_KEYS: &[&str] = &[
    "BACKEND_URL",
    "BACKEND_URL_DEVELOPMENT",
    "BACKEND_URL_PRODUCTION",
    "ENVIRONMENT",
    "ENABLE_LOGGING",
    "MAX_SYNC_ATTEMPTS",
    "SYNC_RETRY_INTERVAL_SECONDS",
    "OFFLINE_DB_NAME",
];

fn main() {
    for key in FORWARDED_KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    let env_file = Path::new(".env");
    if env_file.exists() {
        println!("cargo:rerun-if-changed=.env");

        if let Ok(contents) = fs::read_to_string(env_file) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"');

                    // El entorno real gana sobre .env
                    if FORWARDED_KEYS.contains(&key) && env::var(key).is_err() {
                        println!("cargo:rustc-env={}={}", key, value);
                    }
                }
            }
        }
    } else {
        println!("cargo:warning=No se encontró .env, se usan los valores por defecto (ver .env.example).");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
