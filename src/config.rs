use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

/// Length the decoded `SESSION_KEY` must have. The cookie layer derives its
/// AES-256-GCM encryption and signing keys from it.
pub const SESSION_KEY_BYTES: usize = 32;

pub struct Config {
    pub port: u16,
    pub color_sets_dir: String,
    pub static_dir: String,
    pub results_log_dir: String,
    pub results_log_file: String,
    pub session_key: Vec<u8>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("SURVEY_PORT", "8080"),
            color_sets_dir: try_load("COLOR_SETS_DIR", "color-sets"),
            static_dir: try_load("STATIC_DIR", "static"),
            results_log_dir: try_load("RESULTS_LOG_DIR", "."),
            results_log_file: try_load("RESULTS_LOG_FILE", "results.log"),
            session_key: load_session_key(),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Reads the hex-encoded session master key from the `SESSION_KEY`
/// environment variable, falling back to the `/run/secrets` file of the
/// same name. The key protects every issued session token, so a missing or
/// short key is an unrecoverable boot error.
fn load_session_key() -> Vec<u8> {
    let raw = var("SESSION_KEY").unwrap_or_else(|_| read_secret("SESSION_KEY"));

    let key = hex::decode(raw.trim())
        .map_err(|e| {
            warn!("SESSION_KEY is not valid hex: {e}");
        })
        .expect("Secrets misconfigured!");

    assert_eq!(
        key.len(),
        SESSION_KEY_BYTES,
        "Session key must be {SESSION_KEY_BYTES} bytes!"
    );

    key
}

fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
