use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rand::{SeedableRng, rngs::StdRng};

use super::{config::Config, palette::PaletteStore};

/// Process-wide services, injected into every handler. The palette tables
/// are immutable after load; the stimulus RNG is the one shared mutable
/// resource and is serialized behind its mutex.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub palettes: Arc<PaletteStore>,
    pub rng: Arc<Mutex<StdRng>>,
    pub key: Key,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let palettes = PaletteStore::load(&config.color_sets_dir);
        let key = Key::derive_from(&config.session_key);

        Self {
            config: Arc::new(config),
            palettes: Arc::new(palettes),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            key,
        }
    }
}

// Lets the private cookie jar find its master key in the router state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.key.clone()
    }
}
