use tracing::{debug, error, warn};

use crate::gate::{
    config::{SecurityConfig, SecurityConfigPatch},
    pin::PinCredential,
};

use super::{KeyValueStore, CONFIG_KEY, PIN_KEY};

/// Bridges the gate and a [KeyValueStore]. None of the operations fail: the gate has to stay
/// usable when storage isn't, and its in-memory state is authoritative for the current session.
pub struct SecurityStore<S> {
    store: S,
}

impl<S: KeyValueStore> SecurityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Stored config merged over defaults. Missing or malformed records yield defaults.
    pub fn load_config(&self) -> SecurityConfig {
        let raw = match self.store.get(CONFIG_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored security config, using defaults");
                return SecurityConfig::default();
            }
            Err(e) => {
                warn!("Failed to read security config, using defaults {e:?}");
                return SecurityConfig::default();
            }
        };

        match SecurityConfigPatch::from_stored(&raw) {
            Ok(stored) => SecurityConfig::default().merged(&stored),
            Err(e) => {
                warn!("Stored security config is malformed, using defaults: {e}");
                SecurityConfig::default()
            }
        }
    }

    pub fn save_config(&mut self, config: &SecurityConfig) {
        let serialized = match serde_json::to_string(config) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to serialize security config {e:?}");
                return;
            }
        };
        let _ = self
            .store
            .set(CONFIG_KEY, &serialized)
            .inspect_err(|e| warn!("Failed to persist security config {e:?}"));
    }

    pub fn load_pin(&self) -> Option<PinCredential> {
        match self.store.get(PIN_KEY) {
            Ok(value) => value.and_then(PinCredential::from_stored),
            Err(e) => {
                warn!("Failed to read stored PIN, treating it as absent {e:?}");
                None
            }
        }
    }

    pub fn save_pin(&mut self, pin: &PinCredential) {
        let _ = self
            .store
            .set(PIN_KEY, pin.as_str())
            .inspect_err(|e| warn!("Failed to persist PIN {e:?}"));
    }

    pub fn clear_pin(&mut self) {
        let _ = self
            .store
            .remove(PIN_KEY)
            .inspect_err(|e| warn!("Failed to remove stored PIN {e:?}"));
    }
}
