//! Storage is organized as a tiny key-value store with two records:
//!  - `app_pin` holds the raw PIN digits and is absent when no PIN is set.
//!  - `security_config` holds the lock policy as a JSON object.
//!
//! [adapter::SecurityStore] is the only thing the gate talks to. It never surfaces storage errors,
//! reads fall back to "absent"/defaults and failed writes are logged and dropped.

pub mod adapter;
pub mod file_store;
pub mod memory_store;

use anyhow::Result;

pub const PIN_KEY: &str = "app_pin";
pub const CONFIG_KEY: &str = "security_config";

/// Interface for abstracting durable string records scoped to the local profile.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore {
    /// Returns `None` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
