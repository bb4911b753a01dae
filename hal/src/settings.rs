//! Persistent key/value store (§4.13: "a persistent key/value store
//! (external collaborator) provides `get(name)`, `set(name, value)`, and
//! `commit()`"). `fluidnc_rt`'s parameter store (C13) wraps this to expose
//! named settings and coordinate systems; this crate only fixes the
//! contract.

use std::collections::HashMap;

use fluidnc_common::error::Error;

pub trait SettingsStore: Send {
    fn get(&self, name: &str) -> Option<f64>;
    fn set(&mut self, name: &str, value: f64);
    /// Flush pending writes to durable storage.
    fn commit(&mut self) -> Result<(), Error>;
}

/// An in-process store, for tests and the `fluidnc` binary's demo mode.
/// `commit()` is a no-op: there is nothing behind it to flush to.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: HashMap<String, f64>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    fn commit(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let mut store = MemorySettingsStore::new();
        store.set("homing/x/seek_rate", 500.0);
        assert_eq!(store.get("homing/x/seek_rate"), Some(500.0));
        assert_eq!(store.get("missing"), None);
    }
}
