//! Bus driver registry.
//!
//! Provides a `BusRegistry` struct for registering and retrieving bus
//! factories by name. Constructed at startup and passed where needed; no
//! global state.

use rio_common::port::bus::{Bus, BusFactory};
use rio_common::port::config::PortConfig;
use rio_common::port::error::PortError;
use std::collections::HashMap;

/// Registry of available bus drivers.
pub struct BusRegistry {
    factories: HashMap<&'static str, BusFactory>,
}

impl BusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a bus factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BusFactory) {
        if self.factories.contains_key(name) {
            panic!("Bus driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a bus factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BusFactory> {
        self.factories.get(name).copied()
    }

    /// Create a bus instance by name.
    ///
    /// # Errors
    /// Returns `PortError::NotFound` if no driver with the given name is
    /// registered.
    pub fn create_bus(&self, name: &str, config: &PortConfig) -> Result<Box<dyn Bus>, PortError> {
        let factory = self.get_factory(name).ok_or_else(|| PortError::NotFound {
            kind: "bus driver",
            key: name.to_string(),
        })?;
        Ok(factory(config))
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
