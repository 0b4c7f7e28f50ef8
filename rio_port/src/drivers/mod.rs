//! Bus driver implementations.
//!
//! - [`simulation`] - Software bus for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `Bus` trait from `rio_common::port::bus`
//! 3. Register the factory in [`register_all_buses`]

pub mod simulation;

use crate::bus_registry::BusRegistry;

/// Register all built-in bus drivers.
pub fn register_all_buses(registry: &mut BusRegistry) {
    registry.register("simulation", simulation::create_bus);
}
