//! Simulation bus module.
//!
//! This module provides a software bus for development and testing without
//! physical hardware.

mod board;
mod driver;

pub use board::SimulatedBoard;
pub use driver::{SIMULATED_FIRMWARE, SimulatedBus};

use rio_common::port::bus::Bus;
use rio_common::port::config::PortConfig;

/// Build a simulated bus populated with every board `config` references.
pub fn build(config: &PortConfig) -> SimulatedBus {
    config
        .referenced_boards()
        .into_iter()
        .fold(SimulatedBus::new(), |bus, address| {
            bus.with_board(address, SIMULATED_FIRMWARE)
        })
}

/// Factory function to create a simulation bus instance.
pub fn create_bus(config: &PortConfig) -> Box<dyn Bus> {
    Box::new(build(config))
}
