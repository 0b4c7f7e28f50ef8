//! # RIO Port Library
//!
//! Port layer for robot controller boards sharing one field bus.
//!
//! A [`Port`] owns every board on its bus plus the robots and digital
//! signals bound to them. A real-time driver calls [`Port::read`] and
//! [`Port::write`] once per cycle; bus drivers implement the `Bus` trait
//! defined in `rio_common::port::bus`.
//!
//! # Module Structure
//!
//! - [`port`] - Port struct, configuration and cycle orchestration
//! - [`board`] - Per-board snapshot and fault bookkeeping
//! - [`robot`] - Robots, actuators and brakes
//! - [`digital`] - Debounced digital inputs and digital outputs
//! - [`runner`] - Periodic read/write loop
//! - [`transport`] - Sequential and broadcast transaction strategies
//! - [`events`] - Event reporting to an injected sink
//! - [`registry`] - Name-indexed registries
//! - [`bus_registry`] - Bus driver factory registration
//! - [`drivers`] - Bus driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          rio_port                                │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ Robots / DI │◄──►│    Port      │◄──►│   Bus Registry      │  │
//! │  │ DO registry │    │ (read/write) │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │                                     │
//! │                   ┌────────▼───────┐                             │
//! │                   │   Transport    │ sequential | broadcast      │
//! │                   └────────┬───────┘                             │
//! │                            ▼                                     │
//! │                   ┌────────────────┐                             │
//! │                   │   Bus trait    │ (simulation, hardware)      │
//! │                   └────────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use rio_port::drivers::simulation::SimulatedBus;
//! use rio_port::Port;
//!
//! let bus = SimulatedBus::new().with_board(0, 7);
//! let mut port = Port::new(0, bus);
//! port.add_board(0).unwrap();
//!
//! let report = port.read();
//! assert!(report.failed.is_empty());
//! ```

#![deny(missing_docs)]

pub mod board;
pub mod bus_registry;
pub mod digital;
pub mod drivers;
pub mod events;
pub mod port;
pub mod registry;
pub mod robot;
pub mod runner;
pub mod transport;

// Re-export key types for convenience
pub use crate::board::{BoardStatus, FaultCause};
pub use crate::bus_registry::BusRegistry;
pub use crate::digital::{DigitalInput, DigitalOutput};
pub use crate::events::{CyclePhase, EventSink, PortEvent, TracingSink};
pub use crate::port::{CycleReport, Port, PortStats};
pub use crate::registry::Named;
pub use crate::robot::{Actuator, Brake, Robot};
pub use crate::runner::CycleRunner;
