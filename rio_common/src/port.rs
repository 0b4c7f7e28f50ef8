//! Port-level shared types.
//!
//! This module contains everything the port orchestration layer shares with
//! bus drivers and configuration tooling:
//!
//! - [`types`] - Board addresses, bindings and the protocol selector
//! - [`registers`] - Quadlet layout of board snapshots and commands
//! - [`bus`] - The `Bus` trait implemented by bus drivers
//! - [`error`] - Configuration and lookup errors
//! - [`config`] - `PortConfig` consumed by `Port::configure`

pub mod bus;
pub mod config;
pub mod error;
pub mod registers;
pub mod types;
