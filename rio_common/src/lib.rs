//! RIO Common Library
//!
//! This crate provides shared constants, register layouts, the bus trait and
//! configuration loading utilities for all RIO workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide limits and defaults
//! - [`config`] - Configuration loading traits and types
//! - [`port`] - Port configuration, register layout, bus trait, error types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rio_common::prelude::*;
//!
//! let config = PortConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod port;
pub mod prelude;
