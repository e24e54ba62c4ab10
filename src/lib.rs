//! TankNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod net;
pub mod pins;
pub mod sensors;

// Hardware-facing code; the real implementations are guarded by cfg
// attributes inside, so the crate builds for the host too.
pub mod adapters;
pub mod drivers;
