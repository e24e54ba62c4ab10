//! Application core: pure domain logic, zero I/O.
//!
//! The control loop, report countdown and display layout for the tank node.
//! All interaction with hardware and the network happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod control;
pub mod cycle;
pub mod display;
pub mod events;
pub mod ports;

pub use control::ControlLoop;
