//! wiregpio-core - Remote GPIO over a shared 1-Wire bus
//!
//! This crate implements the controller side of a small command/response
//! protocol that lets one bus master drive digital I/O, analog inputs and
//! PWM outputs on microcontroller peripherals attached to a 1-Wire bus.
//! Each peripheral is addressed by its 8-byte ROM identifier.
//!
//! # Layers
//!
//! ```text
//! discovery ──► PeripheralId set
//!                    │
//! device::Peripheral ┴─► gpio (typed operations)
//!                          │
//!                  engine::CommandEngine ──► frame (CRC-8 codec)
//!                          │
//!                   bus::OneWireBus (reset/select/write/read/search)
//! ```
//!
//! # Features
//!
//! - `alloc` - Enable the bus trait (ROM search returns a `Vec`)
//! - `std` - Enable the command engine, discovery, device facade and TOML
//!   configuration (includes `alloc`)
//!
//! Without `std` only the frame codec, identifiers and protocol constants
//! are compiled, which is enough for peripheral-side firmware.
//!
//! # Example
//!
//! ```ignore
//! use wiregpio_core::{discovery, device::Peripheral, engine::CommandEngine};
//!
//! let engine = CommandEngine::new(bus);
//! let report = discovery::scan_repeatedly(&engine, 4, 10, None);
//! for id in &report.found {
//!     let dev = Peripheral::new(&engine, *id)?;
//!     dev.digital_write(13, 1)?;
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod error;
pub mod frame;
pub mod protocol;
pub mod rom;

#[cfg(feature = "alloc")]
pub mod bus;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod device;
#[cfg(feature = "std")]
pub mod discovery;
#[cfg(feature = "std")]
pub mod engine;
#[cfg(feature = "std")]
pub mod gpio;

pub use error::{Error, Result};
pub use protocol::{Command, PinMode};
pub use rom::PeripheralId;

#[cfg(feature = "alloc")]
pub use bus::OneWireBus;
#[cfg(feature = "std")]
pub use config::DiscoveryConfig;
#[cfg(feature = "std")]
pub use device::Peripheral;
#[cfg(feature = "std")]
pub use engine::{CommandEngine, Response};
