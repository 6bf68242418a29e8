//! CLI command implementations
//!
//! Every command talks to the bus through one shared `CommandEngine`, so
//! retries, backoff and bus locking behave the same for all of them.

pub mod io;
mod list;
pub mod scan;
pub mod selftest;

pub use list::list_buses;

use crate::buses;
use wiregpio_core::{CommandEngine, OneWireBus};

/// Engine over whichever bus the user selected
pub type Engine = CommandEngine<Box<dyn OneWireBus>>;

/// Open the bus described by `bus_str` and wrap it in a command engine
pub fn open_engine(bus_str: &str) -> Result<Engine, Box<dyn std::error::Error>> {
    let bus = buses::open_bus(bus_str)?;
    log::debug!("Opened bus '{}'", bus_str);
    Ok(CommandEngine::new(bus))
}
