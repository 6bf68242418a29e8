//! Bus transaction primitive
//!
//! `OneWireBus` is the narrow interface the protocol layer needs from a bus
//! master. Timing and electrical concerns belong entirely to the
//! implementation; the protocol layer only sequences transactions.

use crate::error::Result;
use crate::rom::{PeripheralId, ROM_LEN};
use alloc::boxed::Box;
use alloc::vec::Vec;

/// 1-Wire bus master
///
/// Implementations report a failed transaction as [`Error::BusFault`];
/// the command engine retries those.
///
/// [`Error::BusFault`]: crate::error::Error::BusFault
pub trait OneWireBus {
    /// Issue a reset pulse and wait for presence
    fn reset(&mut self) -> Result<()>;

    /// Address a single peripheral (Match ROM)
    fn select(&mut self, rom: &PeripheralId) -> Result<()>;

    /// Address every peripheral at once (Skip ROM)
    fn select_all(&mut self) -> Result<()>;

    /// Write bytes to the addressed peripheral
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes from the addressed peripheral
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Run one ROM search pass
    ///
    /// Returns every ROM seen, unfiltered. A single pass may miss
    /// peripherals that are present.
    fn search(&mut self) -> Result<Vec<[u8; ROM_LEN]>>;

    /// Block for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

impl<B: OneWireBus + ?Sized> OneWireBus for Box<B> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn select(&mut self, rom: &PeripheralId) -> Result<()> {
        (**self).select(rom)
    }

    fn select_all(&mut self) -> Result<()> {
        (**self).select_all()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn search(&mut self) -> Result<Vec<[u8; ROM_LEN]>> {
        (**self).search()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
