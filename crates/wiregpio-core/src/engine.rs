//! Command engine
//!
//! Runs one command against one peripheral: reset, select, write the
//! encoded frame, read the response, and check its CRC. Bus faults and
//! corrupt responses are retried with a fixed backoff up to a fixed number
//! of attempts.
//!
//! The bus sits behind a mutex that is held for the whole sequence,
//! retries included, so a select can never be interleaved with another
//! command's transaction.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use crate::bus::OneWireBus;
use crate::error::{Error, Result};
use crate::frame;
use crate::protocol::{Command, ACK_LEN, MAX_ATTEMPTS, RETRY_DELAY_MS, SUCCESS};
use crate::rom::{PeripheralId, ROM_LEN};

/// Decoded outcome of a successful command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// No response was requested
    None,
    /// Peripheral acknowledged with the success sentinel
    Success,
    /// Raw response bytes, checksum included
    Data(Vec<u8>),
}

/// Serializes commands onto a shared bus
pub struct CommandEngine<B> {
    bus: Mutex<B>,
    max_attempts: u8,
    retry_delay_ms: u32,
}

impl<B: OneWireBus> CommandEngine<B> {
    /// Create an engine with the default retry policy (4 attempts, 10 ms)
    pub fn new(bus: B) -> Self {
        Self {
            bus: Mutex::new(bus),
            max_attempts: MAX_ATTEMPTS,
            retry_delay_ms: RETRY_DELAY_MS,
        }
    }

    /// Override the retry policy
    ///
    /// At least one attempt is always made.
    pub fn with_retry(mut self, max_attempts: u8, retry_delay_ms: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Attempts made per command
    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Run `f` with exclusive access to the bus
    pub fn with_bus<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut *self.lock())
    }

    /// Take the bus back
    pub fn into_inner(self) -> B {
        self.bus.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    // A panic mid-transaction leaves nothing behind that the next reset
    // pulse does not clear.
    fn lock(&self) -> MutexGuard<'_, B> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute a raw command
    ///
    /// `target` selects one peripheral, or every peripheral when `None`.
    /// `response_len` is the number of bytes to read back, or `None` when
    /// the command has no response. A response always carries at least its
    /// CRC byte, so `Some(0)` is rejected.
    pub fn execute(
        &self,
        target: Option<&PeripheralId>,
        command: u8,
        payload: &[u8],
        response_len: Option<usize>,
    ) -> Result<Response> {
        if response_len == Some(0) {
            return Err(Error::InvalidArgument("response length must be non-zero"));
        }
        let frame = frame::encode(command, payload)?;
        let mut response = vec![0u8; response_len.unwrap_or(0)];

        let mut bus = self.lock();
        for attempt in 1..=self.max_attempts {
            match transact(&mut *bus, target, &frame, &mut response) {
                Ok(()) if response_len.is_none() => return Ok(Response::None),
                Ok(()) if frame::validate(&response) => {
                    log::trace!(
                        "command 0x{:02X} -> {:02X?} (attempt {})",
                        command,
                        response,
                        attempt
                    );
                    return Ok(decode(response));
                }
                Ok(()) => {
                    log::warn!(
                        "CRC error on response to command 0x{:02X} (attempt {}/{}), retrying",
                        command,
                        attempt,
                        self.max_attempts
                    );
                }
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "1-Wire error on command 0x{:02X} (attempt {}/{}): {:?}, retrying",
                        command,
                        attempt,
                        self.max_attempts,
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            if attempt < self.max_attempts {
                bus.delay_ms(self.retry_delay_ms);
            }
        }

        log::debug!(
            "command 0x{:02X} gave up after {} attempts",
            command,
            self.max_attempts
        );
        Err(Error::BusUnavailable {
            command,
            attempts: self.max_attempts,
        })
    }

    /// Send a command from the command table to one peripheral
    pub fn send(&self, rom: &PeripheralId, command: Command, payload: &[u8]) -> Result<Response> {
        if payload.len() != command.payload_len() {
            return Err(Error::InvalidArgument("payload length does not match command"));
        }
        self.execute(
            Some(rom),
            command.code(),
            payload,
            Some(command.response_len()),
        )
    }

    /// Send a command to every peripheral without reading a response
    pub fn broadcast(&self, command: u8, payload: &[u8]) -> Result<()> {
        self.execute(None, command, payload, None).map(|_| ())
    }

    /// Run one ROM search pass
    pub fn search(&self) -> Result<Vec<[u8; ROM_LEN]>> {
        self.lock().search()
    }

    /// Pause while holding the bus
    pub fn delay_ms(&self, ms: u32) {
        self.lock().delay_ms(ms)
    }
}

fn transact<B: OneWireBus + ?Sized>(
    bus: &mut B,
    target: Option<&PeripheralId>,
    frame: &[u8],
    response: &mut [u8],
) -> Result<()> {
    bus.reset()?;
    match target {
        Some(rom) => bus.select(rom)?,
        None => bus.select_all()?,
    }
    bus.write(frame)?;
    if !response.is_empty() {
        bus.read(response)?;
    }
    Ok(())
}

fn decode(response: Vec<u8>) -> Response {
    if response.len() == ACK_LEN && response[0] == SUCCESS {
        Response::Success
    } else {
        Response::Data(response)
    }
}
