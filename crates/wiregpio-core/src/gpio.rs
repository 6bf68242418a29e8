//! Remote GPIO operations
//!
//! Typed wrappers around [`CommandEngine::send`], one per firmware command.
//! None of these check pin numbers; that is the job of
//! [`Peripheral`](crate::device::Peripheral), which knows the pin counts.

use crate::bus::OneWireBus;
use crate::engine::{CommandEngine, Response};
use crate::error::{Error, Result};
use crate::protocol::{
    Command, PinMode, PIN_COUNT_OFFSET, SCRATCHPAD_LEN, SCRATCH_DATA_LEN, VALUE_OFFSET,
};
use crate::rom::PeripheralId;

/// Read the peripheral firmware version
pub fn read_version<B: OneWireBus>(engine: &CommandEngine<B>, rom: &PeripheralId) -> Result<u16> {
    let r = expect_data(Command::ReadVersion, engine.send(rom, Command::ReadVersion, &[])?)?;
    Ok(decode_value(&r))
}

/// Set the mode of a digital pin
pub fn pin_mode<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
    pin: u8,
    mode: PinMode,
) -> Result<()> {
    let resp = engine.send(rom, Command::PinMode, &[pin, mode.to_byte()])?;
    expect_ack(Command::PinMode, resp)
}

/// Drive a digital pin
///
/// The value is sent as 16 bits, high byte first. The firmware treats any
/// non-zero value as HIGH.
pub fn digital_write<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
    pin: u8,
    value: u16,
) -> Result<()> {
    let [hi, lo] = value.to_be_bytes();
    let resp = engine.send(rom, Command::DigitalWrite, &[pin, hi, lo])?;
    expect_ack(Command::DigitalWrite, resp)
}

/// Read a digital pin (0 or 1)
pub fn digital_read<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
    pin: u8,
) -> Result<u16> {
    let r = expect_data(Command::DigitalRead, engine.send(rom, Command::DigitalRead, &[pin])?)?;
    Ok(decode_value(&r))
}

/// Set the PWM duty of a pin
pub fn analog_write<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
    pin: u8,
    duty: u16,
) -> Result<()> {
    let [hi, lo] = duty.to_be_bytes();
    let resp = engine.send(rom, Command::AnalogWrite, &[pin, hi, lo])?;
    expect_ack(Command::AnalogWrite, resp)
}

/// Read an analog input (0..=1023)
pub fn analog_read<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
    channel: u8,
) -> Result<u16> {
    let r = expect_data(Command::AnalogRead, engine.send(rom, Command::AnalogRead, &[channel])?)?;
    Ok(decode_value(&r))
}

/// Number of digital pins on the peripheral
pub fn digital_pins<B: OneWireBus>(engine: &CommandEngine<B>, rom: &PeripheralId) -> Result<u8> {
    let r = expect_data(Command::DigitalPins, engine.send(rom, Command::DigitalPins, &[])?)?;
    Ok(r[PIN_COUNT_OFFSET])
}

/// Number of analog inputs on the peripheral
pub fn analog_pins<B: OneWireBus>(engine: &CommandEngine<B>, rom: &PeripheralId) -> Result<u8> {
    let r = expect_data(Command::AnalogPins, engine.send(rom, Command::AnalogPins, &[])?)?;
    Ok(r[PIN_COUNT_OFFSET])
}

/// Write 7 bytes to the peripheral scratchpad
///
/// Any other length is rejected before the bus is touched.
pub fn write_scratchpad<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
    data: &[u8],
) -> Result<()> {
    if data.len() != SCRATCH_DATA_LEN {
        return Err(Error::InvalidArgument("scratchpad data must be exactly 7 bytes"));
    }
    let resp = engine.send(rom, Command::WriteScratchpad, data)?;
    expect_ack(Command::WriteScratchpad, resp)
}

/// Read the full 9-byte scratchpad image (checksum included)
pub fn read_scratchpad<B: OneWireBus>(
    engine: &CommandEngine<B>,
    rom: &PeripheralId,
) -> Result<[u8; SCRATCHPAD_LEN]> {
    expect_data(Command::ReadScratchpad, engine.send(rom, Command::ReadScratchpad, &[])?)
}

/// 16-bit little-endian value carried in a scratchpad response
pub fn decode_value(response: &[u8; SCRATCHPAD_LEN]) -> u16 {
    u16::from_le_bytes([response[VALUE_OFFSET], response[VALUE_OFFSET + 1]])
}

fn expect_ack(command: Command, resp: Response) -> Result<()> {
    match resp {
        Response::Success => Ok(()),
        Response::Data(r) => Err(Error::Rejected {
            command: command.code(),
            response: r.first().copied().unwrap_or(0),
        }),
        Response::None => Err(Error::Rejected {
            command: command.code(),
            response: 0,
        }),
    }
}

fn expect_data(command: Command, resp: Response) -> Result<[u8; SCRATCHPAD_LEN]> {
    match resp {
        Response::Data(r) => r.as_slice().try_into().map_err(|_| Error::Rejected {
            command: command.code(),
            response: r.first().copied().unwrap_or(0),
        }),
        Response::Success => Err(Error::Rejected {
            command: command.code(),
            response: crate::protocol::SUCCESS,
        }),
        Response::None => Err(Error::Rejected {
            command: command.code(),
            response: 0,
        }),
    }
}
