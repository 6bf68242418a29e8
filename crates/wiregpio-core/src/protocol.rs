//! Remote GPIO protocol constants and command table
//!
//! These values must match the peripheral firmware byte for byte.

use crate::error::{Error, Result};
use core::str::FromStr;

/// 1-Wire family code of remote GPIO peripherals
pub const FAMILY_CODE: u8 = 0xC4;

// Command codes
/// Set pin mode
pub const CMD_PIN_MODE: u8 = 0x10;
/// Read digital pin
pub const CMD_DIGITAL_READ: u8 = 0x22;
/// Write digital pin
pub const CMD_DIGITAL_WRITE: u8 = 0x32;
/// Read analog input
pub const CMD_ANALOG_READ: u8 = 0x44;
/// Write PWM duty
pub const CMD_ANALOG_WRITE: u8 = 0x54;
/// Query number of digital pins
pub const CMD_DIGITAL_PINS: u8 = 0xAA;
/// Query number of analog inputs
pub const CMD_ANALOG_PINS: u8 = 0xBC;
/// Write 7 bytes to the scratchpad
pub const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;
/// Read the scratchpad
pub const CMD_READ_SCRATCHPAD: u8 = 0xBE;
/// Read firmware version
pub const CMD_READ_VERSION: u8 = 0xCE;

/// Success sentinel (first byte of an acknowledgment)
pub const SUCCESS: u8 = 0xEE;
/// Checksum of the success sentinel (second byte of an acknowledgment)
pub const SUCCESS_CRC: u8 = 0xF6;

/// Length of an acknowledgment response (sentinel + checksum)
pub const ACK_LEN: usize = 2;
/// Length of a value-bearing response (scratchpad image incl. checksum)
pub const SCRATCHPAD_LEN: usize = 9;
/// Number of data bytes carried by a scratchpad write
pub const SCRATCH_DATA_LEN: usize = 7;

/// Offset of the pin count in a pin-count response
pub const PIN_COUNT_OFFSET: usize = 3;
/// Offset of the little-endian 16-bit value in a value response
pub const VALUE_OFFSET: usize = 4;

/// Attempts per command before giving up
pub const MAX_ATTEMPTS: u8 = 4;
/// Backoff between attempts in milliseconds
pub const RETRY_DELAY_MS: u32 = 10;

/// Default number of discovery search passes
pub const DEFAULT_SCAN_ITERATIONS: usize = 4;
/// Default pause between discovery passes in milliseconds
pub const DEFAULT_SCAN_WAIT_MS: u32 = 10;

/// Full-scale reading of the peripheral ADC (10 bit)
pub const ADC_MAX: u16 = 1023;

/// Commands understood by the peripheral firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Read firmware version
    ReadVersion,
    /// Set pin mode: `[pin, mode]`
    PinMode,
    /// Digital write: `[pin, value_hi, value_lo]`
    DigitalWrite,
    /// Digital read: `[pin]`
    DigitalRead,
    /// PWM write: `[pin, duty_hi, duty_lo]`
    AnalogWrite,
    /// Analog read: `[channel]`
    AnalogRead,
    /// Query digital pin count
    DigitalPins,
    /// Query analog pin count
    AnalogPins,
    /// Write 7 bytes to the scratchpad
    WriteScratchpad,
    /// Read the scratchpad
    ReadScratchpad,
}

impl Command {
    /// All commands, in table order
    pub const ALL: [Command; 10] = [
        Command::ReadVersion,
        Command::PinMode,
        Command::DigitalWrite,
        Command::DigitalRead,
        Command::AnalogWrite,
        Command::AnalogRead,
        Command::DigitalPins,
        Command::AnalogPins,
        Command::WriteScratchpad,
        Command::ReadScratchpad,
    ];

    /// Wire command code
    pub const fn code(self) -> u8 {
        match self {
            Command::ReadVersion => CMD_READ_VERSION,
            Command::PinMode => CMD_PIN_MODE,
            Command::DigitalWrite => CMD_DIGITAL_WRITE,
            Command::DigitalRead => CMD_DIGITAL_READ,
            Command::AnalogWrite => CMD_ANALOG_WRITE,
            Command::AnalogRead => CMD_ANALOG_READ,
            Command::DigitalPins => CMD_DIGITAL_PINS,
            Command::AnalogPins => CMD_ANALOG_PINS,
            Command::WriteScratchpad => CMD_WRITE_SCRATCHPAD,
            Command::ReadScratchpad => CMD_READ_SCRATCHPAD,
        }
    }

    /// Look up a command by its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Number of payload bytes following the command code
    pub const fn payload_len(self) -> usize {
        match self {
            Command::PinMode => 2,
            Command::DigitalWrite | Command::AnalogWrite => 3,
            Command::DigitalRead | Command::AnalogRead => 1,
            Command::WriteScratchpad => SCRATCH_DATA_LEN,
            Command::ReadVersion
            | Command::DigitalPins
            | Command::AnalogPins
            | Command::ReadScratchpad => 0,
        }
    }

    /// Length of the response the peripheral sends back
    pub const fn response_len(self) -> usize {
        match self {
            Command::PinMode
            | Command::DigitalWrite
            | Command::AnalogWrite
            | Command::WriteScratchpad => ACK_LEN,
            _ => SCRATCHPAD_LEN,
        }
    }

    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            Command::ReadVersion => "read-version",
            Command::PinMode => "pin-mode",
            Command::DigitalWrite => "digital-write",
            Command::DigitalRead => "digital-read",
            Command::AnalogWrite => "analog-write",
            Command::AnalogRead => "analog-read",
            Command::DigitalPins => "digital-pins",
            Command::AnalogPins => "analog-pins",
            Command::WriteScratchpad => "write-scratchpad",
            Command::ReadScratchpad => "read-scratchpad",
        }
    }
}

/// Pin mode as understood by the peripheral
///
/// The byte is applied verbatim by the peripheral, so modes beyond the
/// three standard ones can be passed with `Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    /// High-impedance input
    Input,
    /// Push-pull output
    Output,
    /// Input with internal pull-up
    InputPullup,
    /// Any other firmware-specific mode byte
    Raw(u8),
}

impl PinMode {
    /// Byte sent on the wire
    pub const fn to_byte(self) -> u8 {
        match self {
            PinMode::Input => 0,
            PinMode::Output => 1,
            PinMode::InputPullup => 2,
            PinMode::Raw(b) => b,
        }
    }

    /// Decode a wire byte
    pub const fn from_byte(b: u8) -> Self {
        match b {
            0 => PinMode::Input,
            1 => PinMode::Output,
            2 => PinMode::InputPullup,
            other => PinMode::Raw(other),
        }
    }
}

impl FromStr for PinMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "input" | "in" => Ok(PinMode::Input),
            "output" | "out" => Ok(PinMode::Output),
            "input-pullup" | "pullup" => Ok(PinMode::InputPullup),
            other => other
                .parse::<u8>()
                .map(PinMode::from_byte)
                .map_err(|_| Error::InvalidArgument("unknown pin mode")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::PinMode.code(), 0x10);
        assert_eq!(Command::DigitalRead.code(), 0x22);
        assert_eq!(Command::DigitalWrite.code(), 0x32);
        assert_eq!(Command::AnalogRead.code(), 0x44);
        assert_eq!(Command::AnalogWrite.code(), 0x54);
        assert_eq!(Command::DigitalPins.code(), 0xAA);
        assert_eq!(Command::AnalogPins.code(), 0xBC);
        assert_eq!(Command::WriteScratchpad.code(), 0x4E);
        assert_eq!(Command::ReadScratchpad.code(), 0xBE);
        assert_eq!(Command::ReadVersion.code(), 0xCE);
    }

    #[test]
    fn test_from_code_roundtrip() {
        for cmd in Command::ALL {
            assert_eq!(Command::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(Command::from_code(0x00), None);
        assert_eq!(Command::from_code(SUCCESS), None);
    }

    #[test]
    fn test_response_lengths() {
        assert_eq!(Command::PinMode.response_len(), 2);
        assert_eq!(Command::WriteScratchpad.response_len(), 2);
        assert_eq!(Command::DigitalRead.response_len(), 9);
        assert_eq!(Command::ReadVersion.response_len(), 9);
        assert_eq!(Command::AnalogPins.response_len(), 9);
    }

    #[test]
    fn test_pin_mode_parse() {
        assert_eq!("output".parse::<PinMode>(), Ok(PinMode::Output));
        assert_eq!("in".parse::<PinMode>(), Ok(PinMode::Input));
        assert_eq!("input-pullup".parse::<PinMode>(), Ok(PinMode::InputPullup));
        assert_eq!("1".parse::<PinMode>(), Ok(PinMode::Output));
        assert_eq!("7".parse::<PinMode>(), Ok(PinMode::Raw(7)));
        assert!("sideways".parse::<PinMode>().is_err());
    }

    #[test]
    fn test_pin_mode_bytes() {
        for b in 0..=255u8 {
            assert_eq!(PinMode::from_byte(b).to_byte(), b);
        }
    }
}
