//! Error types for wiregpio
//!
//! Bus-level faults (`BusFault`, `FrameCorrupt`) are transient: the command
//! engine retries them and only reports `BusUnavailable` once its attempt
//! bound is exhausted. Everything else is returned to the caller as-is.

#[cfg(feature = "std")]
use std::string::String;

#[cfg(feature = "std")]
use thiserror::Error;

/// Protocol and bus errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum Error {
    /// A single bus transaction (reset, select, write, read or search) failed
    #[cfg_attr(feature = "std", error("Bus transaction failed"))]
    BusFault,

    /// A received frame did not pass its checksum
    #[cfg_attr(feature = "std", error("Frame checksum mismatch"))]
    FrameCorrupt,

    /// Command could not be completed within the retry bound
    #[cfg_attr(
        feature = "std",
        error("Device or bus unavailable: command 0x{command:02X} failed after {attempts} attempts")
    )]
    BusUnavailable {
        /// Command code that failed
        command: u8,
        /// Number of attempts made
        attempts: u8,
    },

    /// Peripheral answered with something other than the success sentinel
    #[cfg_attr(
        feature = "std",
        error("Command 0x{command:02X} rejected with response 0x{response:02X}")
    )]
    Rejected {
        /// Command code that was sent
        command: u8,
        /// First byte of the response
        response: u8,
    },

    /// Pin or channel index exceeds what the peripheral reports
    #[cfg_attr(
        feature = "std",
        error("Pin {pin} out of range ({available} pins available)")
    )]
    PinOutOfRange {
        /// Requested pin or channel
        pin: u8,
        /// Number of pins the peripheral reports
        available: u8,
    },

    /// Caller passed an argument the protocol cannot carry
    #[cfg_attr(feature = "std", error("Invalid argument: {0}"))]
    InvalidArgument(&'static str),

    /// Discovery did not find every expected peripheral
    #[cfg_attr(feature = "std", error("Missing {missing} devices"))]
    DeviceMissing {
        /// How many expected peripherals were not seen
        missing: usize,
    },

    /// Identifier string is not 16 hexadecimal characters
    #[cfg_attr(feature = "std", error("Invalid peripheral identifier"))]
    InvalidId,

    /// Configuration file could not be loaded
    #[cfg(feature = "std")]
    #[cfg_attr(feature = "std", error("Configuration error: {0}"))]
    Config(String),
}

impl Error {
    /// Whether the command engine should retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::BusFault | Error::FrameCorrupt)
    }
}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// Result type alias using the crate error
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(Error::BusFault.is_transient());
        assert!(Error::FrameCorrupt.is_transient());
        assert!(!Error::InvalidId.is_transient());
        assert!(!Error::BusUnavailable {
            command: 0x22,
            attempts: 4
        }
        .is_transient());
        assert!(!Error::PinOutOfRange {
            pin: 20,
            available: 14
        }
        .is_transient());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_display() {
        let err = Error::BusUnavailable {
            command: 0xCE,
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "Device or bus unavailable: command 0xCE failed after 4 attempts"
        );
        assert_eq!(
            Error::DeviceMissing { missing: 2 }.to_string(),
            "Missing 2 devices"
        );
    }
}
