//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wiregpio_core::{PeripheralId, PinMode};

/// Parse a peripheral identifier (16 hex digits)
fn parse_id(s: &str) -> Result<PeripheralId, String> {
    s.parse()
        .map_err(|_| format!("Invalid peripheral identifier '{}' (expected 16 hex digits)", s))
}

/// Parse a pin mode name or raw mode byte
fn parse_mode(s: &str) -> Result<PinMode, String> {
    s.parse().map_err(|_| {
        format!(
            "Invalid pin mode '{}' (use input, output, input-pullup or a number)",
            s
        )
    })
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "wiregpio")]
#[command(author, version, about = "Remote GPIO over 1-Wire", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Bus to use, with optional parameters (e.g. dummy:devices=3)
    #[arg(short, long, global = true, default_value = "dummy")]
    pub bus: String,

    /// Discovery configuration file (TOML format)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Discovery options shared across commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DiscoveryArgs {
    /// Number of peripherals expected on the bus
    #[arg(long, conflicts_with = "expect_id")]
    pub expect: Option<usize>,

    /// Identifier of a peripheral expected on the bus (repeatable)
    #[arg(long, value_parser = parse_id)]
    pub expect_id: Vec<PeripheralId>,

    /// Maximum number of search passes
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Pause between search passes in milliseconds
    #[arg(long)]
    pub wait_ms: Option<u32>,

    /// Fail if an expected peripheral is missing
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported buses
    ListBuses,

    /// Search the bus for remote GPIO peripherals
    Scan {
        /// Run a single search pass
        #[arg(long)]
        once: bool,

        #[command(flatten)]
        discovery: DiscoveryArgs,
    },

    /// Show firmware version and pin counts
    Info {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,
    },

    /// Set the mode of a digital pin
    PinMode {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,

        /// Pin number
        pin: u8,

        /// input, output, input-pullup or a raw mode number
        #[arg(value_parser = parse_mode)]
        mode: PinMode,
    },

    /// Read a digital pin
    DigitalRead {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,

        /// Pin number
        pin: u8,
    },

    /// Drive a digital pin
    DigitalWrite {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,

        /// Pin number
        pin: u8,

        /// Level (0 = low, anything else = high)
        #[arg(value_parser = parse_hex_u16)]
        value: u16,
    },

    /// Read an analog input
    AnalogRead {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,

        /// Analog channel
        channel: u8,

        /// Reference voltage used to convert the reading
        #[arg(long, default_value = "5.0")]
        vcc: f32,
    },

    /// Set the PWM duty of a pin
    AnalogWrite {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,

        /// Pin number
        pin: u8,

        /// Duty (hex or decimal)
        #[arg(value_parser = parse_hex_u16)]
        duty: u16,
    },

    /// Scratchpad operations
    #[command(subcommand)]
    Scratchpad(ScratchpadCommands),

    /// Exercise every pin of every peripheral found
    Selftest {
        /// Pins to leave alone (default: the 1-Wire pin 2)
        #[arg(long, value_delimiter = ',', default_value = "2")]
        skip_pin: Vec<u8>,

        #[command(flatten)]
        discovery: DiscoveryArgs,
    },
}

/// Scratchpad subcommands
#[derive(Subcommand)]
pub enum ScratchpadCommands {
    /// Read the 9-byte scratchpad image
    Read {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,
    },

    /// Write 7 bytes to the scratchpad
    Write {
        /// Peripheral identifier
        #[arg(value_parser = parse_id)]
        id: PeripheralId,

        /// 7 bytes in hex, e.g. "00 0A 14 1E 28 32 3C" or 000A141E28323C
        data: String,
    },
}
