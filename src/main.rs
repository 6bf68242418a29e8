//! wiregpio - Drive GPIO, ADC and PWM on remote 1-Wire peripherals
//!
//! # Architecture
//!
//! The CLI opens a bus backend from the registry in `buses`, wraps it in a
//! `CommandEngine` (which owns the bus and serializes every transaction)
//! and hands that to the command implementations. Peripherals are
//! addressed by their 16-digit hex ROM identifier as printed by `scan`.

mod buses;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, ScratchpadCommands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Commands::ListBuses = cli.command {
        commands::list_buses();
        return Ok(());
    }

    let engine = commands::open_engine(&cli.bus)?;

    match cli.command {
        Commands::ListBuses => Ok(()),
        Commands::Scan { once, discovery } => {
            let config = commands::scan::resolve_config(cli.config.as_deref(), &discovery)?;
            commands::scan::run_scan(&engine, once, &config)
        }
        Commands::Info { id } => commands::io::cmd_info(&engine, id),
        Commands::PinMode { id, pin, mode } => commands::io::cmd_pin_mode(&engine, id, pin, mode),
        Commands::DigitalRead { id, pin } => commands::io::cmd_digital_read(&engine, id, pin),
        Commands::DigitalWrite { id, pin, value } => {
            commands::io::cmd_digital_write(&engine, id, pin, value)
        }
        Commands::AnalogRead { id, channel, vcc } => {
            commands::io::cmd_analog_read(&engine, id, channel, vcc)
        }
        Commands::AnalogWrite { id, pin, duty } => {
            commands::io::cmd_analog_write(&engine, id, pin, duty)
        }
        Commands::Scratchpad(subcmd) => match subcmd {
            ScratchpadCommands::Read { id } => commands::io::cmd_scratchpad_read(&engine, id),
            ScratchpadCommands::Write { id, data } => {
                commands::io::cmd_scratchpad_write(&engine, id, &data)
            }
        },
        Commands::Selftest {
            skip_pin,
            discovery,
        } => {
            let config = commands::scan::resolve_config(cli.config.as_deref(), &discovery)?;
            commands::selftest::run_selftest(&engine, &config, &skip_pin)
        }
    }
}
