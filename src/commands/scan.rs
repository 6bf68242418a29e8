//! Scan command implementation

use std::path::Path;

use wiregpio_core::discovery::{self, DiscoveryReport, Expected, Shortfall};
use wiregpio_core::{DiscoveryConfig, OneWireBus};
use wiregpio_core::CommandEngine;

use crate::cli::DiscoveryArgs;

/// Build the discovery settings from the config file and command line
///
/// Command line flags take precedence over the file.
pub fn resolve_config(
    file: Option<&Path>,
    args: &DiscoveryArgs,
) -> Result<DiscoveryConfig, Box<dyn std::error::Error>> {
    let mut config = match file {
        Some(path) => {
            log::debug!("Loading discovery settings from {}", path.display());
            DiscoveryConfig::from_toml_file(path)?
        }
        None => DiscoveryConfig::default(),
    };

    if let Some(n) = args.expect {
        config.expected = Some(Expected::Count(n));
    } else if !args.expect_id.is_empty() {
        config.expected = Some(Expected::Ids(args.expect_id.iter().copied().collect()));
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(wait_ms) = args.wait_ms {
        config.wait_ms = wait_ms;
    }
    if args.strict {
        config.strict = true;
    }

    Ok(config)
}

/// Run discovery and print what was found
pub fn run_scan<B: OneWireBus>(
    engine: &CommandEngine<B>,
    once: bool,
    config: &DiscoveryConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if once {
        let found = discovery::scan(engine)?;
        for id in &found {
            println!("{}", id);
        }
        println!("{} peripheral(s) found in a single pass", found.len());
        return Ok(());
    }

    let report = discovery::discover(engine, config)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &DiscoveryReport) {
    for id in &report.found {
        println!("{}", id);
    }
    println!(
        "{} peripheral(s) found in {} scan(s)",
        report.found.len(),
        report.scans
    );
    match &report.shortfall {
        Some(Shortfall::Count(n)) => println!("Missing {} device(s)", n),
        Some(Shortfall::Ids(ids)) => {
            for id in ids {
                println!("Missing device {}", id);
            }
        }
        None => {}
    }
}
