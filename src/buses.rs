//! Bus registration and dispatch
//!
//! This module provides a central registry for all bus backends, with
//! feature-gated inclusion and help text generated from what was compiled
//! in.

use wiregpio_core::OneWireBus;

/// Information about a bus backend
pub struct BusInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available buses (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_buses() -> Vec<BusInfo> {
    let mut buses = Vec::new();

    #[cfg(feature = "dummy")]
    buses.push(BusInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "Emulated bus for testing (devices=N,digital=N,analog=N,version=N,adc=N,foreign=N,miss=K,corrupt=N,fail-resets=N)",
    });

    buses
}

/// Generate help text listing all available buses
pub fn bus_help() -> String {
    let buses = available_buses();

    if buses.is_empty() {
        return "No buses available (recompile with bus features enabled)".to_string();
    }

    let mut help = String::from("Available buses:\n");
    for b in &buses {
        help.push_str(&format!("  {:12} - {}\n", b.name, b.description));
    }
    help
}

/// Resolve a bus name or alias to its canonical name
pub fn find_bus(name: &str) -> Option<&'static str> {
    available_buses()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Open the bus described by `bus_str`
///
/// The string can be just the name (e.g. "dummy") or include parameters
/// (e.g. "dummy:devices=3,miss=2").
pub fn open_bus(bus_str: &str) -> Result<Box<dyn OneWireBus>, Box<dyn std::error::Error>> {
    let (name, options) = parse_bus_string(bus_str);

    let canonical_name = match find_bus(name) {
        Some(n) => n,
        None => return Err(unknown_bus_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = wiregpio_dummy::parse_options(&options)
                .map_err(|e| format!("Invalid dummy parameters: {}", e))?;
            log::debug!("Opening emulated bus: {:?}", config);
            Ok(Box::new(wiregpio_dummy::DummyBus::from_config(&config)))
        }

        _ => {
            let _ = options;
            Err(unknown_bus_error(name))
        }
    }
}

/// Parse a bus string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_bus_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_bus_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown bus: {}\n\n", name);
    msg.push_str(&bus_help());
    msg.push_str("\nUse 'wiregpio list-buses' for more details");
    msg.into()
}
