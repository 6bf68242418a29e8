//! List commands implementation

use crate::buses;

/// List all compiled-in buses
pub fn list_buses() {
    let buses = buses::available_buses();
    if buses.is_empty() {
        println!("No buses available (recompile with bus features enabled)");
        return;
    }

    println!("Supported buses:");
    println!();
    for b in &buses {
        let aliases = if b.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", b.aliases.join(", "))
        };
        println!("  {:<10} - {}{}", b.name, b.description, aliases);
    }
}
