//! Single-peripheral I/O commands

use wiregpio_core::device::Peripheral;
use wiregpio_core::protocol::SCRATCH_DATA_LEN;
use wiregpio_core::{CommandEngine, OneWireBus, PeripheralId, PinMode};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Print firmware version and pin counts
pub fn cmd_info<B: OneWireBus>(engine: &CommandEngine<B>, id: PeripheralId) -> CmdResult {
    let dev = Peripheral::new(engine, id)?;
    println!("Peripheral:    {}", dev);
    println!("Firmware:      {}", dev.version()?);
    println!("Digital pins:  {}", dev.digital_pins());
    println!("Analog inputs: {}", dev.analog_pins());
    Ok(())
}

/// Set a pin mode
pub fn cmd_pin_mode<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    pin: u8,
    mode: PinMode,
) -> CmdResult {
    Peripheral::new(engine, id)?.pin_mode(pin, mode)?;
    log::info!("{}: pin {} set to {:?}", id, pin, mode);
    Ok(())
}

/// Print the level of a digital pin
pub fn cmd_digital_read<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    pin: u8,
) -> CmdResult {
    let value = Peripheral::new(engine, id)?.digital_read(pin)?;
    println!("{}", value);
    Ok(())
}

/// Drive a digital pin
pub fn cmd_digital_write<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    pin: u8,
    value: u16,
) -> CmdResult {
    Peripheral::new(engine, id)?.digital_write(pin, value)?;
    log::info!("{}: pin {} <- {}", id, pin, value);
    Ok(())
}

/// Print an analog reading, raw and in volts
pub fn cmd_analog_read<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    channel: u8,
    vcc: f32,
) -> CmdResult {
    let dev = Peripheral::new(engine, id)?;
    let adc = dev.adc(channel, vcc)?;
    let raw = adc.read()?;
    let volts = raw as f32 / wiregpio_core::protocol::ADC_MAX as f32 * adc.max_voltage();
    println!("{} ({:.3} V)", raw, volts);
    Ok(())
}

/// Set a PWM duty
pub fn cmd_analog_write<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    pin: u8,
    duty: u16,
) -> CmdResult {
    Peripheral::new(engine, id)?.analog_write(pin, duty)?;
    log::info!("{}: pin {} duty {}", id, pin, duty);
    Ok(())
}

/// Print the scratchpad image
pub fn cmd_scratchpad_read<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
) -> CmdResult {
    let image = wiregpio_core::gpio::read_scratchpad(engine, &id)?;
    println!("{}", format_hex(&image));
    Ok(())
}

/// Write the scratchpad from a hex string
pub fn cmd_scratchpad_write<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    data: &str,
) -> CmdResult {
    let bytes = parse_scratch_data(data)?;
    wiregpio_core::gpio::write_scratchpad(engine, &id, &bytes)?;
    log::info!("{}: wrote scratchpad {}", id, format_hex(&bytes));
    Ok(())
}

/// Parse exactly 7 hex bytes, with or without separators
pub fn parse_scratch_data(s: &str) -> Result<[u8; SCRATCH_DATA_LEN], String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    if !digits.is_ascii() || digits.len() != SCRATCH_DATA_LEN * 2 {
        return Err(format!(
            "Scratchpad data must be exactly {} hex bytes, got '{}'",
            SCRATCH_DATA_LEN, s
        ));
    }

    let mut out = [0u8; SCRATCH_DATA_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|e| format!("Invalid hex byte: {}", e))?;
    }
    Ok(out)
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
