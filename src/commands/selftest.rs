//! Self test: exercise every pin of every peripheral found
//!
//! Every step is run even when earlier ones fail, and failures are
//! collected per peripheral so one bad pin does not hide the rest.

use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use wiregpio_core::device::Peripheral;
use wiregpio_core::discovery;
use wiregpio_core::{CommandEngine, DiscoveryConfig, Error, OneWireBus, PeripheralId, PinMode};

/// Pattern written to the scratchpad
const SCRATCH_PATTERN: [u8; 7] = [0, 10, 20, 30, 40, 50, 60];

/// Steps per digital pin: mode out, write 1, write 0, mode in, read, PWM 256, PWM 0
const STEPS_PER_PIN: u64 = 7;

/// Failures collected during a self test
#[derive(Debug, Default)]
pub struct SelftestReport {
    /// Peripherals tested
    pub tested: Vec<PeripheralId>,
    /// Failed steps per peripheral
    pub failures: BTreeMap<PeripheralId, Vec<(String, Error)>>,
}

impl SelftestReport {
    /// Total number of failed steps
    pub fn failure_count(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }

    fn record<T>(&mut self, id: PeripheralId, step: String, result: Result<T, Error>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("{}: {} failed: {}", id, step, e);
                self.failures.entry(id).or_default().push((step, e));
                None
            }
        }
    }
}

/// Discover peripherals and test each one
pub fn run_selftest<B: OneWireBus>(
    engine: &CommandEngine<B>,
    config: &DiscoveryConfig,
    skip_pins: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let report = discovery::discover(engine, config)?;
    if report.found.is_empty() {
        return Err("No peripherals found".into());
    }
    println!("Testing {} peripheral(s)", report.found.len());

    let mut result = SelftestReport::default();
    for id in &report.found {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")?
                .progress_chars("#>-"),
        );
        pb.set_message(id.to_string());
        test_peripheral(engine, *id, skip_pins, &pb, &mut result);
        pb.finish();
    }

    print_summary(&result);
    if result.failures.is_empty() {
        Ok(())
    } else {
        Err(format!("Self test failed: {} step(s) failed", result.failure_count()).into())
    }
}

/// Run every step against one peripheral
pub fn test_peripheral<B: OneWireBus>(
    engine: &CommandEngine<B>,
    id: PeripheralId,
    skip_pins: &[u8],
    pb: &ProgressBar,
    report: &mut SelftestReport,
) {
    report.tested.push(id);

    let opened = Peripheral::new(engine, id);
    let Some(dev) = report.record(id, "Open (pin counts)".into(), opened) else {
        return;
    };
    let pins: Vec<u8> = (0..dev.digital_pins())
        .filter(|p| !skip_pins.contains(p))
        .collect();
    pb.set_length(3 + STEPS_PER_PIN * pins.len() as u64 + dev.analog_pins() as u64);

    if let Some(v) = report.record(id, "Client version".into(), dev.version()) {
        log::info!(
            "{}: firmware {}, {} digital / {} analog",
            id,
            v,
            dev.digital_pins(),
            dev.analog_pins()
        );
    }
    pb.inc(1);

    report.record(
        id,
        "Write scratchpad".into(),
        dev.write_scratchpad(&SCRATCH_PATTERN),
    );
    pb.inc(1);

    // Offset 1 holds the read request's checksum, the rest echoes the write
    let check = dev.read_scratchpad().and_then(|image| {
        if image[2..8] == SCRATCH_PATTERN[1..] {
            Ok(())
        } else {
            Err(Error::Rejected {
                command: wiregpio_core::protocol::CMD_READ_SCRATCHPAD,
                response: image[0],
            })
        }
    });
    report.record(id, "Read scratchpad".into(), check);
    pb.inc(1);

    for p in pins {
        report.record(
            id,
            format!("PinMode OUTPUT pin {}", p),
            dev.pin_mode(p, PinMode::Output),
        );
        report.record(
            id,
            format!("DigitalWrite 1 pin {}", p),
            dev.digital_write(p, 1),
        );
        report.record(
            id,
            format!("DigitalWrite 0 pin {}", p),
            dev.digital_write(p, 0),
        );
        report.record(
            id,
            format!("PinMode INPUT pin {}", p),
            dev.pin_mode(p, PinMode::Input),
        );
        report.record(id, format!("DigitalRead pin {}", p), dev.digital_read(p));
        report.record(
            id,
            format!("AnalogWrite 256 pin {}", p),
            dev.analog_write(p, 256),
        );
        report.record(id, format!("AnalogWrite 0 pin {}", p), dev.analog_write(p, 0));
        pb.inc(STEPS_PER_PIN);
    }

    for ch in 0..dev.analog_pins() {
        let reading = dev.analog_read(ch);
        if let Some(v) = report.record(id, format!("AnalogRead pin A{}", ch), reading) {
            log::debug!("{}: A{} = {}", id, ch, v);
        }
        pb.inc(1);
    }
}

fn print_summary(report: &SelftestReport) {
    println!();
    if report.failures.is_empty() {
        println!("No errors ({} peripheral(s) tested)", report.tested.len());
        return;
    }

    println!("Errors:");
    for (id, failures) in &report.failures {
        println!("---------------");
        println!("Peripheral: {}", id);
        for (step, e) in failures {
            println!("  {} | {}", step, e);
        }
    }
    println!("---------------");
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use wiregpio_dummy::{dummy_id, DummyBus, DummyConfig};

    fn engine(config: DummyConfig) -> CommandEngine<DummyBus> {
        CommandEngine::new(DummyBus::from_config(&config))
    }

    #[test]
    fn test_clean_run() {
        let engine = engine(DummyConfig {
            devices: 1,
            digital_pins: 14,
            analog_pins: 6,
            ..Default::default()
        });
        let mut report = SelftestReport::default();
        test_peripheral(&engine, dummy_id(0), &[2], &ProgressBar::hidden(), &mut report);
        assert_eq!(report.failure_count(), 0);
        assert_eq!(report.tested, vec![dummy_id(0)]);

        engine.with_bus(|bus| {
            let emu = bus.peripheral(&dummy_id(0)).unwrap();
            // Skipped pin is never touched
            assert_eq!(emu.mode(2), Some(PinMode::Input));
            assert_eq!(emu.duty(2), Some(0));
            assert_eq!(emu.mode(13), Some(PinMode::Input));
            assert_eq!(emu.level(13), Some(0));
        });
    }

    #[test]
    fn test_skip_pin_not_addressed() {
        let engine = engine(DummyConfig {
            devices: 1,
            digital_pins: 4,
            analog_pins: 0,
            ..Default::default()
        });
        let mut report = SelftestReport::default();
        test_peripheral(
            &engine,
            dummy_id(0),
            &[0, 1, 2, 3],
            &ProgressBar::hidden(),
            &mut report,
        );
        assert_eq!(report.failure_count(), 0);
        // open (2 queries) + version + scratch write + scratch read
        assert_eq!(engine.with_bus(|bus| bus.stats().writes), 5);
    }

    #[test]
    fn test_absent_peripheral_reports_failure() {
        let engine = engine(DummyConfig {
            devices: 1,
            ..Default::default()
        });
        let mut report = SelftestReport::default();
        test_peripheral(&engine, dummy_id(5), &[2], &ProgressBar::hidden(), &mut report);
        assert_eq!(report.failure_count(), 1);
        let failures = &report.failures[&dummy_id(5)];
        assert!(matches!(failures[0].1, Error::BusUnavailable { .. }));
    }

    #[test]
    fn test_run_selftest_passes_on_healthy_bus() {
        let engine = engine(DummyConfig::default());
        let config = DiscoveryConfig {
            expected: Some(wiregpio_core::discovery::Expected::Count(2)),
            ..Default::default()
        };
        assert!(run_selftest(&engine, &config, &[2]).is_ok());
    }
}
