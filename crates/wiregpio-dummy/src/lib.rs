//! wiregpio-dummy - Emulated 1-Wire bus for testing
//!
//! This crate provides a bus master that talks to emulated remote GPIO
//! peripherals in memory. The peripherals run the same command handling as
//! the real firmware, so the whole stack can be exercised without
//! hardware. Faults (corrupted responses, failed resets, peripherals that
//! drop out of a search pass) can be injected on demand.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod peripheral;

#[cfg(feature = "alloc")]
pub use peripheral::{DummyPeripheral, DEFAULT_VERSION};

#[cfg(feature = "alloc")]
use alloc::collections::VecDeque;
#[cfg(feature = "alloc")]
use alloc::format;
#[cfg(feature = "alloc")]
use alloc::string::{String, ToString};
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

#[cfg(feature = "alloc")]
use wiregpio_core::error::{Error, Result};
use wiregpio_core::protocol::FAMILY_CODE;
use wiregpio_core::rom::{PeripheralId, ROM_LEN};
#[cfg(feature = "alloc")]
use wiregpio_core::OneWireBus;

/// Family code used for emulated foreign devices (a temperature sensor)
pub const FOREIGN_FAMILY: u8 = 0x28;

/// Configuration for the emulated bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Number of remote GPIO peripherals
    pub devices: usize,
    /// Digital pins per peripheral
    pub digital_pins: u8,
    /// Analog inputs per peripheral
    pub analog_pins: u8,
    /// Reported firmware version
    pub version: u16,
    /// Initial conversion result of every analog input
    pub adc: u16,
    /// Number of non-GPIO devices sharing the bus
    pub foreign: usize,
    /// Hide each peripheral from every n-th search pass (0 = never)
    pub miss_every: usize,
    /// Corrupt this many responses
    pub corrupt: usize,
    /// Fail this many resets
    pub fail_resets: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            devices: 2,
            digital_pins: 20, // ATmega328P
            analog_pins: 6,
            version: 100,
            adc: 512,
            foreign: 0,
            miss_every: 0,
            corrupt: 0,
            fail_resets: 0,
        }
    }
}

/// Identifier of the `index`-th emulated peripheral
pub fn dummy_id(index: usize) -> PeripheralId {
    let [.., b4, b5, b6] = (index as u32 + 1).to_be_bytes();
    PeripheralId::from_parts(FAMILY_CODE, [0, 0, 0, b4, b5, b6])
}

fn foreign_id(index: usize) -> PeripheralId {
    PeripheralId::from_parts(FOREIGN_FAMILY, [0xFF, 0, 0, 0, 0, index as u8])
}

/// Parse bus options of the form `key=value`
///
/// Recognized keys: `devices`, `digital`, `analog`, `version`, `adc`,
/// `foreign`, `miss`, `corrupt`, `fail-resets`.
#[cfg(feature = "alloc")]
pub fn parse_options(options: &[(&str, &str)]) -> core::result::Result<DummyConfig, String> {
    fn num<T: core::str::FromStr>(key: &str, value: &str) -> core::result::Result<T, String> {
        value
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", key, value))
    }

    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "devices" => config.devices = num(key, value)?,
            "digital" => config.digital_pins = num(key, value)?,
            "analog" => config.analog_pins = num(key, value)?,
            "version" => config.version = num(key, value)?,
            "adc" => config.adc = num(key, value)?,
            "foreign" => config.foreign = num(key, value)?,
            "miss" => config.miss_every = num(key, value)?,
            "corrupt" => config.corrupt = num(key, value)?,
            "fail-resets" => config.fail_resets = num(key, value)?,
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.devices > u16::MAX as usize {
        return Err("Too many devices".to_string());
    }

    Ok(config)
}

/// Bus activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Reset pulses issued
    pub resets: usize,
    /// Match ROM or Skip ROM selections
    pub selects: usize,
    /// Write transactions
    pub writes: usize,
    /// Read transactions
    pub reads: usize,
    /// Search passes
    pub searches: usize,
    /// Delay requests
    pub delays: usize,
    /// Total requested delay in milliseconds
    pub delay_ms: u64,
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Nobody,
    One(usize),
    All,
}

/// Emulated 1-Wire bus
///
/// Responses from several selected peripherals are combined the way an
/// open-drain line combines them: bitwise AND, with an idle line reading
/// `0xFF`.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone)]
pub struct DummyBus {
    peripherals: Vec<DummyPeripheral>,
    foreign: Vec<[u8; ROM_LEN]>,
    selection: Selection,
    pending: VecDeque<u8>,
    corrupt: usize,
    fail_resets: usize,
    miss_every: usize,
    pass: usize,
    stats: BusStats,
}

#[cfg(feature = "alloc")]
impl DummyBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            peripherals: Vec::new(),
            foreign: Vec::new(),
            selection: Selection::Nobody,
            pending: VecDeque::new(),
            corrupt: 0,
            fail_resets: 0,
            miss_every: 0,
            pass: 0,
            stats: BusStats::default(),
        }
    }

    /// Create a bus populated according to `config`
    pub fn from_config(config: &DummyConfig) -> Self {
        let mut bus = Self::new();
        for i in 0..config.devices {
            let mut dev = DummyPeripheral::new(dummy_id(i), config.digital_pins, config.analog_pins)
                .with_version(config.version);
            dev.fill_adc(config.adc);
            bus.add_peripheral(dev);
        }
        for i in 0..config.foreign {
            bus.attach_foreign(foreign_id(i).into());
        }
        bus.miss_every(config.miss_every);
        bus.corrupt_responses(config.corrupt);
        bus.fail_resets(config.fail_resets);
        bus
    }

    /// Create a bus with the default configuration
    pub fn new_default() -> Self {
        Self::from_config(&DummyConfig::default())
    }

    /// Attach a remote GPIO peripheral
    pub fn add_peripheral(&mut self, peripheral: DummyPeripheral) {
        log::debug!("dummy: attached {}", peripheral.id());
        self.peripherals.push(peripheral);
    }

    /// Attach a device that only takes part in ROM search
    ///
    /// The ROM is reported verbatim, so a broken checksum can be used.
    pub fn attach_foreign(&mut self, rom: [u8; ROM_LEN]) {
        self.foreign.push(rom);
    }

    /// Corrupt the next `n` responses with a single bit flip
    pub fn corrupt_responses(&mut self, n: usize) {
        self.corrupt = n;
    }

    /// Make the next `n` resets fail
    pub fn fail_resets(&mut self, n: usize) {
        self.fail_resets = n;
    }

    /// Hide each peripheral from every `k`-th search pass (0 = never)
    ///
    /// The schedule is shifted by the peripheral's position, so
    /// different peripherals drop out on different passes.
    pub fn miss_every(&mut self, k: usize) {
        self.miss_every = k;
    }

    /// Attached peripherals
    pub fn peripherals(&self) -> &[DummyPeripheral] {
        &self.peripherals
    }

    /// Look up an attached peripheral
    pub fn peripheral(&self, id: &PeripheralId) -> Option<&DummyPeripheral> {
        self.peripherals.iter().find(|p| p.id() == *id)
    }

    /// Look up an attached peripheral for modification
    pub fn peripheral_mut(&mut self, id: &PeripheralId) -> Option<&mut DummyPeripheral> {
        self.peripherals.iter_mut().find(|p| p.id() == *id)
    }

    /// Activity counters
    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// Zero the activity counters
    pub fn reset_stats(&mut self) {
        self.stats = BusStats::default();
    }

    fn hidden(&self, index: usize) -> bool {
        self.miss_every > 0 && (self.pass + index + 1) % self.miss_every == 0
    }
}

#[cfg(feature = "alloc")]
impl Default for DummyBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "alloc")]
impl OneWireBus for DummyBus {
    fn reset(&mut self) -> Result<()> {
        self.stats.resets += 1;
        self.selection = Selection::Nobody;
        self.pending.clear();
        if self.fail_resets > 0 {
            self.fail_resets -= 1;
            return Err(Error::BusFault);
        }
        if self.peripherals.is_empty() && self.foreign.is_empty() {
            // No presence pulse
            return Err(Error::BusFault);
        }
        Ok(())
    }

    fn select(&mut self, rom: &PeripheralId) -> Result<()> {
        self.stats.selects += 1;
        self.selection = match self.peripherals.iter().position(|p| p.id() == *rom) {
            Some(i) => Selection::One(i),
            None => Selection::Nobody,
        };
        Ok(())
    }

    fn select_all(&mut self) -> Result<()> {
        self.stats.selects += 1;
        self.selection = Selection::All;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stats.writes += 1;
        let responses: Vec<Vec<u8>> = match self.selection {
            Selection::Nobody => Vec::new(),
            Selection::One(i) => self.peripherals[i].handle(data).into_iter().collect(),
            Selection::All => self
                .peripherals
                .iter_mut()
                .filter_map(|p| p.handle(data))
                .collect(),
        };

        let len = responses.iter().map(Vec::len).max().unwrap_or(0);
        let mut line: Vec<u8> = (0..len)
            .map(|i| {
                responses
                    .iter()
                    .fold(0xFF, |acc, r| acc & r.get(i).copied().unwrap_or(0xFF))
            })
            .collect();

        if self.corrupt > 0 && !line.is_empty() {
            self.corrupt -= 1;
            line[0] ^= 0x01;
            log::debug!("dummy: corrupting response");
        }

        self.pending = line.into();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stats.reads += 1;
        for b in buf.iter_mut() {
            *b = self.pending.pop_front().unwrap_or(0xFF);
        }
        Ok(())
    }

    fn search(&mut self) -> Result<Vec<[u8; ROM_LEN]>> {
        self.stats.searches += 1;
        let mut roms: Vec<[u8; ROM_LEN]> = self
            .peripherals
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.hidden(*i))
            .map(|(_, p)| p.id().into())
            .collect();
        roms.extend(self.foreign.iter().copied());
        self.pass += 1;
        Ok(roms)
    }

    fn delay_ms(&mut self, ms: u32) {
        // Nothing to wait for in memory
        self.stats.delays += 1;
        self.stats.delay_ms += ms as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiregpio_core::device::Peripheral;
    use wiregpio_core::discovery::{self, Expected, Shortfall};
    use wiregpio_core::engine::CommandEngine;
    use wiregpio_core::gpio;
    use wiregpio_core::protocol::PinMode;
    use wiregpio_core::DiscoveryConfig;

    fn bus(devices: usize, digital: u8, analog: u8) -> DummyBus {
        DummyBus::from_config(&DummyConfig {
            devices,
            digital_pins: digital,
            analog_pins: analog,
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("devices", "3"),
            ("digital", "14"),
            ("analog", "8"),
            ("miss", "3"),
            ("corrupt", "1"),
            ("bogus", "x"),
        ])
        .unwrap();
        assert_eq!(config.devices, 3);
        assert_eq!(config.digital_pins, 14);
        assert_eq!(config.analog_pins, 8);
        assert_eq!(config.miss_every, 3);
        assert_eq!(config.corrupt, 1);
        assert_eq!(config.version, 100);

        assert!(parse_options(&[("digital", "300")]).is_err());
        assert!(parse_options(&[("devices", "many")]).is_err());
    }

    #[test]
    fn test_dummy_ids() {
        assert_eq!(dummy_id(0).to_string(), "C4000000000001FA");
        assert_eq!(dummy_id(1).to_string(), "C400000000000218");
        assert!(dummy_id(300).is_remote_gpio());
    }

    #[test]
    fn test_write_then_read_back() {
        let engine = CommandEngine::new(bus(1, 20, 6));
        let dev = Peripheral::new(&engine, dummy_id(0)).unwrap();

        dev.pin_mode(13, PinMode::Output).unwrap();
        dev.digital_write(13, 1).unwrap();
        assert_eq!(dev.digital_read(13).unwrap(), 1);
        dev.digital_write(13, 0).unwrap();
        assert_eq!(dev.digital_read(13).unwrap(), 0);
        assert_eq!(dev.version().unwrap(), 100);

        engine.with_bus(|bus| {
            let emu = bus.peripheral(&dummy_id(0)).unwrap();
            assert_eq!(emu.mode(13), Some(PinMode::Output));
            assert_eq!(emu.level(13), Some(0));
        });
    }

    #[test]
    fn test_pin_range_checked_before_bus() {
        let engine = CommandEngine::new(bus(1, 14, 6));
        let dev = Peripheral::new(&engine, dummy_id(0)).unwrap();
        assert_eq!(dev.digital_pins(), 14);
        assert_eq!(dev.analog_pins(), 6);

        let before = engine.with_bus(|bus| bus.stats());
        assert_eq!(
            dev.pin_mode(20, PinMode::Output),
            Err(Error::PinOutOfRange {
                pin: 20,
                available: 14
            })
        );
        assert_eq!(engine.with_bus(|bus| bus.stats()), before);
    }

    #[test]
    fn test_analog_io() {
        let engine = CommandEngine::new(bus(1, 20, 6));
        engine.with_bus(|bus| {
            if let Some(p) = bus.peripheral_mut(&dummy_id(0)) {
                p.set_adc(3, 1023);
            }
        });
        let dev = Peripheral::new(&engine, dummy_id(0)).unwrap();
        assert_eq!(dev.analog_read(0).unwrap(), 512);
        let adc = dev.adc(3, 3.3).unwrap();
        assert!((adc.read_voltage().unwrap() - 3.3).abs() < 1e-6);

        dev.analog_write(9, 256).unwrap();
        engine.with_bus(|bus| assert_eq!(bus.peripheral(&dummy_id(0)).unwrap().duty(9), Some(256)));
    }

    #[test]
    fn test_scratchpad_roundtrip() {
        let engine = CommandEngine::new(bus(1, 20, 6));
        let data = [0, 10, 20, 30, 40, 50, 60];
        gpio::write_scratchpad(&engine, &dummy_id(0), &data).unwrap();
        let image = gpio::read_scratchpad(&engine, &dummy_id(0)).unwrap();
        assert_eq!(&image[2..8], &data[1..]);
    }

    #[test]
    fn test_corruption_is_retried() {
        let mut b = bus(1, 20, 6);
        b.corrupt_responses(2);
        let engine = CommandEngine::new(b);
        assert_eq!(gpio::read_version(&engine, &dummy_id(0)).unwrap(), 100);
        assert_eq!(engine.with_bus(|bus| bus.stats().resets), 3);
    }

    #[test]
    fn test_persistent_corruption_gives_up() {
        let mut b = bus(1, 20, 6);
        b.corrupt_responses(usize::MAX);
        let engine = CommandEngine::new(b);
        assert_eq!(
            gpio::digital_read(&engine, &dummy_id(0), 4),
            Err(Error::BusUnavailable {
                command: 0x22,
                attempts: 4
            })
        );
        let stats = engine.with_bus(|bus| bus.stats());
        assert_eq!(stats.resets, 4);
        assert_eq!(stats.delays, 3);
    }

    #[test]
    fn test_failed_resets_are_retried() {
        let mut b = bus(1, 20, 6);
        b.fail_resets(3);
        let engine = CommandEngine::new(b);
        gpio::pin_mode(&engine, &dummy_id(0), 5, PinMode::InputPullup).unwrap();
        engine.with_bus(|bus| {
            assert_eq!(bus.stats().resets, 4);
            assert_eq!(
                bus.peripheral(&dummy_id(0)).unwrap().mode(5),
                Some(PinMode::InputPullup)
            );
        });
    }

    #[test]
    fn test_absent_peripheral_is_unavailable() {
        let engine = CommandEngine::new(bus(1, 20, 6));
        assert!(matches!(
            Peripheral::new(&engine, dummy_id(7)),
            Err(Error::BusUnavailable { .. })
        ));
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let engine = CommandEngine::new(bus(3, 20, 6));
        let frame_payload = [13, PinMode::Output.to_byte()];
        engine
            .broadcast(wiregpio_core::protocol::CMD_PIN_MODE, &frame_payload)
            .unwrap();
        engine.with_bus(|bus| {
            assert!(bus
                .peripherals()
                .iter()
                .all(|p| p.mode(13) == Some(PinMode::Output)));
        });
    }

    #[test]
    fn test_discovery_with_flaky_search() {
        let mut b = DummyBus::from_config(&DummyConfig {
            devices: 4,
            foreign: 2,
            miss_every: 2,
            ..Default::default()
        });
        let mut broken: [u8; ROM_LEN] = dummy_id(9).into();
        broken[7] ^= 0xFF;
        b.attach_foreign(broken);
        let engine = CommandEngine::new(b);

        // A single pass only sees half of them
        assert_eq!(discovery::scan(&engine).unwrap().len(), 2);

        let report = discovery::scan_repeatedly(&engine, 4, 10, Some(&Expected::Count(4)));
        assert_eq!(report.found.len(), 4);
        assert!(report.is_complete());
        assert!(report.found.iter().all(|id| id.is_remote_gpio()));
    }

    #[test]
    fn test_discovery_strict_shortfall() {
        let engine = CommandEngine::new(bus(2, 20, 6));
        let config = DiscoveryConfig {
            strict: true,
            expected: Some(Expected::Ids(
                [dummy_id(0), dummy_id(1), dummy_id(2)].into_iter().collect(),
            )),
            ..Default::default()
        };
        assert_eq!(
            discovery::discover(&engine, &config),
            Err(Error::DeviceMissing { missing: 1 })
        );

        let report = discovery::scan_repeatedly(&engine, 4, 10, config.expected.as_ref());
        assert_eq!(report.shortfall, Some(Shortfall::Ids(vec![dummy_id(2)])));
        assert_eq!(report.scans, 4);
    }
}
