//! Peripheral discovery
//!
//! A single ROM search pass regularly misses peripherals that are on the
//! bus, so [`scan_repeatedly`] runs several passes and keeps the union of
//! everything seen. It stops early once the expectation is met.

use std::collections::BTreeSet;
use std::vec::Vec;

use crate::bus::OneWireBus;
use crate::config::DiscoveryConfig;
use crate::engine::CommandEngine;
use crate::error::{Error, Result};
use crate::rom::PeripheralId;

/// What discovery expects to find
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum Expected {
    /// A number of peripherals
    Count(usize),
    /// A specific set of peripherals
    Ids(BTreeSet<PeripheralId>),
}

impl Expected {
    /// Number of peripherals expected
    pub fn len(&self) -> usize {
        match self {
            Expected::Count(n) => *n,
            Expected::Ids(ids) => ids.len(),
        }
    }

    /// Whether nothing is expected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `found` meets the expectation
    ///
    /// A count is met by any peripherals of the right family. An explicit
    /// set is met only when every listed identifier has been seen, so
    /// extra peripherals never stand in for missing ones.
    pub fn satisfied_by(&self, found: &BTreeSet<PeripheralId>) -> bool {
        match self {
            Expected::Count(n) => found.len() >= *n,
            Expected::Ids(ids) => ids.is_subset(found),
        }
    }
}

/// Peripherals that discovery expected but did not see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    /// This many peripherals are missing
    Count(usize),
    /// These peripherals are missing
    Ids(Vec<PeripheralId>),
}

impl Shortfall {
    /// Number of missing peripherals
    pub fn count(&self) -> usize {
        match self {
            Shortfall::Count(n) => *n,
            Shortfall::Ids(ids) => ids.len(),
        }
    }
}

/// Result of a repeated scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Every remote GPIO peripheral seen, deduplicated
    pub found: BTreeSet<PeripheralId>,
    /// Number of search passes run
    pub scans: usize,
    /// Missing peripherals, if the expectation was not met
    pub shortfall: Option<Shortfall>,
}

impl DiscoveryReport {
    /// Whether the expectation (if any) was met
    pub fn is_complete(&self) -> bool {
        self.shortfall.is_none()
    }

    /// Found identifiers in ascending order
    pub fn ids(&self) -> Vec<PeripheralId> {
        self.found.iter().copied().collect()
    }
}

/// Run one search pass and keep only intact remote GPIO identifiers
///
/// Other devices sharing the bus, and ROMs that fail their CRC, are
/// dropped silently.
pub fn scan<B: OneWireBus>(engine: &CommandEngine<B>) -> Result<BTreeSet<PeripheralId>> {
    let roms = engine.search()?;
    Ok(roms
        .into_iter()
        .map(PeripheralId::new)
        .filter(|id| {
            let keep = id.is_remote_gpio();
            if !keep {
                log::trace!("ignoring ROM {} (family 0x{:02X})", id, id.family());
            }
            keep
        })
        .collect())
}

/// Scan up to `iterations` times, accumulating every identifier seen
///
/// Waits `wait_ms` between passes. Stops early once `expected` is
/// satisfied. A shortfall is logged and
/// reported but is not an error; see [`discover`] for the strict form.
/// A pass that fails on the bus counts as a pass that saw nothing.
pub fn scan_repeatedly<B: OneWireBus>(
    engine: &CommandEngine<B>,
    iterations: usize,
    wait_ms: u32,
    expected: Option<&Expected>,
) -> DiscoveryReport {
    let mut found = BTreeSet::new();
    let mut scans = 0;

    for i in 0..iterations {
        if i > 0 {
            engine.delay_ms(wait_ms);
        }
        scans += 1;
        match scan(engine) {
            Ok(seen) => {
                log::debug!("scan {}/{}: {} peripherals", scans, iterations, seen.len());
                found.extend(seen);
            }
            Err(e) => log::warn!("scan {}/{} failed: {}", scans, iterations, e),
        }
        if expected.is_some_and(|exp| exp.satisfied_by(&found)) {
            break;
        }
    }

    let shortfall = expected.and_then(|exp| shortfall(exp, &found));
    match &shortfall {
        Some(Shortfall::Count(n)) => log::warn!("Missing {} devices", n),
        Some(Shortfall::Ids(ids)) => {
            for id in ids {
                log::warn!("Missing device {}", id);
            }
        }
        None => {}
    }
    log::info!("Found {} peripherals in {} scans", found.len(), scans);

    DiscoveryReport {
        found,
        scans,
        shortfall,
    }
}

/// Scan according to `config`
///
/// In strict mode a shortfall becomes [`Error::DeviceMissing`].
pub fn discover<B: OneWireBus>(
    engine: &CommandEngine<B>,
    config: &DiscoveryConfig,
) -> Result<DiscoveryReport> {
    let report = scan_repeatedly(
        engine,
        config.iterations,
        config.wait_ms,
        config.expected.as_ref(),
    );
    match (&report.shortfall, config.strict) {
        (Some(missing), true) => Err(Error::DeviceMissing {
            missing: missing.count(),
        }),
        _ => Ok(report),
    }
}

fn shortfall(expected: &Expected, found: &BTreeSet<PeripheralId>) -> Option<Shortfall> {
    if expected.satisfied_by(found) {
        return None;
    }
    match expected {
        Expected::Count(n) => Some(Shortfall::Count(n - found.len())),
        Expected::Ids(ids) => Some(Shortfall::Ids(ids.difference(found).copied().collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FAMILY_CODE;
    use crate::rom::ROM_LEN;

    /// Bus whose search passes return a fixed schedule of ROM lists
    struct SearchBus {
        passes: Vec<Vec<[u8; ROM_LEN]>>,
        searches: usize,
        delays: Vec<u32>,
        fail_pass: Option<usize>,
    }

    impl SearchBus {
        fn new(passes: Vec<Vec<PeripheralId>>) -> Self {
            Self {
                passes: passes
                    .into_iter()
                    .map(|p| p.into_iter().map(<[u8; ROM_LEN]>::from).collect())
                    .collect(),
                searches: 0,
                delays: Vec::new(),
                fail_pass: None,
            }
        }
    }

    impl OneWireBus for SearchBus {
        fn reset(&mut self) -> Result<()> {
            Ok(())
        }
        fn select(&mut self, _rom: &PeripheralId) -> Result<()> {
            Ok(())
        }
        fn select_all(&mut self) -> Result<()> {
            Ok(())
        }
        fn write(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        fn read(&mut self, _buf: &mut [u8]) -> Result<()> {
            Ok(())
        }
        fn search(&mut self) -> Result<Vec<[u8; ROM_LEN]>> {
            let pass = self.searches;
            self.searches += 1;
            if self.fail_pass == Some(pass) {
                return Err(Error::BusFault);
            }
            Ok(self.passes.get(pass).cloned().unwrap_or_default())
        }
        fn delay_ms(&mut self, ms: u32) {
            self.delays.push(ms);
        }
    }

    fn id(n: u8) -> PeripheralId {
        PeripheralId::from_parts(FAMILY_CODE, [0, 0, 0, 0, 0, n])
    }

    #[test]
    fn test_scan_filters_foreign_and_corrupt() {
        let sensor = PeripheralId::from_parts(0x28, [1, 2, 3, 4, 5, 6]);
        let mut broken = *id(9).as_bytes();
        broken[7] ^= 0x55;
        let bus = SearchBus::new(vec![vec![id(1), sensor, PeripheralId::new(broken), id(2)]]);
        let engine = CommandEngine::new(bus);

        let found = scan(&engine).unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![id(1), id(2)]);
    }

    #[test]
    fn test_accumulates_until_count_met() {
        let bus = SearchBus::new(vec![
            vec![id(1)],
            vec![id(2), id(1)],
            vec![id(3)],
            vec![id(1), id(2), id(3)],
        ]);
        let engine = CommandEngine::new(bus);

        let report = scan_repeatedly(&engine, 10, 10, Some(&Expected::Count(3)));
        assert_eq!(report.ids(), vec![id(1), id(2), id(3)]);
        assert_eq!(report.scans, 3);
        assert!(report.is_complete());

        let bus = engine.into_inner();
        assert_eq!(bus.searches, 3);
        assert_eq!(bus.delays, vec![10, 10]);
    }

    #[test]
    fn test_missing_count_reported() {
        let bus = SearchBus::new(vec![vec![id(1)], vec![id(1)], vec![id(2)], vec![]]);
        let engine = CommandEngine::new(bus);

        let report = scan_repeatedly(&engine, 4, 10, Some(&Expected::Count(4)));
        assert_eq!(report.found.len(), 2);
        assert_eq!(report.scans, 4);
        assert_eq!(report.shortfall, Some(Shortfall::Count(2)));
    }

    #[test]
    fn test_missing_ids_reported() {
        let expected = Expected::Ids([id(1), id(2), id(3)].into_iter().collect());
        let bus = SearchBus::new(vec![vec![id(3)], vec![id(1)]]);
        let engine = CommandEngine::new(bus);

        let report = scan_repeatedly(&engine, 3, 0, Some(&expected));
        assert_eq!(report.shortfall, Some(Shortfall::Ids(vec![id(2)])));
    }

    #[test]
    fn test_extra_peripheral_does_not_hide_missing_id() {
        let expected = Expected::Ids([id(1), id(2), id(5)].into_iter().collect());
        let passes = vec![vec![id(1), id(2), id(3)]; 3];
        let engine = CommandEngine::new(SearchBus::new(passes));

        let report = scan_repeatedly(&engine, 3, 0, Some(&expected));
        assert_eq!(report.scans, 3);
        assert_eq!(report.shortfall, Some(Shortfall::Ids(vec![id(5)])));

        let config = DiscoveryConfig {
            iterations: 3,
            wait_ms: 0,
            strict: true,
            expected: Some(expected),
        };
        let engine = CommandEngine::new(SearchBus::new(vec![vec![id(1), id(2), id(3)]; 3]));
        assert_eq!(
            discover(&engine, &config),
            Err(Error::DeviceMissing { missing: 1 })
        );
    }

    #[test]
    fn test_ids_stop_once_all_seen() {
        let expected = Expected::Ids([id(1), id(2)].into_iter().collect());
        let bus = SearchBus::new(vec![vec![id(1), id(4)], vec![id(2)], vec![id(3)]]);
        let engine = CommandEngine::new(bus);

        let report = scan_repeatedly(&engine, 5, 0, Some(&expected));
        assert_eq!(report.scans, 2);
        assert!(report.is_complete());
        assert_eq!(report.ids(), vec![id(1), id(2), id(4)]);
    }

    #[test]
    fn test_no_expectation_runs_all_passes() {
        let bus = SearchBus::new(vec![vec![id(1)], vec![id(1)], vec![id(1)], vec![id(1)]]);
        let engine = CommandEngine::new(bus);

        let report = scan_repeatedly(&engine, 4, 10, None);
        assert_eq!(report.scans, 4);
        assert_eq!(report.found.len(), 1);
        assert!(report.is_complete());
    }

    #[test]
    fn test_failed_pass_is_tolerated() {
        let mut bus = SearchBus::new(vec![vec![id(1)], vec![id(2)], vec![id(3)]]);
        bus.fail_pass = Some(1);
        let engine = CommandEngine::new(bus);

        let report = scan_repeatedly(&engine, 3, 10, Some(&Expected::Count(2)));
        assert_eq!(report.ids(), vec![id(1), id(3)]);
        assert_eq!(report.scans, 3);
    }

    #[test]
    fn test_strict_mode_fails_on_shortfall() {
        let config = DiscoveryConfig {
            iterations: 2,
            wait_ms: 0,
            strict: true,
            expected: Some(Expected::Count(3)),
        };
        let engine = CommandEngine::new(SearchBus::new(vec![vec![id(1)], vec![id(2)]]));
        assert_eq!(
            discover(&engine, &config),
            Err(Error::DeviceMissing { missing: 1 })
        );

        let lenient = DiscoveryConfig {
            strict: false,
            ..config
        };
        let engine = CommandEngine::new(SearchBus::new(vec![vec![id(1)], vec![id(2)]]));
        let report = discover(&engine, &lenient).unwrap();
        assert_eq!(report.shortfall, Some(Shortfall::Count(1)));
    }

    #[test]
    fn test_converges_on_rotating_subsets() {
        // Each pass sees a different subset; the union covers all five
        let all: Vec<PeripheralId> = (1..=5).map(id).collect();
        let passes = (0..6)
            .map(|pass| {
                all.iter()
                    .enumerate()
                    .filter(|(i, _)| (i + pass) % 3 != 0)
                    .map(|(_, id)| *id)
                    .collect()
            })
            .collect();
        let engine = CommandEngine::new(SearchBus::new(passes));

        let report = scan_repeatedly(&engine, 6, 10, Some(&Expected::Count(5)));
        assert_eq!(report.ids(), all);
        assert!(report.scans <= 3);
        assert!(report.is_complete());
    }
}
