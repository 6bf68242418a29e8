//! Peripheral identifiers (1-Wire ROM codes)
//!
//! A ROM code is 8 bytes: family code, 6-byte serial, CRC-8 of the first
//! seven bytes. The canonical string form is 16 uppercase hex digits with
//! no separators, e.g. `C4000000000001FA`.

use crate::error::{Error, Result};
use crate::frame::crc8;
use crate::protocol::FAMILY_CODE;
use core::fmt;
use core::str::FromStr;

/// Length of a ROM code in bytes
pub const ROM_LEN: usize = 8;

/// Unique 8-byte address of one peripheral
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralId([u8; ROM_LEN]);

impl PeripheralId {
    /// Wrap raw ROM bytes as read from the bus (not validated)
    pub const fn new(bytes: [u8; ROM_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a well-formed identifier from a family code and serial number
    pub fn from_parts(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [0u8; ROM_LEN];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = crc8(&bytes[..7]);
        Self(bytes)
    }

    /// Parse raw bytes from a slice, which must be exactly 8 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; ROM_LEN] = bytes.try_into().map_err(|_| Error::InvalidId)?;
        Ok(Self(bytes))
    }

    /// Raw ROM bytes
    pub const fn as_bytes(&self) -> &[u8; ROM_LEN] {
        &self.0
    }

    /// Family code (first byte)
    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    /// Whether the trailing CRC byte matches the first seven bytes
    pub fn is_crc_valid(&self) -> bool {
        crc8(&self.0) == 0
    }

    /// Whether this is an intact remote GPIO peripheral identifier
    pub fn is_remote_gpio(&self) -> bool {
        self.family() == FAMILY_CODE && self.is_crc_valid()
    }
}

impl From<[u8; ROM_LEN]> for PeripheralId {
    fn from(bytes: [u8; ROM_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<PeripheralId> for [u8; ROM_LEN] {
    fn from(id: PeripheralId) -> Self {
        id.0
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeripheralId({})", self)
    }
}

impl FromStr for PeripheralId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != ROM_LEN * 2 || !s.is_ascii() {
            return Err(Error::InvalidId);
        }
        let mut bytes = [0u8; ROM_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| Error::InvalidId)?;
        }
        Ok(Self(bytes))
    }
}

#[cfg(feature = "std")]
impl serde::Serialize for PeripheralId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "std")]
impl<'de> serde::Deserialize<'de> for PeripheralId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Self, D::Error> {
        let s = std::string::String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid peripheral identifier: {}", s)))
    }
}
