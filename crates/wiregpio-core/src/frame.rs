//! Frame codec
//!
//! A frame is `[command, payload..., crc]` where `crc` is the Dallas/Maxim
//! CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected, init 0) of the bytes
//! before it. Running the CRC over a complete frame yields zero, which is
//! how both directions are validated.

use crate::error::{Error, Result};
use crate::protocol::{SCRATCHPAD_LEN, SCRATCH_DATA_LEN};

/// Largest request frame: command + scratchpad data + crc
pub const MAX_FRAME_LEN: usize = 1 + SCRATCH_DATA_LEN + 1;

/// Largest response frame
pub const MAX_RESPONSE_LEN: usize = SCRATCHPAD_LEN;

/// An encoded request frame
pub type Frame = heapless::Vec<u8, MAX_FRAME_LEN>;

/// Reflected form of the 0x31 polynomial
const POLY_REFLECTED: u8 = 0x8C;

const CRC_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x01 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Dallas/Maxim CRC-8 over `data`
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &b| CRC_TABLE[(crc ^ b) as usize])
}

/// Build a request frame for `command` carrying `payload`
///
/// Fails with `InvalidArgument` if the payload does not fit in a frame.
pub fn encode(command: u8, payload: &[u8]) -> Result<Frame> {
    let mut frame = Frame::new();
    frame
        .push(command)
        .map_err(|_| Error::InvalidArgument("frame too long"))?;
    frame
        .extend_from_slice(payload)
        .map_err(|_| Error::InvalidArgument("payload too long for a frame"))?;
    let crc = crc8(&frame);
    frame
        .push(crc)
        .map_err(|_| Error::InvalidArgument("payload too long for a frame"))?;
    Ok(frame)
}

/// Check that a received frame reduces to a zero CRC
///
/// The CRC of an empty buffer is zero, so `validate(&[])` holds. The
/// engine never reads an empty response.
pub fn validate(frame: &[u8]) -> bool {
    crc8(frame) == 0
}

/// Like [`validate`] but as a `Result`
pub fn check(frame: &[u8]) -> Result<()> {
    if validate(frame) {
        Ok(())
    } else {
        Err(Error::FrameCorrupt)
    }
}
