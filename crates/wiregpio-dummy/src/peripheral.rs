//! Emulated peripheral firmware

use alloc::vec;
use alloc::vec::Vec;

use wiregpio_core::frame::crc8;
use wiregpio_core::protocol::{
    Command, PinMode, PIN_COUNT_OFFSET, SCRATCHPAD_LEN, SUCCESS, SUCCESS_CRC, VALUE_OFFSET,
};
use wiregpio_core::PeripheralId;

/// Firmware version reported by default
pub const DEFAULT_VERSION: u16 = 100;

/// One emulated remote GPIO peripheral
///
/// Requests are copied into a 9-byte scratchpad: command code at offset 0,
/// payload and request checksum after it. Responses are either the 2-byte
/// acknowledgment or the scratchpad with a fresh checksum, so request
/// bytes show through in value responses just like on real hardware.
#[derive(Debug, Clone)]
pub struct DummyPeripheral {
    id: PeripheralId,
    version: u16,
    scratchpad: [u8; SCRATCHPAD_LEN],
    modes: Vec<PinMode>,
    levels: Vec<u16>,
    inputs: Vec<Option<u16>>,
    duty: Vec<u16>,
    adc: Vec<u16>,
}

impl DummyPeripheral {
    /// Create a peripheral with the given pin counts
    pub fn new(id: PeripheralId, digital_pins: u8, analog_pins: u8) -> Self {
        let digital = digital_pins as usize;
        Self {
            id,
            version: DEFAULT_VERSION,
            scratchpad: [0; SCRATCHPAD_LEN],
            modes: vec![PinMode::Input; digital],
            levels: vec![0; digital],
            inputs: vec![None; digital],
            duty: vec![0; digital],
            adc: vec![0; analog_pins as usize],
        }
    }

    /// Report a different firmware version
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Identifier of this peripheral
    pub fn id(&self) -> PeripheralId {
        self.id
    }

    /// Number of digital pins
    pub fn digital_pins(&self) -> u8 {
        self.levels.len() as u8
    }

    /// Number of analog inputs
    pub fn analog_pins(&self) -> u8 {
        self.adc.len() as u8
    }

    /// Current mode of a digital pin
    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.modes.get(pin as usize).copied()
    }

    /// Level last driven on a digital pin
    pub fn level(&self, pin: u8) -> Option<u16> {
        self.levels.get(pin as usize).copied()
    }

    /// PWM duty last written to a pin
    pub fn duty(&self, pin: u8) -> Option<u16> {
        self.duty.get(pin as usize).copied()
    }

    /// Raw scratchpad contents
    pub fn scratchpad(&self) -> &[u8; SCRATCHPAD_LEN] {
        &self.scratchpad
    }

    /// Apply an external level to a pin
    ///
    /// Reads of a pin that is not an output return this level instead of
    /// the last driven one.
    pub fn set_input(&mut self, pin: u8, level: bool) {
        if let Some(slot) = self.inputs.get_mut(pin as usize) {
            *slot = Some(level as u16);
        }
    }

    /// Set the conversion result of an analog input
    pub fn set_adc(&mut self, channel: u8, value: u16) {
        if let Some(slot) = self.adc.get_mut(channel as usize) {
            *slot = value;
        }
    }

    /// Set every analog input to the same conversion result
    pub fn fill_adc(&mut self, value: u16) {
        self.adc.iter_mut().for_each(|v| *v = value);
    }

    /// Handle one request frame, returning the response bytes if any
    ///
    /// Frames with an unknown command, a short payload or a bad checksum
    /// get no response.
    pub fn handle(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let (&code, rest) = frame.split_first()?;
        let Some(command) = Command::from_code(code) else {
            log::debug!("{}: unknown command 0x{:02X}", self.id, code);
            return None;
        };
        let len = command.payload_len();
        if rest.len() < len + 1 {
            log::debug!("{}: short frame for {}", self.id, command.name());
            return None;
        }

        self.scratchpad[0] = code;
        self.scratchpad[1..len + 2].copy_from_slice(&rest[..len + 1]);
        if crc8(&self.scratchpad[..len + 2]) != 0 {
            log::debug!("{}: checksum mismatch on {}", self.id, command.name());
            return None;
        }

        let pin = self.scratchpad[1];
        let value = u16::from_be_bytes([self.scratchpad[2], self.scratchpad[3]]);
        match command {
            Command::WriteScratchpad => Some(ack()),
            Command::ReadScratchpad => Some(self.image()),
            Command::PinMode => {
                let mode = PinMode::from_byte(self.scratchpad[2]);
                if let Some(slot) = self.modes.get_mut(pin as usize) {
                    *slot = mode;
                }
                Some(ack())
            }
            Command::DigitalRead => {
                let level = self.read_level(pin);
                self.set_value(level);
                Some(self.image())
            }
            Command::DigitalWrite => {
                if let Some(slot) = self.levels.get_mut(pin as usize) {
                    *slot = (value != 0) as u16;
                }
                Some(ack())
            }
            Command::AnalogRead => {
                let reading = self.adc.get(pin as usize).copied().unwrap_or(0);
                self.set_value(reading);
                Some(self.image())
            }
            Command::AnalogWrite => {
                if let Some(slot) = self.duty.get_mut(pin as usize) {
                    *slot = value;
                }
                Some(ack())
            }
            Command::DigitalPins => {
                self.scratchpad[PIN_COUNT_OFFSET] = self.digital_pins();
                Some(self.image())
            }
            Command::AnalogPins => {
                self.scratchpad[PIN_COUNT_OFFSET] = self.analog_pins();
                Some(self.image())
            }
            Command::ReadVersion => {
                self.set_value(self.version);
                Some(self.image())
            }
        }
    }

    fn read_level(&self, pin: u8) -> u16 {
        let pin = pin as usize;
        match (self.modes.get(pin), self.inputs.get(pin)) {
            (Some(PinMode::Output), _) | (_, Some(None)) => {
                self.levels.get(pin).copied().unwrap_or(0)
            }
            (_, Some(Some(level))) => *level,
            (_, None) => 0,
        }
    }

    fn set_value(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.scratchpad[VALUE_OFFSET] = lo;
        self.scratchpad[VALUE_OFFSET + 1] = hi;
    }

    fn image(&mut self) -> Vec<u8> {
        self.scratchpad[SCRATCHPAD_LEN - 1] = crc8(&self.scratchpad[..SCRATCHPAD_LEN - 1]);
        self.scratchpad.to_vec()
    }
}

fn ack() -> Vec<u8> {
    vec![SUCCESS, SUCCESS_CRC]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiregpio_core::frame::encode;
    use wiregpio_core::protocol::{CMD_DIGITAL_PINS, CMD_READ_SCRATCHPAD, FAMILY_CODE};

    fn dev() -> DummyPeripheral {
        DummyPeripheral::new(PeripheralId::from_parts(FAMILY_CODE, [0, 0, 0, 0, 0, 1]), 14, 6)
    }

    fn request(dev: &mut DummyPeripheral, cmd: Command, payload: &[u8]) -> Option<Vec<u8>> {
        let frame = encode(cmd.code(), payload).unwrap();
        dev.handle(&frame)
    }

    #[test]
    fn test_pin_count_response() {
        let mut d = dev();
        let r = request(&mut d, Command::DigitalPins, &[]).unwrap();
        assert_eq!(r.len(), 9);
        assert_eq!(r[0], CMD_DIGITAL_PINS);
        assert_eq!(r[3], 14);
        assert_eq!(crc8(&r), 0);
    }

    #[test]
    fn test_version_value() {
        let mut d = dev().with_version(0x0203);
        let r = request(&mut d, Command::ReadVersion, &[]).unwrap();
        assert_eq!(&r[4..6], &[0x03, 0x02]);
    }

    #[test]
    fn test_bad_checksum_is_silent() {
        let mut d = dev();
        let mut frame = encode(Command::PinMode.code(), &[3, 1]).unwrap();
        frame[3] ^= 0x01;
        assert_eq!(d.handle(&frame), None);
        assert_eq!(d.mode(3), Some(PinMode::Input));
    }

    #[test]
    fn test_unknown_and_short_frames() {
        let mut d = dev();
        assert_eq!(d.handle(&[0x99, crc8(&[0x99])]), None);
        assert_eq!(d.handle(&[Command::DigitalWrite.code(), 13]), None);
        assert_eq!(d.handle(&[]), None);
    }

    #[test]
    fn test_digital_write_then_read() {
        let mut d = dev();
        request(&mut d, Command::PinMode, &[13, 1]).unwrap();
        assert_eq!(request(&mut d, Command::DigitalWrite, &[13, 0, 1]), Some(ack()));
        assert_eq!(d.level(13), Some(1));

        let r = request(&mut d, Command::DigitalRead, &[13]).unwrap();
        assert_eq!(r[4], 1);

        d.set_input(13, false);
        request(&mut d, Command::PinMode, &[13, 0]).unwrap();
        let r = request(&mut d, Command::DigitalRead, &[13]).unwrap();
        assert_eq!(r[4], 0);
    }

    #[test]
    fn test_analog_write_keeps_full_duty() {
        let mut d = dev();
        request(&mut d, Command::AnalogWrite, &[9, 0x01, 0x00]).unwrap();
        assert_eq!(d.duty(9), Some(256));
    }

    #[test]
    fn test_scratchpad_shows_request_bytes() {
        let mut d = dev();
        let data = [0, 10, 20, 30, 40, 50, 60];
        assert_eq!(request(&mut d, Command::WriteScratchpad, &data), Some(ack()));

        // The read request's own checksum lands at offset 1
        let r = request(&mut d, Command::ReadScratchpad, &[]).unwrap();
        assert_eq!(r[0], CMD_READ_SCRATCHPAD);
        assert_eq!(r[1], crc8(&[CMD_READ_SCRATCHPAD]));
        assert_eq!(&r[2..8], &data[1..]);
        assert_eq!(crc8(&r), 0);
    }
}
