//! Peripheral facade
//!
//! [`Peripheral`] binds an identifier to a shared [`CommandEngine`] and
//! checks pin numbers against the counts the peripheral reported when it
//! was opened. Out-of-range pins are rejected before the bus is touched.
//!
//! [`DigitalPin`] and [`AnalogChannel`] are handles to a single pin. The
//! digital handle implements the `embedded-hal` 1.0 digital traits, so
//! remote pins can be passed to drivers written against embedded-hal.

use std::cell::OnceCell;
use std::fmt;

use crate::bus::OneWireBus;
use crate::engine::CommandEngine;
use crate::error::{Error, Result};
use crate::gpio;
use crate::protocol::{PinMode, ADC_MAX, SCRATCHPAD_LEN};
use crate::rom::PeripheralId;

/// Pin counts reported by a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralCapabilities {
    /// Number of digital pins
    pub digital_pins: u8,
    /// Number of analog inputs
    pub analog_pins: u8,
}

/// One remote GPIO peripheral on a shared bus
pub struct Peripheral<'e, B> {
    engine: &'e CommandEngine<B>,
    id: PeripheralId,
    caps: PeripheralCapabilities,
    version: OnceCell<u16>,
}

impl<'e, B: OneWireBus> Peripheral<'e, B> {
    /// Open a peripheral, querying its digital and analog pin counts
    pub fn new(engine: &'e CommandEngine<B>, id: PeripheralId) -> Result<Self> {
        let digital_pins = gpio::digital_pins(engine, &id)?;
        let analog_pins = gpio::analog_pins(engine, &id)?;
        log::debug!(
            "{}: {} digital pins, {} analog inputs",
            id,
            digital_pins,
            analog_pins
        );
        Ok(Self {
            engine,
            id,
            caps: PeripheralCapabilities {
                digital_pins,
                analog_pins,
            },
            version: OnceCell::new(),
        })
    }

    /// Identifier of this peripheral
    pub fn id(&self) -> PeripheralId {
        self.id
    }

    /// Number of digital pins
    pub fn digital_pins(&self) -> u8 {
        self.caps.digital_pins
    }

    /// Number of analog inputs
    pub fn analog_pins(&self) -> u8 {
        self.caps.analog_pins
    }

    /// Pin counts as reported when the peripheral was opened
    pub fn capabilities(&self) -> PeripheralCapabilities {
        self.caps
    }

    /// Firmware version, queried on first use
    pub fn version(&self) -> Result<u16> {
        if let Some(v) = self.version.get() {
            return Ok(*v);
        }
        let v = gpio::read_version(self.engine, &self.id)?;
        Ok(*self.version.get_or_init(|| v))
    }

    /// Set the mode of a digital pin
    pub fn pin_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        self.check_digital(pin)?;
        gpio::pin_mode(self.engine, &self.id, pin, mode)
    }

    /// Read a digital pin
    pub fn digital_read(&self, pin: u8) -> Result<u16> {
        self.check_digital(pin)?;
        gpio::digital_read(self.engine, &self.id, pin)
    }

    /// Drive a digital pin
    pub fn digital_write(&self, pin: u8, value: u16) -> Result<()> {
        self.check_digital(pin)?;
        gpio::digital_write(self.engine, &self.id, pin, value)
    }

    /// Read an analog input
    pub fn analog_read(&self, channel: u8) -> Result<u16> {
        self.check_analog(channel)?;
        gpio::analog_read(self.engine, &self.id, channel)
    }

    /// Set the PWM duty of a digital pin
    pub fn analog_write(&self, pin: u8, duty: u16) -> Result<()> {
        self.check_digital(pin)?;
        gpio::analog_write(self.engine, &self.id, pin, duty)
    }

    /// Write the 7 scratchpad data bytes
    pub fn write_scratchpad(&self, data: &[u8]) -> Result<()> {
        gpio::write_scratchpad(self.engine, &self.id, data)
    }

    /// Read the 9-byte scratchpad image
    pub fn read_scratchpad(&self) -> Result<[u8; SCRATCHPAD_LEN]> {
        gpio::read_scratchpad(self.engine, &self.id)
    }

    /// Configure `pin` and return a handle to it
    pub fn pin(&self, pin: u8, mode: PinMode) -> Result<DigitalPin<'_, 'e, B>> {
        self.pin_mode(pin, mode)?;
        Ok(DigitalPin {
            dev: self,
            pin,
            mode,
        })
    }

    /// Handle to analog input `channel`, scaled to `vcc` volts
    pub fn adc(&self, channel: u8, vcc: f32) -> Result<AnalogChannel<'_, 'e, B>> {
        self.check_analog(channel)?;
        Ok(AnalogChannel {
            dev: self,
            channel,
            vcc,
        })
    }

    fn check_digital(&self, pin: u8) -> Result<()> {
        check_range(pin, self.caps.digital_pins)
    }

    fn check_analog(&self, channel: u8) -> Result<()> {
        check_range(channel, self.caps.analog_pins)
    }
}

fn check_range(pin: u8, available: u8) -> Result<()> {
    if pin < available {
        Ok(())
    } else {
        Err(Error::PinOutOfRange { pin, available })
    }
}

impl<B> fmt::Display for Peripheral<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<B> fmt::Debug for Peripheral<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peripheral")
            .field("id", &self.id)
            .field("caps", &self.caps)
            .finish()
    }
}

/// A configured digital pin
pub struct DigitalPin<'p, 'e, B> {
    dev: &'p Peripheral<'e, B>,
    pin: u8,
    mode: PinMode,
}

impl<B: OneWireBus> DigitalPin<'_, '_, B> {
    /// Drive an initial value, for output pins
    pub fn with_value(self, value: u16) -> Result<Self> {
        self.set_value(value)?;
        Ok(self)
    }

    /// Pin number
    pub fn number(&self) -> u8 {
        self.pin
    }

    /// Mode the pin was last configured with
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Change the pin mode
    pub fn set_mode(&mut self, mode: PinMode) -> Result<()> {
        self.dev.pin_mode(self.pin, mode)?;
        self.mode = mode;
        Ok(())
    }

    /// Current level
    pub fn value(&self) -> Result<u16> {
        self.dev.digital_read(self.pin)
    }

    /// Drive the pin
    pub fn set_value(&self, value: u16) -> Result<()> {
        self.dev.digital_write(self.pin, value)
    }

    /// Drive the pin high
    pub fn on(&self) -> Result<()> {
        self.set_value(1)
    }

    /// Drive the pin low
    pub fn off(&self) -> Result<()> {
        self.set_value(0)
    }
}

impl<B> embedded_hal::digital::ErrorType for DigitalPin<'_, '_, B> {
    type Error = Error;
}

impl<B: OneWireBus> embedded_hal::digital::InputPin for DigitalPin<'_, '_, B> {
    fn is_high(&mut self) -> Result<bool> {
        Ok(self.value()? != 0)
    }

    fn is_low(&mut self) -> Result<bool> {
        Ok(self.value()? == 0)
    }
}

impl<B: OneWireBus> embedded_hal::digital::OutputPin for DigitalPin<'_, '_, B> {
    fn set_low(&mut self) -> Result<()> {
        self.off()
    }

    fn set_high(&mut self) -> Result<()> {
        self.on()
    }
}

// The peripheral reports the driven level when an output pin is read back
impl<B: OneWireBus> embedded_hal::digital::StatefulOutputPin for DigitalPin<'_, '_, B> {
    fn is_set_high(&mut self) -> Result<bool> {
        Ok(self.value()? != 0)
    }

    fn is_set_low(&mut self) -> Result<bool> {
        Ok(self.value()? == 0)
    }
}

/// An analog input scaled to a reference voltage
pub struct AnalogChannel<'p, 'e, B> {
    dev: &'p Peripheral<'e, B>,
    channel: u8,
    vcc: f32,
}

impl<B: OneWireBus> AnalogChannel<'_, '_, B> {
    /// Channel number
    pub fn number(&self) -> u8 {
        self.channel
    }

    /// Raw conversion result (0..=1023)
    pub fn read(&self) -> Result<u16> {
        self.dev.analog_read(self.channel)
    }

    /// Conversion result in volts
    pub fn read_voltage(&self) -> Result<f32> {
        Ok(self.read()? as f32 / ADC_MAX as f32 * self.vcc)
    }

    /// Voltage of a full-scale reading
    pub fn max_voltage(&self) -> f32 {
        self.vcc
    }
}
