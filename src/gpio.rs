//! GPIO pin driver
//!
//! The GPIO sub-mode exposes one 8-pin bank. The driver caches the
//! direction and output masks so single-pin helpers can be built on the
//! whole-bank commands.

use crate::constants::*;
use crate::device::HydraBus;
use crate::error::{HydraBusError, Result};
use crate::frame::{Command, ResponseShape, Scope};
use crate::mode::BusKind;
use crate::transport::Transport;

/// GPIO bank bound to a session
pub struct Gpio<'a, T: Transport> {
    session: &'a mut HydraBus<T>,
    /// Bit set = pin is an output
    directions: u8,
    /// Last written output levels
    levels: u8,
}

const SCOPE: Scope = Scope::Bus(BusKind::Gpio);

impl<'a, T: Transport> Gpio<'a, T> {
    /// Bind GPIO mode on the session
    ///
    /// All pins start as inputs.
    pub(crate) fn bind(session: &'a mut HydraBus<T>) -> Result<Self> {
        session.enter_mode(BusKind::Gpio)?;
        Ok(Self {
            session,
            directions: 0,
            levels: 0,
        })
    }

    /// Set the whole direction mask at once (bit set = output)
    pub fn set_directions(&mut self, mask: u8) -> Result<()> {
        let cmd = Command::new(
            SCOPE,
            GPIO_CMD_SET_DIRECTION,
            vec![mask],
            ResponseShape::Status,
        );
        self.session.execute(&cmd)?;
        self.directions = mask;
        Ok(())
    }

    /// Configure one pin as input or output
    pub fn set_direction(&mut self, pin: u8, output: bool) -> Result<()> {
        let bit = pin_bit(pin)?;
        let mask = if output {
            self.directions | bit
        } else {
            self.directions & !bit
        };
        self.set_directions(mask)
    }

    /// Write the whole output-level mask at once
    pub fn write_pins(&mut self, levels: u8) -> Result<()> {
        let cmd = Command::new(SCOPE, GPIO_CMD_WRITE, vec![levels], ResponseShape::Status);
        self.session.execute(&cmd)?;
        self.levels = levels;
        Ok(())
    }

    /// Drive one output pin high or low
    pub fn set_pin(&mut self, pin: u8, level: bool) -> Result<()> {
        let bit = pin_bit(pin)?;
        if self.directions & bit == 0 {
            return Err(HydraBusError::InvalidParameter(format!(
                "pin {} is not configured as an output",
                pin
            )));
        }
        let levels = if level {
            self.levels | bit
        } else {
            self.levels & !bit
        };
        self.write_pins(levels)
    }

    /// Read the level of all pins
    pub fn read_pins(&mut self) -> Result<u8> {
        let cmd = Command::new(SCOPE, GPIO_CMD_READ, vec![], ResponseShape::StatusThen(1));
        let payload = self.session.execute(&cmd)?;
        Ok(payload[0])
    }

    /// Read the level of one pin
    pub fn get_pin(&mut self, pin: u8) -> Result<bool> {
        let bit = pin_bit(pin)?;
        Ok(self.read_pins()? & bit != 0)
    }

    /// Exit GPIO mode back to the binary bridge
    pub fn exit(self) -> Result<()> {
        self.session.exit_mode()
    }
}

fn pin_bit(pin: u8) -> Result<u8> {
    if pin >= GPIO_PIN_COUNT {
        return Err(HydraBusError::InvalidParameter(format!(
            "pin {} out of range (0..{})",
            pin, GPIO_PIN_COUNT
        )));
    }
    Ok(1 << pin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn gpio_session(mock: &MockTransport) -> HydraBus<MockTransport> {
        let mut hb = HydraBus::new(mock.clone());
        hb.connect().unwrap();
        mock.push_response(b"BBIO1");
        hb.enter_binary().unwrap();
        mock.push_response(b"PIN1");
        hb
    }

    #[test]
    fn test_pin_range_is_validated_locally() {
        let mock = MockTransport::new();
        let mut hb = gpio_session(&mock);
        let mut gpio = hb.gpio().unwrap();
        let writes_before = mock.writes().len();

        assert!(matches!(
            gpio.set_direction(8, true),
            Err(HydraBusError::InvalidParameter(_))
        ));
        assert!(matches!(
            gpio.get_pin(200),
            Err(HydraBusError::InvalidParameter(_))
        ));
        assert_eq!(mock.writes().len(), writes_before);
    }

    #[test]
    fn test_set_pin_requires_output_direction() {
        let mock = MockTransport::new();
        let mut hb = gpio_session(&mock);
        let mut gpio = hb.gpio().unwrap();

        assert!(matches!(
            gpio.set_pin(2, true),
            Err(HydraBusError::InvalidParameter(_))
        ));

        mock.push_response(&[STATUS_OK]);
        gpio.set_direction(2, true).unwrap();
        mock.push_response(&[STATUS_OK]);
        gpio.set_pin(2, true).unwrap();

        let writes = mock.writes();
        let n = writes.len();
        assert_eq!(writes[n - 2], vec![GPIO_CMD_SET_DIRECTION, 0b0000_0100]);
        assert_eq!(writes[n - 1], vec![GPIO_CMD_WRITE, 0b0000_0100]);
    }

    #[test]
    fn test_get_pin_masks_read_value() {
        let mock = MockTransport::new();
        let mut hb = gpio_session(&mock);
        let mut gpio = hb.gpio().unwrap();

        mock.push_response(&[STATUS_OK, 0b1010_0010]);
        assert!(gpio.get_pin(1).unwrap());
        mock.push_response(&[STATUS_OK, 0b1010_0010]);
        assert!(!gpio.get_pin(2).unwrap());
    }
}
