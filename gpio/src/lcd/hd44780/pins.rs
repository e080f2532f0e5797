use crate::delay::Delay;
use crate::lcd::hd44780::{ConfigurationError, HD44780Result};
use crate::{GpioActiveLevel, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use log::{debug, trace};

/// Minimum E pulse width is 450 ns, and the whole enable cycle is 1000 ns.
const ENABLE_PULSE_US: u32 = 1;

/// Width of the data bus between the host and the controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransferMode {
    /// D4..D7 are wired, every byte is sent as two nibbles, high nibble first.
    FourBit,
    /// D0..D7 are wired, every byte is sent at once.
    EightBit,
}

impl TransferMode {
    pub fn is_8bit(&self) -> bool {
        matches!(self, TransferMode::EightBit)
    }

    pub fn is_4bit(&self) -> bool {
        matches!(self, TransferMode::FourBit)
    }
}

/// GPIO line numbers the display is wired to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PinAssignment {
    /// Register select.
    pub rs: usize,
    /// Enable.
    pub e: usize,
    /// Read/write. `None` if the R/W pin of the display is tied to GND.
    pub rw: Option<usize>,
    /// Data lines, lowest first: D4..D7 for the 4-bit mode or D0..D7 for the 8-bit mode.
    pub data: Vec<usize>,
    /// Backlight switch. Not a part of the HD44780 interface, but often wired next to it.
    pub backlight: Option<usize>,
    /// Active level of the backlight switch.
    pub backlight_level: GpioActiveLevel,
}

impl PinAssignment {
    pub fn new(rs: usize, e: usize, data: impl Into<Vec<usize>>) -> Self {
        PinAssignment {
            rs,
            e,
            rw: None,
            data: data.into(),
            backlight: None,
            backlight_level: GpioActiveLevel::High,
        }
    }

    pub fn with_rw(mut self, rw: usize) -> Self {
        self.rw = Some(rw);
        self
    }

    pub fn with_backlight(mut self, backlight: usize, level: GpioActiveLevel) -> Self {
        self.backlight = Some(backlight);
        self.backlight_level = level;
        self
    }

    /// Checks the assignment and derives the transfer mode from the number of data lines.
    ///
    /// # Errors
    /// - [ConfigurationError::DataLineCount] if there are not exactly 4 or 8 data lines.
    /// - [ConfigurationError::DuplicatePin] if any line serves two roles.
    pub fn validate(&self) -> Result<TransferMode, ConfigurationError> {
        let mode = match self.data.len() {
            4 => TransferMode::FourBit,
            8 => TransferMode::EightBit,
            n => return Err(ConfigurationError::DataLineCount(n)),
        };

        let mut pins = vec![self.rs, self.e];
        pins.extend(self.rw);
        pins.extend(&self.data);
        pins.extend(self.backlight);

        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(ConfigurationError::DuplicatePin(*pin));
            }
        }

        Ok(mode)
    }
}

#[derive(Debug)]
enum DataBus<'a> {
    Bus8Bit(Box<dyn GpioBusOutput<8> + 'a>),
    Bus4Bit(Box<dyn GpioBusOutput<4> + 'a>),
}

/// The lines between the host and an HD44780 controller, exclusively owned for the lifetime of
/// the driver. The lines are released when this is dropped.
#[derive(Debug)]
pub struct HD44780Pins<'a> {
    pin_rs: Box<dyn GpioOutput + 'a>,
    pin_e: Box<dyn GpioOutput + 'a>,
    pin_rw: Option<Box<dyn GpioOutput + 'a>>,
    data_bus: DataBus<'a>,
    backlight: Option<(Box<dyn GpioOutput + 'a>, GpioActiveLevel)>,
}

impl<'a> HD44780Pins<'a> {
    /// Validates the assignment and requests all the lines as outputs.
    ///
    /// Validation happens before any line is requested, so an invalid assignment has no
    /// side effects on the GPIO driver.
    pub fn new<G: GpioDriver>(gpio: &'a G, assignment: &PinAssignment) -> HD44780Result<Self> {
        let mode = assignment.validate()?;
        debug!("Requesting {:?} LCD lines: {:?}", mode, assignment);

        let pin_rs = gpio.get_output(assignment.rs)?;
        let pin_e = gpio.get_output(assignment.e)?;
        let pin_rw = assignment
            .rw
            .map(|rw| gpio.get_output(rw))
            .transpose()?;

        let data_count = ConfigurationError::DataLineCount(assignment.data.len());
        let data_bus = match mode {
            TransferMode::FourBit => {
                let indices: [usize; 4] = assignment
                    .data
                    .as_slice()
                    .try_into()
                    .map_err(|_| data_count)?;
                DataBus::Bus4Bit(gpio.get_output_bus(indices)?)
            }
            TransferMode::EightBit => {
                let indices: [usize; 8] = assignment
                    .data
                    .as_slice()
                    .try_into()
                    .map_err(|_| data_count)?;
                DataBus::Bus8Bit(gpio.get_output_bus(indices)?)
            }
        };

        let backlight = assignment
            .backlight
            .map(|pin| gpio.get_output(pin))
            .transpose()?
            .map(|pin| (pin, assignment.backlight_level));

        Ok(HD44780Pins {
            pin_rs,
            pin_e,
            pin_rw,
            data_bus,
            backlight,
        })
    }

    pub fn transfer_mode(&self) -> TransferMode {
        match self.data_bus {
            DataBus::Bus8Bit(_) => TransferMode::EightBit,
            DataBus::Bus4Bit(_) => TransferMode::FourBit,
        }
    }

    pub fn has_rw(&self) -> bool {
        self.pin_rw.is_some()
    }

    pub fn has_backlight(&self) -> bool {
        self.backlight.is_some()
    }

    /// Sets the register select and read/write lines.
    ///
    /// # Errors
    /// - [GpioError::NotSupported] if `rw` is requested but the R/W line is not wired.
    pub fn set_control(&mut self, rs: bool, rw: bool) -> GpioResult<()> {
        if rw && self.pin_rw.is_none() {
            return Err(GpioError::NotSupported);
        }

        self.pin_rs.write(rs)?;
        if let Some(pin) = &self.pin_rw {
            pin.write(rw)?;
        }
        Ok(())
    }

    /// Drives E low, so the next [transfer](Self::transfer) starts from a known state.
    pub fn idle(&mut self) -> GpioResult<()> {
        self.pin_e.write(false)
    }

    /// Drives the data lines to `value` and latches it with a pulse on E.
    ///
    /// In the 4-bit mode `value` must be a nibble, otherwise [GpioError::InvalidArgument]
    /// is returned.
    pub fn transfer(&mut self, value: u8, delay: &mut impl Delay) -> GpioResult<()> {
        match &self.data_bus {
            DataBus::Bus8Bit(bus) => {
                trace!("Writing byte: {:08b}", value);
                bus.write_byte(value)?;
            }
            DataBus::Bus4Bit(bus) => {
                trace!("Writing nibble: {:04b}", value);
                bus.write_nibble(value)?;
            }
        }
        self.pulse_e(delay)
    }

    fn pulse_e(&self, delay: &mut impl Delay) -> GpioResult<()> {
        // Set E pin to high
        self.pin_e.write(true)?;
        delay.delay_us(ENABLE_PULSE_US);
        // Set E pin to low, the controller latches on this edge
        self.pin_e.write(false)?;
        delay.delay_us(ENABLE_PULSE_US);
        Ok(())
    }

    /// Switches the backlight on or off, honoring its active level.
    ///
    /// # Errors
    /// - [GpioError::NotSupported] if no backlight line was assigned.
    pub fn set_backlight(&mut self, on: bool) -> GpioResult<()> {
        match &self.backlight {
            Some((pin, level)) => pin.write(level.get_state(on)),
            None => Err(GpioError::NotSupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::testing::*;
    use crate::lcd::hd44780::HD44780Error;
    use crate::mock::{MockEvent, MockGpioDriver};

    #[test]
    fn test_transfer_mode_from_data_lines() {
        assert_eq!(assignment_4bit().validate(), Ok(TransferMode::FourBit));
        assert_eq!(assignment_8bit().validate(), Ok(TransferMode::EightBit));
    }

    #[test]
    fn test_rejects_data_line_count() {
        for data in [vec![], vec![4, 5, 6], vec![4, 5, 6, 7, 8], vec![4; 9]] {
            let n = data.len();
            let assignment = PinAssignment::new(PIN_RS, PIN_E, data);
            assert_eq!(
                assignment.validate(),
                Err(ConfigurationError::DataLineCount(n))
            );
        }
    }

    #[test]
    fn test_rejects_duplicate_pins() {
        let shared_data = PinAssignment::new(PIN_RS, PIN_E, [4, 5, 4, 7]);
        assert_eq!(
            shared_data.validate(),
            Err(ConfigurationError::DuplicatePin(4))
        );

        let shared_control = PinAssignment::new(PIN_RS, PIN_RS, [4, 5, 6, 7]);
        assert_eq!(
            shared_control.validate(),
            Err(ConfigurationError::DuplicatePin(PIN_RS))
        );

        let shared_rw = assignment_4bit().with_rw(PIN_E);
        assert_eq!(
            shared_rw.validate(),
            Err(ConfigurationError::DuplicatePin(PIN_E))
        );

        let shared_backlight = assignment_8bit().with_backlight(9, GpioActiveLevel::High);
        assert_eq!(
            shared_backlight.validate(),
            Err(ConfigurationError::DuplicatePin(9))
        );
    }

    #[test]
    fn test_invalid_assignment_requests_nothing() {
        let gpio = MockGpioDriver::new(LINES);
        let assignment = PinAssignment::new(PIN_RS, PIN_E, [4, 5, 6, 6]);

        let err = HD44780Pins::new(&gpio, &assignment).unwrap_err();
        assert_eq!(
            err,
            HD44780Error::Configuration(ConfigurationError::DuplicatePin(6))
        );

        // All the lines are still free
        let pins = HD44780Pins::new(&gpio, &assignment_4bit()).unwrap();
        assert_eq!(pins.transfer_mode(), TransferMode::FourBit);
        assert_eq!(gpio.event_count(), 0);
    }

    #[test]
    fn test_lines_are_owned() {
        let gpio = MockGpioDriver::new(LINES);
        let pins = HD44780Pins::new(&gpio, &assignment_4bit()).unwrap();

        assert_eq!(
            HD44780Pins::new(&gpio, &assignment_4bit()).unwrap_err(),
            HD44780Error::Gpio(GpioError::AlreadyInUse)
        );

        drop(pins);
        assert!(HD44780Pins::new(&gpio, &assignment_4bit()).is_ok());
    }

    #[test]
    fn test_4bit_transfer_is_one_pulse() {
        let gpio = MockGpioDriver::new(LINES);
        let mut delay = gpio.delay();
        let mut pins = HD44780Pins::new(&gpio, &assignment_4bit()).unwrap();

        pins.set_control(true, false).unwrap();
        pins.transfer(0b1010, &mut delay).unwrap();

        assert_eq!(gpio.rising_edges(PIN_E), 1);
        assert_eq!(gpio.level(PIN_E), Some(false));
        assert_eq!(
            latches(&gpio, &assignment_4bit()),
            vec![Latch { rs: true, bits: 0b1010 }]
        );
        assert_eq!(
            pins.transfer(0x10, &mut delay),
            Err(GpioError::InvalidArgument)
        );
    }

    #[test]
    fn test_8bit_transfer_is_one_pulse() {
        let gpio = MockGpioDriver::new(LINES);
        let mut delay = gpio.delay();
        let mut pins = HD44780Pins::new(&gpio, &assignment_8bit()).unwrap();

        pins.set_control(false, false).unwrap();
        pins.transfer(0b1100_0101, &mut delay).unwrap();

        assert_eq!(gpio.rising_edges(PIN_E), 1);
        assert_eq!(
            latches(&gpio, &assignment_8bit()),
            vec![Latch { rs: false, bits: 0b1100_0101 }]
        );
    }

    #[test]
    fn test_enable_pulse_is_held() {
        let gpio = MockGpioDriver::new(LINES);
        let mut delay = gpio.delay();
        let mut pins = HD44780Pins::new(&gpio, &assignment_8bit()).unwrap();

        pins.transfer(0xFF, &mut delay).unwrap();

        let events = gpio.events();
        let rise = events
            .iter()
            .position(|e| *e == MockEvent::Write { pin: PIN_E, level: true })
            .unwrap();
        assert!(matches!(events[rise + 1], MockEvent::Delay { us } if us >= 1));
        assert_eq!(events[rise + 2], MockEvent::Write { pin: PIN_E, level: false });
    }

    #[test]
    fn test_control_lines() {
        let gpio = MockGpioDriver::new(LINES);
        let mut pins = HD44780Pins::new(&gpio, &assignment_4bit()).unwrap();
        assert!(!pins.has_rw());
        assert_eq!(pins.set_control(false, true), Err(GpioError::NotSupported));
        assert_eq!(gpio.event_count(), 0);

        drop(pins);
        let mut pins = HD44780Pins::new(&gpio, &assignment_4bit().with_rw(PIN_RW)).unwrap();
        pins.set_control(true, false).unwrap();
        assert_eq!(gpio.level(PIN_RS), Some(true));
        assert_eq!(gpio.level(PIN_RW), Some(false));
    }

    #[test]
    fn test_backlight_active_level() {
        let gpio = MockGpioDriver::new(LINES);
        let assignment = assignment_4bit().with_backlight(PIN_BACKLIGHT, GpioActiveLevel::Low);
        let mut pins = HD44780Pins::new(&gpio, &assignment).unwrap();

        pins.set_backlight(true).unwrap();
        assert_eq!(gpio.level(PIN_BACKLIGHT), Some(false));
        pins.set_backlight(false).unwrap();
        assert_eq!(gpio.level(PIN_BACKLIGHT), Some(true));

        drop(pins);
        let mut pins = HD44780Pins::new(&gpio, &assignment_4bit()).unwrap();
        assert!(!pins.has_backlight());
        assert_eq!(pins.set_backlight(true), Err(GpioError::NotSupported));
    }
}
