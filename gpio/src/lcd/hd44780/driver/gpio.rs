use crate::delay::Delay;
use crate::lcd::hd44780::driver::{
    execution_time_us, HD44780Driver, DATA_WRITE_US, SHORT_EXECUTION_US,
};
use crate::lcd::hd44780::{HD44780Pins, HD44780Result, PinAssignment, TransferMode};
use crate::{GpioDriver, GpioResult};
use log::{debug, trace};

/// Time for the supply to settle after power-on, before the controller accepts instructions.
const POWER_ON_DELAY_MS: u32 = 100;
/// Settle times after each of the three synchronization function sets, in microseconds.
const SYNC_DELAYS_US: [u32; 3] = [4100, 100, 100];

/// GPIO driver for the HD44780 controller, using a 4-bit or an 8-bit parallel bus.
///
/// The E pin is pulsed for 1 µs and then the driver waits the worst-case execution time of the
/// instruction, as the busy flag is never read.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, D: Delay> {
    pins: HD44780Pins<'a>,
    delay: D,
}

impl<'a, D: Delay> GpioHD44780Driver<'a, D> {
    /// Requests the lines from the assignment and creates the driver.
    ///
    /// The transfer mode follows from the number of data lines. See [HD44780Pins::new] for the
    /// possible errors.
    pub fn new<G: GpioDriver>(
        gpio: &'a G,
        assignment: &PinAssignment,
        delay: D,
    ) -> HD44780Result<Self> {
        let pins = HD44780Pins::new(gpio, assignment)?;
        Ok(Self::from_pins(pins, delay))
    }

    pub fn from_pins(pins: HD44780Pins<'a>, delay: D) -> Self {
        GpioHD44780Driver { pins, delay }
    }

    pub fn pins(&self) -> &HD44780Pins<'a> {
        &self.pins
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        // Set RS pin, and RW pin to write
        self.pins.set_control(rs, false)?;

        match self.pins.transfer_mode() {
            TransferMode::EightBit => {
                self.pins.transfer(data, &mut self.delay)?;
            }
            TransferMode::FourBit => {
                let high_nibble = (data >> 4) & 0x0F;
                let low_nibble = data & 0x0F;
                self.pins.transfer(high_nibble, &mut self.delay)?;
                self.pins.transfer(low_nibble, &mut self.delay)?;
            }
        }

        Ok(())
    }
}

impl<D: Delay> HD44780Driver for GpioHD44780Driver<'_, D> {
    fn transfer_mode(&self) -> TransferMode {
        self.pins.transfer_mode()
    }

    /// Synchronizes with the controller, whatever mode it was left in.
    ///
    /// Sends the `0011` function set three times, each as a single transfer. Whether the
    /// controller was in the 8-bit mode, or in the 4-bit mode expecting either nibble, this
    /// leaves it in the 8-bit mode. If the bus is 4-bit wide, a single `0010` switches it to the
    /// 4-bit mode, and every byte after that is sent as two nibbles.
    fn reset(&mut self) -> GpioResult<()> {
        let mode = self.pins.transfer_mode();
        debug!("Synchronizing the controller in {:?} mode", mode);

        self.pins.idle()?;
        self.pins.set_control(false, false)?;
        self.delay.delay_ms(POWER_ON_DELAY_MS);

        // Only D7..D4 are sampled, the rest is don't care
        let sync = match mode {
            TransferMode::EightBit => 0b00110000,
            TransferMode::FourBit => 0b0011,
        };
        for settle in SYNC_DELAYS_US {
            self.pins.transfer(sync, &mut self.delay)?;
            self.delay.delay_us(settle);
        }

        if mode.is_4bit() {
            self.pins.transfer(0b0010, &mut self.delay)?;
            self.delay.delay_us(SHORT_EXECUTION_US);
        }

        Ok(())
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)?;
        self.delay.delay_us(execution_time_us(command));
        Ok(())
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, true)?;
        self.delay.delay_us(DATA_WRITE_US);
        Ok(())
    }

    fn supports_backlight(&self) -> bool {
        self.pins.has_backlight()
    }

    fn set_backlight(&mut self, on: bool) -> GpioResult<()> {
        self.pins.set_backlight(on)
    }
}
