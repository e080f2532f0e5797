//! Helpers for observing the driver at the pin level.

use crate::lcd::hd44780::driver::GpioHD44780Driver;
use crate::lcd::hd44780::{CharLcd, Geometry, PinAssignment, TransferMode};
use crate::mock::{MockDelay, MockEvent, MockGpioDriver};

pub const LINES: usize = 20;
pub const PIN_RS: usize = 0;
pub const PIN_E: usize = 1;
pub const PIN_RW: usize = 2;
pub const PIN_BACKLIGHT: usize = 3;
pub const PINS_4BIT: [usize; 4] = [4, 5, 6, 7];
pub const PINS_8BIT: [usize; 8] = [8, 9, 10, 11, 12, 13, 14, 15];

pub type MockLcd<'a> = CharLcd<GpioHD44780Driver<'a, MockDelay<'a>>>;

pub fn assignment_4bit() -> PinAssignment {
    PinAssignment::new(PIN_RS, PIN_E, PINS_4BIT)
}

pub fn assignment_8bit() -> PinAssignment {
    PinAssignment::new(PIN_RS, PIN_E, PINS_8BIT)
}

pub fn lcd<'a>(
    gpio: &'a MockGpioDriver,
    assignment: &PinAssignment,
    cols: usize,
    rows: usize,
) -> MockLcd<'a> {
    let driver = GpioHD44780Driver::new(gpio, assignment, gpio.delay()).unwrap();
    CharLcd::new(driver, Geometry::new(cols, rows).unwrap())
}

/// Same as [lcd], but already initialized and with the event log cleared.
pub fn ready_lcd<'a>(
    gpio: &'a MockGpioDriver,
    assignment: &PinAssignment,
    cols: usize,
    rows: usize,
) -> MockLcd<'a> {
    let mut lcd = lcd(gpio, assignment, cols, rows);
    lcd.init().unwrap();
    gpio.clear_events();
    lcd
}

/// The state of RS and the data lines, as seen by the controller on a falling edge of E.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Latch {
    pub rs: bool,
    pub bits: u8,
}

pub fn latches(gpio: &MockGpioDriver, assignment: &PinAssignment) -> Vec<Latch> {
    let mut levels = vec![false; LINES];
    let mut latched = Vec::new();

    for event in gpio.events() {
        if let MockEvent::Write { pin, level } = event {
            if pin == assignment.e && levels[pin] && !level {
                let bits = assignment
                    .data
                    .iter()
                    .enumerate()
                    .filter(|&(_, &data_pin)| levels[data_pin])
                    .fold(0u8, |bits, (i, _)| bits | 1 << i);
                latched.push(Latch {
                    rs: levels[assignment.rs],
                    bits,
                });
            }
            levels[pin] = level;
        }
    }

    latched
}

/// Joins latches into `(rs, byte)` pairs. In the 4-bit mode, every two latches form one byte.
pub fn bytes(latches: &[Latch], mode: TransferMode) -> Vec<(bool, u8)> {
    match mode {
        TransferMode::EightBit => latches.iter().map(|l| (l.rs, l.bits)).collect(),
        TransferMode::FourBit => latches
            .chunks(2)
            .map(|pair| {
                assert_eq!(pair.len(), 2, "dangling nibble");
                assert_eq!(pair[0].rs, pair[1].rs, "RS changed between nibbles");
                (pair[0].rs, pair[0].bits << 4 | pair[1].bits)
            })
            .collect(),
    }
}

/// Instruction bytes (RS low) and data bytes (RS high) sent since the log was last cleared.
pub fn sent(gpio: &MockGpioDriver, assignment: &PinAssignment) -> Vec<(bool, u8)> {
    let mode = assignment.validate().unwrap();
    bytes(&latches(gpio, assignment), mode)
}

pub fn commands(gpio: &MockGpioDriver, assignment: &PinAssignment) -> Vec<u8> {
    sent(gpio, assignment)
        .into_iter()
        .filter(|&(rs, _)| !rs)
        .map(|(_, byte)| byte)
        .collect()
}

pub fn data(gpio: &MockGpioDriver, assignment: &PinAssignment) -> Vec<u8> {
    sent(gpio, assignment)
        .into_iter()
        .filter(|&(rs, _)| rs)
        .map(|(_, byte)| byte)
        .collect()
}
