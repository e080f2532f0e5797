//! Instruction-level interface of the HD44780 controller.
//!
//! [HD44780Driver] encodes the instruction set on top of two raw primitives,
//! [HD44780Driver::send_command] and [HD44780Driver::send_data], which are implemented by the
//! transport. [GpioHD44780Driver] is the parallel bus transport.

mod gpio;

use crate::lcd::hd44780::{Font, TransferMode};
use crate::{GpioError, GpioResult};
pub use gpio::*;
use std::fmt::Debug;

/// Execution time of the clear display and return home instructions, in microseconds.
pub const LONG_EXECUTION_US: u32 = 1520;
/// Execution time of every other instruction, in microseconds.
pub const SHORT_EXECUTION_US: u32 = 37;
/// Time to write a byte to DDRAM or CGRAM, in microseconds (37 µs plus 4 µs of address update).
pub const DATA_WRITE_US: u32 = 43;

/// Gets the minimum time the controller needs to execute the instruction, in microseconds.
///
/// These are the worst-case values for a 270 kHz oscillator.
pub fn execution_time_us(command: u8) -> u32 {
    // Clear display is `00000001`, return home is `0000001?`
    if command & 0b11111100 == 0 {
        LONG_EXECUTION_US
    } else {
        SHORT_EXECUTION_US
    }
}

pub trait HD44780Driver: Debug {
    /// Gets the width of the data bus.
    fn transfer_mode(&self) -> TransferMode;

    /// Brings the controller from an unknown state to a known data length.
    ///
    /// Afterwards the controller expects the final [Self::function_set].
    fn reset(&mut self) -> GpioResult<()>;

    /// Clears the display and sets the cursor to the home position.
    ///
    /// Command: `00000001`.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(0b00000001)
    }

    /// Sets the cursor to the home position and undoes any display shift.
    ///
    /// Command: `0000001?`.
    fn return_home(&mut self) -> GpioResult<()> {
        self.send_command(0b00000010)
    }

    /// Sets the direction the cursor moves after writing, and whether the display follows it.
    ///
    /// Command: `000001IS`.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> GpioResult<()> {
        let mut command = 0b00000100;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    ///
    /// Command: `00001DCB`.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> GpioResult<()> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Moves the cursor or shifts the display by one character, without touching the DDRAM.
    ///
    /// Command: `0001SR??`, where `S` selects the display and `R` the right direction.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> GpioResult<()> {
        let mut command = 0b00010000;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the data length, the number of lines and the font.
    ///
    /// Command: `001DNF??`.
    fn function_set(
        &mut self,
        data_length: TransferMode,
        two_lines: bool,
        font: Font,
    ) -> GpioResult<()> {
        let mut command = 0b00100000;
        if data_length.is_8bit() {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if font == Font::Dots5x10 {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the CGRAM address. Following data is written to the custom characters.
    ///
    /// Command: `01AAAAAA`.
    fn set_cgram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b00111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b01000000 | address;
        self.send_command(command)
    }

    /// Sets the DDRAM address. Following data is written to the display.
    ///
    /// Command: `1AAAAAAA`.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b10000000 | address;
        self.send_command(command)
    }

    /// Gets whether a backlight switch is wired.
    fn supports_backlight(&self) -> bool {
        false
    }

    /// Switches the backlight. It is not a part of the instruction set.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if there is no backlight switch.
    fn set_backlight(&mut self, _on: bool) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    // Low-level commands
    // These raw commands are used by the high-level functions above, and block until the
    // controller is done with the byte.

    /// Sends a command to the HD44780 controller.
    /// Sets the RS pin to 0 (command).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends data to the HD44780 controller.
    /// Sets the RS pin to 1 (data).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor, or the display, to the left.
    Left,
    /// Moves the cursor, or the display, to the right.
    Right,
}
