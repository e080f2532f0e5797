use crate::lcd::hd44780::driver::{CursorDirection, HD44780Driver};
use crate::lcd::hd44780::{
    ConfigurationError, Font, Geometry, HD44780Error, HD44780Result, InvalidPattern, OutOfRange,
};
use log::{debug, info, trace, warn};
use std::fmt;

/// Number of custom characters the CGRAM holds.
pub const CGRAM_SLOTS: u8 = 8;
/// Rows of a 5x8 custom character.
pub const PATTERN_ROWS: usize = 8;

/// Progress of [CharLcd::init].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum InitPhase {
    /// Nothing was sent yet.
    #[default]
    Unpowered,
    /// Synchronizing the data length, see [HD44780Driver::reset].
    ResetSequence,
    /// Setting the data length, line count and font.
    FunctionSet,
    /// Display off, cleared, entry mode set.
    DisplayConfigured,
    /// Display on, ready for use.
    Ready,
}

/// What the driver believes the controller is doing.
///
/// The display can't be read back, so this is kept in sync by every operation of [CharLcd].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ControllerState {
    pub initialized: bool,
    pub display_on: bool,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
    pub backlight_on: bool,
    pub entry_increment: bool,
    pub entry_shift: bool,
    /// Column of the cursor. Equals the column count when the cursor is right past the end of
    /// the row, after the row was filled.
    pub current_col: usize,
    pub current_row: usize,
    /// Net number of characters the display was shifted by, positive to the right.
    pub display_offset: isize,
}

impl ControllerState {
    /// The state right after initialization. The backlight is not a part of the controller.
    fn ready(backlight_on: bool) -> Self {
        ControllerState {
            initialized: true,
            display_on: true,
            cursor_visible: false,
            cursor_blink: false,
            backlight_on,
            entry_increment: true,
            entry_shift: false,
            current_col: 0,
            current_row: 0,
            display_offset: 0,
        }
    }
}

/// A character LCD driven by an HD44780 controller.
///
/// Owns the [driver](HD44780Driver) exclusively. Every operation except [CharLcd::init] fails with
/// [HD44780Error::NotInitialized] until the first successful initialization, without touching the
/// pins. Arguments are validated before anything is sent.
///
/// # Text
///
/// Text is never wrapped. Characters past the last column of the row are dropped, and the methods
/// writing text return the count of characters actually written. Every character is sent as the
/// low byte of its code point, so ASCII maps to the ROM directly, and `'\u{0}'..='\u{7}'` are the
/// custom characters.
///
/// # Custom characters
///
/// Custom characters live in the CGRAM, which is lost on power-down. The driver doesn't remember
/// them, so they have to be created again after every [CharLcd::init].
#[derive(Debug)]
pub struct CharLcd<D: HD44780Driver> {
    driver: D,
    geometry: Geometry,
    font: Font,
    phase: InitPhase,
    state: ControllerState,
}

impl<D: HD44780Driver> CharLcd<D> {
    pub fn new(driver: D, geometry: Geometry) -> Self {
        CharLcd {
            driver,
            geometry,
            font: Font::default(),
            phase: InitPhase::default(),
            state: ControllerState::default(),
        }
    }

    /// Selects the font used on initialization.
    ///
    /// # Errors
    /// - [ConfigurationError::UnsupportedFont] for [Font::Dots5x10] on a multi-row display.
    pub fn with_font(mut self, font: Font) -> HD44780Result<Self> {
        if font == Font::Dots5x10 && self.geometry.two_line() {
            return Err(ConfigurationError::UnsupportedFont.into());
        }
        self.font = font;
        Ok(self)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn font(&self) -> Font {
        self.font
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn init_phase(&self) -> InitPhase {
        self.phase
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Gives the driver back, releasing the display.
    pub fn release(self) -> D {
        self.driver
    }

    fn enter(&mut self, phase: InitPhase) {
        debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn ensure_initialized(&self) -> HD44780Result<()> {
        if !self.state.initialized {
            return Err(HD44780Error::NotInitialized);
        }
        Ok(())
    }

    /// Initializes the controller from scratch, whatever state it is in.
    ///
    /// Runs the [reset sequence](HD44780Driver::reset), sets the data length, line count and
    /// font, then turns the display off, clears it, sets the entry mode to increment without
    /// shift, and turns the display back on with the cursor hidden.
    ///
    /// Can be called again at any time to recover a garbled display. If it fails halfway, the
    /// display stays uninitialized.
    pub fn init(&mut self) -> HD44780Result<()> {
        self.state.initialized = false;

        self.enter(InitPhase::ResetSequence);
        self.driver.reset()?;

        self.enter(InitPhase::FunctionSet);
        let mode = self.driver.transfer_mode();
        self.driver
            .function_set(mode, self.geometry.two_line(), self.font)?;

        self.driver.set_display_control(false, false, false)?;
        self.driver.clear_display()?;
        self.driver.set_entry_mode(CursorDirection::Right, false)?;
        self.enter(InitPhase::DisplayConfigured);

        self.driver.set_display_control(true, false, false)?;
        self.enter(InitPhase::Ready);

        self.state = ControllerState::ready(self.state.backlight_on);
        info!(
            "{}x{} display initialized in {:?} mode",
            self.geometry.cols(),
            self.geometry.rows(),
            mode
        );
        Ok(())
    }

    /// Clears the display, moves the cursor to (0, 0) and undoes the display shift.
    pub fn clear(&mut self) -> HD44780Result<()> {
        self.ensure_initialized()?;
        self.driver.clear_display()?;
        self.state.current_col = 0;
        self.state.current_row = 0;
        self.state.display_offset = 0;
        Ok(())
    }

    /// Moves the cursor to (0, 0) and undoes the display shift, keeping the content.
    pub fn home(&mut self) -> HD44780Result<()> {
        self.ensure_initialized()?;
        self.driver.return_home()?;
        self.state.current_col = 0;
        self.state.current_row = 0;
        self.state.display_offset = 0;
        Ok(())
    }

    /// Moves the cursor to the given column and row.
    ///
    /// # Errors
    /// - [OutOfRange::Position] if the position is not on the display.
    pub fn position(&mut self, col: usize, row: usize) -> HD44780Result<()> {
        self.ensure_initialized()?;
        let address = self.geometry.ddram_address(col, row)?;
        self.driver.set_ddram_address(address)?;
        self.state.current_col = col;
        self.state.current_row = row;
        Ok(())
    }

    /// Writes text at the cursor. Returns the count of characters written.
    pub fn write(&mut self, text: &str) -> HD44780Result<usize> {
        self.ensure_initialized()?;
        self.put(text)
    }

    /// Moves the cursor to the given position and writes text there. Returns the count of
    /// characters written.
    ///
    /// # Errors
    /// - [OutOfRange::Position] if the position is not on the display.
    pub fn write_at(&mut self, text: &str, col: usize, row: usize) -> HD44780Result<usize> {
        self.position(col, row)?;
        self.put(text)
    }

    /// Replaces the whole row with the text, padding it with spaces. Leaves the cursor right after
    /// the text. Returns the count of characters of `text` written.
    pub fn write_line(&mut self, text: &str, row: usize) -> HD44780Result<usize> {
        self.position(0, row)?;
        let written = self.put(text)?;

        let padding = self.geometry.cols() - written;
        if padding > 0 {
            for _ in 0..padding {
                self.driver.send_data(b' ')?;
            }
            self.restore_cursor(written, row)?;
        }

        Ok(written)
    }

    /// Writes a raw character code at the cursor: `0..=7` for the custom characters, anything else
    /// for the ROM. Returns whether it was written, see the [truncation policy](CharLcd#text).
    pub fn write_char(&mut self, code: u8) -> HD44780Result<bool> {
        self.ensure_initialized()?;
        if self.state.current_col >= self.geometry.cols() {
            trace!("Dropping {:#04x} past the end of row {}", code, self.state.current_row);
            return Ok(false);
        }
        self.driver.send_data(code)?;
        self.state.current_col += 1;
        Ok(true)
    }

    fn put(&mut self, text: &str) -> HD44780Result<usize> {
        let available = self.geometry.cols().saturating_sub(self.state.current_col);
        let mut written = 0;

        for c in text.chars() {
            if written == available {
                debug!(
                    "Truncated {:?} after {} characters at row {}",
                    text, written, self.state.current_row
                );
                break;
            }
            self.driver.send_data(Self::char_code(c))?;
            self.state.current_col += 1;
            written += 1;
        }

        Ok(written)
    }

    fn char_code(c: char) -> u8 {
        let code = c as u32;
        if code > 0xFF {
            warn!("Character {:?} is not in the ROM, sending its low byte", c);
        }
        code as u8
    }

    /// Points the address counter back to the DDRAM at the given cursor.
    fn restore_cursor(&mut self, col: usize, row: usize) -> HD44780Result<()> {
        let address = self.geometry.cursor_address(col, row);
        self.driver.set_ddram_address(address)?;
        self.state.current_col = col;
        self.state.current_row = row;
        Ok(())
    }

    /// Turns the display on or off. The content, cursor and backlight stay as they are.
    pub fn display_on_off(&mut self, on: bool) -> HD44780Result<()> {
        self.ensure_initialized()?;
        self.driver
            .set_display_control(on, self.state.cursor_visible, self.state.cursor_blink)?;
        self.state.display_on = on;
        Ok(())
    }

    /// Shows or hides the underline cursor, and sets whether the cursor cell blinks.
    pub fn set_cursor(&mut self, visible: bool, blink: bool) -> HD44780Result<()> {
        self.ensure_initialized()?;
        self.driver
            .set_display_control(self.state.display_on, visible, blink)?;
        self.state.cursor_visible = visible;
        self.state.cursor_blink = blink;
        Ok(())
    }

    /// Switches the backlight line directly, outside of the instruction set.
    ///
    /// Does nothing, apart from a warning, if no backlight line is wired.
    pub fn set_backlight(&mut self, on: bool) -> HD44780Result<()> {
        self.ensure_initialized()?;
        if !self.driver.supports_backlight() {
            warn!("No backlight line, ignoring backlight {}", if on { "on" } else { "off" });
            return Ok(());
        }
        self.driver.set_backlight(on)?;
        self.state.backlight_on = on;
        Ok(())
    }

    /// Defines the custom character with code `slot`.
    ///
    /// Each byte of `pattern` is a row, top first, with the 5 dots in the low bits, the leftmost
    /// dot being bit 4. Afterwards the cursor is pointed back to where it was, so the following
    /// text lands on the display and not in the CGRAM.
    ///
    /// # Errors
    /// - [OutOfRange::CgramSlot] if `slot` is not in `0..=7`.
    /// - [InvalidPattern::Length] if `pattern` doesn't have exactly 8 rows.
    /// - [InvalidPattern::Byte] if any row has bits above the 5th set.
    pub fn create_char(&mut self, slot: u8, pattern: &[u8]) -> HD44780Result<()> {
        self.ensure_initialized()?;

        if slot >= CGRAM_SLOTS {
            return Err(OutOfRange::CgramSlot(slot).into());
        }
        if pattern.len() != PATTERN_ROWS {
            return Err(InvalidPattern::Length(pattern.len()).into());
        }
        if let Some((index, &value)) = pattern.iter().enumerate().find(|&(_, &row)| row > 0b11111) {
            return Err(InvalidPattern::Byte { index, value }.into());
        }

        debug!("Creating custom character {}: {:02x?}", slot, pattern);
        self.driver.set_cgram_address(slot * PATTERN_ROWS as u8)?;
        for &row in pattern {
            self.driver.send_data(row)?;
        }

        self.restore_cursor(self.state.current_col, self.state.current_row)
    }

    /// Shifts the whole display window by one character. The DDRAM and the cursor address stay,
    /// and consecutive shifts add up until [CharLcd::home] or [CharLcd::clear].
    pub fn display_shift(&mut self, direction: CursorDirection) -> HD44780Result<()> {
        self.ensure_initialized()?;
        self.driver.cursor_shift(true, direction)?;
        self.state.display_offset += match direction {
            CursorDirection::Left => -1,
            CursorDirection::Right => 1,
        };
        Ok(())
    }

    /// Sends a raw instruction.
    ///
    /// The driver doesn't decode it, so the [state](Self::state) is not updated. Prefer the
    /// dedicated methods.
    pub fn command(&mut self, command: u8) -> HD44780Result<()> {
        self.ensure_initialized()?;
        self.driver.send_command(command)?;
        Ok(())
    }
}

impl<D: HD44780Driver> fmt::Write for CharLcd<D> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s).map(|_| ()).map_err(|_| fmt::Error)
    }
}
