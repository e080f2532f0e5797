//! HD44780 character LCD module.
//!
//! The driver is split in two layers:
//! - the **pin interface** ([HD44780Pins]), which owns the RS, E, optional RW, data and optional
//!   backlight lines, and knows how to latch a nibble or a byte into the controller,
//! - the **protocol engine**, made of the instruction-level [driver::HD44780Driver] trait (with its
//!   GPIO implementation, [driver::GpioHD44780Driver]) and the character-level [CharLcd] on top of it.
//!
//! The driver is write-only. It never polls the busy flag, and waits the worst-case execution time
//! of every instruction instead, so it works with the RW pin tied to GND.
//!
//! Every operation blocks until the controller is done with it. Nothing here is safe to share
//! between threads without an external lock, as a transfer spans several pin writes.
//!
//! # Sources
//!
//! - Hitachi, [“HD44780U (LCD-II) Dot Matrix Liquid Crystal Display Controller/Driver,”](https://www.sparkfun.com/datasheets/LCD/HD44780.pdf)
//!   ADE-207-272(Z), 1998.
pub mod driver;
mod display;
mod geometry;
mod pins;
#[cfg(test)]
mod testing;

use crate::GpioError;
pub use display::*;
pub use geometry::*;
pub use pins::*;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum HD44780Error {
    /// The pins or the geometry can't describe a working display. Nothing was constructed.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    /// An operation was attempted before [CharLcd::init] succeeded.
    #[error("the display is not initialized")]
    NotInitialized,
    #[error("out of range: {0}")]
    OutOfRange(#[from] OutOfRange),
    #[error("invalid custom character: {0}")]
    InvalidPattern(#[from] InvalidPattern),
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
}

pub type HD44780Result<T> = Result<T, HD44780Error>;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum ConfigurationError {
    #[error("expected 4 or 8 data lines, got {0}")]
    DataLineCount(usize),
    #[error("pin {0} is assigned more than once")]
    DuplicatePin(usize),
    #[error("unsupported geometry: {cols} columns, {rows} rows")]
    InvalidGeometry { cols: usize, rows: usize },
    #[error("row {row} does not fit in the DDRAM")]
    RowOffsetOverflow { row: usize },
    #[error("the 5x10 font is only available on single-row displays")]
    UnsupportedFont,
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum OutOfRange {
    #[error("position ({col}, {row}) is out of bounds for a {cols}x{rows} display")]
    Position {
        col: usize,
        row: usize,
        cols: usize,
        rows: usize,
    },
    #[error("CGRAM slot {0} is not in 0-7")]
    CgramSlot(u8),
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum InvalidPattern {
    #[error("expected 8 rows, got {0}")]
    Length(usize),
    #[error("row {index} ({value:#010b}) is wider than 5 dots")]
    Byte { index: usize, value: u8 },
}
