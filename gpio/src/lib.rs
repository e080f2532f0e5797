//! GPIO abstraction and HD44780 character LCD driver.
//!
//! The [GpioDriver] family of traits is the only thing the [LCD driver](lcd::hd44780) needs from the
//! platform, together with a [Delay](delay::Delay). Two backends are provided: [gpiod] for the Linux
//! GPIO character device, and [mock], which records every line change for tests and dry runs.
pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A source of digital output lines.
///
/// Requesting a line configures it as an output and reserves it until the returned handle is
/// dropped. Requesting a line that is already reserved fails with [GpioError::AlreadyInUse].
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Configures the GPIO pin at the given index as an output.
    fn get_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Configures the GPIO pins at the specific indices as an output bus.
    ///
    /// The first index is the least significant bit of the bus.
    fn get_output_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
}

/// Specifies the active level of the GPIO pin.
///
/// By default, the active level is high.
///
/// Might be software-implemented.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the real state that will be outputted on the GPIO pin based on the active level and the value.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

/// Splits the low `N` bits of `value` into line levels, least significant bit first.
fn bits_lsb_first<const N: usize>(value: u8) -> [bool; N] {
    std::array::from_fn(|bit| (value >> bit) & 1 == 1)
}

impl dyn GpioBusOutput<8> + '_ {
    /// Drives D0..D7 to the bits of `value`.
    pub fn write_byte(&self, value: u8) -> GpioResult<()> {
        self.write(&bits_lsb_first(value))
    }
}

impl dyn GpioBusOutput<4> + '_ {
    /// Drives a 4-line bus to the bits of `value`.
    ///
    /// # Errors
    /// - [GpioError::InvalidArgument] if `value` doesn't fit in a nibble.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        if value > 0x0F {
            return Err(GpioError::InvalidArgument);
        }
        self.write(&bits_lsb_first(value))
    }
}
