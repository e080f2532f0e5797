//! In-memory GPIO backend that records every line change and delay.
//!
//! Useful for tests and for running the LCD driver without hardware. All handles share the
//! event log of the [MockGpioDriver] that created them, so the order of pin writes and delays is
//! preserved exactly.
use crate::delay::Delay;
use crate::{GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};

/// A single recorded action.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MockEvent {
    /// A line was driven to the given level.
    Write { pin: usize, level: bool },
    /// The caller blocked for the given amount of microseconds.
    Delay { us: u32 },
}

pub struct MockGpioDriver {
    lines: usize,
    used_pins: RefCell<BitVec>,
    events: RefCell<Vec<MockEvent>>,
}

impl MockGpioDriver {
    /// Creates a mock chip with `lines` output lines.
    pub fn new(lines: usize) -> Self {
        Self {
            lines,
            used_pins: RefCell::new(BitVec::repeat(false, lines)),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Creates a [Delay] that records into this driver's event log instead of sleeping.
    pub fn delay(&self) -> MockDelay<'_> {
        MockDelay { driver: self }
    }

    /// Gets a copy of all the events recorded so far.
    pub fn events(&self) -> Vec<MockEvent> {
        self.events.borrow().clone()
    }

    /// Gets the amount of events recorded so far.
    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    /// Forgets all the recorded events. Line levels are forgotten as well.
    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Gets the last level written to the given pin, if any.
    pub fn level(&self, pin: usize) -> Option<bool> {
        self.events.borrow().iter().rev().find_map(|event| match *event {
            MockEvent::Write { pin: p, level } if p == pin => Some(level),
            _ => None,
        })
    }

    /// Counts the low-to-high transitions on the given pin.
    pub fn rising_edges(&self, pin: usize) -> usize {
        let mut level = false;
        let mut edges = 0;
        for event in self.events.borrow().iter() {
            if let MockEvent::Write { pin: p, level: new } = *event {
                if p == pin {
                    if new && !level {
                        edges += 1;
                    }
                    level = new;
                }
            }
        }
        edges
    }

    /// Sums all the recorded delays, in microseconds.
    pub fn total_delay_us(&self) -> u64 {
        self.events
            .borrow()
            .iter()
            .map(|event| match *event {
                MockEvent::Delay { us } => us as u64,
                _ => 0,
            })
            .sum()
    }

    fn reserve(&self, indices: &[usize]) -> GpioResult<()> {
        if indices.iter().any(|&index| index >= self.lines) {
            return Err(GpioError::InvalidArgument);
        }

        let mut used = self.used_pins.borrow_mut();
        if indices.iter().any(|&index| used[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in indices {
            used.set(index, true);
        }

        Ok(())
    }

    fn release(&self, indices: &[usize]) {
        let mut used = self.used_pins.borrow_mut();
        for &index in indices {
            used.set(index, false);
        }
    }

    fn record(&self, event: MockEvent) {
        trace!("{:?}", event);
        self.events.borrow_mut().push(event);
    }
}

impl Debug for MockGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpioDriver({})", self.lines)
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.lines)
    }

    fn get_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.reserve(&[index])?;
        Ok(Box::new(MockOutput {
            driver: self,
            pin_index: index,
        }))
    }

    fn get_output_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let mut sorted = indices;
        sorted.sort_unstable();
        if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(GpioError::InvalidArgument);
        }

        self.reserve(&indices)?;
        Ok(Box::new(MockBusOutput {
            driver: self,
            pin_indices: indices,
        }))
    }
}

struct MockOutput<'a> {
    driver: &'a MockGpioDriver,
    pin_index: usize,
}

impl Debug for MockOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for MockOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.record(MockEvent::Write {
            pin: self.pin_index,
            level: value,
        });
        Ok(())
    }
}

impl Drop for MockOutput<'_> {
    fn drop(&mut self) {
        self.driver.release(&[self.pin_index]);
    }
}

struct MockBusOutput<'a, const N: usize> {
    driver: &'a MockGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for MockBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}[output]", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBusOutput<N> for MockBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&pin, &level) in self.pin_indices.iter().zip(values) {
            self.driver.record(MockEvent::Write { pin, level });
        }
        Ok(())
    }
}

impl<const N: usize> Drop for MockBusOutput<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.pin_indices);
    }
}

/// [Delay] that records [MockEvent::Delay] instead of sleeping.
pub struct MockDelay<'a> {
    driver: &'a MockGpioDriver,
}

impl Debug for MockDelay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[delay]", self.driver)
    }
}

impl Delay for MockDelay<'_> {
    fn delay_us(&mut self, us: u32) {
        self.driver.record(MockEvent::Delay { us });
    }
}
