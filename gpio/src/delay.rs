//! Blocking delays used for protocol timing.

use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// A blocking delay with microsecond granularity.
///
/// Implementations must wait *at least* the requested time. Overshooting is fine, since every
/// delay the LCD driver asks for is a minimum settle time.
pub trait Delay: Debug {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// [Delay] backed by [std::thread::sleep].
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64));
    }
}
