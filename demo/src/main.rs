mod config;

use crate::config::Config;
use charlcd_gpio::GpioDriver;
use charlcd_gpio::delay::{Delay, ThreadDelay};
use charlcd_gpio::gpiod::GpiodDriver;
use charlcd_gpio::lcd::hd44780::driver::GpioHD44780Driver;
use charlcd_gpio::lcd::hd44780::{CharLcd, Font, Geometry, PinAssignment};
use charlcd_gpio::mock::MockGpioDriver;
use dotenv::dotenv;
use log::{debug, info};
use std::env::var;
use std::fmt::Write;
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;
use time::OffsetDateTime;

const UNKNOWN_STR: &str = "???";

/// Custom character code of the clock glyph.
const CLOCK_GLYPH: u8 = 0;
const CLOCK_PATTERN: [u8; 8] = [
    0b00000, 0b01110, 0b10101, 0b10111, 0b10001, 0b01110, 0b00000, 0b00000,
];

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!("Architecture {}", System::cpu_arch());

    debug!("Trying to load config...");
    let config = Config::load()?;
    info!("{:?}", config);

    let assignment = config.assignment();
    let geometry = config.geometry()?;
    let font = config.font();

    if var("CHARLCD_BACKEND").is_ok_and(|backend| backend == "mock") {
        info!("Dry run on the mock backend");
        let gpio = MockGpioDriver::new(config.line_count());
        run(&gpio, &assignment, geometry, font, gpio.delay(), Some(1))?;
        info!(
            "Recorded {} events, {} µs of delays",
            gpio.event_count(),
            gpio.total_delay_us()
        );
    } else {
        debug!("Initializing GPIO driver...");
        let gpio = GpiodDriver::open(&config.chip)?;
        debug!("{:?} initialized.", gpio);
        run(&gpio, &assignment, geometry, font, ThreadDelay, None)?;
    }

    Ok(())
}

/// Shows the host name and a clock. Runs forever if `frames` is `None`.
fn run<G: GpioDriver, D: Delay>(
    gpio: &G,
    assignment: &PinAssignment,
    geometry: Geometry,
    font: Font,
    delay: D,
    frames: Option<usize>,
) -> eyre::Result<()> {
    debug!("Initializing LCD driver...");
    let driver = GpioHD44780Driver::new(gpio, assignment, delay)?;
    let mut lcd = CharLcd::new(driver, geometry).with_font(font)?;
    lcd.init()?;
    lcd.set_backlight(true)?;
    lcd.create_char(CLOCK_GLYPH, &CLOCK_PATTERN)?;
    debug!("{:?} initialized.", lcd);

    let clock_row = geometry.rows() - 1;
    if clock_row > 0 {
        let host_name = System::host_name().unwrap_or_else(|| UNKNOWN_STR.to_string());
        lcd.write_line(&host_name, 0)?;
    }

    let mut frame = 0;
    loop {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

        lcd.position(0, clock_row)?;
        lcd.write_char(CLOCK_GLYPH)?;
        write!(lcd, " {:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())?;

        frame += 1;
        if frames.is_some_and(|frames| frame >= frames) {
            break;
        }
        sleep(Duration::from_millis(200));
    }

    Ok(())
}
