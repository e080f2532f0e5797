use charlcd_gpio::GpioActiveLevel;
use charlcd_gpio::lcd::hd44780::{ConfigurationError, Font, Geometry, PinAssignment};
use dotenv::var;
use log::warn;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;

const DEFAULT_CHIP: &str = "/dev/gpiochip0";

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Config {
    #[serde(default = "default_chip")]
    pub chip: String,
    pub cols: usize,
    pub rows: usize,
    #[serde(default)]
    pub font: FontConfig,
    pub pins: PinConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum FontConfig {
    #[default]
    #[serde(rename = "5x8")]
    Dots5x8,
    #[serde(rename = "5x10")]
    Dots5x10,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct PinConfig {
    pub rs: usize,
    pub e: usize,
    #[serde(default)]
    pub rw: Option<usize>,
    /// D4..D7 or D0..D7, lowest first.
    pub data: Vec<usize>,
    #[serde(default)]
    pub backlight: Option<usize>,
    #[serde(default)]
    pub backlight_active_low: bool,
}

fn default_chip() -> String {
    DEFAULT_CHIP.to_string()
}

pub fn parse_pin_bus(pin_str: &str) -> eyre::Result<Vec<usize>> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?;

    match pins.len() {
        4 | 8 => Ok(pins),
        n => Err(eyre::eyre!("Invalid number of data pins: {}", n)),
    }
}

fn optional_pin(name: &str) -> eyre::Result<Option<usize>> {
    match var(name) {
        Ok(pin) if !pin.trim().is_empty() => Ok(Some(pin.trim().parse()?)),
        _ => Ok(None),
    }
}

impl Config {
    /// Loads the JSON file at `CONFIG_FILE` (`lcd.json` by default), falling back to the
    /// `CHARLCD_*` environment variables.
    pub fn load() -> eyre::Result<Self> {
        match Self::try_load() {
            Some(config) => Ok(config),
            None => Self::from_env(),
        }
    }

    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("lcd.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader)
                .inspect_err(|err| warn!("Ignoring {}: {}", config_path.display(), err))
                .ok()
        } else {
            None
        }
    }

    pub fn from_env() -> eyre::Result<Self> {
        let backlight_active_low = var("CHARLCD_BACKLIGHT_ACTIVE_LOW")
            .map(|value| matches!(value.trim(), "1" | "true" | "low"))
            .unwrap_or(false);

        Ok(Config {
            chip: var("CHARLCD_CHIP").unwrap_or_else(|_| default_chip()),
            cols: var("CHARLCD_COLS")?.parse()?,
            rows: var("CHARLCD_ROWS")?.parse()?,
            font: match var("CHARLCD_FONT").as_deref() {
                Ok("5x10") => FontConfig::Dots5x10,
                _ => FontConfig::Dots5x8,
            },
            pins: PinConfig {
                rs: var("CHARLCD_PIN_RS")?.parse()?,
                e: var("CHARLCD_PIN_E")?.parse()?,
                rw: optional_pin("CHARLCD_PIN_RW")?,
                data: parse_pin_bus(&var("CHARLCD_PINS_DATA")?)?,
                backlight: optional_pin("CHARLCD_PIN_BACKLIGHT")?,
                backlight_active_low,
            },
        })
    }

    pub fn assignment(&self) -> PinAssignment {
        let pins = &self.pins;
        let mut assignment = PinAssignment::new(pins.rs, pins.e, pins.data.clone());
        if let Some(rw) = pins.rw {
            assignment = assignment.with_rw(rw);
        }
        if let Some(backlight) = pins.backlight {
            let level = if pins.backlight_active_low {
                GpioActiveLevel::Low
            } else {
                GpioActiveLevel::High
            };
            assignment = assignment.with_backlight(backlight, level);
        }
        assignment
    }

    pub fn geometry(&self) -> Result<Geometry, ConfigurationError> {
        Geometry::new(self.cols, self.rows)
    }

    pub fn font(&self) -> Font {
        match self.font {
            FontConfig::Dots5x8 => Font::Dots5x8,
            FontConfig::Dots5x10 => Font::Dots5x10,
        }
    }

    /// Gets the highest line number in use, plus one.
    pub fn line_count(&self) -> usize {
        let pins = &self.pins;
        [pins.rs, pins.e]
            .into_iter()
            .chain(pins.rw)
            .chain(pins.data.iter().copied())
            .chain(pins.backlight)
            .max()
            .map_or(0, |pin| pin + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin_bus() {
        assert_eq!(parse_pin_bus("26, 16, 20, 21").unwrap(), vec![26, 16, 20, 21]);
        assert_eq!(parse_pin_bus("1;2;3;4 5 6 7 8").unwrap().len(), 8);
        assert!(parse_pin_bus("1,2,3").is_err());
        assert!(parse_pin_bus("1,2,3,x").is_err());
    }

    #[test]
    fn test_json_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "cols": 20,
                "rows": 4,
                "pins": { "rs": 22, "e": 17, "data": [26, 16, 20, 21], "backlight": 18, "backlight_active_low": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.chip, DEFAULT_CHIP);
        assert_eq!(config.font(), Font::Dots5x8);
        assert_eq!(config.geometry().unwrap(), Geometry::new(20, 4).unwrap());
        assert_eq!(
            config.assignment(),
            PinAssignment::new(22, 17, [26, 16, 20, 21])
                .with_backlight(18, GpioActiveLevel::Low)
        );
        assert_eq!(config.line_count(), 27);
    }

    #[test]
    fn test_json_font() {
        let config: Config = serde_json::from_str(
            r#"{ "cols": 16, "rows": 1, "font": "5x10", "pins": { "rs": 0, "e": 1, "rw": 2, "data": [3, 4, 5, 6] } }"#,
        )
        .unwrap();

        assert_eq!(config.font(), Font::Dots5x10);
        assert_eq!(config.assignment().rw, Some(2));
    }
}
