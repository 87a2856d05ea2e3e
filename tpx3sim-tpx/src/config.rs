//! Acquisition configuration.
//!
//! JSON schema (every field optional, missing fields take the defaults):
//!
//! ```json
//! {
//!   "acquisition": {
//!     "mode": 0,
//!     "clock": { "system_clock_hz": 40e6, "fine_clock_hz": 640e6, "epoch": 0.0 },
//!     "geometry": { "width": 256, "height": 256 }
//!   }
//! }
//! ```

use crate::acceptance::HitAcceptance;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tpx3sim_core::{ChipGeometry, ClockConfig, OperatingMode, TimeConverter};

/// Everything the encoder and decoder need to agree on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Pixel matrix dimensions.
    pub geometry: ChipGeometry,
    /// System and fine clocks.
    pub clock: ClockConfig,
    /// Operating mode of the pixel matrix.
    pub mode: OperatingMode,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    acquisition: JsonAcquisition,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonAcquisition {
    mode: Option<u8>,
    clock: JsonClock,
    geometry: JsonGeometry,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonClock {
    system_clock_hz: f64,
    fine_clock_hz: f64,
    epoch: f64,
}

impl Default for JsonClock {
    fn default() -> Self {
        let clock = ClockConfig::default();
        Self {
            system_clock_hz: clock.system_clock_hz,
            fine_clock_hz: clock.fine_clock_hz,
            epoch: clock.epoch,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonGeometry {
    width: u16,
    height: u16,
}

impl Default for JsonGeometry {
    fn default() -> Self {
        let geometry = ChipGeometry::default();
        Self {
            width: geometry.width,
            height: geometry.height,
        }
    }
}

impl AcquisitionConfig {
    /// Sets the operating mode.
    #[must_use]
    pub fn with_mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the clock configuration.
    #[must_use]
    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the chip geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: ChipGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON or
    /// describes an invalid acquisition.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let json_config: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
        Self::from_json_config(json_config)
    }

    /// Loads a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid JSON or describes an
    /// invalid acquisition.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonConfig) -> Result<Self> {
        let acquisition = config.acquisition;

        let mode = match acquisition.mode {
            Some(code) => OperatingMode::from_code(code)?,
            None => OperatingMode::default(),
        };

        let config = Self {
            geometry: ChipGeometry {
                width: acquisition.geometry.width,
                height: acquisition.geometry.height,
            },
            clock: ClockConfig {
                system_clock_hz: acquisition.clock.system_clock_hz,
                fine_clock_hz: acquisition.clock.fine_clock_hz,
                epoch: acquisition.clock.epoch,
            },
            mode,
        };

        // validated once here, never per hit
        config.validate()?;
        Ok(config)
    }

    /// Checks clocks and geometry.
    ///
    /// # Errors
    /// Returns [`Error::CoreError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.clock.validate()?;
        Ok(())
    }

    /// Time converter for this acquisition's clocks.
    #[must_use]
    pub fn converter(&self) -> TimeConverter {
        TimeConverter::new(self.clock)
    }

    /// Hit acceptance for this acquisition's clocks and mode.
    #[must_use]
    pub fn acceptance(&self) -> HitAcceptance {
        HitAcceptance::new(self.converter(), self.mode)
    }

    /// Serializes the configuration in the loadable JSON schema.
    ///
    /// # Errors
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let value = serde_json::json!({
            "acquisition": {
                "mode": self.mode.code(),
                "clock": {
                    "system_clock_hz": self.clock.system_clock_hz,
                    "fine_clock_hz": self.clock.fine_clock_hz,
                    "epoch": self.clock.epoch,
                },
                "geometry": {
                    "width": self.geometry.width,
                    "height": self.geometry.height,
                },
            }
        });
        serde_json::to_string_pretty(&value).map_err(Error::from)
    }
}
