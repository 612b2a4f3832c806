//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`].  The flight preset supplies every value; an
//! optional JSON object on disk overrides individual fields by name.  A
//! missing file means "no overrides".  An unreadable or invalid file, or a
//! result that fails [`SystemConfig::validate`], is a startup error.

use std::path::{Path, PathBuf};

use log::info;
use serde_json::Value;

use crate::app::ports::ConfigPort;
use crate::config::{FlightPreset, SystemConfig};
use crate::error::{Error, Result};

pub struct JsonConfigFile {
    path: PathBuf,
    preset: FlightPreset,
}

impl JsonConfigFile {
    pub fn new(path: impl AsRef<Path>, preset: FlightPreset) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            preset,
        }
    }

    /// Apply the fields of `json` on top of the preset.
    pub fn parse(json: &str, preset: FlightPreset) -> Result<SystemConfig> {
        let overrides: Value =
            serde_json::from_str(json).map_err(|_| Error::Config("config file is not valid JSON"))?;
        let Value::Object(overrides) = overrides else {
            return Err(Error::Config("config file must hold a JSON object"));
        };

        let mut merged = serde_json::to_value(SystemConfig::for_preset(preset))
            .map_err(|_| Error::Config("config serialisation"))?;
        let Value::Object(fields) = &mut merged else {
            return Err(Error::Config("config serialisation"));
        };
        for (key, value) in overrides {
            if !fields.contains_key(&key) {
                log::warn!("Config: unknown field '{}' ignored", key);
                continue;
            }
            fields.insert(key, value);
        }

        let config: SystemConfig = serde_json::from_value(merged)
            .map_err(|_| Error::Config("config field has the wrong type"))?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                info!("Config: overrides from {}", self.path.display());
                Self::parse(&text, self.preset)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config: {:?} preset defaults", self.preset);
                let config = SystemConfig::for_preset(self.preset);
                config.validate()?;
                Ok(config)
            }
            Err(_) => Err(Error::Io("config file read")),
        }
    }
}
