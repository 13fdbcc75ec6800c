//! Persistent settings of the explorer.
//!
//! Settings are stored with the `preferences` crate under `APP_INFO` and the key
//! `config/settings`. A missing or unreadable entry falls back to the defaults, which are then
//! written so the user has a file to edit.

use crate::error::{ExplorerError, ExplorerResult};
use crate::filters::response_removal::{output_order, PRE_FILT_KEYS};
use crate::merge::GapFill;
use crate::response::ResponseOutput;
use crate::spectrogram::SpectrogramParams;
use crate::APP_INFO;
use log::{error, info};
use preferences::Preferences;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const PREFS_KEY: &str = "config/settings";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// FDSN service short name or base URL.
    pub service: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Credentials for restricted data, sent as HTTP basic authentication.
    pub user: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    pub gap_fill: GapFill,
    pub freqmin: f64,
    pub freqmax: f64,
    pub corners: usize,
    pub zerophase: bool,
    /// Water level in dB, `None` to disable.
    pub water_level: Option<f64>,
    /// Pre-filter corners in Hz.
    pub pre_filt: Option<[f64; 4]>,
    pub output: ResponseOutput,
    pub spectrogram: SpectrogramParams,
    /// Plot size in pixels.
    pub plot_size: (u32, u32),
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            service: "RASPISHAKE".to_string(),
            timeout_secs: 120,
            user_agent: format!("seismo-explorer/{}", env!("CARGO_PKG_VERSION")),
            user: None,
            password: None,
            gap_fill: GapFill::Constant(0.0),
            freqmin: 1.0,
            freqmax: 20.0,
            corners: 4,
            zerophase: false,
            water_level: Some(60.0),
            pre_filt: Some([0.5, 1.0, 20.0, 25.0]),
            output: ResponseOutput::Velocity,
            spectrogram: SpectrogramParams::default(),
            plot_size: (1200, 800),
        }
    }
}

fn flag(value: bool) -> f64 {
    f64::from(u8::from(value))
}

impl Settings {
    /// Stored settings, or the defaults (which are then stored) when there are none.
    pub fn load_or_default() -> Settings {
        match Settings::load(&APP_INFO, PREFS_KEY) {
            Ok(settings) => {
                info!("loaded settings from {PREFS_KEY}");
                settings
            }
            Err(err) => {
                info!("no stored settings ({err}), using defaults");
                let settings = Settings::default();
                if let Err(err) = settings.store() {
                    error!("error in saving settings: {err}");
                }
                settings
            }
        }
    }

    pub fn store(&self) -> ExplorerResult<()> {
        self.save(&APP_INFO, PREFS_KEY)
            .map_err(|e| ExplorerError::Preferences(e.to_string()))
    }

    /// Parameters for the `Band Pass` filter.
    pub fn band_pass_parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("freqmin".to_string(), self.freqmin),
            ("freqmax".to_string(), self.freqmax),
            ("corners".to_string(), self.corners as f64),
            ("zerophase".to_string(), flag(self.zerophase)),
        ])
    }

    /// Parameters for the `Remove Response` filter.
    pub fn response_removal_parameters(&self) -> BTreeMap<String, f64> {
        let mut parameters = BTreeMap::from([
            ("output".to_string(), output_order(self.output)),
            ("water_level".to_string(), self.water_level.unwrap_or(-1.0)),
        ]);
        if let Some(corners) = self.pre_filt {
            for (key, value) in PRE_FILT_KEYS.iter().zip(corners) {
                parameters.insert(key.to_string(), value);
            }
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::build_filter;

    #[test]
    fn test_defaults_build_filters() {
        let settings = Settings::default();
        let band_pass = build_filter("Band Pass", &settings.band_pass_parameters()).unwrap();
        assert_eq!(band_pass.parameters()["freqmax"], 20.0);
        let removal =
            build_filter("Remove Response", &settings.response_removal_parameters()).unwrap();
        let parameters = removal.parameters();
        assert_eq!(parameters["output"], 1.0);
        assert_eq!(parameters["pre_filt_f4"], 25.0);
        assert_eq!(parameters["water_level"], 60.0);
    }

    #[test]
    fn test_disabled_water_level() {
        let settings = Settings {
            water_level: None,
            pre_filt: None,
            output: ResponseOutput::Displacement,
            ..Default::default()
        };
        let removal =
            build_filter("Remove Response", &settings.response_removal_parameters()).unwrap();
        let parameters = removal.parameters();
        assert_eq!(parameters["water_level"], -1.0);
        assert_eq!(parameters["output"], 0.0);
        assert!(!parameters.contains_key("pre_filt_f1"));
    }
}
