use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    filter::FilterSettings,
    types::{FINGER_COUNT, Finger},
};

/// Thresholds are in the tracking runtime's distance unit, measured from the
/// wrist (extended / closed) or from the thumb tip (pinched).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub filter: FilterSettings,
    pub extended_thresholds: [f32; FINGER_COUNT],
    pub closed_thresholds: [f32; FINGER_COUNT],
    /// Index, middle, ring, little. The thumb pinches against these.
    pub pinched_thresholds: [f32; FINGER_COUNT - 1],
    pub tracking_poll_interval_secs: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            filter: FilterSettings::default(),
            extended_thresholds: [13.0, 14.0, 14.0, 14.0, 13.0],
            closed_thresholds: [11.5, 11.0, 11.0, 11.0, 11.0],
            pinched_thresholds: [1.1, 1.3, 1.3, 1.3],
            tracking_poll_interval_secs: 1.0,
        }
    }
}

impl GestureSettings {
    pub fn extended_threshold(&self, finger: Finger) -> f32 {
        self.extended_thresholds[finger.index()]
    }

    pub fn closed_threshold(&self, finger: Finger) -> f32 {
        self.closed_thresholds[finger.index()]
    }

    pub fn pinched_threshold(&self, finger: Finger) -> Option<f32> {
        match finger {
            Finger::Thumb => None,
            other => Some(self.pinched_thresholds[other.index() - 1]),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: GestureSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        log::info!("loaded gesture settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for finger in Finger::ALL {
            let extended = self.extended_threshold(finger);
            let closed = self.closed_threshold(finger);
            check_threshold("extended", finger, extended)?;
            check_threshold("closed", finger, closed)?;
            if let Some(pinched) = self.pinched_threshold(finger) {
                check_threshold("pinched", finger, pinched)?;
            }
            if closed > extended {
                return Err(ConfigError::InvertedThresholds {
                    finger: finger.label(),
                    closed,
                    extended,
                });
            }
        }

        match self.filter {
            FilterSettings::Simple { cutoff_hz } => check_cutoff("cutoff_hz", cutoff_hz)?,
            FilterSettings::OneEuro {
                min_cutoff,
                delta_cutoff,
                cutoff_slope,
            } => {
                check_cutoff("min_cutoff", min_cutoff)?;
                check_cutoff("delta_cutoff", delta_cutoff)?;
                if !cutoff_slope.is_finite() || cutoff_slope < 0.0 {
                    return Err(ConfigError::InvalidFilter {
                        name: "cutoff_slope",
                        value: cutoff_slope,
                    });
                }
            }
        }

        let interval = self.tracking_poll_interval_secs;
        if !interval.is_finite() || interval < 0.0 {
            return Err(ConfigError::InvalidPollInterval(interval));
        }

        Ok(())
    }
}

fn check_threshold(kind: &'static str, finger: Finger, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            kind,
            finger: finger.label(),
            value,
        })
    }
}

fn check_cutoff(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidFilter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = GestureSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.extended_threshold(Finger::Index), 14.0);
        assert_eq!(settings.closed_threshold(Finger::Thumb), 11.5);
    }

    #[test]
    fn test_thumb_has_no_pinch_threshold() {
        let settings = GestureSettings::default();
        assert_eq!(settings.pinched_threshold(Finger::Thumb), None);
        assert_eq!(settings.pinched_threshold(Finger::Index), Some(1.1));
        assert_eq!(settings.pinched_threshold(Finger::Little), Some(1.3));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = GestureSettings::from_json_str(
            r#"{ "filter": { "kind": "one_euro", "min_cutoff": 1.5, "delta_cutoff": 1.0, "cutoff_slope": 0.2 } }"#,
        )
        .unwrap();
        assert_eq!(
            settings.filter,
            FilterSettings::OneEuro {
                min_cutoff: 1.5,
                delta_cutoff: 1.0,
                cutoff_slope: 0.2
            }
        );
        assert_eq!(
            settings.extended_thresholds,
            GestureSettings::default().extended_thresholds
        );
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = GestureSettings::from_json_str(
            r#"{ "closed_thresholds": [11.5, 15.0, 11.0, 11.0, 11.0] }"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvertedThresholds { finger: "index", .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_bad_filter_rejected() {
        let err = GestureSettings::from_json_str(r#"{ "filter": { "kind": "simple", "cutoff_hz": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFilter { name: "cutoff_hz", .. }));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = GestureSettings::load("/nonexistent/gesture-settings.json").unwrap_err();
        assert!(err.to_string().contains("gesture-settings.json"), "{err}");
    }
}
