//! Seat configuration.
//!
//! Loaded from TOML or JSON:
//!
//! ```toml
//! burst_capacity = 32
//! axis_step = 10
//!
//! [viewport]
//! x = 0
//! y = 0
//! width = 1920
//! height = 1080
//!
//! [[devices]]
//! name = "Elo TouchSystems 2700 IntelliTouch"
//! calibration = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
//! ```
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output region absolute coordinates are remapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1024,
            height: 768,
        }
    }
}

/// 2×3 affine transform `[c0, c1, c2, c3, c4, c5]`:
/// `x' = x·c0 + y·c1 + c2`, `y' = x'·c3 + y·c4 + c5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calibration(pub [f32; 6]);

impl Calibration {
    /// Apply to a remapped position.
    ///
    /// `y'` is computed from the already transformed `x'`.
    pub fn apply(&self, x: i32, y: i32) -> (i32, i32) {
        let c = &self.0;
        let x = (x as f32 * c[0] + y as f32 * c[1] + c[2]) as i32;
        let y = (x as f32 * c[3] + y as f32 * c[4] + c[5]) as i32;
        (x, y)
    }
}

/// Per-device settings matched by kernel device name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRule {
    pub name: String,
    #[serde(default)]
    pub calibration: Option<Calibration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatConfig {
    pub viewport: Viewport,
    /// Records requested per read.
    pub burst_capacity: usize,
    /// Logical units per wheel detent.
    pub axis_step: i32,
    pub devices: Vec<DeviceRule>,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            burst_capacity: 32,
            axis_step: 10,
            devices: Vec::new(),
        }
    }
}

impl SeatConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: SeatConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: SeatConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.burst_capacity == 0 {
            return Err(ConfigError::Invalid("burst_capacity must be at least 1".into()));
        }
        if self.viewport.width < 0 || self.viewport.height < 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport size {}x{} is negative",
                self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }

    /// Calibration configured for a device name, if any.
    pub fn calibration_for(&self, name: &str) -> Option<Calibration> {
        self.devices
            .iter()
            .find(|rule| rule.name == name)
            .and_then(|rule| rule.calibration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip_of_documented_example() {
        let cfg = SeatConfig::from_toml_str(
            r#"
            burst_capacity = 8
            [viewport]
            x = 100
            y = 50
            width = 1920
            height = 1080
            [[devices]]
            name = "touch"
            calibration = [2.0, 0.0, 5.0, 0.0, 1.0, -3.0]
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.burst_capacity, 8);
        assert_eq!(cfg.axis_step, 10);
        assert_eq!(cfg.viewport.x, 100);
        assert_eq!(
            cfg.calibration_for("touch"),
            Some(Calibration([2.0, 0.0, 5.0, 0.0, 1.0, -3.0]))
        );
        assert_eq!(cfg.calibration_for("mouse"), None);
    }

    #[test]
    fn json_defaults_fill_missing_fields() {
        let cfg = SeatConfig::from_json_str(r#"{ "axis_step": 15 }"#).expect("valid config");
        assert_eq!(cfg.axis_step, 15);
        assert_eq!(cfg.burst_capacity, 32);
        assert_eq!(cfg.viewport, Viewport::default());
    }

    #[test]
    fn zero_burst_capacity_is_invalid() {
        let err = SeatConfig::from_toml_str("burst_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = SeatConfig::load("/nonexistent/seat.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn calibration_uses_transformed_x_for_y() {
        let cal = Calibration([2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        // x' = 20, y' = x' = 20 rather than the untransformed 10.
        assert_eq!(cal.apply(10, 7), (20, 20));
    }
}
