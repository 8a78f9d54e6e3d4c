use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::Canvas;
use crate::types::Point;

/// Settings for one averaging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AverageConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Canonical position of the first eye corner, as fractions of the canvas.
    pub left_eye_anchor: Point,
    /// Canonical position of the second eye corner, as fractions of the canvas.
    pub right_eye_anchor: Point,
    /// Per-image warp budget in milliseconds; `None` disables the check.
    pub warp_timeout_ms: Option<u64>,
    /// Normalize and warp images on the rayon thread pool.
    pub parallel: bool,
}

impl Default for AverageConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            left_eye_anchor: Point::new(0.3, 1.0 / 3.0),
            right_eye_anchor: Point::new(0.7, 1.0 / 3.0),
            warp_timeout_ms: Some(30_000),
            parallel: true,
        }
    }
}

impl AverageConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(Error::InvalidConfig(format!(
                "canvas must be at least 2x2, got {}x{}",
                self.width, self.height
            )));
        }
        for (name, p) in [("left", self.left_eye_anchor), ("right", self.right_eye_anchor)] {
            if !(0.0..=1.0).contains(&p.x) || !(0.0..=1.0).contains(&p.y) {
                return Err(Error::InvalidConfig(format!(
                    "{name} eye anchor ({}, {}) lies outside the unit square",
                    p.x, p.y
                )));
            }
        }
        let canvas = self.canvas();
        if canvas.left_eye.distance(&canvas.right_eye) < 1.0 {
            return Err(Error::InvalidConfig(
                "eye anchors must be at least one pixel apart".into(),
            ));
        }
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::with_anchors(
            self.width,
            self.height,
            self.left_eye_anchor,
            self.right_eye_anchor,
        )
    }

    pub fn warp_budget(&self) -> Option<Duration> {
        self.warp_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_canonical_frame() {
        let config = AverageConfig::default();
        config.validate().unwrap();
        let canvas = config.canvas();
        assert_eq!((canvas.width, canvas.height), (600, 600));
        assert_eq!(canvas.left_eye, Point::new(180.0, 200.0));
        assert_eq!(config.warp_budget(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AverageConfig = serde_json::from_str(r#"{ "width": 300 }"#).unwrap();
        assert_eq!(config.width, 300);
        assert_eq!(config.height, 600);
        assert!(config.parallel);
    }

    #[test]
    fn rejects_bad_settings() {
        let tiny = AverageConfig {
            width: 1,
            ..AverageConfig::default()
        };
        assert!(matches!(tiny.validate(), Err(Error::InvalidConfig(_))));

        let same = AverageConfig {
            right_eye_anchor: Point::new(0.3, 1.0 / 3.0),
            ..AverageConfig::default()
        };
        assert!(same.validate().is_err());

        let outside = AverageConfig {
            left_eye_anchor: Point::new(-0.1, 0.5),
            ..AverageConfig::default()
        };
        assert!(outside.validate().is_err());
    }

    #[test]
    fn save_and_load_config() {
        let config = AverageConfig {
            width: 320,
            height: 240,
            warp_timeout_ms: None,
            ..AverageConfig::default()
        };

        let temp_path = std::env::temp_dir().join("mean_face_test_config.json");
        config.save(&temp_path).unwrap();
        let loaded = AverageConfig::load(&temp_path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(temp_path).ok();
    }
}
