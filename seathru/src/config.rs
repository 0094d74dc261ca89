//! Restoration configuration.
//!
//! A flat [`Config`] struct grouped by pipeline stage. Every field has a
//! default, so partial YAML/JSON files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fitting::FitConfig;

/// Which physical model the restorer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Backscatter, illumination and depth-dependent attenuation are fitted
    /// from the image and inverted per pixel.
    #[default]
    Advanced,
    /// Fixed per-channel attenuation compensated at the mean scene depth.
    Simplified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub variant: ModelVariant,

    // ------------------------------------------------------------------------
    // Backscatter
    // ------------------------------------------------------------------------
    /// Number of equal-width depth bins used for dark-pixel sampling.
    pub depth_bins: usize,
    /// Fraction of the darkest pixels taken from each bin (at least one).
    pub dark_fraction: f64,

    // ------------------------------------------------------------------------
    // Illumination
    // ------------------------------------------------------------------------
    /// Side length of the box filter smoothing the direct signal.
    pub illumination_window: usize,

    // ------------------------------------------------------------------------
    // Numerics
    // ------------------------------------------------------------------------
    /// Floor applied before every division and logarithm.
    pub epsilon: f64,
    /// Curve fitter settings shared by the backscatter and attenuation fits.
    pub fit: FitConfig,

    // ------------------------------------------------------------------------
    // Simplified variant
    // ------------------------------------------------------------------------
    /// Per-channel (R, G, B) attenuation coefficients of the simplified model.
    pub simple_attenuation: [f32; 3],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: ModelVariant::Advanced,
            depth_bins: 10,
            dark_fraction: 0.01,
            illumination_window: 5,
            epsilon: 1e-8,
            fit: FitConfig::default(),
            simple_attenuation: [0.01, 0.02, 0.03],
        }
    }
}

impl Config {
    /// Load from a `.yaml`/`.yml`/`.json` file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Config = common::read_from_file(path)?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) {
        assert!(
            self.depth_bins > 0,
            "depth_bins must be positive, got {}",
            self.depth_bins
        );
        assert!(
            self.dark_fraction > 0.0 && self.dark_fraction <= 1.0,
            "dark_fraction must be in (0, 1], got {}",
            self.dark_fraction
        );
        assert!(
            self.illumination_window > 0,
            "illumination_window must be positive, got {}",
            self.illumination_window
        );
        assert!(
            self.epsilon > 0.0 && self.epsilon < 1.0,
            "epsilon must be in (0, 1), got {}",
            self.epsilon
        );
        assert!(
            self.simple_attenuation
                .iter()
                .all(|b| b.is_finite() && *b >= 0.0),
            "simple_attenuation must be finite and non-negative, got {:?}",
            self.simple_attenuation
        );
        self.fit.validate();
    }
}
