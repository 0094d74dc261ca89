//! Full restoration pipeline.
//!
//! # Pipeline Stages
//!
//! 1. **Backscatter** - Fit the veiling-light model to dark pixels per depth bin
//! 2. **Illumination** - Box-filter the backscatter-free signal
//! 3. **Attenuation** - Fit `β(d)` to raw per-pixel attenuation
//! 4. **Recovery** - Invert the formation model per pixel
//!
//! The simplified variant replaces all four stages with a fixed per-channel
//! gain at the mean scene depth.

mod result;


use std::time::Instant;

pub use result::{DegradedChannel, FitStage, Restoration};

use crate::analysis::ImageStats;
use crate::attenuation::estimate_attenuation;
use crate::backscatter::estimate_backscatter;
use crate::config::{Config, ModelVariant};
use crate::error::RestoreError;
use crate::illumination::estimate_illumination;
use crate::image::{sanitize_depth, DepthMap, RgbImage};
use crate::recovery::recover_radiance;
use crate::simple::restore_simple;

/// Restores underwater images with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Restorer {
    config: Config,
}

impl Restorer {
    /// Create a restorer. Panics if `config` is invalid.
    pub fn from_config(config: Config) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Restore `image` using its co-registered `depth`.
    ///
    /// Fails only on empty or mismatched inputs. Fit failures degrade the
    /// affected channel and are reported through
    /// [`Restoration::degraded_channels`].
    pub fn restore(&self, image: &RgbImage, depth: &DepthMap) -> Result<Restoration, RestoreError> {
        let start = Instant::now();

        validate_inputs(image, depth)?;

        let (depth, repaired) = sanitize_depth(depth);
        if repaired > 0 {
            tracing::warn!(
                "Replaced {} negative or non-finite depth values with 0",
                repaired
            );
        }

        tracing::info!(
            "Restoring {}x{} image ({:?} model)",
            image.width(),
            image.height(),
            self.config.variant
        );
        let input_stats = ImageStats::compute(image);

        let mut restoration = match self.config.variant {
            ModelVariant::Advanced => self.restore_advanced(image, &depth),
            ModelVariant::Simplified => self.restore_simplified(image, &depth),
        };
        restoration.input_stats = input_stats;
        restoration.output_stats = ImageStats::compute(&restoration.image);
        restoration.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let degraded = restoration.degraded_channels();
        if !degraded.is_empty() {
            tracing::warn!("{} channel fit(s) fell back to default models", degraded.len());
        }
        tracing::info!(
            "Restoration finished in {:.1} ms: brightness {:.3} -> {:.3}, contrast {:.3} -> {:.3}",
            restoration.elapsed_ms,
            restoration.input_stats.brightness,
            restoration.output_stats.brightness,
            restoration.input_stats.contrast,
            restoration.output_stats.contrast
        );

        Ok(restoration)
    }

    fn restore_advanced(&self, image: &RgbImage, depth: &DepthMap) -> Restoration {
        let config = &self.config;

        // Step 1: Backscatter from dark pixels
        let backscatter = estimate_backscatter(image, depth, config);

        // Step 2: Local illuminant
        let illumination =
            estimate_illumination(image, &backscatter.map, config.illumination_window);

        // Step 3: Range attenuation
        let attenuation =
            estimate_attenuation(image, depth, &backscatter.map, &illumination, config);

        // Step 4: Invert
        let restored = recover_radiance(
            image,
            depth,
            &backscatter.map,
            &attenuation.map,
            &illumination,
            config.epsilon,
        );

        Restoration {
            image: restored,
            backscatter: Some(backscatter),
            illumination: Some(illumination),
            attenuation: Some(attenuation),
            input_stats: ImageStats::default(),
            output_stats: ImageStats::default(),
            elapsed_ms: 0.0,
        }
    }

    fn restore_simplified(&self, image: &RgbImage, depth: &DepthMap) -> Restoration {
        Restoration {
            image: restore_simple(image, depth, self.config.simple_attenuation),
            backscatter: None,
            illumination: None,
            attenuation: None,
            input_stats: ImageStats::default(),
            output_stats: ImageStats::default(),
            elapsed_ms: 0.0,
        }
    }
}

/// Restore `image` with `config`. See [`Restorer::restore`].
pub fn restore(
    image: &RgbImage,
    depth: &DepthMap,
    config: &Config,
) -> Result<Restoration, RestoreError> {
    Restorer::from_config(config.clone()).restore(image, depth)
}

fn validate_inputs(image: &RgbImage, depth: &DepthMap) -> Result<(), RestoreError> {
    if !image.same_shape(depth) {
        return Err(RestoreError::ShapeMismatch {
            image_width: image.width(),
            image_height: image.height(),
            depth_width: depth.width(),
            depth_height: depth.height(),
        });
    }
    if image.is_empty() {
        return Err(RestoreError::EmptyImage);
    }
    Ok(())
}
