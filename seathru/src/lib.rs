//! Seathru - depth-aware color restoration for underwater photographs.
//!
//! Water adds a veiling light (backscatter) that grows with range and
//! attenuates the direct signal at a channel-dependent rate. Given an RGB
//! image and a co-registered depth map, this library:
//! - Estimates backscatter from the darkest pixels at each depth
//! - Estimates the local illuminant from the backscatter-free signal
//! - Fits a range-dependent attenuation coefficient per channel
//! - Inverts the formation model to recover scene colors
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seathru::{rgb_from_u8, depth_from_slice, Config, Restorer};
//!
//! let image = rgb_from_u8(width, height, &rgb_bytes)?;
//! let depth = depth_from_slice(width, height, &depth_values)?;
//!
//! let restorer = Restorer::from_config(Config::default());
//! let restoration = restorer.restore(&image, &depth)?;
//!
//! for channel in restoration.degraded_channels() {
//!     println!("degraded: {channel}");
//! }
//! let corrected = restoration.to_u8();
//! ```

mod analysis;
mod attenuation;
mod backscatter;
mod channel;
mod config;
mod error;
pub(crate) mod fitting;
mod illumination;
mod image;
mod pipeline;
mod recovery;
mod simple;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Images
// ============================================================================

pub use common::Buffer2;
pub use image::{
    clip_unit, depth_from_slice, rgb_from_interleaved, rgb_from_u8, rgb_to_u8, sanitize_depth,
    DepthMap, RgbImage,
};

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{Config, ModelVariant};
pub use error::{ConfigError, RestoreError};
pub use fitting::{fit_curve, Bounds, CurveModel, FitConfig, FitResult, FitStatus};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{restore, DegradedChannel, FitStage, Restoration, Restorer};

// ============================================================================
// Stages
// ============================================================================

pub use analysis::ImageStats;
pub use attenuation::{
    estimate_attenuation, AttenuationCoefficients, AttenuationEstimate, ATTENUATION_BOUNDS,
    ATTENUATION_INITIAL, MIN_ATTENUATION_SAMPLES,
};
pub use backscatter::{
    estimate_backscatter, BackscatterCoefficients, BackscatterEstimate, BACKSCATTER_BOUNDS,
};
pub use channel::{ChannelFit, CHANNEL_NAMES};
pub use illumination::estimate_illumination;
pub use recovery::recover_radiance;
pub use simple::restore_simple;
