//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use seathru::prelude::*;
//! ```

// Buffers and adapters
pub use crate::{
    depth_from_slice, rgb_from_interleaved, rgb_from_u8, rgb_to_u8, Buffer2, DepthMap, RgbImage,
};

// Main API
pub use crate::{
    restore, Config, ConfigError, FitStatus, ModelVariant, Restoration, RestoreError, Restorer,
};
