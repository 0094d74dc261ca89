//! Restoration output and diagnostics.

use serde::Serialize;

use crate::analysis::ImageStats;
use crate::attenuation::AttenuationEstimate;
use crate::backscatter::BackscatterEstimate;
use crate::channel::CHANNEL_NAMES;
use crate::fitting::FitStatus;
use crate::image::{rgb_to_u8, RgbImage};

/// Pipeline stage that runs a per-channel curve fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitStage {
    Backscatter,
    Attenuation,
}

impl std::fmt::Display for FitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStage::Backscatter => write!(f, "backscatter"),
            FitStage::Attenuation => write!(f, "attenuation"),
        }
    }
}

/// A channel whose model did not come from a converged fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DegradedChannel {
    pub stage: FitStage,
    /// 0 = red, 1 = green, 2 = blue.
    pub channel: usize,
    pub status: FitStatus,
}

impl std::fmt::Display for DegradedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.stage, CHANNEL_NAMES[self.channel], self.status
        )
    }
}

/// Corrected image plus the intermediate estimates that produced it.
///
/// The estimate fields are `None` for the simplified variant.
#[derive(Debug, Clone)]
pub struct Restoration {
    /// Corrected image, same shape as the input, values in [0, 1].
    pub image: RgbImage,
    pub backscatter: Option<BackscatterEstimate>,
    pub illumination: Option<RgbImage>,
    pub attenuation: Option<AttenuationEstimate>,
    pub input_stats: ImageStats,
    pub output_stats: ImageStats,
    /// Wall-clock time of the restoration in milliseconds.
    pub elapsed_ms: f64,
}

impl Restoration {
    /// Every channel fit that fell back, backscatter first.
    pub fn degraded_channels(&self) -> Vec<DegradedChannel> {
        let backscatter = self
            .backscatter
            .iter()
            .flat_map(|estimate| estimate.channels.map(|fit| fit.status))
            .map(|status| (FitStage::Backscatter, status));
        let attenuation = self
            .attenuation
            .iter()
            .flat_map(|estimate| estimate.channels.map(|fit| fit.status))
            .map(|status| (FitStage::Attenuation, status));

        backscatter
            .chain(attenuation)
            .enumerate()
            .filter(|(_, (_, status))| status.is_fallback())
            .map(|(i, (stage, status))| DegradedChannel {
                stage,
                channel: i % 3,
                status,
            })
            .collect()
    }

    /// The corrected image as interleaved 8-bit RGB.
    pub fn to_u8(&self) -> Vec<u8> {
        rgb_to_u8(&self.image)
    }
}
