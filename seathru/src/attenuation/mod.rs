//! Depth-dependent attenuation estimation.
//!
//! The direct signal decays with range as `e^(−β·d)`. A raw per-pixel
//! coefficient is derived from the ratio of the local illuminant to the
//! backscatter-free signal, then each channel is smoothed by fitting
//!
//! `β(d) = a·e^(b·d) + c·e^(d′·d)`
//!
//! over all pixels with positive depth. The two rates `b` and `d′` are
//! independent parameters.

#[cfg(test)]
mod tests;

use glam::Vec3;
use serde::Serialize;

use crate::channel::{log_channel_fit, par_channels, ChannelFit};
use crate::config::Config;
use crate::fitting::{fit_curve, Bounds, CurveModel, FitConfig, FitStatus};
use crate::image::{DepthMap, RgbImage};

/// Box constraints for `[a, b, c, d′]`.
pub const ATTENUATION_BOUNDS: Bounds<4> =
    Bounds::new([0.0, -5.0, 0.0, -5.0], [10.0, 0.0, 10.0, 0.0]);

/// Starting point shared by all channels.
pub const ATTENUATION_INITIAL: [f64; 4] = [0.5, -0.8, 0.5, -0.2];

/// Fewer valid samples than this skip the fit and use the zero model.
pub const MIN_ATTENUATION_SAMPLES: usize = 4;

/// Coefficients of the dual-exponential attenuation model for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AttenuationCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl AttenuationCoefficients {
    pub fn from_params(params: [f64; 4]) -> Self {
        let [a, b, c, d] = params;
        Self { a, b, c, d }
    }

    pub fn to_params(self) -> [f64; 4] {
        [self.a, self.b, self.c, self.d]
    }

    /// `β` at `depth`.
    #[inline]
    pub fn evaluate(&self, depth: f64) -> f64 {
        self.a * (self.b * depth).exp() + self.c * (self.d * depth).exp()
    }
}

struct AttenuationCurve;

impl CurveModel<4> for AttenuationCurve {
    #[inline]
    fn evaluate(&self, x: f64, params: &[f64; 4]) -> f64 {
        AttenuationCoefficients::from_params(*params).evaluate(x)
    }

    #[inline]
    fn jacobian_row(&self, x: f64, params: &[f64; 4]) -> [f64; 4] {
        let [a, b, c, d] = *params;
        let e1 = (b * x).exp();
        let e2 = (d * x).exp();
        [e1, a * x * e1, e2, c * x * e2]
    }
}

/// Dense attenuation field and the per-channel fits that produced it.
#[derive(Debug, Clone)]
pub struct AttenuationEstimate {
    /// Per-pixel `β` for each channel.
    pub map: RgbImage,
    pub channels: [ChannelFit<AttenuationCoefficients>; 3],
}

/// Estimate per-channel attenuation from the image, its backscatter and
/// illumination fields, and depth. All four buffers must share one shape.
pub fn estimate_attenuation(
    image: &RgbImage,
    depth: &DepthMap,
    backscatter: &RgbImage,
    illumination: &RgbImage,
    config: &Config,
) -> AttenuationEstimate {
    assert!(
        image.same_shape(depth) && image.same_shape(backscatter) && image.same_shape(illumination),
        "buffer shape mismatch"
    );

    let epsilon = config.epsilon;
    let channels = par_channels(|c| {
        let (depths, raw) = raw_samples(image, depth, backscatter, illumination, c, epsilon);
        fit_channel(&depths, &raw, &config.fit)
    });
    for (c, fit) in channels.iter().enumerate() {
        log_channel_fit("Attenuation", c, fit);
    }

    let map = evaluate_attenuation(depth, &channels);
    AttenuationEstimate { map, channels }
}

/// Raw attenuation `−ln(max(E, ε) / max(I − B, ε)) / max(d, ε)`.
#[inline]
pub(crate) fn raw_attenuation(
    intensity: f64,
    backscatter: f64,
    illumination: f64,
    depth: f64,
    epsilon: f64,
) -> f64 {
    let residual = (intensity - backscatter).max(epsilon);
    -(illumination.max(epsilon) / residual).ln() / depth.max(epsilon)
}

/// `(depth, raw)` pairs of channel `c` for pixels with positive depth and a
/// finite raw coefficient.
fn raw_samples(
    image: &RgbImage,
    depth: &DepthMap,
    backscatter: &RgbImage,
    illumination: &RgbImage,
    c: usize,
    epsilon: f64,
) -> (Vec<f64>, Vec<f64>) {
    image
        .iter()
        .zip(depth.iter())
        .zip(backscatter.iter().zip(illumination.iter()))
        .filter(|((_, &d), _)| d > 0.0)
        .filter_map(|((px, &d), (b, e))| {
            let d = d as f64;
            let raw = raw_attenuation(px[c] as f64, b[c] as f64, e[c] as f64, d, epsilon);
            raw.is_finite().then_some((d, raw))
        })
        .unzip()
}

/// Fit one channel. Fewer than [`MIN_ATTENUATION_SAMPLES`] yields the zero
/// model without a fit.
pub(crate) fn fit_channel(
    depths: &[f64],
    raw: &[f64],
    config: &FitConfig,
) -> ChannelFit<AttenuationCoefficients> {
    if raw.len() < MIN_ATTENUATION_SAMPLES {
        let status = if raw.is_empty() {
            FitStatus::Skipped
        } else {
            FitStatus::InsufficientSamples
        };
        return ChannelFit::without_fit(AttenuationCoefficients::default(), status, raw.len());
    }

    let result = fit_curve(
        &AttenuationCurve,
        depths,
        raw,
        ATTENUATION_INITIAL,
        &ATTENUATION_BOUNDS,
        config,
    );
    ChannelFit::from_result(&result, raw.len(), AttenuationCoefficients::from_params)
}

/// Evaluate the fitted per-channel `β(d)` at every pixel depth.
pub(crate) fn evaluate_attenuation(
    depth: &DepthMap,
    channels: &[ChannelFit<AttenuationCoefficients>; 3],
) -> RgbImage {
    let coefficients = channels.each_ref().map(|fit| fit.coefficients);
    depth.par_map(|&d| {
        let d = d as f64;
        Vec3::new(
            coefficients[0].evaluate(d) as f32,
            coefficients[1].evaluate(d) as f32,
            coefficients[2].evaluate(d) as f32,
        )
    })
}
