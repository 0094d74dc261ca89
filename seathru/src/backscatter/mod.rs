//! Backscatter estimation.
//!
//! Backscatter is the veiling light scattered toward the camera by particles
//! between camera and scene. It grows with range and does not depend on the
//! scene itself, so the darkest pixels at any given depth are dominated by it.
//! The estimator bins the depth range, keeps the darkest fraction of each bin
//! and fits, per channel,
//!
//! `B(d) = B∞·(1 − e^(−βB·d)) + J′·e^(−βD′·d)`
//!
//! to those samples. The fitted curve is then evaluated at every pixel.


use glam::Vec3;
use rayon::prelude::*;
use serde::Serialize;

use crate::channel::{log_channel_fit, par_channels, ChannelFit};
use crate::config::Config;
use crate::fitting::{fit_curve, Bounds, CurveModel, FitConfig, FitStatus};
use crate::image::{depth_range, luma_mean, DepthMap, RgbImage};

/// Box constraints for `[B∞, βB, J′, βD′]`.
pub const BACKSCATTER_BOUNDS: Bounds<4> = Bounds::new([0.0, 0.0, 0.0, 0.0], [1.5, 5.0, 1.5, 5.0]);

/// Initial rates and residual-signal amplitude; `B∞` starts at the brightest sample.
const INITIAL_BACKSCATTER_RATE: f64 = 0.5;
const INITIAL_RESIDUAL_SIGNAL: f64 = 0.1;
const INITIAL_DIRECT_RATE: f64 = 0.5;

/// Coefficients of the dual-term backscatter model for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BackscatterCoefficients {
    /// Veiling light at infinite range, `B∞`.
    pub veiling_light: f64,
    /// Backscatter rate, `βB`.
    pub backscatter_rate: f64,
    /// Residual direct signal amplitude, `J′`.
    pub residual_signal: f64,
    /// Residual direct signal decay rate, `βD′`.
    pub direct_rate: f64,
}

impl BackscatterCoefficients {
    pub fn from_params(params: [f64; 4]) -> Self {
        let [veiling_light, backscatter_rate, residual_signal, direct_rate] = params;
        Self {
            veiling_light,
            backscatter_rate,
            residual_signal,
            direct_rate,
        }
    }

    pub fn to_params(self) -> [f64; 4] {
        [
            self.veiling_light,
            self.backscatter_rate,
            self.residual_signal,
            self.direct_rate,
        ]
    }

    /// Starting point for a fit whose brightest sample is `max_value`.
    pub fn initial_guess(max_value: f64) -> Self {
        Self::from_params([
            max_value,
            INITIAL_BACKSCATTER_RATE,
            INITIAL_RESIDUAL_SIGNAL,
            INITIAL_DIRECT_RATE,
        ])
    }

    #[inline]
    pub fn evaluate(&self, depth: f64) -> f64 {
        self.veiling_light * (1.0 - (-self.backscatter_rate * depth).exp())
            + self.residual_signal * (-self.direct_rate * depth).exp()
    }
}

struct BackscatterCurve;

impl CurveModel<4> for BackscatterCurve {
    #[inline]
    fn evaluate(&self, x: f64, params: &[f64; 4]) -> f64 {
        BackscatterCoefficients::from_params(*params).evaluate(x)
    }

    #[inline]
    fn jacobian_row(&self, x: f64, params: &[f64; 4]) -> [f64; 4] {
        let [b_inf, beta_b, j_prime, beta_d] = *params;
        let e_b = (-beta_b * x).exp();
        let e_d = (-beta_d * x).exp();
        [
            1.0 - e_b,          // df/dB∞
            b_inf * x * e_b,    // df/dβB
            e_d,                // df/dJ′
            -j_prime * x * e_d, // df/dβD′
        ]
    }
}

/// Dense backscatter field and the per-channel fits that produced it.
#[derive(Debug, Clone)]
pub struct BackscatterEstimate {
    pub map: RgbImage,
    pub channels: [ChannelFit<BackscatterCoefficients>; 3],
}

/// Dark-pixel samples collected across all depth bins.
#[derive(Debug, Clone, Default)]
pub(crate) struct DarkSamples {
    pub depths: Vec<f64>,
    pub values: [Vec<f64>; 3],
}

impl DarkSamples {
    pub fn len(&self) -> usize {
        self.depths.len()
    }
}

/// Estimate the backscatter field of `image` given its co-registered `depth`.
pub fn estimate_backscatter(
    image: &RgbImage,
    depth: &DepthMap,
    config: &Config,
) -> BackscatterEstimate {
    assert!(image.same_shape(depth), "image and depth shape mismatch");

    let samples = sample_dark_pixels(image, depth, config.depth_bins, config.dark_fraction);
    tracing::debug!(
        "Collected {} dark-pixel samples over {} depth bins",
        samples.len(),
        config.depth_bins
    );

    let channels = par_channels(|c| fit_channel(&samples.depths, &samples.values[c], &config.fit));
    for (c, fit) in channels.iter().enumerate() {
        log_channel_fit("Backscatter", c, fit);
    }

    let map = evaluate_backscatter(depth, &channels);
    BackscatterEstimate { map, channels }
}

/// Partition `[min(depth), max(depth)]` into `bins` equal-width bins and keep
/// the darkest `fraction` of each bin (at least one pixel), ranked by the
/// mean of the three channels.
///
/// Bin edges are inclusive on both sides, so a pixel lying exactly on an
/// interior edge can be sampled by both neighbouring bins. A constant depth
/// map is sampled as a single bin.
pub(crate) fn sample_dark_pixels(
    image: &RgbImage,
    depth: &DepthMap,
    bins: usize,
    fraction: f64,
) -> DarkSamples {
    let Some((z_min, z_max)) = depth_range(depth) else {
        return DarkSamples::default();
    };
    let (z_min, z_max) = (z_min as f64, z_max as f64);
    // A zero-width range makes every bin the same interval; sample it once.
    let bins = if z_max > z_min { bins } else { 1 };
    let step = (z_max - z_min) / bins as f64;
    let edge = |i: usize| if i == bins { z_max } else { z_min + step * i as f64 };

    let pixels = image.pixels();
    let depths = depth.pixels();

    let selected: Vec<Vec<usize>> = (0..bins)
        .into_par_iter()
        .map(|bin| {
            let (lo, hi) = (edge(bin), edge(bin + 1));
            let mut members: Vec<(f32, usize)> = depths
                .iter()
                .enumerate()
                .filter(|(_, &d)| (lo..=hi).contains(&(d as f64)))
                .map(|(i, _)| (luma_mean(pixels[i]), i))
                .collect();
            if members.is_empty() {
                return Vec::new();
            }

            let take = ((members.len() as f64 * fraction) as usize).clamp(1, members.len());
            let by_darkness =
                |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
            if take < members.len() {
                members.select_nth_unstable_by(take - 1, by_darkness);
                members.truncate(take);
            }
            members.sort_unstable_by(by_darkness);
            members.into_iter().map(|(_, i)| i).collect()
        })
        .collect();

    let mut samples = DarkSamples::default();
    for i in selected.into_iter().flatten() {
        samples.depths.push(depths[i] as f64);
        let px = pixels[i];
        for c in 0..3 {
            samples.values[c].push(px[c] as f64);
        }
    }
    samples
}

/// Fit one channel. No samples yields the zero model without a fit.
pub(crate) fn fit_channel(
    depths: &[f64],
    values: &[f64],
    config: &FitConfig,
) -> ChannelFit<BackscatterCoefficients> {
    if values.is_empty() {
        return ChannelFit::without_fit(BackscatterCoefficients::default(), FitStatus::Skipped, 0);
    }

    let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let initial = BackscatterCoefficients::initial_guess(max_value).to_params();
    let result = fit_curve(
        &BackscatterCurve,
        depths,
        values,
        initial,
        &BACKSCATTER_BOUNDS,
        config,
    );

    ChannelFit::from_result(&result, values.len(), BackscatterCoefficients::from_params)
}

/// Evaluate the fitted per-channel models at every pixel depth.
pub(crate) fn evaluate_backscatter(
    depth: &DepthMap,
    channels: &[ChannelFit<BackscatterCoefficients>; 3],
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
