//! Synthetic scenes shared by the unit tests.

#![allow(dead_code)]

use common::Buffer2;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backscatter::BackscatterCoefficients;
use crate::image::{DepthMap, RgbImage};

/// Per-channel backscatter coefficients `[B∞, βB, J′, βD′]` that the dark-pixel
/// fit recovers exactly from [`backscatter_scene`].
pub const BACKSCATTER_TRUTH: [[f64; 4]; 3] = [
    [0.7, 0.3, 0.05, 2.0],
    [0.5, 0.45, 0.05, 2.0],
    [0.6, 0.5, 0.05, 2.0],
];

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Depth growing linearly from 0 at the left column to `max_depth` at the right.
pub fn depth_ramp(width: usize, height: usize, max_depth: f32) -> DepthMap {
    let denom = (width.max(2) - 1) as f32;
    let mut depth = Buffer2::new_default(width, height);
    for y in 0..height {
        for x in 0..width {
            depth[(x, y)] = max_depth * x as f32 / denom;
        }
    }
    depth
}

/// Image made of pure backscatter: every pixel equals `B_c(depth)`.
pub fn backscatter_scene(
    width: usize,
    height: usize,
    max_depth: f32,
    truth: &[[f64; 4]; 3],
) -> (RgbImage, DepthMap) {
    let depth = depth_ramp(width, height, max_depth);
    let coefficients = truth.map(BackscatterCoefficients::from_params);
    let image = depth.par_map(|&d| {
        let d = d as f64;
        Vec3::new(
            coefficients[0].evaluate(d) as f32,
            coefficients[1].evaluate(d) as f32,
            coefficients[2].evaluate(d) as f32,
        )
    });
    (image, depth)
}

pub fn uniform_scene(width: usize, height: usize, color: Vec3, depth: f32) -> (RgbImage, DepthMap) {
    (
        Buffer2::new_filled(width, height, color),
        Buffer2::new_filled(width, height, depth),
    )
}

/// Random albedo attenuated with range plus a veiling-light term, over depths
/// in `[0.5, 12]`. Reproducible for a given `seed`.
pub fn random_scene(width: usize, height: usize, seed: u64) -> (RgbImage, DepthMap) {
    let mut rng = StdRng::seed_from_u64(seed);
    let beta = Vec3::new(0.4, 0.15, 0.1);
    let veiling = Vec3::new(0.1, 0.3, 0.35);

    let mut image = Buffer2::new_default(width, height);
    let mut depth = Buffer2::new_default(width, height);
    for y in 0..height {
        for x in 0..width {
            let d: f32 = rng.random_range(0.5..12.0);
            let albedo = Vec3::new(
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
            );
            let direct = albedo * (-beta * d).exp();
            let scatter = veiling * (Vec3::ONE - (-beta * d).exp());
            image[(x, y)] = (direct + scatter).clamp(Vec3::ZERO, Vec3::ONE);
            depth[(x, y)] = d;
        }
    }
    (image, depth)
}
