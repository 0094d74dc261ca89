//! Simplified correction with fixed attenuation.
//!
//! Compensates each channel for attenuation over the mean scene depth,
//! `clip(I · e^(β_c · z̄), 0, 1)`. No backscatter or illumination is modelled.

use glam::Vec3;

use crate::image::{clip_unit_rgb, mean_depth, DepthMap, RgbImage};

/// Apply the simplified correction with per-channel `attenuation` (R, G, B).
pub fn restore_simple(image: &RgbImage, depth: &DepthMap, attenuation: [f32; 3]) -> RgbImage {
    assert!(image.same_shape(depth), "image and depth shape mismatch");

    let mean = mean_depth(depth) as f32;
    let gain = (Vec3::from_array(attenuation) * mean).exp();
    tracing::debug!("Simplified correction: mean depth {:.3}, gain {:?}", mean, gain);

    image.par_map(|px| clip_unit_rgb(*px * gain))
}

#[cfg(test)]
mod tests {
    use common::Buffer2;

    use super::*;

    #[test]
    fn test_gain_uses_mean_depth() {
        let image = Buffer2::new_filled(2, 2, Vec3::splat(0.5));
        let depth = Buffer2::new(2, 2, vec![1.0, 3.0, 5.0, 7.0]);
        let out = restore_simple(&image, &depth, [0.01, 0.02, 0.03]);

        let expected = Vec3::new(
            0.5 * (0.04f32).exp(),
            0.5 * (0.08f32).exp(),
            0.5 * (0.12f32).exp(),
        );
        for px in out.iter() {
            assert!((*px - expected).abs().max_element() < 1e-6);
        }
    }

    #[test]
    fn test_blue_gains_most() {
        let image = Buffer2::new_filled(1, 1, Vec3::splat(0.4));
        let depth = Buffer2::new_filled(1, 1, 10.0);
        let px = restore_simple(&image, &depth, [0.01, 0.02, 0.03])[(0, 0)];
        assert!(px.z > px.y && px.y > px.x);
    }

    #[test]
    fn test_zero_depth_is_identity() {
        let image = Buffer2::new(2, 1, vec![Vec3::new(0.1, 0.2, 0.3), Vec3::splat(0.9)]);
        let depth = Buffer2::new_filled(2, 1, 0.0);
        assert_eq!(restore_simple(&image, &depth, [0.01, 0.02, 0.03]), image);
    }

    #[test]
    fn test_output_is_clipped() {
        let image = Buffer2::new_filled(3, 3, Vec3::splat(0.95));
        let depth = Buffer2::new_filled(3, 3, 50.0);
        let out = restore_simple(&image, &depth, [0.01, 0.02, 0.03]);
        assert!(out.iter().all(|px| *px == Vec3::ONE));
    }
}
