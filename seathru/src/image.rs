//! Pixel and depth buffers exchanged with the decoding / depth-estimation
//! collaborators, plus the adapters to and from their flat representations.

use common::Buffer2;
use glam::Vec3;

use crate::error::RestoreError;

/// RGB image with intensities normalized to [0, 1].
pub type RgbImage = Buffer2<Vec3>;

/// Per-pixel scene depth, co-registered with an [`RgbImage`].
pub type DepthMap = Buffer2<f32>;

/// Clip a channel value to [0, 1], mapping NaN to 0.
#[inline]
pub fn clip_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[inline]
pub(crate) fn clip_unit_rgb(v: Vec3) -> Vec3 {
    Vec3::new(clip_unit(v.x), clip_unit(v.y), clip_unit(v.z))
}

/// Mean of the three channels.
#[inline]
pub(crate) fn luma_mean(v: Vec3) -> f32 {
    v.element_sum() / 3.0
}

fn check_length(
    width: usize,
    height: usize,
    channels: usize,
    actual: usize,
) -> Result<(), RestoreError> {
    let expected = width * height * channels;
    if actual != expected {
        return Err(RestoreError::BufferLength {
            width,
            height,
            channels,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Build an image from an interleaved `height × width × 3` buffer.
///
/// Values are clipped to [0, 1]; non-finite values become 0.
pub fn rgb_from_interleaved(
    width: usize,
    height: usize,
    data: &[f32],
) -> Result<RgbImage, RestoreError> {
    check_length(width, height, 3, data.len())?;
    let pixels = data
        .chunks_exact(3)
        .map(|px| clip_unit_rgb(Vec3::new(px[0], px[1], px[2])))
        .collect();
    Ok(Buffer2::new(width, height, pixels))
}

/// Build an image from interleaved 8-bit RGB data.
pub fn rgb_from_u8(width: usize, height: usize, data: &[u8]) -> Result<RgbImage, RestoreError> {
    check_length(width, height, 3, data.len())?;
    let pixels = data
        .chunks_exact(3)
        .map(|px| Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32) / 255.0)
        .collect();
    Ok(Buffer2::new(width, height, pixels))
}

/// Rescale to [0, 255] and round to interleaved 8-bit RGB.
pub fn rgb_to_u8(image: &RgbImage) -> Vec<u8> {
    image
        .iter()
        .flat_map(|px| clip_unit_rgb(*px).to_array())
        .map(|v| (v * 255.0).round() as u8)
        .collect()
}

/// Build a depth map from a row-major `height × width` buffer.
pub fn depth_from_slice(
    width: usize,
    height: usize,
    data: &[f32],
) -> Result<DepthMap, RestoreError> {
    check_length(width, height, 1, data.len())?;
    Ok(Buffer2::new(width, height, data.to_vec()))
}

/// Replace negative and non-finite depths with 0.
///
/// Returns the cleaned map and the number of repaired pixels.
pub fn sanitize_depth(depth: &DepthMap) -> (DepthMap, usize) {
    let repaired = depth
        .iter()
        .filter(|d| !d.is_finite() || **d < 0.0)
        .count();
    if repaired == 0 {
        return (depth.clone(), 0);
    }

    let cleaned = depth.par_map(|&d| if d.is_finite() && d > 0.0 { d } else { 0.0 });
    (cleaned, repaired)
}

/// `(min, max)` of a depth map, or `None` when it is empty.
pub(crate) fn depth_range(depth: &DepthMap) -> Option<(f32, f32)> {
    depth.iter().fold(None, |acc, &d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

/// Mean depth, computed in f64.
pub(crate) fn mean_depth(depth: &DepthMap) -> f64 {
    if depth.is_empty() {
        return 0.0;
    }
    depth.iter().map(|&d| d as f64).sum::<f64>() / depth.len() as f64
}
