//! Scene radiance recovery.
//!
//! Inverts the image formation model in a single pass: subtract backscatter,
//! undo range attenuation, divide out the local illuminant.


use common::Buffer2;
use glam::Vec3;

use crate::image::{clip_unit_rgb, DepthMap, RgbImage};

/// `clip((I − B)·e^(β·d) / max(E, ε), 0, 1)` per pixel and channel.
///
/// Non-finite intermediate values (overflowing exponentials, `0 · ∞`) map to 0.
pub fn recover_radiance(
    image: &RgbImage,
    depth: &DepthMap,
    backscatter: &RgbImage,
    beta: &RgbImage,
    illumination: &RgbImage,
    epsilon: f64,
) -> RgbImage {
    assert!(
        image.same_shape(depth)
            && image.same_shape(backscatter)
            && image.same_shape(beta)
            && image.same_shape(illumination),
        "buffer shape mismatch"
    );

    let floor = Vec3::splat(epsilon as f32);
    let mut output = Buffer2::new_default(image.width(), image.height());
    output.par_fill_rows(|y, out_row| {
        let rows = image
            .row(y)
            .iter()
            .zip(depth.row(y))
            .zip(backscatter.row(y).iter().zip(beta.row(y)))
            .zip(illumination.row(y));
        for (out, (((px, &d), (b, k)), e)) in out_row.iter_mut().zip(rows) {
            *out = recover_pixel(*px, d, *b, *k, *e, floor);
        }
    });
    output
}

#[inline]
fn recover_pixel(
    intensity: Vec3,
    depth: f32,
    backscatter: Vec3,
    beta: Vec3,
    illumination: Vec3,
    floor: Vec3,
) -> Vec3 {
    let direct = intensity - backscatter;
    let gain = (beta * depth).exp();
    clip_unit_rgb(direct * gain / illumination.max(floor))
}
