//! Local illumination estimate.
//!
//! Once backscatter is removed, what remains is the direct signal: scene
//! reflectance times the light reaching it. Averaging that residual over a
//! small neighbourhood approximates the local illuminant.

#[cfg(test)]
mod tests;

use glam::Vec3;

use crate::image::RgbImage;

/// Box-filtered `clip(image − backscatter, 0)`, same shape as `image`.
///
/// Channels are filtered independently with a `window × window` mean and
/// reflected borders (`d c b a | a b c d`).
pub fn estimate_illumination(image: &RgbImage, backscatter: &RgbImage, window: usize) -> RgbImage {
    let residual = direct_signal(image, backscatter);
    box_filter(&residual, window)
}

/// `max(image − backscatter, 0)` per channel.
pub(crate) fn direct_signal(image: &RgbImage, backscatter: &RgbImage) -> RgbImage {
    image.par_zip_map(backscatter, |px, b| (*px - *b).max(Vec3::ZERO))
}

/// Separable `window × window` mean filter with reflected borders.
///
/// An even window extends one pixel further toward lower indices, matching the
/// usual centring of even-sized filters.
pub(crate) fn box_filter(input: &RgbImage, window: usize) -> RgbImage {
    assert!(window > 0, "Window must be positive");

    if window == 1 || input.is_empty() {
        return input.clone();
    }

    let width = input.width();
    let height = input.height();
    let before = window / 2;
    let scale = 1.0 / window as f32;

    // Horizontal pass
    let mut horizontal = input.clone();
    horizontal.par_fill_rows(|y, out_row| {
        let in_row = input.row(y);
        for (x, out) in out_row.iter_mut().enumerate() {
            let mut sum = Vec3::ZERO;
            for k in 0..window {
                sum += in_row[reflect(x as isize + k as isize - before as isize, width)];
            }
            *out = sum * scale;
        }
    });

    // Vertical pass
    let mut output = horizontal.clone();
    output.par_fill_rows(|y, out_row| {
        out_row.fill(Vec3::ZERO);
        for k in 0..window {
            let sy = reflect(y as isize + k as isize - before as isize, height);
            for (out, v) in out_row.iter_mut().zip(horizontal.row(sy)) {
                *out += *v;
            }
        }
        for out in out_row.iter_mut() {
            *out *= scale;
        }
    });

    output
}

/// Map an out-of-range index back into `0..n` by reflection about the edges,
/// repeating the edge sample (`d c b a | a b c d | d c b a`).
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    debug_assert!(n > 0);
    let period = 2 * n as isize;
    let k = i.rem_euclid(period) as usize;
    if k < n {
        k
    } else {
        2 * n - 1 - k
    }
}
