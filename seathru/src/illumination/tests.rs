use common::Buffer2;
use glam::Vec3;

use super::*;

fn gray_row(values: &[f32]) -> RgbImage {
    Buffer2::new(
        values.len(),
        1,
        values.iter().map(|&v| Vec3::splat(v)).collect(),
    )
}

fn red(image: &RgbImage) -> Vec<f32> {
    image.iter().map(|px| px.x).collect()
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-5, "index {i}: got {a}, expected {e}");
    }
}

#[test]
fn test_reflect_index() {
    let mapped: Vec<usize> = (-4..8).map(|i| reflect(i, 4)).collect();
    assert_eq!(mapped, vec![3, 2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0]);
    assert_eq!(reflect(-3, 1), 0);
    assert_eq!(reflect(5, 1), 0);
}

#[test]
fn test_window_one_is_identity() {
    let image = gray_row(&[0.1, 0.7, 0.3]);
    assert_eq!(box_filter(&image, 1), image);
}

#[test]
fn test_odd_window_reflects_at_borders() {
    let image = gray_row(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let filtered = box_filter(&image, 3);
    assert_close(
        &red(&filtered),
        &[4.0 / 3.0, 2.0, 3.0, 4.0, 14.0 / 3.0],
    );
}

#[test]
fn test_even_window_leans_toward_lower_indices() {
    let image = gray_row(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let filtered = box_filter(&image, 4);
    assert_close(&red(&filtered), &[1.5, 1.75, 2.5, 3.5, 4.25]);
}

#[test]
fn test_window_wider_than_image() {
    let image = gray_row(&[1.0, 3.0]);
    // Reflected sequence around x = 0 for window 5: 3 1 | 1 3 | 3
    let filtered = box_filter(&image, 5);
    assert_close(&red(&filtered), &[11.0 / 5.0, 9.0 / 5.0]);
}

#[test]
fn test_vertical_pass() {
    let image = Buffer2::new(
        1,
        3,
        vec![Vec3::splat(0.0), Vec3::splat(3.0), Vec3::splat(6.0)],
    );
    let filtered = box_filter(&image, 3);
    assert_close(&red(&filtered), &[1.0, 3.0, 5.0]);
}

#[test]
fn test_uniform_input_is_unchanged() {
    let image = Buffer2::new_filled(17, 11, Vec3::new(0.2, 0.4, 0.6));
    let filtered = box_filter(&image, 5);
    for px in filtered.iter() {
        assert!((*px - Vec3::new(0.2, 0.4, 0.6)).abs().max_element() < 1e-6);
    }
}

#[test]
fn test_channels_are_filtered_independently() {
    let image = Buffer2::new(
        3,
        1,
        vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
    );
    let filtered = box_filter(&image, 3);
    // Center pixel sees each channel once in a window of three.
    assert!((filtered[(1, 0)] - Vec3::splat(1.0 / 3.0)).abs().max_element() < 1e-6);
    // Left pixel: reflection duplicates the red source.
    assert!((filtered[(0, 0)] - Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0)).abs().max_element() < 1e-6);
}

#[test]
fn test_residual_is_clipped_at_zero() {
    let image = gray_row(&[0.2, 0.8]);
    let backscatter = gray_row(&[0.5, 0.3]);
    let residual = direct_signal(&image, &backscatter);
    assert_close(&red(&residual), &[0.0, 0.5]);
}

#[test]
fn test_shape_preserved() {
    let image = Buffer2::new_filled(13, 9, Vec3::splat(0.5));
    let backscatter = Buffer2::new_filled(13, 9, Vec3::splat(0.1));
    let illumination = estimate_illumination(&image, &backscatter, 5);
    assert!(illumination.same_shape(&image));
    for px in illumination.iter() {
        assert!((*px - Vec3::splat(0.4)).abs().max_element() < 1e-6);
    }
}

#[test]
fn test_empty_image() {
    let image: RgbImage = Buffer2::new_default(0, 0);
    assert!(box_filter(&image, 5).is_empty());
}
