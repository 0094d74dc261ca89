use common::Buffer2;
use glam::Vec3;

use super::*;
use crate::testing::{depth_ramp, random_scene};

const TRUTH: [f64; 4] = [0.8, -0.9, 0.3, -0.1];

/// Image whose raw attenuation equals `β_truth(d)` exactly, under a constant
/// illuminant of 0.2 and no backscatter.
fn attenuated_scene(width: usize, height: usize) -> (RgbImage, DepthMap, RgbImage, RgbImage) {
    let depth = depth_ramp(width, height, 8.0);
    let truth = AttenuationCoefficients::from_params(TRUTH);
    let illuminant = 0.2f32;
    let image = depth.par_map(|&d| {
        let d = d as f64;
        Vec3::splat((illuminant as f64 * (truth.evaluate(d) * d).exp()) as f32)
    });
    let backscatter = Buffer2::new_filled(width, height, Vec3::ZERO);
    let illumination = Buffer2::new_filled(width, height, Vec3::splat(illuminant));
    (image, depth, backscatter, illumination)
}

#[test]
fn test_jacobian_matches_finite_differences() {
    let params = [0.7, -0.6, 0.4, -0.05];
    let h = 1e-7;
    for &x in &[0.0, 1.0, 3.5, 9.0] {
        let row = AttenuationCurve.jacobian_row(x, &params);
        for k in 0..4 {
            let mut hi = params;
            let mut lo = params;
            hi[k] += h;
            lo[k] -= h;
            let numeric = (AttenuationCurve.evaluate(x, &hi) - AttenuationCurve.evaluate(x, &lo))
                / (2.0 * h);
            assert!((row[k] - numeric).abs() < 1e-6, "x={x} k={k}");
        }
    }
}

#[test]
fn test_raw_attenuation_floors() {
    // I == B: residual floored at ε, illumination 0 floored at ε, ratio 1.
    assert_eq!(raw_attenuation(0.3, 0.3, 0.0, 2.0, 1e-8), 0.0);
    // Zero depth divides by ε instead of zero.
    let raw = raw_attenuation(0.5, 0.0, 0.25, 0.0, 1e-8);
    assert!(raw.is_finite());
    assert!((raw - 2f64.ln() / 1e-8).abs() / raw < 1e-12);
    // E / R = e^(-0.4) at depth 2 gives 0.2.
    let e = 0.5 * (-0.4f64).exp();
    assert!((raw_attenuation(0.5, 0.0, e, 2.0, 1e-8) - 0.2).abs() < 1e-12);
}

#[test]
fn test_recovers_ground_truth_coefficients() {
    let (image, depth, backscatter, illumination) = attenuated_scene(200, 8);
    let estimate =
        estimate_attenuation(&image, &depth, &backscatter, &illumination, &Config::default());

    for (c, fit) in estimate.channels.iter().enumerate() {
        assert_eq!(fit.status, FitStatus::Converged, "channel {c}");
        // The zero-depth column is excluded.
        assert_eq!(fit.samples, 199 * 8);
        let got = fit.coefficients.to_params();
        for k in 0..4 {
            assert!(
                ((got[k] - TRUTH[k]) / TRUTH[k]).abs() < 0.1,
                "channel {c} param {k}: got {} expected {}",
                got[k],
                TRUTH[k]
            );
        }
    }
}

#[test]
fn test_all_zero_depth_gives_zero_beta() {
    let image = Buffer2::new_filled(6, 4, Vec3::splat(0.5));
    let depth = Buffer2::new_filled(6, 4, 0.0);
    let backscatter = Buffer2::new_filled(6, 4, Vec3::splat(0.1));
    let illumination = Buffer2::new_filled(6, 4, Vec3::splat(0.4));

    let estimate =
        estimate_attenuation(&image, &depth, &backscatter, &illumination, &Config::default());
    for fit in &estimate.channels {
        assert_eq!(fit.status, FitStatus::Skipped);
        assert_eq!(fit.samples, 0);
        assert_eq!(fit.coefficients, AttenuationCoefficients::default());
    }
    assert!(estimate.map.iter().all(|px| *px == Vec3::ZERO));
}

#[test]
fn test_too_few_samples_gives_zero_model() {
    let fit = fit_channel(&[1.0, 2.0, 3.0], &[0.4, 0.3, 0.2], &FitConfig::default());
    assert_eq!(fit.status, FitStatus::InsufficientSamples);
    assert_eq!(fit.samples, 3);
    assert_eq!(fit.coefficients, AttenuationCoefficients::default());

    let depth = Buffer2::new_filled(2, 2, 5.0);
    let map = evaluate_attenuation(&depth, &[fit, fit, fit]);
    assert!(map.iter().all(|px| *px == Vec3::ZERO));
}

#[test]
fn test_evaluation_limit_keeps_initial_guess() {
    let depths: Vec<f64> = (1..50).map(|i| i as f64 * 0.1).collect();
    let truth = AttenuationCoefficients::from_params(TRUTH);
    let raw: Vec<f64> = depths.iter().map(|&d| truth.evaluate(d)).collect();
    let config = FitConfig {
        max_evaluations: 3,
        ..FitConfig::default()
    };

    let fit = fit_channel(&depths, &raw, &config);
    assert_eq!(fit.status, FitStatus::EvaluationLimit);
    assert_eq!(fit.coefficients.to_params(), ATTENUATION_INITIAL);
}

#[test]
fn test_map_is_finite_on_random_scene() {
    let (image, depth) = random_scene(24, 16, 3);
    let backscatter = Buffer2::new_filled(24, 16, Vec3::splat(0.05));
    let illumination = crate::illumination::estimate_illumination(&image, &backscatter, 5);

    let estimate =
        estimate_attenuation(&image, &depth, &backscatter, &illumination, &Config::default());
    assert!(estimate.map.same_shape(&image));
    assert!(estimate.map.iter().all(|px| px.is_finite()));
    for fit in &estimate.channels {
        assert_eq!(fit.samples, 24 * 16);
    }
}
