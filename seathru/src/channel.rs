//! Per-channel fit bookkeeping shared by the backscatter and attenuation
//! estimators.

use serde::Serialize;

use crate::fitting::{FitResult, FitStatus};

pub const CHANNEL_NAMES: [&str; 3] = ["red", "green", "blue"];

/// Fitted coefficients of one color channel plus how they were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelFit<C> {
    pub coefficients: C,
    pub status: FitStatus,
    /// Samples handed to the fitter.
    pub samples: usize,
    pub iterations: usize,
    pub evaluations: usize,
}

impl<C> ChannelFit<C> {
    /// A channel for which no fit was attempted.
    pub(crate) fn without_fit(coefficients: C, status: FitStatus, samples: usize) -> Self {
        Self {
            coefficients,
            status,
            samples,
            iterations: 0,
            evaluations: 0,
        }
    }

    pub(crate) fn from_result<const N: usize>(
        result: &FitResult<N>,
        samples: usize,
        to_coefficients: impl FnOnce([f64; N]) -> C,
    ) -> Self {
        Self {
            coefficients: to_coefficients(result.params),
            status: result.status,
            samples,
            iterations: result.iterations,
            evaluations: result.evaluations,
        }
    }
}

/// Run `f` for channels 0, 1 and 2 on the rayon pool.
pub(crate) fn par_channels<T, F>(f: F) -> [T; 3]
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let (r, (g, b)) = rayon::join(|| f(0), || rayon::join(|| f(1), || f(2)));
    [r, g, b]
}

/// Log one channel's fit outcome; fallbacks are warnings.
pub(crate) fn log_channel_fit<C: std::fmt::Debug>(
    stage: &str,
    channel: usize,
    fit: &ChannelFit<C>,
) {
    let name = CHANNEL_NAMES[channel];
    if fit.status.is_fallback() {
        tracing::warn!(
            "{} fit for {} channel fell back ({}): {} samples, coefficients {:?}",
            stage,
            name,
            fit.status,
            fit.samples,
            fit.coefficients
        );
    } else {
        tracing::debug!(
            "{} fit for {} channel: {:?} ({} samples, {} iterations, {} evaluations)",
            stage,
            name,
            fit.coefficients,
            fit.samples,
            fit.iterations,
            fit.evaluations
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_par_channels_keeps_order() {
        assert_eq!(par_channels(|c| c * 10), [0, 10, 20]);
    }
}
