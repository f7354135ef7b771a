use log::trace;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{GlycoError, Result};

/// Noise assumed for a segment without data points.
pub const EMPTY_SEGMENT_NOISE: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseMode {
    Whole,
    Segments,
}

/// Noise level of a spectrum.
///
/// `Segments` holds the estimates of the first and last quarter of the
/// spectrum, and the last m/z, to interpolate a position-dependent floor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NoiseProfile {
    Whole(f64),
    Segments {
        first_quarter: f64,
        last_quarter: f64,
        last_mz: f64,
    },
}

impl NoiseProfile {
    /// Noise floor at `mz`, `fallback` when the segment estimates are unreliable.
    pub fn local_noise(&self, mz: f64, fallback: f64) -> f64 {
        match *self {
            NoiseProfile::Whole(noise) => noise,
            NoiseProfile::Segments {
                first_quarter,
                last_quarter,
                last_mz,
            } => local_noise(first_quarter, last_quarter, last_mz, mz, fallback),
        }
    }
}

/// estimate the noise level of a spectrum
///
/// Arguments:
///
/// * `mz` - m/z values, ascending
/// * `intensity` - intensities, same length as `mz`
/// * `mode` - one estimate for the whole spectrum, or one per outer quarter
///
/// Returns:
///
/// * `NoiseProfile` - noise estimate(s) in intensity units
///
/// # Examples
///
/// ```
/// use glycocore::algorithm::noise::{estimate_noise, NoiseMode, NoiseProfile};
///
/// let noise = estimate_noise(&[100.0, 200.0, 300.0], &[0.0, 0.0, 0.0], NoiseMode::Whole).unwrap();
/// assert_eq!(noise, NoiseProfile::Whole(1.0));
/// ```
pub fn estimate_noise(mz: &[f64], intensity: &[f64], mode: NoiseMode) -> Result<NoiseProfile> {
    if mz.len() != intensity.len() {
        return Err(GlycoError::Shape {
            left: mz.len(),
            right: intensity.len(),
        });
    }

    match mode {
        NoiseMode::Whole => Ok(NoiseProfile::Whole(segment_noise(intensity))),
        NoiseMode::Segments => {
            let quarter = intensity.len() / 4;
            Ok(NoiseProfile::Segments {
                first_quarter: segment_noise(&intensity[..quarter]),
                last_quarter: segment_noise(&intensity[3 * quarter..]),
                last_mz: mz.last().copied().unwrap_or(0.0),
            })
        }
    }
}

/// Two standard deviations of the segment, unless the data look already
/// denoised or are all zero, in which case the smallest intensity (or 1.0 if
/// not positive). A flat nonzero segment has no noise.
fn segment_noise(intensity: &[f64]) -> f64 {
    if intensity.is_empty() {
        return EMPTY_SEGMENT_NOISE;
    }

    let min = intensity.min();
    let max = intensity.max();
    let threshold = 2.0 * intensity.population_std_dev();

    let denoised = (min > 0.0 && threshold > 5.0 * min) || threshold > 0.5 * max || max == 0.0;
    if denoised {
        trace!("Segment of {} points looks denoised, threshold {threshold}", intensity.len());
        return if min > 0.0 { min } else { EMPTY_SEGMENT_NOISE };
    }
    threshold
}

/// interpolate the noise floor between the first and last quarter estimates
///
/// Arguments:
///
/// * `first_quarter` - noise at m/z 0
/// * `last_quarter` - noise at `last_mz`
/// * `last_mz` - last m/z of the spectrum
/// * `mz` - position to evaluate
/// * `fallback` - returned when `last_mz` is 0 or one estimate exceeds the other more than 5 times
///
/// Returns:
///
/// * `noise` - local noise floor
///
/// # Examples
///
/// ```
/// use glycocore::algorithm::noise::local_noise;
///
/// assert_eq!(local_noise(10.0, 10.0, 50.0, 25.0, 99.0), 10.0);
/// assert_eq!(local_noise(10.0, 100.0, 0.0, 25.0, 99.0), 99.0);
/// ```
pub fn local_noise(first_quarter: f64, last_quarter: f64, last_mz: f64, mz: f64, fallback: f64) -> f64 {
    if last_mz == 0.0 || first_quarter > 5.0 * last_quarter || last_quarter > 5.0 * first_quarter {
        return fallback;
    }
    first_quarter + (last_quarter - first_quarter) / last_mz * mz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mz_axis(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_all_zero_whole_spectrum() {
        let intensity = [0.0; 5];
        let noise = estimate_noise(&mz_axis(5), &intensity, NoiseMode::Whole).unwrap();
        assert_eq!(noise, NoiseProfile::Whole(1.0));
    }

    #[test]
    fn test_flat_segment_has_no_noise() {
        let noise = estimate_noise(&mz_axis(4), &[5.0; 4], NoiseMode::Whole).unwrap();
        assert_eq!(noise, NoiseProfile::Whole(0.0));

        let spectrum = [5.0, 5.0, 5.0, 5.0, 9.0, 1.0, 9.0, 1.0];
        let NoiseProfile::Segments { first_quarter, .. } =
            estimate_noise(&mz_axis(8), &spectrum, NoiseMode::Segments).unwrap()
        else {
            panic!("expected segments");
        };
        assert_eq!(first_quarter, 0.0);
    }

    #[test]
    fn test_empty_spectrum() {
        assert_eq!(estimate_noise(&[], &[], NoiseMode::Whole).unwrap(), NoiseProfile::Whole(1.0));
        assert_eq!(
            estimate_noise(&[], &[], NoiseMode::Segments).unwrap(),
            NoiseProfile::Segments {
                first_quarter: 1.0,
                last_quarter: 1.0,
                last_mz: 0.0
            }
        );
    }

    #[test]
    fn test_noisy_segment_uses_two_sigma() {
        // population sigma of [10, 12, 14, 16] is sqrt(5)
        let intensity = [10.0, 12.0, 14.0, 16.0];
        let noise = estimate_noise(&mz_axis(4), &intensity, NoiseMode::Whole).unwrap();
        let expected = 2.0 * 5.0_f64.sqrt();
        match noise {
            NoiseProfile::Whole(value) => assert!((value - expected).abs() < 1e-12),
            other => panic!("unexpected profile {other:?}"),
        }
    }

    #[test]
    fn test_denoised_segment_falls_back_to_min() {
        // sparse peaks over a clean baseline: 2 sigma exceeds half the maximum
        let intensity = [5.0, 5.0, 5.0, 1000.0];
        let noise = estimate_noise(&mz_axis(4), &intensity, NoiseMode::Whole).unwrap();
        assert_eq!(noise, NoiseProfile::Whole(5.0));

        let with_zero = [0.0, 0.0, 0.0, 1000.0];
        let noise = estimate_noise(&mz_axis(4), &with_zero, NoiseMode::Whole).unwrap();
        assert_eq!(noise, NoiseProfile::Whole(1.0));
    }

    #[test]
    fn test_segments() {
        let mut intensity = vec![10.0, 12.0, 14.0, 16.0];
        intensity.extend([50.0; 8]);
        intensity.extend([20.0, 24.0, 28.0, 32.0]);
        let mz = mz_axis(intensity.len());
        let profile = estimate_noise(&mz, &intensity, NoiseMode::Segments).unwrap();

        let NoiseProfile::Segments {
            first_quarter,
            last_quarter,
            last_mz,
        } = profile
        else {
            panic!("expected segments");
        };
        assert!((first_quarter - 2.0 * 5.0_f64.sqrt()).abs() < 1e-12);
        assert!((last_quarter - 4.0 * 5.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(last_mz, 115.0);

        let middle = profile.local_noise(last_mz / 2.0, 0.0);
        assert!((middle - 3.0 * 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        assert_eq!(
            estimate_noise(&[1.0, 2.0], &[1.0], NoiseMode::Whole),
            Err(GlycoError::Shape { left: 2, right: 1 })
        );
    }

    #[test]
    fn test_local_noise_guards() {
        assert_eq!(local_noise(10.0, 10.0, 50.0, 25.0, 99.0), 10.0);
        assert_eq!(local_noise(10.0, 100.0, 0.0, 25.0, 99.0), 99.0);
        assert_eq!(local_noise(10.0, 51.0, 50.0, 25.0, 99.0), 99.0);
        assert_eq!(local_noise(10.0, 20.0, 50.0, 25.0, 99.0), 15.0);
        assert_eq!(NoiseProfile::Whole(7.0).local_noise(1e6, 99.0), 7.0);
    }
}
