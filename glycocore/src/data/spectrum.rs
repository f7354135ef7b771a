use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::noise::{estimate_noise, NoiseMode, NoiseProfile};
use crate::algorithm::statistics::whittaker_smooth;
use crate::error::{GlycoError, Result};

/// Represents a mass spectrum with associated m/z values and intensities.
///
/// Uses Arc<Vec<T>> so cloning is O(1).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MzSpectrum {
    pub mz: Arc<Vec<f64>>,
    pub intensity: Arc<Vec<f64>>,
}

impl MzSpectrum {
    /// Constructs a new `MzSpectrum`.
    ///
    /// # Arguments
    ///
    /// * `mz` - A vector of m/z values.
    /// * `intensity` - A vector of intensity values corresponding to the m/z values.
    ///
    /// # Errors
    ///
    /// Returns [`GlycoError::Shape`] if the lengths of `mz` and `intensity` differ.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use glycocore::data::spectrum::MzSpectrum;
    /// let spectrum = MzSpectrum::new(vec![100.0, 200.0], vec![10.0, 20.0]).unwrap();
    /// assert_eq!(*spectrum.mz, vec![100.0, 200.0]);
    /// assert!(MzSpectrum::new(vec![100.0], vec![]).is_err());
    /// ```
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if mz.len() != intensity.len() {
            return Err(GlycoError::Shape {
                left: mz.len(),
                right: intensity.len(),
            });
        }
        Ok(MzSpectrum {
            mz: Arc::new(mz),
            intensity: Arc::new(intensity),
        })
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Filters the m/z values and intensities based on a range of m/z values and intensities.
    pub fn filter_ranged(&self, mz_min: f64, mz_max: f64, intensity_min: f64, intensity_max: f64) -> Self {
        let (mz, intensity): (Vec<f64>, Vec<f64>) = self
            .mz
            .iter()
            .zip(self.intensity.iter())
            .filter(|&(&mz, &intensity)| {
                mz_min <= mz && mz <= mz_max && intensity >= intensity_min && intensity <= intensity_max
            })
            .unzip();
        MzSpectrum {
            mz: Arc::new(mz),
            intensity: Arc::new(intensity),
        }
    }

    pub fn noise_profile(&self, mode: NoiseMode) -> Result<NoiseProfile> {
        estimate_noise(&self.mz, &self.intensity, mode)
    }

    /// Noise floor at `mz` according to `profile`.
    pub fn local_noise(&self, profile: &NoiseProfile, mz: f64, fallback: f64) -> f64 {
        profile.local_noise(mz, fallback)
    }

    /// Intensities above the local noise floor.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use glycocore::algorithm::noise::NoiseProfile;
    /// # use glycocore::data::spectrum::MzSpectrum;
    /// let spectrum = MzSpectrum::new(vec![100.0, 101.0, 102.0], vec![5.0, 50.0, 8.0]).unwrap();
    /// let peaks = spectrum.above_noise(&NoiseProfile::Whole(10.0), 10.0);
    /// assert_eq!(*peaks.mz, vec![101.0]);
    /// ```
    pub fn above_noise(&self, profile: &NoiseProfile, fallback: f64) -> Self {
        let (mz, intensity): (Vec<f64>, Vec<f64>) = self
            .mz
            .iter()
            .zip(self.intensity.iter())
            .filter(|&(&mz, &intensity)| intensity > profile.local_noise(mz, fallback))
            .unzip();
        MzSpectrum {
            mz: Arc::new(mz),
            intensity: Arc::new(intensity),
        }
    }

    /// Spectrum with Whittaker-smoothed intensities.
    pub fn smoothed(&self, lambda: f64, order: usize) -> Result<Self> {
        Ok(MzSpectrum {
            mz: Arc::clone(&self.mz),
            intensity: Arc::new(whittaker_smooth(&self.intensity, lambda, order)?),
        })
    }
}

impl Display for MzSpectrum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (mz, i) = self
            .mz
            .iter()
            .zip(self.intensity.iter())
            .fold((0.0, 0.0), |(max_mz, max_i), (&mz, &i)| if i > max_i { (mz, i) } else { (max_mz, max_i) });

        write!(f, "MzSpectrum(data points: {}, max by intensity: ({:.3}, {}))", self.len(), mz, i)
    }
}
