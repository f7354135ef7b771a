use serde::{Deserialize, Serialize};

use crate::chemistry::composition::AtomicComposition;
use crate::chemistry::constants::{MASS_ELECTRON, MASS_PROTON};
use crate::chemistry::elements::principal_isotope;
use crate::error::{GlycoError, Result};

/// calculate the monoisotopic mass of an atomic composition
///
/// Arguments:
///
/// * `composition` - atomic composition, negative counts subtract mass
///
/// Returns:
///
/// * `mass` - monoisotopic mass built from each element's most abundant isotope
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::composition::parse_composition;
/// use glycocore::chemistry::formulas::monoisotopic_mass;
///
/// let water = parse_composition("H2O1").unwrap();
/// let mass = monoisotopic_mass(&water).unwrap();
/// assert!((mass - 18.0105646837).abs() < 1e-9);
/// ```
pub fn monoisotopic_mass(composition: &AtomicComposition) -> Result<f64> {
    composition.iter().try_fold(0.0, |acc, (symbol, count)| -> Result<f64> {
        let isotope = principal_isotope(symbol).ok_or_else(|| GlycoError::UnknownElement(symbol.to_string()))?;
        Ok(acc + isotope.mass * count as f64)
    })
}

/// calculate the m/z of a protonated ion
///
/// Arguments:
///
/// * `mono_mass` - monoisotopic mass of the ion
/// * `charge` - charge state of the ion
///
/// Returns:
///
/// * `mz` - mass-over-charge of the ion
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::formulas::calculate_mz;
///
/// let mz = calculate_mz(1000.0, 2);
/// assert_eq!(mz, 501.007276466621);
/// ```
pub fn calculate_mz(monoisotopic_mass: f64, charge: i32) -> f64 {
    (monoisotopic_mass + charge as f64 * MASS_PROTON) / charge as f64
}

/// calculate the m/z of a neutral molecule carrying an adduct combination
///
/// Each unit of adduct count carries one elementary charge, so the ion loses
/// one electron mass per positive charge and gains one per negative charge.
///
/// Arguments:
///
/// * `neutral_mass` - monoisotopic mass of the neutral molecule
/// * `adduct` - adduct combination, e.g. `{H: 2, Na: 1}` or `{H: -2}`
///
/// Returns:
///
/// * `mz` - mass-over-charge of the adduct ion
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::composition::parse_composition;
/// use glycocore::chemistry::formulas::{adduct_mz, calculate_mz};
///
/// let adduct = parse_composition("H2").unwrap();
/// let mz = adduct_mz(1000.0, &adduct).unwrap();
/// assert!((mz - calculate_mz(1000.0, 2)).abs() < 1e-6);
/// ```
pub fn adduct_mz(neutral_mass: f64, adduct: &AtomicComposition) -> Result<f64> {
    let charge = adduct.total();
    if charge == 0 {
        return Err(GlycoError::InvalidParameter {
            name: "adduct",
            reason: format!("{adduct} carries no net charge"),
        });
    }
    let ion_mass = neutral_mass + monoisotopic_mass(adduct)? - charge as f64 * MASS_ELECTRON;
    Ok(ion_mass / charge.unsigned_abs() as f64)
}

/// calculate the PPM difference between an observed and a target m/z
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::formulas::calculate_ppm_diff;
///
/// let ppm = calculate_ppm_diff(999.99, 1000.0);
/// assert!((ppm - 10.0).abs() < 1e-6);
/// ```
pub fn calculate_ppm_diff(mz: f64, target: f64) -> f64 {
    ((target - mz) / target) * 1e6
}

/// Mass accuracy, either relative (PPM) or as a fixed m/z window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum MassTolerance {
    Ppm(f64),
    Mz(f64),
}

impl MassTolerance {
    /// Absolute m/z tolerance at the given m/z.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::formulas::MassTolerance;
    ///
    /// let tolerance = MassTolerance::Ppm(10.0).to_mz(1000.0);
    /// assert!((tolerance - 0.01).abs() < 1e-12);
    /// assert_eq!(MassTolerance::Mz(0.02).to_mz(1000.0), 0.02);
    /// ```
    pub fn to_mz(&self, mz: f64) -> f64 {
        match self {
            MassTolerance::Ppm(ppm) => ppm * mz / 1e6,
            MassTolerance::Mz(window) => *window,
        }
    }

    pub fn from_unit(unit: &str, value: f64) -> Result<Self> {
        match unit {
            "ppm" => Ok(MassTolerance::Ppm(value)),
            "mz" | "pw" => Ok(MassTolerance::Mz(value)),
            other => Err(GlycoError::InvalidParameter {
                name: "accuracy_unit",
                reason: format!("{other:?} is neither 'ppm' nor 'mz'"),
            }),
        }
    }
}

impl Default for MassTolerance {
    fn default() -> Self {
        MassTolerance::Mz(0.01)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::composition::parse_composition;

    #[test]
    fn test_monoisotopic_mass_of_hexose() {
        let hexose = parse_composition("C6O6H12").unwrap();
        let mass = monoisotopic_mass(&hexose).unwrap();
        assert!((mass - 180.0633881).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_element() {
        let comp = parse_composition("Xe1").unwrap();
        assert_eq!(monoisotopic_mass(&comp), Err(GlycoError::UnknownElement("Xe".to_string())));
    }

    #[test]
    fn test_negative_mode_adduct_mz() {
        let deprotonated = parse_composition("H-1").unwrap();
        let mz = adduct_mz(180.0633881, &deprotonated).unwrap();
        assert!((mz - (180.0633881 - MASS_PROTON)).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_adduct_rejected() {
        let comp = parse_composition("H1Na-1").unwrap();
        assert!(matches!(adduct_mz(100.0, &comp), Err(GlycoError::InvalidParameter { .. })));
    }

    #[test]
    fn test_tolerance_from_unit() {
        assert_eq!(MassTolerance::from_unit("ppm", 5.0).unwrap(), MassTolerance::Ppm(5.0));
        assert_eq!(MassTolerance::from_unit("mz", 0.01).unwrap(), MassTolerance::Mz(0.01));
        assert!(MassTolerance::from_unit("da", 0.01).is_err());
    }
}
