use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::chemistry::composition::AtomicComposition;
use crate::chemistry::constants::AVERAGE_ATOM_MASS;
use crate::chemistry::elements::principal_isotope;
use crate::config::SearchLimits;
use crate::error::{GlycoError, Result};

const TAG_ELEMENTS: [&str; 4] = ["C", "O", "N", "H"];

/// Best elemental composition found for a tag mass.
///
/// An empty composition with mass 0 means no candidate beat the sentinel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagMatch {
    pub composition: AtomicComposition,
    pub mass: f64,
    pub target_mass: f64,
}

impl TagMatch {
    fn sentinel(target_mass: f64) -> Self {
        TagMatch {
            composition: AtomicComposition::new(),
            mass: 0.0,
            target_mass,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.composition.is_empty()
    }

    pub fn error(&self) -> f64 {
        (self.target_mass - self.mass).abs()
    }

    pub fn into_result(self) -> Result<Self> {
        if self.is_found() {
            Ok(self)
        } else {
            Err(GlycoError::NoMatchFound(self.target_mass))
        }
    }
}

/// Brute-force search for the C/O/N/H composition closest to a target mass.
#[derive(Clone, Debug, Default)]
pub struct TagCompositionSearch {
    limits: SearchLimits,
}

impl TagCompositionSearch {
    pub fn new(limits: SearchLimits) -> Self {
        TagCompositionSearch { limits }
    }

    /// Find the composition whose monoisotopic mass is closest to `target_mass`.
    ///
    /// Atom counts run from `floor(target_mass / 5)` down to 1. Within a count,
    /// candidates are visited as multisets over `C, O, N, H` in that order, and
    /// only a strictly closer candidate replaces the current best.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::algorithm::tag::TagCompositionSearch;
    /// use glycocore::config::SearchLimits;
    ///
    /// let search = TagCompositionSearch::new(SearchLimits::default());
    /// let water = search.best_match(18.0105646837).unwrap();
    /// assert_eq!(water.composition.to_formula(), "O1H2");
    ///
    /// assert!(!search.best_match(0.0).unwrap().is_found());
    /// ```
    pub fn best_match(&self, target_mass: f64) -> Result<TagMatch> {
        if !target_mass.is_finite() || target_mass < 0.0 {
            return Err(GlycoError::InvalidParameter {
                name: "target_mass",
                reason: format!("{target_mass} is not a non-negative mass"),
            });
        }

        let max_atoms = (target_mass / AVERAGE_ATOM_MASS).floor() as usize;
        if max_atoms > self.limits.max_tag_atoms {
            return Err(GlycoError::SearchLimitExceeded {
                what: "tag atom count",
                requested: max_atoms,
                limit: self.limits.max_tag_atoms,
            });
        }

        let masses = element_masses()?;
        let mut best_counts: Option<[usize; 4]> = None;
        let mut best_mass = 0.0;
        let mut best_error = target_mass.abs();

        for atoms in (1..=max_atoms).rev() {
            // multiset order over C, O, N, H: C-heaviest first
            for c in (0..=atoms).rev() {
                for o in (0..=atoms - c).rev() {
                    for n in (0..=atoms - c - o).rev() {
                        let counts = [c, o, n, atoms - c - o - n];
                        let mass: f64 = counts.iter().zip(masses.iter()).map(|(&k, m)| k as f64 * m).sum();
                        let error = (target_mass - mass).abs();
                        if error < best_error {
                            best_error = error;
                            best_mass = mass;
                            best_counts = Some(counts);
                        }
                    }
                }
            }
            trace!("Tag search at {atoms} atoms, best error {best_error}");
        }

        let Some(counts) = best_counts else {
            debug!("No tag composition found for mass {target_mass}");
            return Ok(TagMatch::sentinel(target_mass));
        };

        let pairs = TAG_ELEMENTS
            .iter()
            .zip(counts)
            .map(|(symbol, count)| {
                i32::try_from(count)
                    .map(|count| (*symbol, count))
                    .map_err(|_| GlycoError::InvalidParameter {
                        name: "tag_mass",
                        reason: format!("{count} {symbol} atoms exceed the atom count range"),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let composition = AtomicComposition::from_distinct(pairs);
        debug!("Tag mass {target_mass} matched {composition} at {best_mass}");
        Ok(TagMatch {
            composition,
            mass: best_mass,
            target_mass,
        })
    }
}

fn element_masses() -> Result<[f64; 4]> {
    let mut masses = [0.0; 4];
    for (mass, symbol) in masses.iter_mut().zip(TAG_ELEMENTS) {
        *mass = principal_isotope(symbol)
            .ok_or_else(|| GlycoError::UnknownElement(symbol.to_string()))?
            .mass;
    }
    Ok(masses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::composition::parse_composition;
    use crate::chemistry::formulas::monoisotopic_mass;

    #[test]
    fn test_recovers_exact_composition() {
        let glucose = parse_composition("C6O6H12").unwrap();
        let mass = monoisotopic_mass(&glucose).unwrap();
        let found = TagCompositionSearch::default().best_match(mass).unwrap();
        assert_eq!(found.composition, glucose);
        assert!(found.error() < 1e-9);
        assert!((found.mass - mass).abs() < 1e-9);
    }

    #[test]
    fn test_reported_mass_matches_composition() {
        let found = TagCompositionSearch::default().best_match(133.7).unwrap();
        assert!(found.is_found());
        let mass = monoisotopic_mass(&found.composition).unwrap();
        assert!((found.mass - mass).abs() < 1e-9);
        assert!(found.error() < 0.5);
    }

    #[test]
    fn test_small_targets_return_sentinel() {
        let search = TagCompositionSearch::default();
        for target in [0.0, 4.99] {
            let found = search.best_match(target).unwrap();
            assert!(found.composition.is_empty());
            assert_eq!(found.mass, 0.0);
            assert_eq!(found.into_result(), Err(GlycoError::NoMatchFound(target)));
        }
    }

    #[test]
    fn test_limit_and_invalid_target() {
        let search = TagCompositionSearch::new(SearchLimits {
            max_tag_atoms: 10,
            ..SearchLimits::default()
        });
        assert!(matches!(
            search.best_match(100.0),
            Err(GlycoError::SearchLimitExceeded { requested: 20, limit: 10, .. })
        ));
        assert!(matches!(search.best_match(-1.0), Err(GlycoError::InvalidParameter { .. })));
        assert!(matches!(search.best_match(f64::NAN), Err(GlycoError::InvalidParameter { .. })));
    }
}
