use std::collections::HashSet;

use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::chemistry::composition::{parse_terms, AtomicComposition};
use crate::config::SearchLimits;
use crate::error::{GlycoError, Result};

/// Adduct species with the maximum count of each allowed in one combination.
///
/// Declaration order is kept, since it fixes the order of generated combinations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdductSpec {
    maxima: Vec<(String, i32)>,
}

impl AdductSpec {
    /// Repeated symbols keep their first position and sum their maxima.
    pub fn new<S: Into<String>>(maxima: impl IntoIterator<Item = (S, i32)>) -> Self {
        let mut spec = AdductSpec::default();
        for (symbol, max) in maxima {
            let symbol = symbol.into();
            match spec.maxima.iter_mut().find(|(known, _)| *known == symbol) {
                Some((_, known_max)) => *known_max += max,
                None => spec.maxima.push((symbol, max)),
            }
        }
        spec
    }

    /// Parse a maximum adducts formula such as `H3Na1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::algorithm::adducts::AdductSpec;
    ///
    /// let spec = AdductSpec::from_formula("H3Na1").unwrap();
    /// assert_eq!(spec.max_of("H"), 3);
    /// assert_eq!(spec.max_of("K"), 0);
    /// ```
    pub fn from_formula(formula: &str) -> Result<Self> {
        Ok(AdductSpec::new(parse_terms(formula)?))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> + Clone {
        self.maxima.iter().map(|(symbol, _)| symbol.as_str())
    }

    pub fn max_of(&self, symbol: &str) -> i32 {
        self.maxima
            .iter()
            .find(|(known, _)| known == symbol)
            .map_or(0, |(_, max)| *max)
    }

    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty()
    }

    fn allows(&self, combination: &AtomicComposition) -> bool {
        combination
            .iter()
            .all(|(symbol, count)| count.unsigned_abs() <= self.max_of(symbol).unsigned_abs())
    }
}

/// Enumerates every adduct combination allowed by an [`AdductSpec`].
#[derive(Clone, Debug)]
pub struct AdductCombinationGenerator {
    spec: AdductSpec,
    limits: SearchLimits,
}

impl AdductCombinationGenerator {
    pub fn new(spec: AdductSpec) -> Self {
        AdductCombinationGenerator {
            spec,
            limits: SearchLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn spec(&self) -> &AdductSpec {
        &self.spec
    }

    /// Generate the adduct combinations carrying 1 to `|max_charge|` charges.
    ///
    /// Each combination is a multiset of adduct symbols; every occurrence adds
    /// one to its symbol when `max_charge` is positive and subtracts one when
    /// negative. Combinations exceeding a declared maximum, or present in
    /// `exclusions`, are dropped. Output is ordered by combination size, then
    /// by multiset order over the declared symbols.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashSet;
    /// use glycocore::algorithm::adducts::{AdductCombinationGenerator, AdductSpec};
    ///
    /// let generator = AdductCombinationGenerator::new(AdductSpec::from_formula("H3Na1").unwrap());
    /// let combinations = generator.generate(&HashSet::new(), 2).unwrap();
    /// let formulas: Vec<String> = combinations.iter().map(|c| c.to_formula()).collect();
    /// assert_eq!(formulas, vec!["H1", "Na1", "H2", "H1Na1"]);
    /// ```
    pub fn generate(
        &self,
        exclusions: &HashSet<AtomicComposition>,
        max_charge: i32,
    ) -> Result<Vec<AtomicComposition>> {
        let size = max_charge.unsigned_abs() as usize;
        if size > self.limits.max_adduct_charge {
            return Err(GlycoError::SearchLimitExceeded {
                what: "adduct combination size",
                requested: size,
                limit: self.limits.max_adduct_charge,
            });
        }
        let step = max_charge.signum();

        let mut combinations = Vec::new();
        let mut discarded = 0usize;
        for k in 1..=size {
            for multiset in self.spec.symbols().combinations_with_replacement(k) {
                let combination = AtomicComposition::from_pairs(multiset.into_iter().map(|symbol| (symbol, step)))?;
                if !self.spec.allows(&combination) || exclusions.contains(&combination) {
                    trace!("Discarding adduct combination {combination}");
                    discarded += 1;
                    continue;
                }
                combinations.push(combination);
            }
        }

        debug!(
            "Generated {} adduct combinations for max charge {} ({} discarded)",
            combinations.len(),
            max_charge,
            discarded
        );
        Ok(combinations)
    }
}

/// Net raw charge carried by an adduct combination.
pub fn adduct_charge(combination: &AtomicComposition) -> i64 {
    combination.total()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::composition::parse_composition;

    fn generator(formula: &str) -> AdductCombinationGenerator {
        AdductCombinationGenerator::new(AdductSpec::from_formula(formula).unwrap())
    }

    #[test]
    fn test_respects_maxima_and_charge() {
        let combinations = generator("H3Na1").generate(&HashSet::new(), 3).unwrap();
        assert!(!combinations.is_empty());
        for combination in &combinations {
            assert!(combination.get("H").abs() <= 3);
            assert!(combination.get("Na").abs() <= 1);
            let total = combination.absolute_total();
            assert!((1..=3).contains(&total), "{combination} carries {total}");
        }
        // H1 Na1 H2 H1Na1 H3 H2Na1; Na2, HNa2, Na3 exceed the sodium maximum
        assert_eq!(combinations.len(), 6);
    }

    #[test]
    fn test_repeated_symbols_accumulate() {
        let combinations = generator("H3").generate(&HashSet::new(), 3).unwrap();
        let formulas: Vec<String> = combinations.iter().map(|c| c.to_formula()).collect();
        assert_eq!(formulas, vec!["H1", "H2", "H3"]);
        assert_eq!(adduct_charge(&combinations[2]), 3);
    }

    #[test]
    fn test_zero_charge_is_empty() {
        assert!(generator("H3Na1").generate(&HashSet::new(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_negative_mode() {
        let combinations = generator("H2").generate(&HashSet::new(), -2).unwrap();
        assert_eq!(
            combinations,
            vec![parse_composition("H-1").unwrap(), parse_composition("H-2").unwrap()]
        );
        assert_eq!(adduct_charge(&combinations[1]), -2);
    }

    #[test]
    fn test_exclusions() {
        let exclusions: HashSet<AtomicComposition> =
            [parse_composition("H1Na1").unwrap(), parse_composition("H3").unwrap()].into_iter().collect();
        let combinations = generator("H3Na1").generate(&exclusions, 3).unwrap();
        assert_eq!(combinations.len(), 4);
        assert!(combinations.iter().all(|c| !exclusions.contains(c)));
    }

    #[test]
    fn test_zero_maximum_symbol_never_appears() {
        let combinations = generator("H2K0").generate(&HashSet::new(), 2).unwrap();
        assert!(combinations.iter().all(|c| c.get("K") == 0));
        assert_eq!(combinations.len(), 2);
    }

    #[test]
    fn test_combinations_are_unique() {
        let combinations = generator("H3Na2K1").generate(&HashSet::new(), 4).unwrap();
        let unique: HashSet<&AtomicComposition> = combinations.iter().collect();
        assert_eq!(unique.len(), combinations.len());
    }

    #[test]
    fn test_search_limit() {
        let limited = generator("H3").with_limits(SearchLimits {
            max_adduct_charge: 2,
            ..SearchLimits::default()
        });
        assert!(matches!(
            limited.generate(&HashSet::new(), -3),
            Err(GlycoError::SearchLimitExceeded { requested: 3, limit: 2, .. })
        ));
    }

    #[test]
    fn test_repeated_spec_symbols_are_merged() {
        let spec = AdductSpec::new([("H", 1), ("Na", 1), ("H", 2)]);
        assert_eq!(spec.max_of("H"), 3);
        assert_eq!(spec.symbols().collect::<Vec<_>>(), vec!["H", "Na"]);
    }
}
