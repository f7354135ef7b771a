use std::collections::BTreeMap;

use log::debug;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use statrs::function::factorial::ln_factorial;

use crate::chemistry::composition::AtomicComposition;
use crate::chemistry::constants::{CLUMPING_DISTANCE, ISOTOPE_ABUNDANCE_FLOOR};
use crate::chemistry::elements::{element_isotopes, isotope_mass, principal_isotope, IsotopeData};
use crate::error::{GlycoError, Result};

/// Elements whose isotopes are resolved in fast mode.
pub const FAST_ISOTOPE_ALPHABET: [&str; 1] = ["C"];
/// Elements whose isotopes are resolved in full mode.
pub const FULL_ISOTOPE_ALPHABET: [&str; 4] = ["C", "N", "O", "H"];

/// A nuclide, identified by element and mass number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Isotope {
    pub element: String,
    pub mass_number: u16,
}

impl Isotope {
    pub fn new(element: &str, mass_number: u16) -> Self {
        Isotope {
            element: element.to_string(),
            mass_number,
        }
    }
}

/// Isotope-resolved composition of one isotopic state of a molecule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IsotopicComposition {
    counts: BTreeMap<Isotope, u32>,
}

impl IsotopicComposition {
    pub fn new() -> Self {
        IsotopicComposition::default()
    }

    pub fn add(&mut self, isotope: Isotope, count: u32) {
        if count > 0 {
            *self.counts.entry(isotope).or_insert(0) += count;
        }
    }

    pub fn get(&self, isotope: &Isotope) -> u32 {
        self.counts.get(isotope).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Isotope, u32)> {
        self.counts.iter().map(|(isotope, &count)| (isotope, count))
    }

    fn merged(&self, other: &IsotopicComposition) -> IsotopicComposition {
        let mut merged = self.clone();
        for (isotope, count) in other.iter() {
            merged.add(isotope.clone(), count);
        }
        merged
    }
}

/// Source of isotopic states and their masses.
///
/// The envelope calculation only depends on this capability, so it can be
/// driven by the built-in [`NaturalAbundance`] tables or by a test double.
pub trait IsotopeEnumerator {
    /// Enumerate the isotopic states of `atoms`, resolving isotopes only for
    /// the elements in `isotope_alphabet` and dropping every state whose
    /// abundance falls below `abundance_floor`.
    fn isotopic_states(
        &self,
        atoms: &AtomicComposition,
        isotope_alphabet: &[&str],
        abundance_floor: f64,
    ) -> Result<Vec<(IsotopicComposition, f64)>>;

    /// Exact mass of an isotopic state.
    fn calculate_mass(&self, state: &IsotopicComposition) -> Result<f64>;
}

/// Isotope enumeration from natural abundance tables.
///
/// Each element follows a multinomial distribution over its isotopes; the
/// molecule is the product of its elements. Any partial product below the
/// floor is pruned, which is exact since further factors cannot raise it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalAbundance;

impl NaturalAbundance {
    fn element_states(
        symbol: &str,
        count: u32,
        isotopes: &[IsotopeData],
        abundance_floor: f64,
    ) -> Vec<(IsotopicComposition, f64)> {
        let ln_total = ln_factorial(count as u64);
        let mut states = Vec::new();

        for split in distribute(count, isotopes.len()) {
            let ln_probability = split
                .iter()
                .zip(isotopes)
                .fold(ln_total, |acc, (&k, isotope)| {
                    acc - ln_factorial(k as u64) + k as f64 * isotope.abundance.ln()
                });
            let probability = ln_probability.exp();
            if probability < abundance_floor {
                continue;
            }

            let mut state = IsotopicComposition::new();
            for (&k, isotope) in split.iter().zip(isotopes) {
                state.add(Isotope::new(symbol, isotope.mass_number), k);
            }
            states.push((state, probability));
        }
        states
    }
}

impl IsotopeEnumerator for NaturalAbundance {
    fn isotopic_states(
        &self,
        atoms: &AtomicComposition,
        isotope_alphabet: &[&str],
        abundance_floor: f64,
    ) -> Result<Vec<(IsotopicComposition, f64)>> {
        let mut states = vec![(IsotopicComposition::new(), 1.0)];

        for (symbol, count) in atoms.iter() {
            let count = u32::try_from(count).map_err(|_| GlycoError::NegativeCount {
                symbol: symbol.to_string(),
                count,
            })?;

            let element_states = if isotope_alphabet.contains(&symbol) {
                let isotopes: Vec<IsotopeData> = element_isotopes(symbol)
                    .ok_or_else(|| GlycoError::UnknownElement(symbol.to_string()))?
                    .iter()
                    .copied()
                    .filter(|isotope| isotope.abundance > 0.0)
                    .collect();
                NaturalAbundance::element_states(symbol, count, &isotopes, abundance_floor)
            } else {
                let principal = principal_isotope(symbol).ok_or_else(|| GlycoError::UnknownElement(symbol.to_string()))?;
                let mut fixed = IsotopicComposition::new();
                fixed.add(Isotope::new(symbol, principal.mass_number), count);
                vec![(fixed, 1.0)]
            };

            states = states
                .iter()
                .flat_map(|(state, abundance)| {
                    element_states.iter().filter_map(move |(element_state, element_abundance)| {
                        let combined = abundance * element_abundance;
                        (combined >= abundance_floor).then(|| (state.merged(element_state), combined))
                    })
                })
                .collect();
        }

        Ok(states)
    }

    fn calculate_mass(&self, state: &IsotopicComposition) -> Result<f64> {
        state.iter().try_fold(0.0, |acc, (isotope, count)| -> Result<f64> {
            let mass = isotope_mass(&isotope.element, isotope.mass_number)
                .ok_or_else(|| GlycoError::UnknownElement(format!("{}{}", isotope.mass_number, isotope.element)))?;
            Ok(acc + mass * count as f64)
        })
    }
}

/// All ways of splitting `count` atoms over `slots` isotopes.
fn distribute(count: u32, slots: usize) -> Vec<Vec<u32>> {
    match slots {
        0 => Vec::new(),
        1 => vec![vec![count]],
        _ => (0..=count)
            .rev()
            .flat_map(|first| {
                distribute(count - first, slots - 1).into_iter().map(move |mut rest| {
                    rest.insert(0, first);
                    rest
                })
            })
            .collect(),
    }
}

/// One peak of an isotopic envelope.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsotopologuePeak {
    pub mass: f64,
    pub relative_abundance: f64,
}

/// Isotopic envelope as parallel mass and abundance vectors, sorted by mass.
/// Abundances are relative to the lowest-mass peak.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IsotopicEnvelope {
    pub abundances: Vec<f64>,
    pub masses: Vec<f64>,
}

impl IsotopicEnvelope {
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn monoisotopic_mass(&self) -> Option<f64> {
        self.masses.first().copied()
    }

    pub fn peaks(&self) -> Vec<IsotopologuePeak> {
        self.masses
            .iter()
            .zip(self.abundances.iter())
            .map(|(&mass, &relative_abundance)| IsotopologuePeak { mass, relative_abundance })
            .collect()
    }

    /// Merge peaks closer than half a hydrogen-1 mass to the previous kept peak.
    fn clumped(self) -> IsotopicEnvelope {
        let mut clumped = IsotopicEnvelope::default();
        for (mass, abundance) in self.masses.into_iter().zip(self.abundances) {
            match (clumped.masses.last_mut(), clumped.abundances.last_mut()) {
                (Some(last_mass), Some(last_abundance)) if (mass - *last_mass).abs() < CLUMPING_DISTANCE => {
                    *last_mass = (*last_mass + mass) / 2.0;
                    *last_abundance += abundance;
                }
                _ => {
                    clumped.masses.push(mass);
                    clumped.abundances.push(abundance);
                }
            }
        }
        clumped
    }
}

/// calculate the isotopic envelope of an atomic composition
///
/// Arguments:
///
/// * `enumerator` - source of isotopic states and masses
/// * `atoms` - atomic composition of the molecule
/// * `fast` - resolve carbon isotopes only
/// * `high_res` - keep isotopologues that differ by less than half a hydrogen mass apart
///
/// Returns:
///
/// * `IsotopicEnvelope` - masses ascending, abundances relative to the monoisotopic peak
///
/// # Examples
///
/// ```
/// use glycocore::algorithm::isotope::{isotopic_envelope, NaturalAbundance};
/// use glycocore::chemistry::composition::parse_composition;
///
/// let glucose = parse_composition("C6O6H12").unwrap();
/// let envelope = isotopic_envelope(&NaturalAbundance, &glucose, true, false).unwrap();
/// assert_eq!(envelope.abundances[0], 1.0);
/// assert_eq!(envelope.len(), 3);
/// ```
pub fn isotopic_envelope<E: IsotopeEnumerator + ?Sized>(
    enumerator: &E,
    atoms: &AtomicComposition,
    fast: bool,
    high_res: bool,
) -> Result<IsotopicEnvelope> {
    let alphabet: &[&str] = if fast { &FAST_ISOTOPE_ALPHABET } else { &FULL_ISOTOPE_ALPHABET };
    let states = enumerator.isotopic_states(atoms, alphabet, ISOTOPE_ABUNDANCE_FLOOR)?;

    let mut peaks = states
        .iter()
        .map(|(state, abundance)| -> Result<(f64, f64)> { Ok((enumerator.calculate_mass(state)?, *abundance)) })
        .collect::<Result<Vec<_>>>()?;
    peaks.sort_by_key(|(mass, _)| OrderedFloat(*mass));

    let monoisotopic_abundance = peaks.first().ok_or(GlycoError::EmptyDistribution)?.1;
    let envelope = IsotopicEnvelope {
        abundances: peaks.iter().map(|(_, abundance)| abundance / monoisotopic_abundance).collect(),
        masses: peaks.iter().map(|(mass, _)| *mass).collect(),
    };

    if !high_res && !fast {
        let raw = envelope.len();
        let clumped = envelope.clumped();
        debug!("Clumped {} isotopologues of {} into {} peaks", raw, atoms, clumped.len());
        return Ok(clumped);
    }
    Ok(envelope)
}

/// calculate isotopic envelopes for many compositions using multiple threads
///
/// Arguments:
///
/// * `enumerator` - source of isotopic states and masses
/// * `compositions` - atomic compositions to process
/// * `fast` - resolve carbon isotopes only
/// * `high_res` - skip clumping
/// * `num_threads` - number of threads to use
///
/// Returns:
///
/// * `Vec<IsotopicEnvelope>` - one envelope per composition, in input order
///
pub fn isotopic_envelopes<E: IsotopeEnumerator + Sync + ?Sized>(
    enumerator: &E,
    compositions: &[AtomicComposition],
    fast: bool,
    high_res: bool,
    num_threads: usize,
) -> Result<Vec<IsotopicEnvelope>> {
    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| GlycoError::InvalidParameter {
            name: "num_threads",
            reason: e.to_string(),
        })?;

    thread_pool.install(|| {
        compositions
            .par_iter()
            .map(|atoms| isotopic_envelope(enumerator, atoms, fast, high_res))
            .collect()
    })
}
