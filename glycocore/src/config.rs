use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::algorithm::adducts::{AdductCombinationGenerator, AdductSpec};
use crate::algorithm::isotope::{isotopic_envelope, IsotopicEnvelope, NaturalAbundance};
use crate::algorithm::tag::{TagCompositionSearch, TagMatch};
use crate::chemistry::composition::{parse_composition, sum_atomic, AtomicComposition};
use crate::chemistry::formulas::MassTolerance;
use crate::chemistry::monosaccharide::{Monosaccharide, MonosaccharideComposition};
use crate::error::Result;

/// Upper bounds on the combinatorial searches, owned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Largest `|max_charge|` accepted by adduct generation (default: 8)
    pub max_adduct_charge: usize,
    /// Largest starting atom count of the tag search (default: 200, i.e. a 1000 Da tag)
    pub max_tag_atoms: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_adduct_charge: 8,
            max_tag_atoms: 200,
        }
    }
}

/// Inclusive range of counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub const fn new(min: u32, max: u32) -> Self {
        Bounds { min, max }
    }

    pub fn contains(&self, count: impl Into<u64>) -> bool {
        (u64::from(self.min)..=u64::from(self.max)).contains(&count.into())
    }
}

/// Parameters of glycan library building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryParameters {
    /// Total monosaccharide count, tag excluded (default: 5 to 22)
    pub monosaccharides: Bounds,
    /// Hexoses (default: 3 to 10)
    pub hexoses: Bounds,
    /// N-acetylhexosamines (default: 2 to 8)
    pub hexnacs: Bounds,
    /// All sialic acids, acetylated and glycolylated (default: 0 to 4)
    pub sialic_acids: Bounds,
    /// Deoxyhexoses (default: 0 to 2)
    pub fucoses: Bounds,
    /// N-acetylneuraminic acids in any derivatized form (default: 0 to 4)
    pub neuacs: Bounds,
    /// N-glycolylneuraminic acids (default: 0 to 0)
    pub neugcs: Bounds,
    /// Maximum adducts formula, e.g. `H3Na1` (default: "H3")
    pub max_adducts: String,
    /// Maximum charge, negative for negative mode (default: 3)
    pub max_charges: i32,
    /// Adduct combinations never generated, as formulas (default: empty)
    pub adduct_exclusions: Vec<String>,
    /// Mass of a reducing-end tag, 0 for none (default: 0.0)
    pub tag_mass: f64,
    pub permethylated: bool,
    /// Reducing end reduced to an alditol, adding H2 (default: false)
    pub reduced: bool,
    /// Resolve carbon isotopes only (default: true)
    pub fast_iso: bool,
    /// Keep isotopologues closer than half a hydrogen mass apart (default: false)
    pub high_resolution_isotopic_dist: bool,
    pub tolerance: MassTolerance,
    pub limits: SearchLimits,
}

impl Default for LibraryParameters {
    fn default() -> Self {
        LibraryParameters {
            monosaccharides: Bounds::new(5, 22),
            hexoses: Bounds::new(3, 10),
            hexnacs: Bounds::new(2, 8),
            sialic_acids: Bounds::new(0, 4),
            fucoses: Bounds::new(0, 2),
            neuacs: Bounds::new(0, 4),
            neugcs: Bounds::new(0, 0),
            max_adducts: "H3".to_string(),
            max_charges: 3,
            adduct_exclusions: Vec::new(),
            tag_mass: 0.0,
            permethylated: false,
            reduced: false,
            fast_iso: true,
            high_resolution_isotopic_dist: false,
            tolerance: MassTolerance::default(),
            limits: SearchLimits::default(),
        }
    }
}

impl LibraryParameters {
    pub fn adduct_spec(&self) -> Result<AdductSpec> {
        AdductSpec::from_formula(&self.max_adducts)
    }

    pub fn exclusions(&self) -> Result<HashSet<AtomicComposition>> {
        self.adduct_exclusions.iter().map(|formula| parse_composition(formula)).collect()
    }

    /// All adduct combinations allowed by these parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::config::LibraryParameters;
    ///
    /// let params = LibraryParameters {
    ///     max_adducts: "H3Na1".to_string(),
    ///     max_charges: 2,
    ///     adduct_exclusions: vec!["Na1".to_string()],
    ///     ..LibraryParameters::default()
    /// };
    /// let formulas: Vec<String> = params.adduct_combinations().unwrap().iter().map(|c| c.to_formula()).collect();
    /// assert_eq!(formulas, vec!["H1", "H2", "H1Na1"]);
    /// ```
    pub fn adduct_combinations(&self) -> Result<Vec<AtomicComposition>> {
        AdductCombinationGenerator::new(self.adduct_spec()?)
            .with_limits(self.limits)
            .generate(&self.exclusions()?, self.max_charges)
    }

    /// Elemental composition of the tag, the empty sentinel when no tag is set.
    pub fn tag_match(&self) -> Result<TagMatch> {
        TagCompositionSearch::new(self.limits).best_match(self.tag_mass)
    }

    pub fn tolerance(&self) -> MassTolerance {
        self.tolerance
    }

    /// Whether a glycan composition falls inside every configured bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::monosaccharide::MonosaccharideComposition;
    /// use glycocore::config::LibraryParameters;
    ///
    /// let params = LibraryParameters::default();
    /// let biantennary: MonosaccharideComposition = "H5N4S2F1".parse().unwrap();
    /// let high_mannose: MonosaccharideComposition = "H12N2".parse().unwrap();
    /// assert!(params.within_bounds(&biantennary));
    /// assert!(!params.within_bounds(&high_mannose));
    /// ```
    pub fn within_bounds(&self, composition: &MonosaccharideComposition) -> bool {
        let neuacs: u64 = [
            Monosaccharide::NeuAc,
            Monosaccharide::LactonizedNeuAc,
            Monosaccharide::EthylEsterifiedNeuAc,
        ]
        .iter()
        .map(|&mono| u64::from(composition[mono]))
        .sum();
        let neugcs = u64::from(composition[Monosaccharide::NeuGc]);

        self.monosaccharides.contains(composition.total())
            && self.hexoses.contains(composition[Monosaccharide::Hexose])
            && self.hexnacs.contains(composition[Monosaccharide::HexNAc])
            && self.fucoses.contains(composition[Monosaccharide::Fucose])
            && self.neuacs.contains(neuacs)
            && self.neugcs.contains(neugcs)
            && self.sialic_acids.contains(neuacs + neugcs)
    }

    /// Neutral atoms of a glycan: its residues, water at the free reducing end,
    /// and H2 more when `reduced` is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::monosaccharide::MonosaccharideComposition;
    /// use glycocore::config::LibraryParameters;
    ///
    /// let glycan: MonosaccharideComposition = "H3N2".parse().unwrap();
    /// let free = LibraryParameters::default().glycan_atoms(&glycan).unwrap();
    /// assert_eq!(free.to_formula(), "C34O26N2H58");
    ///
    /// let reduced = LibraryParameters { reduced: true, ..LibraryParameters::default() };
    /// assert_eq!(reduced.glycan_atoms(&glycan).unwrap().get("H"), 60);
    /// ```
    pub fn glycan_atoms(&self, composition: &MonosaccharideComposition) -> Result<AtomicComposition> {
        let residues = composition.to_atoms(self.permethylated)?;
        let reducing_end = parse_composition(if self.reduced { "H4O1" } else { "H2O1" })?;
        sum_atomic(&[&residues, &reducing_end])
    }

    /// Isotopic envelope of a glycan under the configured isotope flags.
    pub fn glycan_envelope(&self, composition: &MonosaccharideComposition) -> Result<IsotopicEnvelope> {
        isotopic_envelope(
            &NaturalAbundance,
            &self.glycan_atoms(composition)?,
            self.fast_iso,
            self.high_resolution_isotopic_dist,
        )
    }
}
