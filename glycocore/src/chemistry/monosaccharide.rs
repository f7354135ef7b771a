use std::fmt::{self, Display, Formatter};
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chemistry::composition::{parse_terms, AtomicComposition};
use crate::error::{GlycoError, Result};

/// Monosaccharide residues of the glycan alphabet, plus the reducing-end tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Monosaccharide {
    Hexose,
    HexNAc,
    NeuAc,
    LactonizedNeuAc,
    EthylEsterifiedNeuAc,
    Fucose,
    NeuGc,
    Tag,
}

/// Atom counts per residue in `C, O, N, H` order.
type ResidueAtoms = [i32; 4];

const ATOM_SYMBOLS: [&str; 4] = ["C", "O", "N", "H"];

impl Monosaccharide {
    pub const ALL: [Monosaccharide; 8] = [
        Monosaccharide::Hexose,
        Monosaccharide::HexNAc,
        Monosaccharide::NeuAc,
        Monosaccharide::LactonizedNeuAc,
        Monosaccharide::EthylEsterifiedNeuAc,
        Monosaccharide::Fucose,
        Monosaccharide::NeuGc,
        Monosaccharide::Tag,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Monosaccharide::Hexose => "H",
            Monosaccharide::HexNAc => "N",
            Monosaccharide::NeuAc => "S",
            Monosaccharide::LactonizedNeuAc => "lS",
            Monosaccharide::EthylEsterifiedNeuAc => "eS",
            Monosaccharide::Fucose => "F",
            Monosaccharide::NeuGc => "G",
            Monosaccharide::Tag => "T",
        }
    }

    pub fn from_symbol(symbol: &str) -> Result<Monosaccharide> {
        Monosaccharide::ALL
            .into_iter()
            .find(|mono| mono.symbol() == symbol)
            .ok_or_else(|| GlycoError::UnknownMonosaccharide(symbol.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Monosaccharide::Hexose => "Hexose",
            Monosaccharide::HexNAc => "N-Acetyl Hexosamine",
            Monosaccharide::NeuAc => "Acetyl Neuraminic Acid",
            Monosaccharide::LactonizedNeuAc => "Lactonized Acetyl Neuraminic Acid alpha2,3 bound",
            Monosaccharide::EthylEsterifiedNeuAc => "Ethyl-Esterified Acetyl Neuraminic Acid alpha2,6 bound",
            Monosaccharide::Fucose => "Fucose",
            Monosaccharide::NeuGc => "Glycolyl Neuraminic Acid",
            Monosaccharide::Tag => "Reducing End Tag",
        }
    }

    /// Molecular formula of the free monosaccharide. The tag has none.
    pub fn free_formula(&self) -> Option<&'static str> {
        match self {
            Monosaccharide::Hexose => Some("C6O6H12"),
            Monosaccharide::HexNAc => Some("C8O6N1H15"),
            Monosaccharide::NeuAc => Some("C11O9N1H19"),
            Monosaccharide::LactonizedNeuAc => Some("C11O8N2H20"),
            Monosaccharide::EthylEsterifiedNeuAc => Some("C13O9N1H23"),
            Monosaccharide::Fucose => Some("C6O5H12"),
            Monosaccharide::NeuGc => Some("C11O10N1H19"),
            Monosaccharide::Tag => None,
        }
    }

    /// Residue (dehydrated) atom counts as found inside a glycan chain.
    fn residue_atoms(&self) -> ResidueAtoms {
        match self {
            Monosaccharide::Hexose => [6, 5, 0, 10],
            Monosaccharide::HexNAc => [8, 5, 1, 13],
            Monosaccharide::NeuAc => [11, 8, 1, 17],
            Monosaccharide::LactonizedNeuAc => [11, 7, 2, 18],
            Monosaccharide::EthylEsterifiedNeuAc => [13, 8, 1, 21],
            Monosaccharide::Fucose => [6, 4, 0, 10],
            Monosaccharide::NeuGc => [11, 9, 1, 17],
            Monosaccharide::Tag => [0, 0, 0, 0],
        }
    }

    /// Carbons and hydrogens gained by each residue on permethylation.
    fn methylation_atoms(&self) -> ResidueAtoms {
        match self {
            Monosaccharide::Hexose | Monosaccharide::HexNAc => [3, 0, 0, 6],
            Monosaccharide::Fucose => [2, 0, 0, 4],
            Monosaccharide::NeuAc | Monosaccharide::NeuGc => [5, 0, 0, 10],
            _ => [0, 0, 0, 0],
        }
    }

    /// Atom counts of the residue, derived fresh for the permethylated form.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::monosaccharide::Monosaccharide;
    ///
    /// let native = Monosaccharide::Hexose.atoms(false);
    /// let permethylated = Monosaccharide::Hexose.atoms(true);
    /// assert_eq!(native.get("C") + 3, permethylated.get("C"));
    /// assert_eq!(Monosaccharide::Hexose.atoms(true), permethylated);
    /// ```
    pub fn atoms(&self, permethylated: bool) -> AtomicComposition {
        let mut atoms = self.residue_atoms();
        if permethylated {
            for (count, extra) in atoms.iter_mut().zip(self.methylation_atoms()) {
                *count += extra;
            }
        }
        AtomicComposition::from_distinct(ATOM_SYMBOLS.into_iter().zip(atoms))
    }
}

impl Display for Monosaccharide {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Counts of each residue of the glycan alphabet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonosaccharideComposition {
    counts: [u32; 8],
}

impl MonosaccharideComposition {
    pub fn new() -> Self {
        MonosaccharideComposition::default()
    }

    pub fn from_counts(counts: impl IntoIterator<Item = (Monosaccharide, u32)>) -> Result<Self> {
        let mut composition = MonosaccharideComposition::new();
        for (mono, count) in counts {
            composition.add_count(mono, count)?;
        }
        Ok(composition)
    }

    /// Add `count` residues of `mono`, failing if the count leaves the `u32` range.
    pub fn add_count(&mut self, mono: Monosaccharide, count: u32) -> Result<()> {
        self[mono] = self[mono].checked_add(count).ok_or_else(|| GlycoError::InvalidParameter {
            name: "count",
            reason: format!("count of {} overflows", mono.symbol()),
        })?;
        Ok(())
    }

    pub fn get(&self, mono: Monosaccharide) -> u32 {
        self[mono]
    }

    /// Total number of monosaccharides, excluding the tag.
    pub fn total(&self) -> u64 {
        Monosaccharide::ALL
            .iter()
            .filter(|&&mono| mono != Monosaccharide::Tag)
            .map(|&mono| u64::from(self[mono]))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Monosaccharide, u32)> + '_ {
        Monosaccharide::ALL.into_iter().map(|mono| (mono, self[mono]))
    }

    /// Element-wise sum over the residue alphabet.
    pub fn sum(compositions: &[&MonosaccharideComposition]) -> Result<MonosaccharideComposition> {
        let mut summed = MonosaccharideComposition::new();
        for composition in compositions {
            for (mono, count) in composition.iter() {
                summed.add_count(mono, count)?;
            }
        }
        Ok(summed)
    }

    /// Formula string in alphabet order, skipping zero counts.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::monosaccharide::MonosaccharideComposition;
    ///
    /// let glycan: MonosaccharideComposition = "F1H5N4S1".parse().unwrap();
    /// assert_eq!(glycan.to_formula(), "H5N4S1F1");
    /// ```
    pub fn to_formula(&self) -> String {
        self.iter()
            .filter(|(_, count)| *count != 0)
            .map(|(mono, count)| format!("{}{}", mono.symbol(), count))
            .collect()
    }

    /// Convert to an atomic composition over `C, O, N, H`. Tags contribute nothing.
    ///
    /// The permethylated variant is derived per call, so repeated calls with
    /// `permethylated = true` always agree.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::monosaccharide::MonosaccharideComposition;
    ///
    /// let glycan: MonosaccharideComposition = "H3N2".parse().unwrap();
    /// assert_eq!(glycan.to_atoms(false).unwrap().to_formula(), "C34O25N2H56");
    /// ```
    pub fn to_atoms(&self, permethylated: bool) -> Result<AtomicComposition> {
        let mut atoms = AtomicComposition::new();
        for (mono, count) in self.iter() {
            if mono == Monosaccharide::Tag || count == 0 {
                continue;
            }
            let overflow = || GlycoError::InvalidParameter {
                name: "count",
                reason: format!("{count} residues of {} exceed the atom count range", mono.symbol()),
            };
            let count = i32::try_from(count).map_err(|_| overflow())?;
            for (symbol, per_residue) in mono.atoms(permethylated).iter() {
                atoms.add_count(symbol, per_residue.checked_mul(count).ok_or_else(overflow)?)?;
            }
        }
        Ok(atoms)
    }
}

impl Index<Monosaccharide> for MonosaccharideComposition {
    type Output = u32;

    fn index(&self, mono: Monosaccharide) -> &u32 {
        &self.counts[mono as usize]
    }
}

impl IndexMut<Monosaccharide> for MonosaccharideComposition {
    fn index_mut(&mut self, mono: Monosaccharide) -> &mut u32 {
        &mut self.counts[mono as usize]
    }
}

impl FromStr for MonosaccharideComposition {
    type Err = GlycoError;

    fn from_str(s: &str) -> Result<Self> {
        let mut composition = MonosaccharideComposition::new();
        for (symbol, count) in parse_terms(s)? {
            let mono = Monosaccharide::from_symbol(&symbol)?;
            let count = u32::try_from(count).map_err(|_| GlycoError::NegativeCount {
                symbol: symbol.clone(),
                count,
            })?;
            composition.add_count(mono, count)?;
        }
        Ok(composition)
    }
}

impl Display for MonosaccharideComposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_formula())
    }
}

/// Sum glycan formulas such as `H5N4` and `S1F1`.
///
/// Fails with [`GlycoError::UnknownMonosaccharide`] if a formula names a
/// residue outside the alphabet.
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::monosaccharide::{sum_monosaccharides, Monosaccharide};
///
/// let summed = sum_monosaccharides(&["H5N4", "S1F1", "T1"]).unwrap();
/// assert_eq!(summed.get(Monosaccharide::Hexose), 5);
/// assert_eq!(summed.get(Monosaccharide::Tag), 1);
/// assert!(sum_monosaccharides(&["H5X1"]).is_err());
/// ```
pub fn sum_monosaccharides(formulas: &[&str]) -> Result<MonosaccharideComposition> {
    let compositions = formulas
        .iter()
        .map(|formula| formula.parse::<MonosaccharideComposition>())
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&MonosaccharideComposition> = compositions.iter().collect();
    MonosaccharideComposition::sum(&refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::composition::parse_composition;

    #[test]
    fn test_symbol_round_trip() {
        for mono in Monosaccharide::ALL {
            assert_eq!(Monosaccharide::from_symbol(mono.symbol()).unwrap(), mono);
        }
        assert_eq!(
            Monosaccharide::from_symbol("X"),
            Err(GlycoError::UnknownMonosaccharide("X".to_string()))
        );
    }

    #[test]
    fn test_residue_is_free_sugar_minus_water() {
        for mono in Monosaccharide::ALL {
            let Some(formula) = mono.free_formula() else {
                continue;
            };
            let free = parse_composition(formula).unwrap();
            let residue = mono.atoms(false);
            assert_eq!(free.get("O") - 1, residue.get("O"), "{mono}");
            assert_eq!(free.get("H") - 2, residue.get("H"), "{mono}");
            assert_eq!(free.get("C"), residue.get("C"), "{mono}");
        }
    }

    #[test]
    fn test_to_atoms() {
        let glycan: MonosaccharideComposition = "H5N4S1F1".parse().unwrap();
        let atoms = glycan.to_atoms(false).unwrap();
        assert_eq!(atoms.get("C"), 5 * 6 + 4 * 8 + 11 + 6);
        assert_eq!(atoms.get("O"), 5 * 5 + 4 * 5 + 8 + 4);
        assert_eq!(atoms.get("N"), 4 + 1);
        assert_eq!(atoms.get("H"), 5 * 10 + 4 * 13 + 17 + 10);
    }

    #[test]
    fn test_tag_contributes_no_atoms() {
        let tagged: MonosaccharideComposition = "H3N2T1".parse().unwrap();
        let untagged: MonosaccharideComposition = "H3N2".parse().unwrap();
        assert_eq!(tagged.to_atoms(false).unwrap(), untagged.to_atoms(false).unwrap());
        assert_eq!(tagged.total(), 5);
    }

    #[test]
    fn test_permethylation_is_idempotent() {
        let glycan: MonosaccharideComposition = "H5N4S1F1G1".parse().unwrap();
        let native = glycan.to_atoms(false).unwrap();
        let first = glycan.to_atoms(true).unwrap();
        let second = glycan.to_atoms(true).unwrap();
        assert_eq!(first, second);
        assert_eq!(glycan.to_atoms(false).unwrap(), native);
        // 9 x (3C 6H) + 2 x (5C 10H) + (2C 4H)
        assert_eq!(first.get("C") - native.get("C"), 27 + 10 + 2);
        assert_eq!(first.get("H") - native.get("H"), 54 + 20 + 4);
        assert_eq!(first.get("O"), native.get("O"));
    }

    #[test]
    fn test_modified_sialic_acids_are_not_methylated() {
        assert_eq!(
            Monosaccharide::LactonizedNeuAc.atoms(true),
            Monosaccharide::LactonizedNeuAc.atoms(false)
        );
        assert_eq!(
            Monosaccharide::EthylEsterifiedNeuAc.atoms(true),
            Monosaccharide::EthylEsterifiedNeuAc.atoms(false)
        );
    }

    #[test]
    fn test_sum_and_format() {
        let summed = sum_monosaccharides(&["H5N4", "lS1eS1", "H1"]).unwrap();
        assert_eq!(summed.to_formula(), "H6N4lS1eS1");
        assert!(matches!(
            sum_monosaccharides(&["H5Q1"]),
            Err(GlycoError::UnknownMonosaccharide(symbol)) if symbol == "Q"
        ));
    }

    #[test]
    fn test_negative_residue_count_rejected() {
        assert!(matches!(
            "H-1".parse::<MonosaccharideComposition>(),
            Err(GlycoError::NegativeCount { count: -1, .. })
        ));
    }

    #[test]
    fn test_residue_runs_without_counts() {
        let glycan: MonosaccharideComposition = "H5lSeSF".parse().unwrap();
        assert_eq!(glycan.to_formula(), "H5lS1eS1F1");
        assert_eq!(glycan.total(), 8);
    }

    #[test]
    fn test_count_overflow_is_an_error() {
        assert!(matches!(
            "H2147483647H2147483647H2".parse::<MonosaccharideComposition>(),
            Err(GlycoError::InvalidParameter { .. })
        ));
        let huge: MonosaccharideComposition = "H2147483647".parse().unwrap();
        assert!(matches!(huge.to_atoms(false), Err(GlycoError::InvalidParameter { .. })));
        assert!(MonosaccharideComposition::sum(&[&huge, &huge]).is_ok());
        assert_eq!(huge.total(), 2147483647);
    }
}
