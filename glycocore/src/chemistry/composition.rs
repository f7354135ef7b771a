use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GlycoError, Result};

static TERM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)(-)?(\d+)?").expect("term pattern is valid"));

/// Lowercase letters that open a residue symbol, as in `lS` and `eS`.
const RESIDUE_PREFIXES: [u8; 2] = [b'l', b'e'];

/// Canonical order of the organic elements when writing formulas.
const CANONICAL_ORDER: [&str; 4] = ["C", "O", "N", "H"];

/// Atomic composition: element symbol to signed count.
///
/// Zero counts are never stored, so a missing symbol reads as zero and two
/// compositions compare equal regardless of explicit zeros in their source.
/// Counts may be negative when the composition describes a delta, such as
/// the net elemental change of an adduct.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, i32>", into = "BTreeMap<String, i32>")]
pub struct AtomicComposition {
    counts: BTreeMap<String, i32>,
}

impl AtomicComposition {
    pub fn new() -> Self {
        AtomicComposition::default()
    }

    /// Build a composition from `(symbol, count)` pairs, summing repeated symbols.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::composition::AtomicComposition;
    ///
    /// let comp = AtomicComposition::from_pairs([("C", 6), ("H", 12), ("C", 1), ("N", 0)]).unwrap();
    /// assert_eq!(comp.get("C"), 7);
    /// assert_eq!(comp.get("N"), 0);
    /// assert_eq!(comp.len(), 2);
    /// ```
    pub fn from_pairs<S: AsRef<str>>(pairs: impl IntoIterator<Item = (S, i32)>) -> Result<Self> {
        let mut composition = AtomicComposition::new();
        for (symbol, count) in pairs {
            composition.add_count(symbol.as_ref(), count)?;
        }
        Ok(composition)
    }

    /// Build a composition from pairs whose symbols are all different, so no
    /// count accumulates. A repeated symbol keeps its last count.
    pub(crate) fn from_distinct<S: Into<String>>(pairs: impl IntoIterator<Item = (S, i32)>) -> Self {
        AtomicComposition {
            counts: pairs
                .into_iter()
                .filter(|(_, count)| *count != 0)
                .map(|(symbol, count)| (symbol.into(), count))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> i32 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    /// Add `count` atoms of `symbol`, dropping the entry if it cancels out.
    ///
    /// Fails with [`GlycoError::InvalidParameter`] if the count leaves the `i32` range.
    pub fn add_count(&mut self, symbol: &str, count: i32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let summed = self
            .get(symbol)
            .checked_add(count)
            .ok_or_else(|| count_overflow(symbol))?;
        if summed == 0 {
            self.counts.remove(symbol);
        } else {
            self.counts.insert(symbol.to_string(), summed);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct symbols with a nonzero count.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.counts.iter().map(|(symbol, &count)| (symbol.as_str(), count))
    }

    /// Signed sum of all counts. For an adduct this is its net raw charge.
    pub fn total(&self) -> i64 {
        self.counts.values().map(|&count| i64::from(count)).sum()
    }

    /// Sum of the absolute counts.
    pub fn absolute_total(&self) -> u64 {
        self.counts.values().map(|count| u64::from(count.unsigned_abs())).sum()
    }

    /// Entries in canonical order: C, O, N, H first, then the remaining
    /// symbols alphabetically.
    pub fn canonical_iter(&self) -> impl Iterator<Item = (&str, i32)> {
        let organic = CANONICAL_ORDER
            .iter()
            .filter_map(move |&symbol| self.counts.get_key_value(symbol));
        let rest = self
            .counts
            .iter()
            .filter(|(symbol, _)| !CANONICAL_ORDER.contains(&symbol.as_str()));
        organic.chain(rest).map(|(symbol, &count)| (symbol.as_str(), count))
    }

    /// Serialize to a formula string such as `C6O6H12` or `H-2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use glycocore::chemistry::composition::parse_composition;
    ///
    /// let comp = parse_composition("H12C6N0O6").unwrap();
    /// assert_eq!(comp.to_formula(), "C6O6H12");
    /// ```
    pub fn to_formula(&self) -> String {
        self.canonical_iter()
            .map(|(symbol, count)| format!("{symbol}{count}"))
            .collect()
    }
}

impl Display for AtomicComposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_formula())
    }
}

impl FromStr for AtomicComposition {
    type Err = GlycoError;

    fn from_str(s: &str) -> Result<Self> {
        parse_composition(s)
    }
}

impl From<BTreeMap<String, i32>> for AtomicComposition {
    fn from(counts: BTreeMap<String, i32>) -> Self {
        AtomicComposition::from_distinct(counts)
    }
}

impl From<AtomicComposition> for BTreeMap<String, i32> {
    fn from(composition: AtomicComposition) -> Self {
        composition.counts
    }
}

fn count_overflow(symbol: &str) -> GlycoError {
    GlycoError::InvalidParameter {
        name: "count",
        reason: format!("count of {symbol} overflows"),
    }
}

/// Split a run of letters into symbols.
///
/// A symbol is one uppercase letter, optionally opened by a residue prefix
/// (`l`, `e`) and optionally closed by one lowercase letter. A residue prefix
/// directly followed by an uppercase letter opens the next symbol instead, so
/// `lSeS` splits into `lS`, `eS` while `NaH` splits into `Na`, `H`.
/// On failure returns the offset of the offending letter.
fn split_symbols(letters: &str) -> std::result::Result<Vec<&str>, usize> {
    let bytes = letters.as_bytes();
    let opens_symbol = |at: usize| {
        RESIDUE_PREFIXES.contains(&bytes[at]) && bytes.get(at + 1).is_some_and(u8::is_ascii_uppercase)
    };

    let mut symbols = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = start;
        if bytes[end].is_ascii_lowercase() {
            if !opens_symbol(end) {
                return Err(end);
            }
            end += 1;
        }
        if !bytes[end].is_ascii_uppercase() {
            return Err(end);
        }
        end += 1;
        if end < bytes.len() && bytes[end].is_ascii_lowercase() && !opens_symbol(end) {
            end += 1;
        }
        symbols.push(&letters[start..end]);
        start = end;
    }
    Ok(symbols)
}

fn format_error(formula: &str, position: usize, reason: impl Into<String>) -> GlycoError {
    GlycoError::Format {
        formula: formula.to_string(),
        position,
        reason: reason.into(),
    }
}

/// Split a composition string into its `(symbol, count)` terms in written order.
///
/// A symbol without digits counts one. A `-` between a symbol and its digits
/// negates that count only.
pub(crate) fn parse_terms(formula: &str) -> Result<Vec<(String, i32)>> {
    let mut terms = Vec::new();
    let mut position = 0;

    while position < formula.len() {
        let rest = &formula[position..];
        let captures = TERM_PATTERN
            .captures(rest)
            .ok_or_else(|| format_error(formula, position, "expected an element or residue symbol"))?;

        let letters = &captures[1];
        let negative = captures.get(2).is_some();
        let digits = captures.get(3).map(|m| m.as_str());

        let symbols = split_symbols(letters).map_err(|offset| {
            format_error(formula, position + offset, format!("cannot split {letters:?} into symbols"))
        })?;

        let count = match digits {
            Some(digits) => digits
                .parse::<i32>()
                .map_err(|e| format_error(formula, position + letters.len(), e.to_string()))?,
            None if negative => {
                return Err(format_error(formula, position + letters.len(), "sign without a count"))
            }
            None => 1,
        };

        // only the last symbol of a run owns the count, the others count one
        let (last, leading) = symbols.split_last().ok_or_else(|| {
            format_error(formula, position, "expected an element or residue symbol")
        })?;
        terms.extend(leading.iter().map(|symbol| (symbol.to_string(), 1)));
        terms.push((last.to_string(), if negative { -count } else { count }));

        position += captures[0].len();
    }

    Ok(terms)
}

/// Parse an atomic or adduct formula.
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::composition::parse_composition;
///
/// let comp = parse_composition("C6O6N0H12").unwrap();
/// assert_eq!(comp.get("C"), 6);
/// assert_eq!(comp.get("N"), 0);
///
/// let adduct = parse_composition("H-2").unwrap();
/// assert_eq!(adduct.get("H"), -2);
/// ```
pub fn parse_composition(formula: &str) -> Result<AtomicComposition> {
    AtomicComposition::from_pairs(parse_terms(formula)?)
}

/// Net raw charge of an adduct formula, the sum of its counts.
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::composition::charge_of_adduct_formula;
///
/// assert_eq!(charge_of_adduct_formula("H3Na1").unwrap(), 4);
/// assert_eq!(charge_of_adduct_formula("H-2").unwrap(), -2);
/// ```
pub fn charge_of_adduct_formula(formula: &str) -> Result<i32> {
    parse_terms(formula)?
        .iter()
        .try_fold(0i32, |charge, (symbol, count)| charge.checked_add(*count).ok_or_else(|| count_overflow(symbol)))
}

/// Element-wise sum over the union of symbols.
pub fn sum_atomic(compositions: &[&AtomicComposition]) -> Result<AtomicComposition> {
    let mut summed = AtomicComposition::new();
    for composition in compositions {
        for (symbol, count) in composition.iter() {
            summed.add_count(symbol, count)?;
        }
    }
    Ok(summed)
}

/// Count the letters of a combinatorial sequence such as `CCCCOONH`.
///
/// `L` and `E` stand for the lactonized and ethyl-esterified sialic acids
/// (`lS` and `eS`), which cannot be written as a single letter.
pub fn count_sequence_letters(sequence: &str) -> Result<AtomicComposition> {
    let mut composition = AtomicComposition::new();
    for letter in sequence.chars() {
        let symbol = match letter {
            'L' => "lS".to_string(),
            'E' => "eS".to_string(),
            other => other.to_string(),
        };
        composition.add_count(&symbol, 1)?;
    }
    Ok(composition)
}
