use std::collections::HashMap;

/// A single stable isotope of an element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsotopeData {
    pub mass_number: u16,
    pub mass: f64,
    pub abundance: f64,
}

const fn iso(mass_number: u16, mass: f64, abundance: f64) -> IsotopeData {
    IsotopeData { mass_number, mass, abundance }
}

const HYDROGEN: [IsotopeData; 2] = [iso(1, 1.00782503223, 0.999885), iso(2, 2.01410177812, 0.000115)];
const LITHIUM: [IsotopeData; 2] = [iso(6, 6.0151228874, 0.0759), iso(7, 7.0160034366, 0.9241)];
const CARBON: [IsotopeData; 2] = [iso(12, 12.0000000, 0.9893), iso(13, 13.00335483507, 0.0107)];
const NITROGEN: [IsotopeData; 2] = [iso(14, 14.00307400443, 0.99632), iso(15, 15.00010889888, 0.00368)];
const OXYGEN: [IsotopeData; 3] = [
    iso(16, 15.99491461957, 0.99757),
    iso(17, 16.99913175650, 0.00038),
    iso(18, 17.99915961286, 0.00205),
];
const FLUORINE: [IsotopeData; 1] = [iso(19, 18.99840316273, 1.0)];
const SODIUM: [IsotopeData; 1] = [iso(23, 22.9897692820, 1.0)];
const PHOSPHORUS: [IsotopeData; 1] = [iso(31, 30.97376199842, 1.0)];
const SULFUR: [IsotopeData; 3] = [
    iso(32, 31.9720711744, 0.9493),
    iso(33, 32.9714589098, 0.0076),
    iso(34, 33.967867004, 0.0429),
];
const CHLORINE: [IsotopeData; 2] = [iso(35, 34.968852682, 0.7578), iso(37, 36.965902602, 0.2422)];
const POTASSIUM: [IsotopeData; 3] = [
    iso(39, 38.963706679, 0.932581),
    iso(40, 39.963998166, 0.000117),
    iso(41, 40.961825257, 0.067302),
];

/// Elements known to the isotope tables, in canonical formula order.
pub const KNOWN_ELEMENTS: [&str; 11] = ["C", "O", "N", "H", "Li", "F", "Na", "P", "S", "Cl", "K"];

/// Returns the stable isotopes of an element, lightest first.
///
/// # Examples
///
/// ```
/// use glycocore::chemistry::elements::element_isotopes;
///
/// let carbon = element_isotopes("C").unwrap();
/// assert_eq!(carbon[1].mass_number, 13);
/// assert!(element_isotopes("Xx").is_none());
/// ```
pub fn element_isotopes(symbol: &str) -> Option<&'static [IsotopeData]> {
    let isotopes: &'static [IsotopeData] = match symbol {
        "H" => &HYDROGEN,
        "Li" => &LITHIUM,
        "C" => &CARBON,
        "N" => &NITROGEN,
        "O" => &OXYGEN,
        "F" => &FLUORINE,
        "Na" => &SODIUM,
        "P" => &PHOSPHORUS,
        "S" => &SULFUR,
        "Cl" => &CHLORINE,
        "K" => &POTASSIUM,
        _ => return None,
    };
    Some(isotopes)
}

/// The most abundant isotope of an element, which defines its monoisotopic mass.
pub fn principal_isotope(symbol: &str) -> Option<IsotopeData> {
    element_isotopes(symbol)?
        .iter()
        .copied()
        .max_by(|a, b| a.abundance.total_cmp(&b.abundance))
}

/// Look up the mass of a specific isotope.
pub fn isotope_mass(symbol: &str, mass_number: u16) -> Option<f64> {
    element_isotopes(symbol)?
        .iter()
        .find(|isotope| isotope.mass_number == mass_number)
        .map(|isotope| isotope.mass)
}

pub fn atomic_weights_mono_isotopic() -> HashMap<&'static str, f64> {
    KNOWN_ELEMENTS
        .iter()
        .filter_map(|&symbol| principal_isotope(symbol).map(|isotope| (symbol, isotope.mass)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abundances_sum_to_one() {
        for symbol in KNOWN_ELEMENTS {
            let total: f64 = element_isotopes(symbol).unwrap().iter().map(|i| i.abundance).sum();
            assert!((total - 1.0).abs() < 1e-3, "{symbol} sums to {total}");
        }
    }

    #[test]
    fn test_principal_isotope_is_most_abundant() {
        assert_eq!(principal_isotope("Li").unwrap().mass_number, 7);
        assert_eq!(principal_isotope("H").unwrap().mass_number, 1);
        assert_eq!(atomic_weights_mono_isotopic()["C"], 12.0);
    }

    #[test]
    fn test_isotope_mass_lookup() {
        assert_eq!(isotope_mass("O", 18), Some(17.99915961286));
        assert_eq!(isotope_mass("O", 19), None);
    }
}
