use thiserror::Error;

/// Errors raised by the composition, isotope and statistics routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlycoError {
    #[error("Malformed composition {formula:?} at offset {position}: {reason}")]
    Format {
        formula: String,
        position: usize,
        reason: String,
    },
    #[error("Unknown monosaccharide: {0}")]
    UnknownMonosaccharide(String),
    #[error("Unknown element: {0}")]
    UnknownElement(String),
    #[error("Negative count {count} for {symbol}")]
    NegativeCount { symbol: String, count: i32 },
    #[error("Input arrays must have the same length, got {left} and {right}")]
    Shape { left: usize, right: usize },
    #[error("Cannot fit a line when all x values are identical")]
    DegenerateFit,
    #[error("The isotope enumerator returned no isotopic state")]
    EmptyDistribution,
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Search size {requested} exceeds the configured limit {limit} for {what}")]
    SearchLimitExceeded {
        what: &'static str,
        requested: usize,
        limit: usize,
    },
    #[error("No composition found close to mass {0}")]
    NoMatchFound(f64),
}

pub type Result<T> = std::result::Result<T, GlycoError>;
