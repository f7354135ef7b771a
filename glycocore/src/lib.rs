// chemistry module
pub mod chemistry {
    pub mod constants;
    pub mod elements;
    pub mod composition;
    pub mod monosaccharide;
    pub mod formulas;
}

// algorithm module
pub mod algorithm {
    pub mod adducts;
    pub mod isotope;
    pub mod tag;
    pub mod noise;
    pub mod statistics;
}

// data module
pub mod data {
    pub mod spectrum;
}

pub mod config;
pub mod error;
