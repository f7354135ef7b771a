// Purpose: To store constants that are used in the program
pub const MASS_PROTON: f64 = 1.007276466621; // Unified atomic mass unit
pub const MASS_ELECTRON: f64 = 0.00054857990946; // Unified atomic mass unit
pub const MASS_HYDROGEN: f64 = 1.00782503223; // 1H, unified atomic mass unit

// Isotope envelopes
pub const ISOTOPE_ABUNDANCE_FLOOR: f64 = 1e-4;
pub const CLUMPING_DISTANCE: f64 = MASS_HYDROGEN / 2.0;

// Tag search: assumed average mass per atom of a small organic tag
pub const AVERAGE_ATOM_MASS: f64 = 5.0;
