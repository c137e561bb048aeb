//! Statistical primitives of the enrichment pipeline
//!
//! The submodules are deliberately small and free of domain types: they
//! operate on counts and probabilities only.
//!
//! - [`hypergeom`]: one-sided exact testing of 2×2 contingency tables
//! - [`fisher`]: Fisher's method for combining p-values of repeated
//!   measurements
//! - [`fdr`]: Benjamini–Hochberg false-discovery-rate adjustment

pub mod fdr;
pub mod fisher;
pub mod hypergeom;

/// Widens a count for ratio arithmetic
///
/// Universe and contingency counts fit in `u32`, where the `f64` cast is
/// exact; a larger count is a caller bug and panics instead of rounding
/// silently.
pub(crate) fn f64_from_u64(n: u64) -> f64 {
    let intermediate: u32 = n.try_into().expect("count exceeds the exact f64 range");
    intermediate.into()
}

/// Widens a count for ratio arithmetic
///
/// Universe and contingency counts fit in `u32`, where the `f64` cast is
/// exact; a larger count is a caller bug and panics instead of rounding
/// silently.
pub(crate) fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n.try_into().expect("count exceeds the exact f64 range");
    intermediate.into()
}
