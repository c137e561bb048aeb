//! Benjamini–Hochberg false-discovery-rate adjustment
//!
//! The adjustment is only meaningful across the whole batch of tests of one
//! analysis, so the enrichment engine collects every per-set p-value first
//! and corrects them in a single call.
//!
//! # Examples
//!
//! ```
//! use aopstat::stats::fdr::benjamini_hochberg;
//!
//! let adjusted = benjamini_hochberg(&[0.01, 0.04, 0.03, 0.005]);
//! assert_eq!(adjusted, vec![0.02, 0.04, 0.04, 0.02]);
//! ```

use crate::stats::f64_from_usize;

/// Adjusts p-values with the Benjamini–Hochberg step-up procedure
///
/// Each value is scaled by `n / rank` (rank 1 = smallest p-value), the
/// sequence is made monotone by a right-to-left running minimum, and results
/// are clamped to 1. The returned vector is in the input order.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| pvalues[i].total_cmp(&pvalues[j]));

    let scale = f64_from_usize(n);
    let mut adjusted = vec![0.0; n];
    // walking from the largest p-value down keeps the sequence monotone;
    // starting the minimum at 1.0 doubles as the clamp
    let mut running_min = 1.0_f64;
    for (rank0, &idx) in order.iter().enumerate().rev() {
        let raw = pvalues[idx] * scale / f64_from_usize(rank0 + 1);
        running_min = running_min.min(raw);
        adjusted[idx] = running_min;
    }
    adjusted
}
