//! Fisher's method for combining p-values
//!
//! Repeated measurements of the same gene (duplicate probes, synonym
//! identifiers) are merged into a single p-value by summing `-2·ln(p)` over
//! the usable measurements and evaluating the sum against a chi-square
//! distribution with two degrees of freedom per measurement.
//!
//! The method assumes the combined measurements are independent. For
//! duplicates created by fanning out a composite identifier cell this does
//! not hold (the same measurement is repeated), so the combined value is an
//! optimistic approximation there: acceptable for a screening significance
//! flag, not for a rigorous meta-analysis.
//!
//! # Examples
//!
//! ```
//! use aopstat::stats::fisher::combine_pvalues;
//!
//! let combined = combine_pvalues(&[0.04, 0.02]).unwrap();
//! assert!(combined < 0.02);
//!
//! // non-positive values cannot enter the combination
//! assert!(combine_pvalues(&[0.0, -1.0]).is_none());
//! ```

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::stats::f64_from_usize;

/// Combines p-values with Fisher's method
///
/// Values that are non-positive or not finite are excluded (their logarithm
/// is undefined or meaningless); the degrees of freedom count only the
/// values that actually enter the sum. A single usable value is returned
/// unchanged, since the chi-square survival with two degrees of freedom of
/// `-2·ln(p)` is exactly `p`.
///
/// Returns `None` when no value is usable.
pub fn combine_pvalues(pvalues: &[f64]) -> Option<f64> {
    let mut statistic = 0.0;
    let mut combined = 0usize;
    for &p in pvalues {
        if p > 0.0 && p.is_finite() {
            statistic += -2.0 * p.ln();
            combined += 1;
        }
    }
    if combined == 0 {
        return None;
    }

    let chi = ChiSquared::new(2.0 * f64_from_usize(combined))
        .expect("degrees of freedom are positive");
    Some(chi.sf(statistic))
}
