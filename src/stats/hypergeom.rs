//! One-sided exact testing of 2×2 contingency tables
//!
//! The test asks whether the upper-left cell of the table is larger than
//! expected under the hypergeometric null distribution ("greater"
//! alternative), which is the one-sided Fisher exact test used for
//! over-representation analysis.
//!
//! # Examples
//!
//! ```
//! use aopstat::stats::hypergeom::ContingencyTable;
//!
//! // 10 of 100 genes fall into a reference set; 6 of the 20 significant ones
//! let table = ContingencyTable::new(6, 14, 4, 76);
//!
//! assert!(table.p_greater() < 0.05);
//! assert!(table.odds_ratio().unwrap() > 1.0);
//! ```

use statrs::distribution::{DiscreteCDF, Hypergeometric};

use crate::stats::f64_from_u64;

/// A 2×2 contingency table in the classic `[[a, b], [c, d]]` layout
///
/// Rows split the population by the property under test (significant vs
/// not), columns by reference-set membership:
///
/// ```text
///                  in set    out of set
/// significant        a           b
/// not significant    c           d
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    a: u64,
    b: u64,
    c: u64,
    d: u64,
}

impl ContingencyTable {
    /// Creates a table from its four cells
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    /// The upper-left cell (significant genes inside the set)
    pub fn a(&self) -> u64 {
        self.a
    }

    /// The upper-right cell (significant genes outside the set)
    pub fn b(&self) -> u64 {
        self.b
    }

    /// The lower-left cell (non-significant genes inside the set)
    pub fn c(&self) -> u64 {
        self.c
    }

    /// The lower-right cell (non-significant genes outside the set)
    pub fn d(&self) -> u64 {
        self.d
    }

    /// The total population size
    pub fn population(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// One-sided p-value for over-representation of `a`
    ///
    /// This is the probability of observing `a` or more successes when
    /// drawing `a + c` items from a population of [`population`] items that
    /// contains `a + b` successes.
    ///
    /// [`population`]: ContingencyTable::population
    pub fn p_greater(&self) -> f64 {
        if self.a == 0 {
            // "0 or more" is certain
            return 1.0;
        }
        let hyper = Hypergeometric::new(self.population(), self.a + self.b, self.a + self.c)
            .expect("successes and draws cannot exceed the population");

        // subtract 1 because the observed count itself is part of the test
        // ("6 or more"), while sf calculates "more than 6"
        hyper.sf(self.a - 1)
    }

    /// The unconditional odds ratio `(a·d) / (b·c)`
    ///
    /// Returns `None` for the degenerate `0/0` case (both products zero),
    /// where the ratio carries no information. A zero denominator with a
    /// non-zero numerator yields `f64::INFINITY`, which is meaningful
    /// (maximal enrichment) and kept.
    pub fn odds_ratio(&self) -> Option<f64> {
        let ratio = (f64_from_u64(self.a) * f64_from_u64(self.d))
            / (f64_from_u64(self.b) * f64_from_u64(self.c));
        if ratio.is_nan() {
            None
        } else {
            Some(ratio)
        }
    }
}
