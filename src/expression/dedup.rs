//! Collapse of repeated gene identifiers
//!
//! Duplicate probes and composite-identifier fan-out leave several
//! measurements per gene. [`collapse`] merges them into one: the fold-change
//! becomes the arithmetic mean over all occurrences, the p-value Fisher's
//! combined p-value over the occurrences with a usable (positive) p-value.
//! A gene whose occurrences have no usable p-value at all is dropped.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::debug;

use crate::expression::normalize::Measurement;
use crate::stats::f64_from_usize;
use crate::stats::fisher::combine_pvalues;

// almost every gene occurs once or twice; spill to the heap only beyond that
type Occurrences = SmallVec<[(f64, f64); 2]>;

/// Result of one deduplication pass
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseOutcome {
    genes: Vec<Measurement>,
    merged: usize,
    dropped: usize,
}

impl CollapseOutcome {
    /// One measurement per unique identifier, in first-occurrence order
    pub fn genes(&self) -> &[Measurement] {
        &self.genes
    }

    /// Consumes the outcome, returning the collapsed measurements
    pub fn into_genes(self) -> Vec<Measurement> {
        self.genes
    }

    /// Number of genes that had more than one occurrence
    pub fn merged(&self) -> usize {
        self.merged
    }

    /// Number of genes dropped because no occurrence had a usable p-value
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Collapses measurements into one entry per unique identifier
///
/// Genes occurring exactly once pass through unchanged, including p-values a
/// combination would have to reject. Output order is the order in which each
/// identifier was first seen, so repeated runs are deterministic.
///
/// # Examples
///
/// ```
/// use aopstat::expression::dedup::collapse;
/// use aopstat::expression::normalize::Measurement;
///
/// let outcome = collapse(vec![
///     Measurement::new("TP53", 1.0, 0.04),
///     Measurement::new("TP53", 3.0, 0.02),
/// ]);
///
/// let merged = &outcome.genes()[0];
/// assert_eq!(merged.id(), "TP53");
/// assert!((merged.log2fc() - 2.0).abs() < f64::EPSILON);
/// assert!(merged.pval() < 0.02);
/// ```
pub fn collapse(measurements: Vec<Measurement>) -> CollapseOutcome {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Occurrences)> = Vec::new();
    for measurement in measurements {
        let values = (measurement.log2fc(), measurement.pval());
        match index.get(measurement.id()) {
            Some(&at) => groups[at].1.push(values),
            None => {
                let id = measurement.id().to_string();
                index.insert(id.clone(), groups.len());
                let mut occurrences = Occurrences::new();
                occurrences.push(values);
                groups.push((id, occurrences));
            }
        }
    }

    let mut genes = Vec::with_capacity(groups.len());
    let mut merged = 0;
    let mut dropped = 0;
    for (id, occurrences) in groups {
        if occurrences.len() == 1 {
            let (log2fc, pval) = occurrences[0];
            genes.push(Measurement::new(id, log2fc, pval));
            continue;
        }

        merged += 1;
        let mean = occurrences.iter().map(|(log2fc, _)| log2fc).sum::<f64>()
            / f64_from_usize(occurrences.len());
        let pvalues: SmallVec<[f64; 2]> =
            occurrences.iter().map(|(_, pval)| *pval).collect();
        match combine_pvalues(&pvalues) {
            Some(pval) => genes.push(Measurement::new(id, mean, pval)),
            None => {
                dropped += 1;
                debug!(
                    "dropping {}: no usable p-value among {} occurrences",
                    id,
                    occurrences.len()
                );
            }
        }
    }
    CollapseOutcome {
        genes,
        merged,
        dropped,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unique_ids_pass_through() {
        let input = vec![
            Measurement::new("BRCA1", 2.0, 0.01),
            Measurement::new("TP53", -1.0, 0.2),
        ];
        let outcome = collapse(input.clone());

        assert_eq!(outcome.genes(), input);
        assert_eq!(outcome.merged(), 0);
        assert_eq!(outcome.dropped(), 0);
    }

    #[test]
    fn duplicates_are_combined() {
        let outcome = collapse(vec![
            Measurement::new("TP53", 1.0, 0.04),
            Measurement::new("TP53", 3.0, 0.02),
        ]);

        assert_eq!(outcome.genes().len(), 1);
        assert_eq!(outcome.merged(), 1);

        let gene = &outcome.genes()[0];
        assert!((gene.log2fc() - 2.0).abs() < f64::EPSILON);
        // Fisher-combined 0.04 and 0.02, by hand: 0.006504...
        assert!(gene.pval() > 0.0064 && gene.pval() < 0.0066);
    }

    #[test]
    fn collapse_is_idempotent() {
        let first = collapse(vec![
            Measurement::new("TP53", 1.0, 0.04),
            Measurement::new("BRCA1", 0.5, 0.3),
            Measurement::new("TP53", 3.0, 0.02),
        ]);
        let second = collapse(first.genes().to_vec());

        assert_eq!(second.genes(), first.genes());
        assert_eq!(second.merged(), 0);
        assert_eq!(second.dropped(), 0);
    }

    #[test]
    fn first_occurrence_order_is_kept() {
        let outcome = collapse(vec![
            Measurement::new("ZNF1", 1.0, 0.5),
            Measurement::new("ABC1", 1.0, 0.5),
            Measurement::new("ZNF1", 2.0, 0.4),
            Measurement::new("MYC", 1.0, 0.5),
        ]);

        let ids: Vec<&str> = outcome.genes().iter().map(Measurement::id).collect();
        assert_eq!(ids, ["ZNF1", "ABC1", "MYC"]);
    }

    #[test]
    fn non_positive_pvalues_are_excluded_from_combination() {
        let outcome = collapse(vec![
            Measurement::new("TP53", 1.0, 0.0),
            Measurement::new("TP53", 3.0, 0.03),
        ]);

        let gene = &outcome.genes()[0];
        // the zero is excluded; the surviving single value passes through
        assert!((gene.pval() - 0.03).abs() < 1e-12);
        // the fold-change mean still covers every occurrence
        assert!((gene.log2fc() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gene_without_usable_pvalue_is_dropped() {
        let outcome = collapse(vec![
            Measurement::new("TP53", 1.0, 0.0),
            Measurement::new("TP53", 3.0, -0.5),
            Measurement::new("BRCA1", 1.0, 0.01),
        ]);

        let ids: Vec<&str> = outcome.genes().iter().map(Measurement::id).collect();
        assert_eq!(ids, ["BRCA1"]);
        assert_eq!(outcome.dropped(), 1);
    }

    #[test]
    fn single_occurrence_keeps_raw_pvalue() {
        // the exclusion rule applies to combinations only
        let outcome = collapse(vec![Measurement::new("TP53", 1.0, 0.0)]);

        assert_eq!(outcome.genes().len(), 1);
        assert!((outcome.genes()[0].pval() - 0.0).abs() < f64::EPSILON);
        assert_eq!(outcome.dropped(), 0);
    }

    #[test]
    fn empty_input() {
        let outcome = collapse(Vec::new());
        assert!(outcome.genes().is_empty());
        assert_eq!(outcome.merged(), 0);
        assert_eq!(outcome.dropped(), 0);
    }
}
