//! Per-Key-Event enrichment statistics over a gene universe
//!
//! For every Key Event (KE) of the selected pathway that has a reference
//! gene set, the engine intersects the set with the observed gene universe,
//! builds the 2x2 contingency table of significant/non-significant versus
//! in-set/not-in-set, and runs a one-sided exact test for over-representation
//! of significant genes. The per-set p-values are corrected in one batch with
//! the Benjamini-Hochberg procedure; results come back sorted by corrected
//! FDR, ascending, with ties kept in KE-id order.
//!
//! A KE whose reference set shares no gene with the dataset is skipped
//! rather than reported as a zero row. A pathway where no KE has any overlap
//! at all cannot be corrected or ranked and fails with
//! [`AopstatError::NoEnrichmentResults`].

use std::collections::BTreeMap;

use tracing::debug;
use tracing::info;

use crate::expression::GeneRecord;
use crate::expression::GeneUniverse;
use crate::reference::AopMetadata;
use crate::reference::ReferenceSets;
use crate::stats::f64_from_usize;
use crate::stats::fdr::benjamini_hochberg;
use crate::stats::hypergeom::ContingencyTable;
use crate::AopstatError;
use crate::AopstatResult;

/// One tested reference set, with its table counts and statistics
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    ke: String,
    title: String,
    genes_in_set: usize,
    significant_in_set: usize,
    significant_not_in_set: usize,
    non_significant_in_set: usize,
    non_significant_not_in_set: usize,
    pct_significant: f64,
    odds_ratio: Option<f64>,
    pvalue: f64,
    fdr: f64,
    overlap: Vec<String>,
}

impl EnrichmentResult {
    /// The Key Event id of the tested set
    pub fn ke(&self) -> &str {
        &self.ke
    }

    /// The Key Event title
    ///
    /// [`AopMetadata`] marks untitled events with a blank title; those fall
    /// back to the Key Event id here, so the title is never empty.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of universe genes in the reference set
    pub fn genes_in_set(&self) -> usize {
        self.genes_in_set
    }

    /// Significant universe genes in the set (cell `a`)
    pub fn significant_in_set(&self) -> usize {
        self.significant_in_set
    }

    /// Significant universe genes outside the set (cell `b`)
    pub fn significant_not_in_set(&self) -> usize {
        self.significant_not_in_set
    }

    /// Non-significant universe genes in the set (cell `c`)
    pub fn non_significant_in_set(&self) -> usize {
        self.non_significant_in_set
    }

    /// Non-significant universe genes outside the set (cell `d`)
    pub fn non_significant_not_in_set(&self) -> usize {
        self.non_significant_not_in_set
    }

    /// Percentage of the set's universe genes that are significant,
    /// rounded to one decimal
    pub fn pct_significant(&self) -> f64 {
        self.pct_significant
    }

    /// Odds ratio rounded to four decimals; `None` for degenerate tables
    ///
    /// An infinite ratio (empty off-diagonal) is a legitimate value and is
    /// kept; only the undefined `0/0` case maps to `None`.
    pub fn odds_ratio(&self) -> Option<f64> {
        self.odds_ratio
    }

    /// The uncorrected one-sided p-value
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// The Benjamini-Hochberg corrected p-value
    pub fn fdr(&self) -> f64 {
        self.fdr
    }

    /// The significant overlap genes, sorted
    pub fn overlap(&self) -> &[String] {
        &self.overlap
    }

    /// The overlap as one comma-joined string for display
    pub fn overlap_list(&self) -> String {
        self.overlap.join(", ")
    }
}

/// Tests every reference set of the selected pathway for enrichment
///
/// # Errors
///
/// - [`AopstatError::NoReferenceSets`] when no Key Event of the pathway has
///   a reference set at all
/// - [`AopstatError::NoEnrichmentResults`] when sets exist but none shares
///   a gene with the universe
///
/// # Examples
///
/// ```
/// use aopstat::expression::{GeneRecord, GeneUniverse};
/// use aopstat::{key_event_enrichment, AopMetadata, KeKind, ReferenceSets};
///
/// let universe = GeneUniverse::new(vec![
///     GeneRecord::new("TP53", 2.1, 0.001, true),
///     GeneRecord::new("EGFR", 1.8, 0.01, true),
///     GeneRecord::new("BRCA1", -0.2, 0.8, false),
///     GeneRecord::new("MYC", 0.1, 0.7, false),
/// ]);
///
/// let mut reference = ReferenceSets::new();
/// reference.insert("KE:1", ["TP53", "EGFR", "BRCA1"]);
/// let mut aop = AopMetadata::new("AOP:42");
/// aop.insert("KE:1", "Oxidative stress", KeKind::MolecularInitiating);
///
/// let results = key_event_enrichment(&universe, &reference, &aop).unwrap();
///
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].significant_in_set(), 2);
/// assert_eq!(results[0].overlap_list(), "EGFR, TP53");
/// assert!((results[0].pvalue() - 0.5).abs() < 1e-12);
/// ```
pub fn key_event_enrichment(
    universe: &GeneUniverse,
    reference: &ReferenceSets,
    metadata: &AopMetadata,
) -> AopstatResult<Vec<EnrichmentResult>> {
    let total_significant = universe.significant_count();
    let total_non_significant = universe.non_significant_count();

    let mut results = Vec::new();
    let mut pvalues = Vec::new();
    let mut sets_tested = 0_usize;

    for ke_id in metadata.ke_ids() {
        let Some(gene_set) = reference.get(ke_id) else {
            continue;
        };
        if gene_set.is_empty() {
            continue;
        }
        sets_tested += 1;

        let in_set: Vec<&GeneRecord> = gene_set
            .iter()
            .filter_map(|gene| universe.get(gene))
            .collect();
        if in_set.is_empty() {
            debug!("skipping {}: no overlap with the dataset", ke_id);
            continue;
        }

        let a = in_set.iter().filter(|gene| gene.is_significant()).count();
        let c = in_set.len() - a;
        let b = total_significant - a;
        let d = total_non_significant - c;
        let table = ContingencyTable::new(a as u64, b as u64, c as u64, d as u64);

        let pvalue = table.p_greater();
        let mut overlap: Vec<String> = in_set
            .iter()
            .filter(|gene| gene.is_significant())
            .map(|gene| gene.id().to_string())
            .collect();
        overlap.sort_unstable();

        // a blank title is AopMetadata's untitled state
        let title = match metadata.title_of(ke_id) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => ke_id.to_string(),
        };

        pvalues.push(pvalue);
        results.push(EnrichmentResult {
            ke: ke_id.to_string(),
            title,
            genes_in_set: in_set.len(),
            significant_in_set: a,
            significant_not_in_set: b,
            non_significant_in_set: c,
            non_significant_not_in_set: d,
            pct_significant: round1(f64_from_usize(a) / f64_from_usize(in_set.len()) * 100.0),
            odds_ratio: table.odds_ratio().map(round4),
            pvalue,
            // placeholder until the whole batch is corrected below
            fdr: pvalue,
            overlap,
        });
    }

    if sets_tested == 0 {
        return Err(AopstatError::NoReferenceSets {
            aop: metadata.aop().to_string(),
        });
    }
    if results.is_empty() {
        return Err(AopstatError::NoEnrichmentResults { sets_tested });
    }

    for (result, fdr) in results.iter_mut().zip(benjamini_hochberg(&pvalues)) {
        result.fdr = fdr;
    }
    // stable sort: equal FDRs keep KE-id order
    results.sort_by(|left, right| left.fdr.total_cmp(&right.fdr));

    info!(
        "tested {} of {} reference sets for {} ({} skipped without overlap)",
        results.len(),
        sets_tested,
        metadata.aop(),
        sets_tested - results.len()
    );
    Ok(results)
}

/// One reference-set member of a Key Event, with its dataset measurement
#[derive(Debug, Clone, PartialEq)]
pub struct KeGeneDetail {
    gene: String,
    log2fc: Option<f64>,
    significant: bool,
}

impl KeGeneDetail {
    /// The canonical gene identifier
    pub fn gene(&self) -> &str {
        &self.gene
    }

    /// The gene's (possibly averaged) log2 fold-change, or `None` when the
    /// dataset does not measure the gene
    pub fn log2fc(&self) -> Option<f64> {
        self.log2fc
    }

    /// Whether the gene passed the significance thresholds
    ///
    /// Always `false` for unmeasured genes.
    pub fn is_significant(&self) -> bool {
        self.significant
    }
}

/// Lists the members of every reference set of the pathway
///
/// Purely presentational data for tooltips and gene tables: every Key Event
/// of the pathway that has a reference set appears, and every member of that
/// set appears whether the dataset measures it or not. Unmeasured members
/// carry no fold-change and count as non-significant. Genes are sorted by
/// id, Key Events by id.
pub fn ke_gene_details(
    universe: &GeneUniverse,
    reference: &ReferenceSets,
    metadata: &AopMetadata,
) -> BTreeMap<String, Vec<KeGeneDetail>> {
    let mut details = BTreeMap::new();
    for ke_id in metadata.ke_ids() {
        let Some(gene_set) = reference.get(ke_id) else {
            continue;
        };
        let mut genes: Vec<KeGeneDetail> = gene_set
            .iter()
            .map(|gene| match universe.get(gene) {
                Some(record) => KeGeneDetail {
                    gene: record.id().to_string(),
                    log2fc: Some(record.log2fc()),
                    significant: record.is_significant(),
                },
                None => KeGeneDetail {
                    gene: gene.to_string(),
                    log2fc: None,
                    significant: false,
                },
            })
            .collect();
        genes.sort_unstable_by(|left, right| left.gene.cmp(&right.gene));
        details.insert(ke_id.to_string(), genes);
    }
    details
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::reference::KeKind;

    fn universe(significant: &[&str], non_significant: &[&str]) -> GeneUniverse {
        let mut records = Vec::new();
        for id in significant {
            records.push(GeneRecord::new(id, 2.0, 0.001, true));
        }
        for id in non_significant {
            records.push(GeneRecord::new(id, 0.1, 0.8, false));
        }
        GeneUniverse::new(records)
    }

    fn metadata_for(ke_ids: &[&str]) -> AopMetadata {
        let mut aop = AopMetadata::new("AOP:7");
        for ke_id in ke_ids {
            aop.insert(ke_id, "", KeKind::Intermediate);
        }
        aop
    }

    #[test]
    fn skewed_universe_is_enriched() {
        // 100 genes, 20 significant; the set holds 10 of them, 6 significant
        let mut records: Vec<GeneRecord> = (1..=20)
            .map(|at| GeneRecord::new(&format!("S{at}"), 2.5, 0.001, true))
            .collect();
        records.extend((1..=80).map(|at| GeneRecord::new(&format!("N{at}"), 0.2, 0.6, false)));
        let universe = GeneUniverse::new(records);

        let members: Vec<String> = (1..=6)
            .map(|at| format!("S{at}"))
            .chain((1..=4).map(|at| format!("N{at}")))
            .collect();
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", members.iter());
        let metadata = metadata_for(&["KE:1"]);

        let results = key_event_enrichment(&universe, &reference, &metadata).unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];

        assert_eq!(result.genes_in_set(), 10);
        assert_eq!(result.significant_in_set(), 6);
        assert_eq!(result.significant_not_in_set(), 14);
        assert_eq!(result.non_significant_in_set(), 4);
        assert_eq!(result.non_significant_not_in_set(), 76);
        assert!(result.pvalue() > 0.00390 && result.pvalue() < 0.00397);
        // (6 * 76) / (14 * 4) = 8.142857..., rounded to 4 decimals
        assert_eq!(result.odds_ratio(), Some(8.1429));
        assert!((result.pct_significant() - 60.0).abs() < f64::EPSILON);
        assert_eq!(result.overlap(), ["S1", "S2", "S3", "S4", "S5", "S6"]);
        assert_eq!(result.overlap_list(), "S1, S2, S3, S4, S5, S6");
        // a single set corrects to itself
        assert!((result.fdr() - result.pvalue()).abs() < 1e-15);
    }

    #[test]
    fn results_rank_by_fdr_with_stable_ties() {
        let universe = universe(&["S1", "S2"], &["N1", "N2"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:A", ["S1", "S2"]);
        reference.insert("KE:B", ["S1", "N1"]);
        reference.insert("KE:C", ["N1", "N2"]);
        reference.insert("KE:D", ["Z9"]);
        reference.insert("KE:X", ["S1", "S2"]);
        let metadata = metadata_for(&["KE:A", "KE:B", "KE:C", "KE:D"]);

        let results = key_event_enrichment(&universe, &reference, &metadata).unwrap();

        // KE:D has no overlap, KE:X is not part of the pathway
        let order: Vec<&str> = results.iter().map(EnrichmentResult::ke).collect();
        assert_eq!(order, ["KE:A", "KE:B", "KE:C"]);

        // raw p-values 1/6, 5/6 and 1 correct to 0.5, 1.0, 1.0
        assert!((results[0].fdr() - 0.5).abs() < 1e-9);
        assert!((results[1].fdr() - 1.0).abs() < 1e-9);
        assert!((results[2].fdr() - 1.0).abs() < 1e-9);
        for result in &results {
            assert!(result.fdr() >= result.pvalue() - 1e-12);
        }
    }

    #[test]
    fn a_pathway_without_reference_sets_is_an_error() {
        let universe = universe(&["S1"], &["N1"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:9", ["S1"]);
        let metadata = metadata_for(&["KE:1", "KE:2"]);

        let err = key_event_enrichment(&universe, &reference, &metadata).unwrap_err();
        assert_eq!(
            err,
            AopstatError::NoReferenceSets {
                aop: "AOP:7".to_string()
            }
        );
    }

    #[test]
    fn overlap_nowhere_is_an_error() {
        let universe = universe(&["S1"], &["N1"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["Q1"]);
        reference.insert("KE:2", ["Q2", "Q3"]);
        let metadata = metadata_for(&["KE:1", "KE:2"]);

        let err = key_event_enrichment(&universe, &reference, &metadata).unwrap_err();
        assert_eq!(err, AopstatError::NoEnrichmentResults { sets_tested: 2 });
    }

    #[test]
    fn degenerate_tables_report_no_odds_ratio() {
        let universe = universe(&[], &["N1", "N2", "N3"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["N1", "N2"]);
        let metadata = metadata_for(&["KE:1"]);

        let results = key_event_enrichment(&universe, &reference, &metadata).unwrap();
        let result = &results[0];

        assert_eq!(result.odds_ratio(), None);
        assert!((result.pvalue() - 1.0).abs() < f64::EPSILON);
        assert!(result.pct_significant().abs() < f64::EPSILON);
        assert!(result.overlap().is_empty());
        assert_eq!(result.overlap_list(), "");
    }

    #[test]
    fn untitled_events_fall_back_to_the_ke_id() {
        let universe = universe(&["S1"], &["N1", "N2"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["S1"]);
        reference.insert("KE:2", ["N1"]);
        reference.insert("KE:3", ["N2"]);
        let mut metadata = AopMetadata::new("AOP:7");
        metadata.insert("KE:1", "", KeKind::MolecularInitiating);
        metadata.insert("KE:2", "Hepatic steatosis", KeKind::AdverseOutcome);
        metadata.insert("KE:3", "   ", KeKind::Intermediate);

        let results = key_event_enrichment(&universe, &reference, &metadata).unwrap();
        let by_ke = |ke: &str| {
            results
                .iter()
                .find(|result| result.ke() == ke)
                .unwrap()
                .title()
                .to_string()
        };

        assert_eq!(by_ke("KE:1"), "KE:1");
        assert_eq!(by_ke("KE:2"), "Hepatic steatosis");
        // whitespace-only titles trim to blank at registration
        assert_eq!(by_ke("KE:3"), "KE:3");
    }

    #[test]
    fn gene_details_cover_every_reference_ke() {
        let universe = universe(&["TP53", "EGFR"], &["BRCA1"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["TP53", "BRCA1", "XYZ"]);
        reference.insert("KE:2", ["NOPE"]);
        let metadata = metadata_for(&["KE:1", "KE:2"]);

        let details = ke_gene_details(&universe, &reference, &metadata);

        assert_eq!(details.len(), 2);
        let ke1 = &details["KE:1"];
        let listed: Vec<&str> = ke1.iter().map(KeGeneDetail::gene).collect();
        assert_eq!(listed, ["BRCA1", "TP53", "XYZ"]);
        assert!(!ke1[0].is_significant());
        assert!(ke1[1].is_significant());
        assert_eq!(ke1[1].log2fc(), Some(2.0));
        assert_eq!(details["KE:2"].len(), 1);
    }

    #[test]
    fn unmeasured_set_members_carry_no_measurement() {
        let universe = universe(&["TP53"], &["BRCA1"]);
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["TP53", "BRCA1", "XYZ"]);
        let metadata = metadata_for(&["KE:1"]);

        let details = ke_gene_details(&universe, &reference, &metadata);
        let unmeasured = &details["KE:1"][2];

        assert_eq!(unmeasured.gene(), "XYZ");
        assert_eq!(unmeasured.log2fc(), None);
        assert!(!unmeasured.is_significant());
    }
}
