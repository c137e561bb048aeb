//! One-call orchestration of the full analysis pipeline
//!
//! [`run_analysis`] chains the processing pipeline, the namespace
//! classification and the enrichment engine into a single call and bundles
//! their outputs as an [`AnalysisReport`]. [`select_columns`] bridges the
//! column detector's ranked suggestions into the concrete
//! [`ColumnSelection`] the pipeline needs, enforcing the one rule the
//! detector leaves to its caller: the three roles must map to three
//! distinct columns.

use crate::detect::ColumnSuggestions;
use crate::enrichment::key_event_enrichment;
use crate::enrichment::EnrichmentResult;
use crate::expression::process_table;
use crate::expression::ColumnSelection;
use crate::expression::DatasetSummary;
use crate::expression::Thresholds;
use crate::idtype::IdentifierClassifier;
use crate::idtype::IdentifierTypeAnalysis;
use crate::reference::AopMetadata;
use crate::reference::ReferenceSets;
use crate::table::DataTable;
use crate::AopstatResult;

/// The complete outcome of one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    summary: DatasetSummary,
    identifiers: IdentifierTypeAnalysis,
    results: Vec<EnrichmentResult>,
}

impl AnalysisReport {
    /// Aggregate counts of the processing pipeline
    pub fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Namespace classification of the universe's identifiers
    pub fn identifiers(&self) -> &IdentifierTypeAnalysis {
        &self.identifiers
    }

    /// Enrichment results, sorted ascending by corrected FDR
    pub fn results(&self) -> &[EnrichmentResult] {
        &self.results
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs processing, classification and enrichment in one call
///
/// ```mermaid
/// graph LR
///     T[DataTable] --> P(process_table)
///     P --> U[GeneUniverse]
///     P --> S[DatasetSummary]
///     U --> C(classifier)
///     U --> E(enrichment)
///     R[ReferenceSets] --> E
///     M[AopMetadata] --> E
///     S --> REP[AnalysisReport]
///     C --> REP
///     E --> REP
/// ```
///
/// The classification step is advisory and cannot fail; the processing and
/// enrichment steps propagate their errors unchanged (see the crate-level
/// documentation for a worked example).
///
/// # Errors
///
/// - [`AopstatError::MissingColumns`](crate::AopstatError::MissingColumns)
///   when the selection names absent columns
/// - [`AopstatError::NoUsableData`](crate::AopstatError::NoUsableData) when
///   no table row survives processing
/// - [`AopstatError::NoReferenceSets`](crate::AopstatError::NoReferenceSets)
///   and
///   [`AopstatError::NoEnrichmentResults`](crate::AopstatError::NoEnrichmentResults)
///   from the enrichment engine
pub fn run_analysis(
    table: &DataTable,
    selection: &ColumnSelection,
    thresholds: &Thresholds,
    reference: &ReferenceSets,
    metadata: &AopMetadata,
) -> AopstatResult<AnalysisReport> {
    let processed = process_table(table, selection, thresholds)?;
    let identifiers = IdentifierClassifier::default().analyze(processed.universe().ids());
    let results = key_event_enrichment(processed.universe(), reference, metadata)?;
    let (_, summary) = processed.into_parts();
    Ok(AnalysisReport {
        summary,
        identifiers,
        results,
    })
}

/// Builds a [`ColumnSelection`] from the detector's best picks
///
/// Returns `None` unless every role has a best candidate and the three
/// candidates name three distinct columns. The detector deliberately
/// proposes the same column for several roles when it fits them; resolving
/// that is this function's job, and an unresolvable table is left to the
/// caller (typically by asking the user).
///
/// # Examples
///
/// ```
/// use aopstat::{select_columns, ColumnDetector, DataTable};
///
/// let table = DataTable::from_columns([
///     ("SYMBOL", vec![Some("TP53".into()), Some("BRCA1".into())]),
///     ("logFC", vec![Some("1.4".into()), Some("-0.6".into())]),
///     ("P.Value", vec![Some("0.01".into()), Some("0.2".into())]),
/// ])
/// .unwrap();
///
/// let suggestions = ColumnDetector::default().detect(&table);
/// let selection = select_columns(&suggestions).unwrap();
///
/// assert_eq!(selection.gene_id(), "SYMBOL");
/// assert_eq!(selection.log2fc(), "logFC");
/// assert_eq!(selection.pvalue(), "P.Value");
/// ```
pub fn select_columns(suggestions: &ColumnSuggestions) -> Option<ColumnSelection> {
    let gene_id = suggestions.best_gene_id()?;
    let log2fc = suggestions.best_log2fc()?;
    let pvalue = suggestions.best_pvalue()?;
    if gene_id.column() == log2fc.column()
        || gene_id.column() == pvalue.column()
        || log2fc.column() == pvalue.column()
    {
        return None;
    }
    Some(ColumnSelection::new(
        gene_id.column(),
        log2fc.column(),
        pvalue.column(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::detect::ColumnDetector;
    use crate::idtype::IdentifierKind;
    use crate::reference::KeKind;
    use crate::AopstatError;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|value| Some((*value).to_string())).collect()
    }

    fn expression_table() -> DataTable {
        DataTable::from_columns([
            ("SYMBOL", cells(&["TP53", "BRCA1", "EGFR", "MYC"])),
            ("logFC", cells(&["2.1", "-0.2", "1.8", "0.1"])),
            ("pvalue", cells(&["0.001", "0.8", "0.01", "0.7"])),
        ])
        .unwrap()
    }

    fn pathway() -> (ReferenceSets, AopMetadata) {
        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["TP53", "EGFR", "BRCA1"]);
        let mut aop = AopMetadata::new("AOP:42");
        aop.insert("KE:1", "Oxidative stress", KeKind::MolecularInitiating);
        (reference, aop)
    }

    #[test]
    fn end_to_end_report() {
        let (reference, aop) = pathway();
        let selection = ColumnSelection::new("SYMBOL", "logFC", "pvalue");

        let report = run_analysis(
            &expression_table(),
            &selection,
            &Thresholds::default(),
            &reference,
            &aop,
        )
        .unwrap();

        assert_eq!(report.summary().rows_in(), 4);
        assert_eq!(report.summary().total_genes(), 4);
        assert_eq!(report.summary().significant_genes(), 2);
        assert_eq!(report.identifiers().primary(), IdentifierKind::Symbol);

        assert_eq!(report.results().len(), 1);
        let result = &report.results()[0];
        assert_eq!(result.ke(), "KE:1");
        assert_eq!(result.title(), "Oxidative stress");
        assert_eq!(result.genes_in_set(), 3);
        assert_eq!(result.significant_in_set(), 2);
        assert!((result.pvalue() - 0.5).abs() < 1e-12);
        assert!((result.fdr() - 0.5).abs() < 1e-12);
        assert!((result.pct_significant() - 66.7).abs() < 1e-9);
        // b = 0: every significant gene of the universe sits in the set
        assert_eq!(result.odds_ratio(), Some(f64::INFINITY));
        assert_eq!(result.overlap(), ["EGFR", "TP53"]);
    }

    #[test]
    fn processing_errors_propagate() {
        let (reference, aop) = pathway();
        let selection = ColumnSelection::new("Gene", "logFC", "pvalue");

        let err = run_analysis(
            &expression_table(),
            &selection,
            &Thresholds::default(),
            &reference,
            &aop,
        )
        .unwrap_err();
        assert_eq!(err, AopstatError::MissingColumns(vec!["Gene".to_string()]));
    }

    #[test]
    fn detector_assisted_flow() {
        let table = DataTable::from_columns([
            ("Gene_Symbol", cells(&["BRCA1", "TP53", "EGFR"])),
            ("log2FoldChange", cells(&["2.5", "-1.8", "3.2"])),
            ("padj", cells(&["0.001", "0.005", "0.0001"])),
        ])
        .unwrap();

        let suggestions = ColumnDetector::default().detect(&table);
        let selection = select_columns(&suggestions).unwrap();
        assert_eq!(selection.gene_id(), "Gene_Symbol");
        assert_eq!(selection.log2fc(), "log2FoldChange");
        assert_eq!(selection.pvalue(), "padj");

        let mut reference = ReferenceSets::new();
        reference.insert("KE:1", ["TP53", "BRCA1"]);
        let mut aop = AopMetadata::new("AOP:12");
        aop.insert("KE:1", "DNA damage", KeKind::MolecularInitiating);

        let report = run_analysis(
            &table,
            &selection,
            &Thresholds::default(),
            &reference,
            &aop,
        )
        .unwrap();

        assert_eq!(report.summary().significant_genes(), 3);
        assert_eq!(report.results()[0].significant_in_set(), 2);
    }

    #[test]
    fn selection_requires_three_distinct_columns() {
        // one numeric column that ranks best for both numeric roles
        let table = DataTable::from_columns([
            ("SYMBOL", cells(&["TP53", "BRCA1", "EGFR", "MYC"])),
            ("value", cells(&["0.01", "0.2", "0.6", "0.3"])),
        ])
        .unwrap();
        let suggestions = ColumnDetector::default().detect(&table);

        assert_eq!(suggestions.best_log2fc().unwrap().column(), "value");
        assert_eq!(suggestions.best_pvalue().unwrap().column(), "value");
        assert!(select_columns(&suggestions).is_none());
    }

    #[test]
    fn selection_requires_every_role() {
        let table = DataTable::from_columns([(
            "SYMBOL",
            cells(&["TP53", "BRCA1"]),
        )])
        .unwrap();
        let suggestions = ColumnDetector::default().detect(&table);

        assert!(suggestions.best_gene_id().is_some());
        assert!(suggestions.best_log2fc().is_none());
        assert!(select_columns(&suggestions).is_none());
    }
}
