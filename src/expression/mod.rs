//! From raw table rows to a significance-flagged gene universe
//!
//! The pipeline runs in three stages:
//!
//! 1. [`normalize`]: canonicalize identifiers, fan out composite cells,
//!    coerce numeric cells, drop (and count) rows that yield nothing
//! 2. [`dedup`]: collapse repeated identifiers into one measurement per gene
//! 3. significance flagging against validated [`Thresholds`]
//!
//! The result is a [`GeneUniverse`] with one [`GeneRecord`] per unique gene,
//! together with the [`DatasetSummary`] counts describing what happened on
//! the way there. Per-row problems never fail the run; an input from which
//! nothing survives does, with [`AopstatError::NoUsableData`].

pub mod dedup;
pub mod normalize;

use std::collections::HashMap;

use tracing::info;

use crate::table::DataTable;
use crate::AopstatError;
use crate::AopstatResult;
use crate::{DEFAULT_LOG2FC_THRESHOLD, DEFAULT_PVAL_CUTOFF, MAX_LOG2FC_THRESHOLD};

use normalize::RawRow;

/// Names of the three table columns an analysis consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    gene_id: String,
    log2fc: String,
    pvalue: String,
}

impl ColumnSelection {
    /// Creates a selection from the three column names
    pub fn new<S: Into<String>>(gene_id: S, log2fc: S, pvalue: S) -> Self {
        Self {
            gene_id: gene_id.into(),
            log2fc: log2fc.into(),
            pvalue: pvalue.into(),
        }
    }

    /// Name of the gene identifier column
    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    /// Name of the log2 fold-change column
    pub fn log2fc(&self) -> &str {
        &self.log2fc
    }

    /// Name of the p-value column
    pub fn pvalue(&self) -> &str {
        &self.pvalue
    }
}

/// Validated significance thresholds
///
/// A gene is flagged significant when its absolute log2 fold-change reaches
/// `log2fc` **and** its p-value does not exceed `pval`.
///
/// # Examples
///
/// ```
/// use aopstat::Thresholds;
///
/// let thresholds = Thresholds::new(1.0, 0.05).unwrap();
/// assert!((thresholds.log2fc() - 1.0).abs() < f64::EPSILON);
///
/// assert!(Thresholds::new(-1.0, 0.05).is_err());
/// assert!(Thresholds::new(11.0, 0.05).is_err());
/// assert!(Thresholds::new(1.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    log2fc: f64,
    pval: f64,
}

impl Thresholds {
    /// Creates thresholds, validating both values
    ///
    /// # Errors
    ///
    /// [`AopstatError::InvalidThreshold`] when the fold-change threshold is
    /// not a finite non-negative number of at most
    /// [`MAX_LOG2FC_THRESHOLD`], or the p-value cutoff is outside `(0, 1]`.
    pub fn new(log2fc: f64, pval: f64) -> AopstatResult<Self> {
        if !log2fc.is_finite() {
            return Err(AopstatError::InvalidThreshold(format!(
                "log2 fold-change threshold must be a finite number, got {log2fc}"
            )));
        }
        if log2fc < 0.0 {
            return Err(AopstatError::InvalidThreshold(
                "log2 fold-change threshold cannot be negative".to_string(),
            ));
        }
        if log2fc > MAX_LOG2FC_THRESHOLD {
            return Err(AopstatError::InvalidThreshold(format!(
                "log2 fold-change threshold {log2fc} is unreasonably high (maximum {MAX_LOG2FC_THRESHOLD})"
            )));
        }
        if !(pval > 0.0 && pval <= 1.0) {
            return Err(AopstatError::InvalidThreshold(format!(
                "p-value cutoff must be within (0, 1], got {pval}"
            )));
        }
        Ok(Self { log2fc, pval })
    }

    /// The absolute log2 fold-change threshold
    pub fn log2fc(&self) -> f64 {
        self.log2fc
    }

    /// The p-value cutoff
    pub fn pval(&self) -> f64 {
        self.pval
    }

    /// Whether a measurement passes both thresholds
    pub fn is_significant(&self, log2fc: f64, pval: f64) -> bool {
        log2fc.abs() >= self.log2fc && pval <= self.pval
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            log2fc: DEFAULT_LOG2FC_THRESHOLD,
            pval: DEFAULT_PVAL_CUTOFF,
        }
    }
}

/// One gene after normalization, deduplication and significance flagging
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    id: String,
    log2fc: f64,
    pval: f64,
    significant: bool,
}

impl GeneRecord {
    /// Creates a record, canonicalizing the identifier
    ///
    /// The processing pipeline builds records itself; this constructor is
    /// for callers that assemble a [`GeneUniverse`] from preprocessed data.
    pub fn new(id: &str, log2fc: f64, pval: f64, significant: bool) -> Self {
        Self {
            id: id.trim().to_uppercase(),
            log2fc,
            pval,
            significant,
        }
    }

    /// The canonical gene identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The (possibly averaged) log2 fold-change
    pub fn log2fc(&self) -> f64 {
        self.log2fc
    }

    /// The (possibly combined) p-value
    pub fn pval(&self) -> f64 {
        self.pval
    }

    /// Whether the gene passed the significance thresholds
    pub fn is_significant(&self) -> bool {
        self.significant
    }
}

/// The deduplicated gene universe of one analysis
///
/// Holds exactly one [`GeneRecord`] per canonical identifier, in
/// first-occurrence order, with an index for by-identifier lookup.
#[derive(Debug, Clone)]
pub struct GeneUniverse {
    records: Vec<GeneRecord>,
    index: HashMap<String, usize>,
    significant: usize,
}

impl GeneUniverse {
    /// Builds a universe from records
    ///
    /// The identifiers must be unique; the processing pipeline guarantees
    /// this for its own output.
    pub fn new(records: Vec<GeneRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        let mut significant = 0;
        for (at, record) in records.iter().enumerate() {
            index.entry(record.id().to_string()).or_insert(at);
            if record.is_significant() {
                significant += 1;
            }
        }
        debug_assert_eq!(index.len(), records.len(), "gene ids must be unique");
        Self {
            records,
            index,
            significant,
        }
    }

    /// Number of genes in the universe
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the universe holds no genes
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records in first-occurrence order
    pub fn records(&self) -> &[GeneRecord] {
        &self.records
    }

    /// The canonical identifiers in first-occurrence order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(GeneRecord::id)
    }

    /// Looks up a gene by canonical identifier
    pub fn get(&self, id: &str) -> Option<&GeneRecord> {
        self.index.get(id).map(|&at| &self.records[at])
    }

    /// Returns `true` if the identifier is part of the universe
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of significant genes
    pub fn significant_count(&self) -> usize {
        self.significant
    }

    /// Number of non-significant genes
    pub fn non_significant_count(&self) -> usize {
        self.records.len() - self.significant
    }
}

/// Aggregate counts of one processing run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetSummary {
    rows_in: usize,
    rows_dropped: usize,
    duplicates_merged: usize,
    genes_dropped: usize,
    total_genes: usize,
    significant_genes: usize,
    thresholds: Thresholds,
}

impl DatasetSummary {
    /// Number of rows the table supplied
    pub fn rows_in(&self) -> usize {
        self.rows_in
    }

    /// Number of rows dropped during normalization
    pub fn rows_dropped(&self) -> usize {
        self.rows_dropped
    }

    /// Number of genes merged from several occurrences
    pub fn duplicates_merged(&self) -> usize {
        self.duplicates_merged
    }

    /// Number of genes dropped because no occurrence had a usable p-value
    pub fn genes_dropped(&self) -> usize {
        self.genes_dropped
    }

    /// Number of unique genes in the universe
    pub fn total_genes(&self) -> usize {
        self.total_genes
    }

    /// Number of genes flagged significant
    pub fn significant_genes(&self) -> usize {
        self.significant_genes
    }

    /// Number of genes not flagged significant
    pub fn non_significant_genes(&self) -> usize {
        self.total_genes - self.significant_genes
    }

    /// The log2 fold-change threshold the flag was computed with
    pub fn log2fc_threshold(&self) -> f64 {
        self.thresholds.log2fc()
    }

    /// The p-value cutoff the flag was computed with
    pub fn pval_cutoff(&self) -> f64 {
        self.thresholds.pval()
    }
}

/// A processed dataset: the gene universe plus its summary counts
#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    universe: GeneUniverse,
    summary: DatasetSummary,
}

impl ProcessedDataset {
    /// The deduplicated, significance-flagged gene universe
    pub fn universe(&self) -> &GeneUniverse {
        &self.universe
    }

    /// The aggregate counts of the run
    pub fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Consumes the dataset, returning universe and summary
    pub fn into_parts(self) -> (GeneUniverse, DatasetSummary) {
        (self.universe, self.summary)
    }
}

/// Processes the selected columns of a table into a gene universe
///
/// # Errors
///
/// - [`AopstatError::MissingColumns`] when the selection names columns the
///   table does not have (nothing is processed in that case)
/// - [`AopstatError::NoUsableData`] when no row survives the pipeline
///
/// # Examples
///
/// ```
/// use aopstat::expression::{process_table, ColumnSelection, Thresholds};
/// use aopstat::DataTable;
///
/// let mut table = DataTable::new();
/// table
///     .add_column("Gene", vec![Some("tp53".into()), Some("TP53".into())])
///     .unwrap();
/// table
///     .add_column("logFC", vec![Some("1.0".into()), Some("3.0".into())])
///     .unwrap();
/// table
///     .add_column("padj", vec![Some("0.04".into()), Some("0.02".into())])
///     .unwrap();
///
/// let selection = ColumnSelection::new("Gene", "logFC", "padj");
/// let processed = process_table(&table, &selection, &Thresholds::default()).unwrap();
///
/// // both rows describe the same gene and were merged
/// assert_eq!(processed.universe().len(), 1);
/// let gene = processed.universe().get("TP53").unwrap();
/// assert!((gene.log2fc() - 2.0).abs() < f64::EPSILON);
/// assert!(gene.is_significant());
/// ```
pub fn process_table(
    table: &DataTable,
    selection: &ColumnSelection,
    thresholds: &Thresholds,
) -> AopstatResult<ProcessedDataset> {
    let columns = table.require_columns(&[
        selection.gene_id(),
        selection.log2fc(),
        selection.pvalue(),
    ])?;
    let (ids, log2fcs, pvals) = (columns[0], columns[1], columns[2]);

    let rows = (0..table.n_rows()).map(|at| RawRow {
        id: ids.cells()[at].as_deref(),
        log2fc: log2fcs.cells()[at].as_deref(),
        pval: pvals.cells()[at].as_deref(),
    });
    process_rows(rows, thresholds)
}

/// Processes already extracted raw rows into a gene universe
///
/// # Errors
///
/// [`AopstatError::NoUsableData`] when no row survives the pipeline.
pub fn process_rows<'a, I>(rows: I, thresholds: &Thresholds) -> AopstatResult<ProcessedDataset>
where
    I: IntoIterator<Item = RawRow<'a>>,
{
    let (measurements, counts) = normalize::expand_rows(rows);
    let outcome = dedup::collapse(measurements);
    let duplicates_merged = outcome.merged();
    let genes_dropped = outcome.dropped();

    let records: Vec<GeneRecord> = outcome
        .into_genes()
        .into_iter()
        .map(|gene| {
            let significant = thresholds.is_significant(gene.log2fc(), gene.pval());
            GeneRecord {
                id: gene.id().to_string(),
                log2fc: gene.log2fc(),
                pval: gene.pval(),
                significant,
            }
        })
        .collect();

    if records.is_empty() {
        return Err(AopstatError::NoUsableData {
            rows_in: counts.rows_in(),
        });
    }

    let universe = GeneUniverse::new(records);
    let summary = DatasetSummary {
        rows_in: counts.rows_in(),
        rows_dropped: counts.rows_dropped(),
        duplicates_merged,
        genes_dropped,
        total_genes: universe.len(),
        significant_genes: universe.significant_count(),
        thresholds: *thresholds,
    };
    info!(
        "processed {} rows into {} genes ({} significant, {} rows dropped, {} duplicates merged)",
        summary.rows_in(),
        summary.total_genes(),
        summary.significant_genes(),
        summary.rows_dropped(),
        summary.duplicates_merged()
    );
    Ok(ProcessedDataset { universe, summary })
}
