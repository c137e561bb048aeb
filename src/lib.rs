//! Key-Event enrichment statistics for differential gene-expression data
//!
//! `aopstat` turns a parsed gene-expression table into ranked enrichment
//! statistics for the Key Events (KEs) of an Adverse Outcome Pathway (AOP).
//! It covers the full analysis pipeline between file parsing and report
//! rendering, both of which stay in the host application:
//!
//! 1. [`detect`]: heuristic detection of which table columns hold gene
//!    identifiers, log2 fold-changes and p-values
//! 2. [`expression`]: identifier normalization, composite-identifier fan-out,
//!    gene-level deduplication with Fisher's combined p-value and a
//!    configurable significance flag
//! 3. [`idtype`]: classification of the identifier namespace in use
//!    (HGNC symbols, Ensembl, NCBI, ...)
//! 4. [`enrichment`]: a one-sided exact test per reference gene set with
//!    Benjamini–Hochberg correction over the whole batch
//!
//! The crate performs no file or network I/O. Tables ([`DataTable`]),
//! reference gene sets ([`ReferenceSets`]) and pathway metadata
//! ([`AopMetadata`]) are plain data handed in by the caller; results come
//! back as plain data ([`EnrichmentResult`]).
//!
//! # Examples
//!
//! ```
//! use aopstat::{AopMetadata, ColumnSelection, DataTable, KeKind, ReferenceSets, Thresholds};
//!
//! // A small differential-expression table, already parsed by the host
//! let mut table = DataTable::new();
//! table
//!     .add_column(
//!         "SYMBOL",
//!         vec![
//!             Some("TP53".into()),
//!             Some("BRCA1".into()),
//!             Some("EGFR".into()),
//!             Some("MYC".into()),
//!         ],
//!     )
//!     .unwrap();
//! table
//!     .add_column(
//!         "logFC",
//!         vec![
//!             Some("2.1".into()),
//!             Some("-0.2".into()),
//!             Some("1.8".into()),
//!             Some("0.1".into()),
//!         ],
//!     )
//!     .unwrap();
//! table
//!     .add_column(
//!         "pvalue",
//!         vec![
//!             Some("0.001".into()),
//!             Some("0.8".into()),
//!             Some("0.01".into()),
//!             Some("0.7".into()),
//!         ],
//!     )
//!     .unwrap();
//!
//! // Reference gene sets and display metadata for one pathway
//! let mut reference = ReferenceSets::new();
//! reference.insert("KE:1", ["TP53", "EGFR", "BRCA1"]);
//!
//! let mut aop = AopMetadata::new("AOP:42");
//! aop.insert("KE:1", "Oxidative stress", KeKind::MolecularInitiating);
//!
//! let selection = ColumnSelection::new("SYMBOL", "logFC", "pvalue");
//! let report = aopstat::run_analysis(
//!     &table,
//!     &selection,
//!     &Thresholds::default(),
//!     &reference,
//!     &aop,
//! )
//! .unwrap();
//!
//! assert_eq!(report.summary().total_genes(), 4);
//! assert_eq!(report.summary().significant_genes(), 2);
//!
//! let top = report.results().first().unwrap();
//! assert_eq!(top.ke(), "KE:1");
//! assert_eq!(top.significant_in_set(), 2);
//! ```
//!
//! When the column headers are unknown up front, run the
//! [`ColumnDetector`] first and build the [`ColumnSelection`] from its
//! suggestions (see [`analysis::select_columns`]).

use std::time::Duration;

use thiserror::Error;

pub mod analysis;
pub mod detect;
pub mod enrichment;
pub mod expression;
pub mod idtype;
pub mod reference;
pub mod stats;
pub mod table;

pub use analysis::{run_analysis, select_columns, AnalysisReport};
pub use detect::{ColumnDetector, ColumnMatch, ColumnRole, ColumnSuggestions};
pub use enrichment::{key_event_enrichment, EnrichmentResult};
pub use expression::{ColumnSelection, DatasetSummary, GeneRecord, GeneUniverse, Thresholds};
pub use idtype::{IdentifierClassifier, IdentifierKind, IdentifierTypeAnalysis};
pub use reference::{AopMetadata, KeKind, ReferenceCache, ReferenceSets};
pub use table::DataTable;

/// Default p-value cutoff of the significance flag
pub const DEFAULT_PVAL_CUTOFF: f64 = 0.05;

/// Default absolute log2 fold-change threshold (0.0: every gene passes)
pub const DEFAULT_LOG2FC_THRESHOLD: f64 = 0.0;

/// Largest accepted log2 fold-change threshold
pub const MAX_LOG2FC_THRESHOLD: f64 = 10.0;

/// Delimiter joining synonym identifiers within a single table cell
pub const COMPOSITE_DELIMITER: &str = "///";

/// Number of identifiers inspected from the head of a sequence during
/// namespace classification
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Cap on the invalid identifiers retained for diagnostics
pub const MAX_INVALID_SAMPLES: usize = 20;

/// Share of a secondary namespace above which a sample is flagged as mixed
pub const MIXED_SHARE_THRESHOLD: f64 = 0.2;

/// Minimum confidence for a column to be suggested for a role at all
pub const MIN_CONFIDENCE: f64 = 0.3;

/// Confidence at or above which a column suggestion is considered safe to
/// select without user review
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Classifier confidence at or above which the namespace call is "high"
pub const CONFIDENCE_BAND_HIGH: f64 = 0.85;

/// Classifier confidence at or above which the namespace call is "medium"
pub const CONFIDENCE_BAND_MEDIUM: f64 = 0.6;

/// Default time-to-live of the [`ReferenceCache`]
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Errors of the analysis pipeline
///
/// Heuristic components (column detection, namespace classification) never
/// return errors; a weak signal is reported as a low confidence or a missing
/// suggestion instead. Errors are reserved for malformed input shapes and for
/// analyses that cannot produce any result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AopstatError {
    /// Requested column names are absent from the input table
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A column was added twice to the same table
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    /// A column does not have the same number of rows as the rest of the table
    #[error("column {column} has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        /// Name of the offending column
        column: String,
        /// Number of rows in the table
        expected: usize,
        /// Number of rows in the column
        actual: usize,
    },

    /// Every input row was dropped during normalization or deduplication
    #[error("no usable data: none of the {rows_in} input rows produced a valid gene record")]
    NoUsableData {
        /// Number of rows the table supplied
        rows_in: usize,
    },

    /// The selected pathway has no matching reference gene sets
    #[error("no reference gene sets found for {aop}")]
    NoReferenceSets {
        /// Identifier of the selected pathway
        aop: String,
    },

    /// No reference set shares a single gene with the observed universe
    #[error("no enrichment results: none of the {sets_tested} reference sets overlap the dataset")]
    NoEnrichmentResults {
        /// Number of reference sets that were examined
        sets_tested: usize,
    },

    /// A significance threshold was rejected during validation
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// Crate-wide `Result` alias, using [`AopstatError`]
pub type AopstatResult<T> = Result<T, AopstatError>;
