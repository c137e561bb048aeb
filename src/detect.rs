//! Heuristic detection of the gene-id, fold-change and p-value columns
//!
//! Expression tables arrive with wildly different headers (`Gene_Symbol`,
//! `log2FoldChange`, `padj`, `P.Value`, ...). The [`ColumnDetector`] scores
//! every column for every role and returns ranked [`ColumnSuggestions`], so
//! interactive callers can preselect sensible defaults and still offer the
//! full ranking for manual correction.
//!
//! The confidence of a (column, role) pair is a weighted sum of two
//! independent signals: how well the header matches the role's naming
//! conventions (weight 0.4) and how well the cell contents behave for the
//! role (weight 0.6). Detection is a heuristic and never fails: a column
//! that fits nothing simply yields no candidate, and picking between
//! same-ranked suggestions stays the caller's job. The same column may rank
//! for several roles; the caller is responsible for choosing three distinct
//! columns in the end.

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::expression::normalize::parse_number;
use crate::idtype::IdentifierClassifier;
use crate::idtype::IdentifierTypeAnalysis;
use crate::stats::f64_from_usize;
use crate::table::Column;
use crate::table::DataTable;
use crate::HIGH_CONFIDENCE;
use crate::MIN_CONFIDENCE;

const NAME_WEIGHT: f64 = 0.4;
const CONTENT_WEIGHT: f64 = 0.6;
const FULL_NAME_SCORE: f64 = 1.0;
const PARTIAL_NAME_SCORE: f64 = 0.8;
const SUPPORTED_NAMESPACE_BONUS: f64 = 0.1;
const NON_NUMERIC_TOLERANCE: f64 = 0.2;
const LOG2FC_ENVELOPE: f64 = 15.0;

fn compile(patterns: &[&'static str]) -> Vec<(&'static str, Regex)> {
    patterns
        .iter()
        .map(|pattern| {
            (
                *pattern,
                Regex::new(pattern).expect("name patterns must compile"),
            )
        })
        .collect()
}

/// Header conventions per role
///
/// Every pattern is tried against the lowercased header; a full-string match
/// anywhere in the list wins over substring matches. The first pattern that
/// reaches the winning score is the one named in the match reason, so the
/// specific `gene.*symbol` precedes the catch-all `id`.
static GENE_NAME_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        "gene.*symbol",
        "gene.*name",
        "gene.*id",
        "symbol",
        "hgnc",
        "ensembl",
        "entrez",
        "ncbi",
        "gene",
        "identifier",
        "id",
        "probe.*id",
        "probe",
        "feature",
    ])
});

static FC_NAME_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        "log2.*fc",
        "log2.*fold",
        "logfc",
        "log.*fold.*change",
        "fold.*change",
        "fc",
        "lfc",
        "log2.*ratio",
        "ratio",
    ])
});

static PVAL_NAME_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    compile(&[
        "p.*val",
        "pval",
        r"p\.val",
        "p_val",
        "p.*adj",
        "padj",
        "fdr",
        "q.*val",
        "qval",
        "significance",
        "p.*value",
    ])
});

/// The three roles an analysis needs filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    /// The gene identifier column
    GeneId,
    /// The log2 fold-change column
    Log2Fc,
    /// The p-value column
    PValue,
}

impl Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::GeneId => "gene identifier",
            Self::Log2Fc => "log2 fold-change",
            Self::PValue => "p-value",
        };
        write!(f, "{label}")
    }
}

/// Descriptive statistics of a numeric candidate column
///
/// `std` is the sample standard deviation (`n - 1` denominator) and is NaN
/// for fewer than two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary {
    n: usize,
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
}

impl NumericSummary {
    fn of(values: &[f64]) -> Self {
        let n = values.len();
        let mean = values.iter().sum::<f64>() / f64_from_usize(n);
        let spread = values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>();
        let std = (spread / f64_from_usize(n.saturating_sub(1))).sqrt();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            n,
            mean,
            std,
            min,
            max,
        }
    }

    /// Number of parseable values
    pub fn n(&self) -> usize {
        self.n
    }

    /// Arithmetic mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation; NaN for fewer than two values
    pub fn std(&self) -> f64 {
        self.std
    }

    /// Smallest value
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest value
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// The diagnostic payload behind a [`ColumnMatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnAnalysis {
    /// Gene-id candidates carry the namespace classification
    Identifier(IdentifierTypeAnalysis),
    /// Numeric candidates carry descriptive statistics
    Numeric(NumericSummary),
}

/// One scored (column, role) candidate
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    column: String,
    role: ColumnRole,
    confidence: f64,
    reasons: Vec<String>,
    analysis: ColumnAnalysis,
}

impl ColumnMatch {
    /// The candidate column's header
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The role the column is proposed for
    pub fn role(&self) -> ColumnRole {
        self.role
    }

    /// Combined name and content confidence, in `[0, 1]`
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether the confidence reaches the high-confidence mark of `0.8`
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= HIGH_CONFIDENCE
    }

    /// Human-readable scoring reasons, name signal first
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// The diagnostic payload the score was derived from
    pub fn analysis(&self) -> &ColumnAnalysis {
        &self.analysis
    }
}

/// Ranked detection output, one candidate list per role
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSuggestions {
    gene_id: Vec<ColumnMatch>,
    log2fc: Vec<ColumnMatch>,
    pvalue: Vec<ColumnMatch>,
}

impl ColumnSuggestions {
    /// Gene-id candidates, best first
    pub fn gene_id(&self) -> &[ColumnMatch] {
        &self.gene_id
    }

    /// Fold-change candidates, best first
    pub fn log2fc(&self) -> &[ColumnMatch] {
        &self.log2fc
    }

    /// P-value candidates, best first
    pub fn pvalue(&self) -> &[ColumnMatch] {
        &self.pvalue
    }

    /// The best gene-id candidate, if any cleared the floor
    pub fn best_gene_id(&self) -> Option<&ColumnMatch> {
        self.gene_id.first()
    }

    /// The best fold-change candidate, if any cleared the floor
    pub fn best_log2fc(&self) -> Option<&ColumnMatch> {
        self.log2fc.first()
    }

    /// The best p-value candidate, if any cleared the floor
    pub fn best_pvalue(&self) -> Option<&ColumnMatch> {
        self.pvalue.first()
    }
}

/// Scores every column of a table for every role
///
/// # Examples
///
/// ```
/// use aopstat::detect::ColumnDetector;
/// use aopstat::DataTable;
///
/// let table = DataTable::from_columns([
///     (
///         "Gene_Symbol",
///         vec![Some("BRCA1".into()), Some("TP53".into()), Some("EGFR".into())],
///     ),
///     (
///         "log2FoldChange",
///         vec![Some("2.5".into()), Some("-1.8".into()), Some("3.2".into())],
///     ),
///     (
///         "padj",
///         vec![Some("0.001".into()), Some("0.005".into()), Some("0.0001".into())],
///     ),
/// ])
/// .unwrap();
///
/// let suggestions = ColumnDetector::default().detect(&table);
///
/// assert_eq!(suggestions.best_gene_id().unwrap().column(), "Gene_Symbol");
/// assert_eq!(suggestions.best_log2fc().unwrap().column(), "log2FoldChange");
/// assert_eq!(suggestions.best_pvalue().unwrap().column(), "padj");
/// assert!(suggestions.best_gene_id().unwrap().confidence() > 0.5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ColumnDetector {
    min_confidence: f64,
}

impl Default for ColumnDetector {
    fn default() -> Self {
        Self {
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

impl ColumnDetector {
    /// Uses a different candidate floor
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Scores all columns and returns the ranked suggestions
    ///
    /// Columns without a single non-missing cell are skipped. Columns whose
    /// non-missing cells are more than a fifth non-numeric are skipped for
    /// the numeric roles but may still rank as gene-id candidates.
    pub fn detect(&self, table: &DataTable) -> ColumnSuggestions {
        let mut suggestions = ColumnSuggestions::default();

        for column in table.columns() {
            let values: Vec<&str> = column.non_missing().collect();
            if values.is_empty() {
                continue;
            }
            let lowered = column.name().to_lowercase();

            if let Some(candidate) = self.score_gene_id(column, &lowered, &values) {
                suggestions.gene_id.push(candidate);
            }

            let numbers: Vec<f64> = values.iter().filter_map(|cell| parse_number(cell)).collect();
            let non_numeric = values.len() - numbers.len();
            if f64_from_usize(non_numeric) / f64_from_usize(values.len()) > NON_NUMERIC_TOLERANCE {
                continue;
            }
            let summary = NumericSummary::of(&numbers);

            let (score, reasons) = log2fc_content(&summary, &numbers);
            if let Some(candidate) = self.assemble(
                column,
                ColumnRole::Log2Fc,
                name_score(column.name(), &lowered, &FC_NAME_PATTERNS),
                score,
                reasons,
                ColumnAnalysis::Numeric(summary),
            ) {
                suggestions.log2fc.push(candidate);
            }

            let (score, reasons) = pvalue_content(&summary, &numbers);
            if let Some(candidate) = self.assemble(
                column,
                ColumnRole::PValue,
                name_score(column.name(), &lowered, &PVAL_NAME_PATTERNS),
                score,
                reasons,
                ColumnAnalysis::Numeric(summary),
            ) {
                suggestions.pvalue.push(candidate);
            }
        }

        rank(&mut suggestions.gene_id);
        rank(&mut suggestions.log2fc);
        rank(&mut suggestions.pvalue);
        debug!(
            "proposed {} gene-id, {} fold-change and {} p-value candidates",
            suggestions.gene_id.len(),
            suggestions.log2fc.len(),
            suggestions.pvalue.len()
        );
        suggestions
    }

    fn score_gene_id(
        &self,
        column: &Column,
        lowered: &str,
        values: &[&str],
    ) -> Option<ColumnMatch> {
        let analysis = IdentifierClassifier::default().analyze(values.iter().copied());
        let mut content = analysis.confidence();
        let mut reasons = vec![format!(
            "sampled ids classify as {} with {} confidence",
            analysis.primary(),
            analysis.confidence_level()
        )];
        if analysis.primary().is_supported() {
            content = (content + SUPPORTED_NAMESPACE_BONUS).min(1.0);
            reasons.push(format!(
                "{} ids join directly against reference sets",
                analysis.primary()
            ));
        }
        self.assemble(
            column,
            ColumnRole::GeneId,
            name_score(column.name(), lowered, &GENE_NAME_PATTERNS),
            content,
            reasons,
            ColumnAnalysis::Identifier(analysis),
        )
    }

    fn assemble(
        &self,
        column: &Column,
        role: ColumnRole,
        name: Option<(f64, String)>,
        content_score: f64,
        content_reasons: Vec<String>,
        analysis: ColumnAnalysis,
    ) -> Option<ColumnMatch> {
        let mut reasons = Vec::new();
        let mut name_component = 0.0;
        if let Some((score, reason)) = name {
            name_component = score;
            reasons.push(reason);
        }
        reasons.extend(content_reasons);
        let confidence = name_component * NAME_WEIGHT + content_score.min(1.0) * CONTENT_WEIGHT;
        (confidence >= self.min_confidence).then(|| ColumnMatch {
            column: column.name().to_string(),
            role,
            confidence,
            reasons,
            analysis,
        })
    }
}

/// Stable descending sort, so equal confidences keep table order
fn rank(candidates: &mut [ColumnMatch]) {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

fn name_score(
    name: &str,
    lowered: &str,
    patterns: &[(&'static str, Regex)],
) -> Option<(f64, String)> {
    let mut partial = None;
    for (raw, pattern) in patterns {
        let Some(hit) = pattern.find(lowered) else {
            continue;
        };
        if hit.start() == 0 && hit.end() == lowered.len() {
            return Some((FULL_NAME_SCORE, format!("name '{name}' matches '{raw}'")));
        }
        if partial.is_none() {
            partial = Some(format!("name '{name}' contains '{raw}'"));
        }
    }
    partial.map(|reason| (PARTIAL_NAME_SCORE, reason))
}

fn log2fc_content(summary: &NumericSummary, values: &[f64]) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();
    if summary.min() >= -LOG2FC_ENVELOPE && summary.max() <= LOG2FC_ENVELOPE {
        score += 0.3;
        reasons.push("all values lie within the [-15, 15] log2 ratio range".to_string());
    }
    if summary.mean().abs() < 2.0 {
        score += 0.2;
        reasons.push(format!("mean {:.2} is close to zero", summary.mean()));
    }
    // NaN spread (fewer than two values) fails the containment check
    if (0.5..=5.0).contains(&summary.std()) {
        score += 0.2;
        reasons.push(format!(
            "spread (std {:.2}) is typical of log2 ratios",
            summary.std()
        ));
    }
    if values.iter().any(|value| *value > 0.0) && values.iter().any(|value| *value < 0.0) {
        score += 0.2;
        reasons.push("both up- and down-regulated values present".to_string());
    }
    (score, reasons)
}

fn pvalue_content(summary: &NumericSummary, values: &[f64]) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();
    // the three checks accrue independently: an out-of-range value costs
    // the range credit, not the whole content signal
    if summary.min() >= 0.0 && summary.max() <= 1.0 {
        score += 0.4;
        reasons.push("all values fall within [0, 1]".to_string());
    }
    if values.iter().any(|value| *value < 0.05) && values.iter().any(|value| *value >= 0.5) {
        score += 0.2;
        reasons.push("mixture of significant and non-significant values".to_string());
    }
    if values.iter().all(|value| *value != 0.0 && *value != 1.0) {
        score += 0.1;
        reasons.push("no exact 0 or 1 values".to_string());
    }
    (score, reasons)
}
