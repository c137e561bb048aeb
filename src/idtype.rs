//! Namespace classification of gene identifiers
//!
//! Expression tables identify genes in several incompatible namespaces:
//! HGNC-style symbols, Ensembl gene ids, numeric Entrez ids, RefSeq
//! accessions and microarray probe ids. The [`IdentifierClassifier`] inspects
//! a sample of identifiers and reports the dominant namespace together with a
//! confidence score, so callers know whether the reference sets can be joined
//! against the data directly or a conversion step is needed first.
//!
//! Classification is a heuristic and never fails: a sample nothing matches
//! yields [`IdentifierKind::Unknown`] with confidence `0`, plus advisory
//! [`warnings`](IdentifierTypeAnalysis::warnings).

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::expression::normalize::canonical_id;
use crate::stats::f64_from_usize;
use crate::{
    CONFIDENCE_BAND_HIGH, CONFIDENCE_BAND_MEDIUM, DEFAULT_SAMPLE_SIZE, MAX_INVALID_SAMPLES,
    MIXED_SHARE_THRESHOLD,
};

/// The identifier namespaces the classifier recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// Ensembl gene ids: `ENSG` + 11 digits, optional `.version`
    Ensembl,
    /// RefSeq accessions: `NM_`/`XM_`/`NR_`/`XR_` + digits, optional version
    RefSeq,
    /// Microarray probe ids: `_AT`/`_S_AT`/`_X_AT` suffixes
    Probe,
    /// Numeric NCBI Entrez gene ids
    Entrez,
    /// HGNC-style gene symbols
    Symbol,
    /// No recognizable namespace
    Unknown,
}

impl IdentifierKind {
    /// Whether reference sets can be joined against this namespace directly
    ///
    /// Probe and RefSeq ids need an upstream conversion step before
    /// enrichment; the other recognized namespaces are joined as-is.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Symbol | Self::Ensembl | Self::Entrez)
    }
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Ensembl => "Ensembl",
            Self::RefSeq => "RefSeq",
            Self::Probe => "probe",
            Self::Entrez => "Entrez",
            Self::Symbol => "symbol",
            Self::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Namespace patterns over the canonical (trimmed, uppercased) form
///
/// The order is load-bearing: the first matching pattern wins, so structured
/// prefixes must come before the pure-numeric pattern and both before the
/// generic symbol pattern (an Ensembl id is also a well-formed symbol).
static NAMESPACE_PATTERNS: LazyLock<Vec<(IdentifierKind, Regex)>> = LazyLock::new(|| {
    [
        (IdentifierKind::Ensembl, r"^ENSG\d{11}(\.\d+)?$"),
        (IdentifierKind::RefSeq, r"^(NM_|XM_|NR_|XR_)\d+(\.\d+)?$"),
        (IdentifierKind::Probe, r"^.+(_S_AT|_X_AT|_AT)$"),
        (IdentifierKind::Entrez, r"^\d+$"),
        (IdentifierKind::Symbol, r"^[A-Z][A-Z0-9-]*[A-Z0-9]$|^[A-Z]$"),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        (
            kind,
            Regex::new(pattern).expect("namespace patterns must compile"),
        )
    })
    .collect()
});

/// Coarse banding of a classification confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    /// Confidence of at least `0.85`
    High,
    /// Confidence of at least `0.60`
    Medium,
    /// Anything below
    Low,
}

impl ConfidenceLevel {
    fn from_confidence(confidence: f64) -> Self {
        if confidence >= CONFIDENCE_BAND_HIGH {
            Self::High
        } else if confidence >= CONFIDENCE_BAND_MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{label}")
    }
}

/// The outcome of classifying an identifier sample
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierTypeAnalysis {
    primary: IdentifierKind,
    confidence: f64,
    mixed: bool,
    distribution: Vec<(IdentifierKind, usize)>,
    invalid: Vec<String>,
    invalid_total: usize,
    sampled: usize,
    warnings: Vec<String>,
}

impl IdentifierTypeAnalysis {
    /// The dominant namespace of the sample
    pub fn primary(&self) -> IdentifierKind {
        self.primary
    }

    /// Share of the sample classified as the primary namespace, in `[0, 1]`
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// The confidence expressed as a coarse band
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }

    /// Whether a second namespace holds more than a fifth of the sample
    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    /// Per-namespace counts, in pattern order, omitting empty namespaces
    pub fn distribution(&self) -> &[(IdentifierKind, usize)] {
        &self.distribution
    }

    /// Sampled identifiers that matched no namespace, capped at 20 entries
    pub fn invalid_samples(&self) -> &[String] {
        &self.invalid
    }

    /// Exact number of sampled identifiers that matched no namespace
    pub fn invalid_total(&self) -> usize {
        self.invalid_total
    }

    /// Number of identifiers actually inspected
    pub fn sampled(&self) -> usize {
        self.sampled
    }

    /// Advisory messages; never a failure
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Head-sampling identifier-type classifier
///
/// Inspects the first [`DEFAULT_SAMPLE_SIZE`] identifiers of a sequence
/// (deterministic, no random sampling) and classifies each against the
/// namespace patterns in a fixed order.
///
/// # Examples
///
/// ```
/// use aopstat::idtype::{IdentifierClassifier, IdentifierKind};
///
/// let analysis = IdentifierClassifier::default().analyze(["TP53", "BRCA1", "EGFR"]);
///
/// assert_eq!(analysis.primary(), IdentifierKind::Symbol);
/// assert!((analysis.confidence() - 1.0).abs() < f64::EPSILON);
/// assert!(!analysis.is_mixed());
/// assert!(analysis.warnings().is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IdentifierClassifier {
    sample_size: usize,
}

impl Default for IdentifierClassifier {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl IdentifierClassifier {
    /// Uses a different sample size
    ///
    /// ```
    /// use aopstat::idtype::IdentifierClassifier;
    ///
    /// let classifier = IdentifierClassifier::default().with_sample_size(200);
    /// # let _ = classifier;
    /// ```
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Classifies up to `sample_size` identifiers from the head of a sequence
    ///
    /// Identifiers are canonicalized (trimmed, uppercased) before matching;
    /// blank ones are skipped without consuming a sample slot.
    pub fn analyze<'a, I>(&self, identifiers: I) -> IdentifierTypeAnalysis
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = vec![0_usize; NAMESPACE_PATTERNS.len()];
        let mut sampled = 0_usize;
        let mut invalid_total = 0_usize;
        let mut invalid = Vec::new();

        for raw in identifiers {
            if sampled == self.sample_size {
                break;
            }
            let Some(canonical) = canonical_id(raw) else {
                continue;
            };
            sampled += 1;
            let hit = NAMESPACE_PATTERNS
                .iter()
                .position(|(_, pattern)| pattern.is_match(&canonical));
            match hit {
                Some(at) => counts[at] += 1,
                None => {
                    invalid_total += 1;
                    if invalid.len() < MAX_INVALID_SAMPLES {
                        invalid.push(canonical);
                    }
                }
            }
        }

        let distribution: Vec<(IdentifierKind, usize)> = NAMESPACE_PATTERNS
            .iter()
            .zip(&counts)
            .filter(|(_, count)| **count > 0)
            .map(|((kind, _), count)| (*kind, *count))
            .collect();

        // ties resolve to the earlier pattern, keeping the outcome stable
        let mut best: Option<(IdentifierKind, usize)> = None;
        let mut runner_up: Option<(IdentifierKind, usize)> = None;
        for &(kind, count) in &distribution {
            if best.map_or(true, |(_, top)| count > top) {
                runner_up = best;
                best = Some((kind, count));
            } else if runner_up.map_or(true, |(_, second)| count > second) {
                runner_up = Some((kind, count));
            }
        }

        let (primary, confidence) = match best {
            Some((kind, count)) => (kind, f64_from_usize(count) / f64_from_usize(sampled)),
            None => (IdentifierKind::Unknown, 0.0),
        };
        let mixed = runner_up.is_some_and(|(_, count)| {
            f64_from_usize(count) / f64_from_usize(sampled) > MIXED_SHARE_THRESHOLD
        });

        let mut warnings = Vec::new();
        if mixed {
            let (kind, count) = runner_up.expect("mixed requires a runner-up");
            warnings.push(format!(
                "mixed identifier namespaces: {count} of {sampled} sampled ids are {kind} rather than {primary}"
            ));
        }
        if sampled > 0
            && f64_from_usize(invalid_total) / f64_from_usize(sampled) > MIXED_SHARE_THRESHOLD
        {
            warnings.push(format!(
                "{invalid_total} of {sampled} sampled ids match no known namespace"
            ));
        }
        if primary != IdentifierKind::Unknown && !primary.is_supported() {
            warnings.push(format!(
                "primary namespace {primary} has no reference-set mapping; supported namespaces are symbol, Ensembl and Entrez"
            ));
        }

        debug!(
            "classified {} sampled ids as {} (confidence {:.2}, {} invalid)",
            sampled, primary, confidence, invalid_total
        );
        IdentifierTypeAnalysis {
            primary,
            confidence,
            mixed,
            distribution,
            invalid,
            invalid_total,
            sampled,
            warnings,
        }
    }
}
