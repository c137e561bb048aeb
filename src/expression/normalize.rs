//! Identifier canonicalization and row expansion
//!
//! Raw identifier cells are trimmed and uppercased; a cell holding several
//! synonym identifiers joined by [`COMPOSITE_DELIMITER`] fans out into one
//! measurement per synonym, every one carrying the fold-change/p-value pair
//! of the source row. A row is dropped (counted, never fatal) when its
//! identifier cell yields no usable identifier or a numeric cell does not
//! parse.

use tracing::debug;

use crate::COMPOSITE_DELIMITER;

/// One table row as handed to the normalizer: three optional raw cells
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    /// The gene identifier cell
    pub id: Option<&'a str>,
    /// The log2 fold-change cell
    pub log2fc: Option<&'a str>,
    /// The p-value cell
    pub pval: Option<&'a str>,
}

/// One normalized measurement: a canonical identifier with its values
///
/// Several measurements may share an identifier (duplicate probes, composite
/// fan-out); [`collapse`](crate::expression::dedup::collapse) merges them.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    id: String,
    log2fc: f64,
    pval: f64,
}

impl Measurement {
    /// Creates a measurement from an already canonical identifier
    pub fn new<I: Into<String>>(id: I, log2fc: f64, pval: f64) -> Self {
        Self {
            id: id.into(),
            log2fc,
            pval,
        }
    }

    /// The canonical gene identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The log2 fold-change of this measurement
    pub fn log2fc(&self) -> f64 {
        self.log2fc
    }

    /// The p-value of this measurement
    pub fn pval(&self) -> f64 {
        self.pval
    }
}

/// Row totals of one normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    rows_in: usize,
    rows_dropped: usize,
}

impl RowCounts {
    /// Number of rows received
    pub fn rows_in(&self) -> usize {
        self.rows_in
    }

    /// Number of rows that produced no measurement
    pub fn rows_dropped(&self) -> usize {
        self.rows_dropped
    }
}

/// Canonicalizes a raw identifier: trim, uppercase
///
/// Returns `None` when nothing but whitespace remains.
///
/// # Examples
///
/// ```
/// use aopstat::expression::normalize::canonical_id;
///
/// assert_eq!(canonical_id("  tp53 "), Some("TP53".to_string()));
/// assert_eq!(canonical_id("   "), None);
/// ```
pub fn canonical_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_uppercase())
    }
}

/// Parses a numeric cell leniently
///
/// Surrounding whitespace is ignored; anything that does not parse to a
/// finite `f64` counts as non-numeric.
pub(crate) fn parse_number(cell: &str) -> Option<f64> {
    let value: f64 = cell.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Expands raw rows into canonical measurements
///
/// Composite identifier cells fan out into one measurement per synonym.
/// Rows without a usable identifier or with unparseable numeric cells are
/// dropped and counted in the returned [`RowCounts`].
pub fn expand_rows<'a, I>(rows: I) -> (Vec<Measurement>, RowCounts)
where
    I: IntoIterator<Item = RawRow<'a>>,
{
    let mut measurements = Vec::new();
    let mut counts = RowCounts::default();
    for row in rows {
        counts.rows_in += 1;
        if expand_row(&row, &mut measurements) == 0 {
            counts.rows_dropped += 1;
            debug!("dropping row {}: no usable measurement", counts.rows_in);
        }
    }
    (measurements, counts)
}

/// Appends the measurements of a single row, returning how many were added
fn expand_row(row: &RawRow<'_>, out: &mut Vec<Measurement>) -> usize {
    let Some(id_cell) = row.id else {
        return 0;
    };
    let Some(log2fc) = row.log2fc.and_then(parse_number) else {
        return 0;
    };
    let Some(pval) = row.pval.and_then(parse_number) else {
        return 0;
    };

    let mut produced = 0;
    for fragment in id_cell.split(COMPOSITE_DELIMITER) {
        if let Some(id) = canonical_id(fragment) {
            out.push(Measurement::new(id, log2fc, pval));
            produced += 1;
        }
    }
    produced
}

#[cfg(test)]
mod test {
    use super::*;

    fn row<'a>(id: &'a str, log2fc: &'a str, pval: &'a str) -> RawRow<'a> {
        RawRow {
            id: Some(id),
            log2fc: Some(log2fc),
            pval: Some(pval),
        }
    }

    #[test]
    fn plain_row_is_canonicalized() {
        let (measurements, counts) = expand_rows([row(" tp53 ", "1.5", "0.01")]);

        assert_eq!(measurements, [Measurement::new("TP53", 1.5, 0.01)]);
        assert_eq!(counts.rows_in(), 1);
        assert_eq!(counts.rows_dropped(), 0);
    }

    #[test]
    fn composite_cell_fans_out() {
        let (measurements, _) = expand_rows([row("BRCA1///TP53", "2.0", "0.01")]);

        assert_eq!(
            measurements,
            [
                Measurement::new("BRCA1", 2.0, 0.01),
                Measurement::new("TP53", 2.0, 0.01),
            ]
        );
    }

    #[test]
    fn blank_fragments_are_skipped() {
        let (measurements, counts) = expand_rows([row("A/// ///B", "1.0", "0.5")]);

        let ids: Vec<&str> = measurements.iter().map(Measurement::id).collect();
        assert_eq!(ids, ["A", "B"]);
        assert_eq!(counts.rows_dropped(), 0);
    }

    #[test]
    fn all_blank_composite_drops_the_row() {
        let (measurements, counts) = expand_rows([row("///", "1.0", "0.5")]);

        assert!(measurements.is_empty());
        assert_eq!(counts.rows_dropped(), 1);
    }

    #[test]
    fn missing_cells_drop_the_row() {
        let rows = [
            RawRow {
                id: None,
                log2fc: Some("1.0"),
                pval: Some("0.5"),
            },
            RawRow {
                id: Some("TP53"),
                log2fc: None,
                pval: Some("0.5"),
            },
            RawRow {
                id: Some("TP53"),
                log2fc: Some("1.0"),
                pval: None,
            },
        ];
        let (measurements, counts) = expand_rows(rows);

        assert!(measurements.is_empty());
        assert_eq!(counts.rows_in(), 3);
        assert_eq!(counts.rows_dropped(), 3);
    }

    #[test]
    fn unparseable_numbers_drop_the_row() {
        let (measurements, counts) = expand_rows([
            row("TP53", "strong", "0.5"),
            row("BRCA1", "1.0", "n.s."),
            row("EGFR", "1.0", "0.5"),
        ]);

        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].id(), "EGFR");
        assert_eq!(counts.rows_dropped(), 2);
    }

    #[test]
    fn non_finite_numbers_count_as_unparseable() {
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
        assert_eq!(parse_number("1e-8"), Some(1e-8));
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn whitespace_identifier_is_dropped() {
        let (measurements, counts) = expand_rows([row("   ", "1.0", "0.5")]);

        assert!(measurements.is_empty());
        assert_eq!(counts.rows_dropped(), 1);
    }
}
