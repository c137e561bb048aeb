//! In-memory model of a parsed expression table
//!
//! The host application reads the delimited text file (with its own delimiter
//! auto-detection) and hands the result over as a [`DataTable`]: named columns
//! in their original order, each holding one optional string cell per row.
//! Missing cells stay `None`; cells that contain only whitespace are treated
//! as missing by everything downstream.

use crate::AopstatError;
use crate::AopstatResult;

/// A single named column of raw string cells
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    cells: Vec<Option<String>>,
}

impl Column {
    /// The column header
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All cells of the column, including missing ones
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    /// Number of rows in the column
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates the trimmed, non-missing cells
    ///
    /// Whitespace-only cells count as missing and are skipped.
    pub fn non_missing(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .filter_map(|cell| cell.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// A parsed input table: ordered named columns of equal height
///
/// # Examples
///
/// ```
/// use aopstat::DataTable;
///
/// let mut table = DataTable::new();
/// table
///     .add_column("Gene", vec![Some("TP53".into()), Some("BRCA1".into())])
///     .unwrap();
/// table
///     .add_column("logFC", vec![Some("1.4".into()), None])
///     .unwrap();
///
/// assert_eq!(table.n_rows(), 2);
/// assert_eq!(table.column_names().collect::<Vec<_>>(), ["Gene", "logFC"]);
/// assert!(table.column("logFC").is_some());
/// assert!(table.column("padj").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<Column>,
}

impl DataTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, cells)` pairs
    ///
    /// # Errors
    ///
    /// - [`AopstatError::DuplicateColumn`] if a name appears twice
    /// - [`AopstatError::ColumnLengthMismatch`] if the columns differ in height
    pub fn from_columns<N: Into<String>>(
        columns: impl IntoIterator<Item = (N, Vec<Option<String>>)>,
    ) -> AopstatResult<Self> {
        let mut table = Self::new();
        for (name, cells) in columns {
            table.add_column(name, cells)?;
        }
        Ok(table)
    }

    /// Appends a column to the table
    ///
    /// # Errors
    ///
    /// - [`AopstatError::DuplicateColumn`] if the name is already present
    /// - [`AopstatError::ColumnLengthMismatch`] if the cell count differs
    ///   from the existing columns
    pub fn add_column<N: Into<String>>(
        &mut self,
        name: N,
        cells: Vec<Option<String>>,
    ) -> AopstatResult<()> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(AopstatError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != cells.len() {
                return Err(AopstatError::ColumnLengthMismatch {
                    column: name,
                    expected: first.len(),
                    actual: cells.len(),
                });
            }
        }
        self.columns.push(Column { name, cells });
        Ok(())
    }

    /// Number of rows shared by every column
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the table has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The columns in their original order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The column headers in their original order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Looks up a column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Looks up several columns at once, failing fast when any are absent
    ///
    /// The returned columns are in the order of `names`, not table order.
    ///
    /// # Errors
    ///
    /// [`AopstatError::MissingColumns`], listing every absent name, if at
    /// least one lookup fails. No partial result is returned.
    pub fn require_columns(&self, names: &[&str]) -> AopstatResult<Vec<&Column>> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column(name) {
                Some(column) => found.push(column),
                None => missing.push((*name).to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(AopstatError::MissingColumns(missing))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|value| {
                if value.is_empty() {
                    None
                } else {
                    Some((*value).to_string())
                }
            })
            .collect()
    }

    #[test]
    fn build_and_look_up() {
        let table = DataTable::from_columns([
            ("Gene", cells(&["TP53", "BRCA1"])),
            ("logFC", cells(&["1.5", "-0.4"])),
        ])
        .unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_columns(), 2);
        assert_eq!(table.column("Gene").unwrap().name(), "Gene");
        assert!(table.column("gene").is_none());
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut table = DataTable::new();
        table.add_column("Gene", cells(&["TP53", "BRCA1"])).unwrap();

        let err = table.add_column("logFC", cells(&["1.5"])).unwrap_err();
        assert_eq!(
            err,
            AopstatError::ColumnLengthMismatch {
                column: "logFC".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut table = DataTable::new();
        table.add_column("Gene", cells(&["TP53"])).unwrap();

        let err = table.add_column("Gene", cells(&["EGFR"])).unwrap_err();
        assert_eq!(err, AopstatError::DuplicateColumn("Gene".to_string()));
    }

    #[test]
    fn require_columns_lists_all_missing_names() {
        let table = DataTable::from_columns([("Gene", cells(&["TP53"]))]).unwrap();

        let err = table
            .require_columns(&["Gene", "logFC", "padj"])
            .unwrap_err();
        assert_eq!(
            err,
            AopstatError::MissingColumns(vec!["logFC".to_string(), "padj".to_string()])
        );
        assert_eq!(
            err.to_string(),
            "missing required columns: logFC, padj"
        );
    }

    #[test]
    fn non_missing_skips_blank_cells() {
        let table = DataTable::from_columns([(
            "Gene",
            vec![
                Some("TP53".to_string()),
                None,
                Some("   ".to_string()),
                Some("  BRCA1 ".to_string()),
            ],
        )])
        .unwrap();

        let values: Vec<&str> = table.column("Gene").unwrap().non_missing().collect();
        assert_eq!(values, ["TP53", "BRCA1"]);
    }

    #[test]
    fn empty_table() {
        let table = DataTable::new();
        assert!(table.is_empty());
        assert_eq!(table.n_rows(), 0);
        assert!(table.require_columns(&["Gene"]).is_err());
    }
}
