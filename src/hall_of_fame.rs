//! Hall of fame: the discovered-equation table
//!
//! The table is written by the discovery backend and carries at least an
//! `Equation` (text) and a `Complexity` (integer) column. Extra columns such
//! as `Loss` or `Score` are ignored. Records keep file order and are not
//! de-duplicated.

use crate::dataset::{write_batch_csv, Dataset};
use crate::{Error, Result};
use arrow::array::{Array, Int64Array, RecordBatch, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use std::path::Path;
use std::sync::Arc;

/// File name of the relocated table inside an experiment's output directory
pub const HALL_OF_FAME_FILE: &str = "hall_of_fame.csv";

/// Column holding equation text
pub const EQUATION_COLUMN: &str = "Equation";

/// Column holding the backend-assigned complexity
pub const COMPLEXITY_COLUMN: &str = "Complexity";

/// One discovered equation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationRecord {
    /// Equation text as printed by the backend
    pub equation: String,
    /// Backend-assigned complexity score
    pub complexity: i64,
}

impl EquationRecord {
    /// Create a record
    #[must_use]
    pub fn new(equation: impl Into<String>, complexity: i64) -> Self {
        Self {
            equation: equation.into(),
            complexity,
        }
    }
}

/// Discovered equations in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HallOfFame {
    records: Vec<EquationRecord>,
}

impl HallOfFame {
    /// Build from records
    #[must_use]
    pub const fn from_records(records: Vec<EquationRecord>) -> Self {
        Self { records }
    }

    /// Load a hall-of-fame CSV
    ///
    /// # Errors
    /// Returns `Error::ArtifactMissing` if the file does not exist, and
    /// `Error::InvalidInput` if a required column is absent or has nulls
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ArtifactMissing(path.display().to_string()));
        }

        let table = Dataset::load_csv(path)?;
        table
            .require_columns(&[EQUATION_COLUMN, COMPLEXITY_COLUMN])
            .map_err(|e| Error::InvalidInput(format!("{}: {e}", path.display())))?;

        let equations = cast(table.column(EQUATION_COLUMN)?.as_ref(), &DataType::Utf8)?;
        let equations = equations
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::InvalidInput("Equation column is not text".to_string()))?;

        let complexities = cast(table.column(COMPLEXITY_COLUMN)?.as_ref(), &DataType::Int64)?;
        let complexities = complexities
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| Error::InvalidInput("Complexity column is not integer".to_string()))?;

        let mut records = Vec::with_capacity(table.num_rows());
        for row in 0..table.num_rows() {
            if equations.is_null(row) || complexities.is_null(row) {
                return Err(Error::InvalidInput(format!(
                    "{}: row {row} has an empty Equation or Complexity",
                    path.display()
                )));
            }
            records.push(EquationRecord::new(
                equations.value(row),
                complexities.value(row),
            ));
        }

        Ok(Self { records })
    }

    /// Write as CSV with `Complexity` and `Equation` columns
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new(COMPLEXITY_COLUMN, DataType::Int64, false),
            Field::new(EQUATION_COLUMN, DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from_iter_values(
                    self.records.iter().map(|r| r.complexity),
                )),
                Arc::new(StringArray::from_iter_values(
                    self.records.iter().map(|r| r.equation.as_str()),
                )),
            ],
        )?;
        write_batch_csv(&batch, path.as_ref())
    }

    /// All records in file order
    #[must_use]
    pub fn records(&self) -> &[EquationRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the table holds no equations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First equation with the given complexity
    #[must_use]
    pub fn equation_for_complexity(&self, complexity: i64) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.complexity == complexity)
            .map(|r| r.equation.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_ignores_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HALL_OF_FAME_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Complexity,Loss,Equation").unwrap();
        writeln!(file, "1,0.5,x0").unwrap();
        writeln!(file, "3,0.1,\"x0 * 2.5\"").unwrap();
        drop(file);

        let hof = HallOfFame::load(&path).unwrap();
        assert_eq!(hof.len(), 2);
        assert_eq!(hof.records()[1], EquationRecord::new("x0 * 2.5", 3));
        assert_eq!(hof.equation_for_complexity(1), Some("x0"));
        assert_eq!(hof.equation_for_complexity(7), None);
    }

    #[test]
    fn test_missing_file_is_artifact_missing() {
        let err = HallOfFame::load("/nonexistent/hall_of_fame.csv").unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HALL_OF_FAME_FILE);
        std::fs::write(&path, "Complexity,Loss\n1,0.5\n").unwrap();
        assert!(matches!(HallOfFame::load(&path), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HALL_OF_FAME_FILE);
        let hof = HallOfFame::from_records(vec![
            EquationRecord::new("2*x + 1", 1),
            EquationRecord::new("exp(x) - 1", 4),
        ]);
        hof.write_csv(&path).unwrap();
        assert_eq!(HallOfFame::load(&path).unwrap(), hof);
    }
}
