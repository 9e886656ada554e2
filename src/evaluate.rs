//! Equation evaluation on unseen data
//!
//! Every hall-of-fame equation is compiled once, evaluated over the test
//! rows, and scored per row with the relative error
//! `|actual - predicted| / (|actual| + 1e-8)`. The result table holds the
//! parameter values, the true target and one error column per complexity,
//! named `Complexity {c} {target} p err`.
//!
//! Test rows are sorted ascending by the parameter columns (left-to-right
//! precedence) purely so saved results are easy to read.

use crate::dataset::{write_batch_csv, Dataset};
use crate::equation::{compile, CompiledEquation};
use crate::hall_of_fame::{EquationRecord, HallOfFame};
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Added to `|actual|` so an exact zero target does not divide by zero
pub const RELATIVE_ERROR_EPSILON: f64 = 1e-8;

/// File name of the result table inside an experiment's output directory
pub const RESULTS_FILE: &str = "med_unseen.csv";

/// Relative prediction error with the epsilon-guarded denominator
#[must_use]
pub fn relative_error(actual: f64, predicted: f64) -> f64 {
    (actual - predicted).abs() / (actual.abs() + RELATIVE_ERROR_EPSILON)
}

/// Name of the error column for one complexity
#[must_use]
pub fn error_column_name(complexity: i64, target: &str) -> String {
    format!("Complexity {complexity} {target} p err")
}

/// Equation left out of the result table because it did not compile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEquation {
    /// Equation text
    pub equation: String,
    /// Complexity from the hall of fame
    pub complexity: i64,
    /// Compiler diagnostic
    pub reason: String,
}

/// Aggregate error of one complexity over all test rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySummary {
    /// Complexity score
    pub complexity: i64,
    /// Equation whose errors fill the column
    pub equation: String,
    /// Median relative error over finite rows (NaN if none)
    pub median: f64,
    /// Mean relative error over finite rows (NaN if none)
    pub mean: f64,
    /// Rows with a finite error
    pub finite_rows: usize,
}

struct ErrorColumn {
    name: String,
    complexity: i64,
    equation: String,
    values: Vec<f64>,
}

/// Per-row errors for every compiled equation
#[derive(Debug, Clone)]
pub struct ResultTable {
    batch: RecordBatch,
    columns: Vec<(i64, String, String)>,
    skipped: Vec<SkippedEquation>,
}

impl ResultTable {
    /// Result rows as an Arrow batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of test rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Error column names in output order
    #[must_use]
    pub fn error_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(_, name, _)| name.as_str()).collect()
    }

    /// Errors for one complexity, in result row order
    #[must_use]
    pub fn errors(&self, complexity: i64) -> Option<&[f64]> {
        let (_, name, _) = self.columns.iter().find(|(c, _, _)| *c == complexity)?;
        let array = self
            .batch
            .column_by_name(name)?
            .as_any()
            .downcast_ref::<Float64Array>()?;
        let values: &[f64] = array.values();
        Some(values)
    }

    /// Equations that failed to compile
    #[must_use]
    pub fn skipped(&self) -> &[SkippedEquation] {
        &self.skipped
    }

    /// Median and mean error per complexity, non-finite rows excluded
    #[must_use]
    pub fn summary(&self) -> Vec<ComplexitySummary> {
        self.columns
            .iter()
            .map(|(complexity, _, equation)| {
                let mut finite: Vec<f64> = self
                    .errors(*complexity)
                    .unwrap_or_default()
                    .iter()
                    .copied()
                    .filter(|e| e.is_finite())
                    .collect();
                finite.sort_by(f64::total_cmp);
                ComplexitySummary {
                    complexity: *complexity,
                    equation: equation.clone(),
                    median: median(&finite),
                    mean: mean(&finite),
                    finite_rows: finite.len(),
                }
            })
            .collect()
    }

    /// Write the table as CSV
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_batch_csv(&self.batch, path.as_ref())
    }
}

/// Score every hall-of-fame equation on `test`
///
/// Equations that fail to compile are skipped with a warning and listed in
/// [`ResultTable::skipped`]. When several records share a complexity the
/// column keeps its first position and holds the last record's errors.
///
/// # Errors
/// Returns `Error::InvalidInput` for an empty parameter list and
/// `Error::Validation` if a parameter or the target is not a test column
pub fn evaluate<S: AsRef<str>>(
    test: &Dataset,
    hall_of_fame: &HallOfFame,
    parameters: &[S],
    target: &str,
) -> Result<ResultTable> {
    let parameters: Vec<String> = parameters.iter().map(|p| p.as_ref().to_string()).collect();
    if parameters.is_empty() {
        return Err(Error::InvalidInput(
            "at least one parameter is required".to_string(),
        ));
    }
    test.require_columns(parameters.as_slice())?;
    test.require_columns(&[target])?;

    let sorted = test.sorted_by(parameters.as_slice())?;
    let inputs = parameters
        .iter()
        .map(|p| sorted.numeric_column(p))
        .collect::<Result<Vec<_>>>()?;
    let input_refs: Vec<&[f64]> = inputs.iter().map(Vec::as_slice).collect();
    let actual = sorted.numeric_column(target)?;

    let mut compiled: HashMap<&str, std::result::Result<CompiledEquation, String>> =
        HashMap::new();
    let mut columns: Vec<ErrorColumn> = Vec::new();
    let mut skipped = Vec::new();

    for EquationRecord {
        equation,
        complexity,
    } in hall_of_fame.records()
    {
        let entry = compiled
            .entry(equation.as_str())
            .or_insert_with(|| compile(equation, parameters.as_slice()).map_err(|e| e.to_string()));

        let function = match entry {
            Ok(function) => function,
            Err(reason) => {
                warn!(%equation, complexity, %reason, "skipping equation that does not compile");
                skipped.push(SkippedEquation {
                    equation: equation.clone(),
                    complexity: *complexity,
                    reason: reason.clone(),
                });
                continue;
            }
        };

        let predicted = function.evaluate_columns(&input_refs)?;
        let values: Vec<f64> = actual
            .iter()
            .zip(&predicted)
            .map(|(&a, &p)| relative_error(a, p))
            .collect();
        debug!(%equation, complexity, rows = values.len(), "evaluated equation");

        let name = error_column_name(*complexity, target);
        let column = ErrorColumn {
            name,
            complexity: *complexity,
            equation: equation.clone(),
            values,
        };
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => columns.push(column),
        }
    }

    build_table(&sorted, &parameters, target, columns, skipped)
}

fn build_table(
    sorted: &Dataset,
    parameters: &[String],
    target: &str,
    columns: Vec<ErrorColumn>,
    skipped: Vec<SkippedEquation>,
) -> Result<ResultTable> {
    let schema = sorted.batch().schema();
    let mut fields = Vec::with_capacity(parameters.len() + 1 + columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

    for name in parameters.iter().map(String::as_str).chain(std::iter::once(target)) {
        let field = schema.field_with_name(name)?;
        fields.push(field.clone());
        arrays.push(sorted.column(name)?.clone());
    }

    let mut index = Vec::with_capacity(columns.len());
    for column in columns {
        fields.push(Field::new(&column.name, DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(column.values)));
        index.push((column.complexity, column.name, column.equation));
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    Ok(ResultTable {
        batch,
        columns: index,
        skipped,
    })
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;

    fn test_set() -> Dataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("x", DataType::Int64, false),
            Field::new("y", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![3, 1, 2, 0])),
                Arc::new(Float64Array::from(vec![7.0, 3.0, 5.0, 1.0])),
            ],
        )
        .unwrap();
        Dataset::new(batch)
    }

    #[test]
    fn test_relative_error_zero_actual() {
        assert_eq!(relative_error(0.0, 0.0), 0.0);
        assert_eq!(relative_error(0.0, 1.0), 1.0 / 1e-8);
    }

    #[test]
    fn test_column_name() {
        assert_eq!(error_column_name(5, "y"), "Complexity 5 y p err");
    }

    #[test]
    fn test_exact_equation_has_zero_error_and_sorted_rows() {
        let hof = HallOfFame::from_records(vec![
            EquationRecord::new("2*x + 1", 1),
            EquationRecord::new("2*x", 3),
        ]);
        let table = evaluate(&test_set(), &hof, &["x"], "y").unwrap();

        assert_eq!(table.num_rows(), 4);
        assert_eq!(
            table.error_column_names(),
            vec!["Complexity 1 y p err", "Complexity 3 y p err"]
        );
        assert!(table.errors(1).unwrap().iter().all(|&e| e == 0.0));

        let x = table
            .batch()
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(x.values().to_vec(), vec![0, 1, 2, 3]);

        // y = 1, 3, 5, 7 after sorting; 2*x misses by exactly 1
        let errs = table.errors(3).unwrap();
        assert!((errs[1] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_equation_skipped() {
        let hof = HallOfFame::from_records(vec![
            EquationRecord::new("sin(x)", 2),
            EquationRecord::new("x", 1),
        ]);
        let table = evaluate(&test_set(), &hof, &["x"], "y").unwrap();
        assert_eq!(table.error_column_names(), vec!["Complexity 1 y p err"]);
        assert_eq!(table.skipped().len(), 1);
        assert_eq!(table.skipped()[0].complexity, 2);
    }

    #[test]
    fn test_duplicate_complexity_last_wins() {
        let hof = HallOfFame::from_records(vec![
            EquationRecord::new("x", 2),
            EquationRecord::new("2*x + 1", 2),
        ]);
        let table = evaluate(&test_set(), &hof, &["x"], "y").unwrap();
        assert_eq!(table.error_column_names().len(), 1);
        assert!(table.errors(2).unwrap().iter().all(|&e| e == 0.0));
    }

    #[test]
    fn test_domain_errors_do_not_abort() {
        let hof = HallOfFame::from_records(vec![EquationRecord::new("log(x - 10)", 4)]);
        let table = evaluate(&test_set(), &hof, &["x"], "y").unwrap();
        assert!(table.errors(4).unwrap().iter().all(|e| e.is_nan()));

        let summary = table.summary();
        assert_eq!(summary[0].finite_rows, 0);
        assert!(summary[0].median.is_nan());
    }

    #[test]
    fn test_summary_median_and_mean() {
        assert_eq!(median(&[1.0, 2.0, 10.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), 2.5);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_missing_target_is_validation_error() {
        let hof = HallOfFame::default();
        assert!(matches!(
            evaluate(&test_set(), &hof, &["x"], "z"),
            Err(Error::Validation { .. })
        ));
    }
}
