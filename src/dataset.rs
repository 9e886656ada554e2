//! Labelled tabular datasets (Arrow `RecordBatch`)
//!
//! A dataset is a single columnar batch: parameter columns, one target column
//! and any number of bystander columns. Rows are never mutated; splitting and
//! sorting build new batches with `take`.
//!
//! Supported inputs:
//! - `.csv` with a header row (schema inferred)
//! - `.parquet`

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, RecordBatch, UInt32Array};
use arrow::compute::{
    cast, concat_batches, lexsort_to_indices, take_record_batch, SortColumn, SortOptions,
};
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, SchemaRef};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

/// Labelled dataset backed by one Arrow record batch
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wrap an existing batch
    ///
    /// Useful for testing and for results built in memory
    #[must_use]
    pub const fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Concatenate batches sharing `schema` into one dataset
    ///
    /// # Errors
    /// Returns error if a batch does not match `schema`
    pub fn from_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        let batch = concat_batches(schema, batches)?;
        Ok(Self { batch })
    }

    /// Load a dataset, choosing the reader by file extension
    ///
    /// # Errors
    /// Returns error if the extension is unsupported or the file cannot be read
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::load_parquet(path),
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::load_csv(path),
            _ => Err(Error::InvalidInput(format!(
                "Unsupported dataset format: {} (expected .csv or .parquet)",
                path.display()
            ))),
        }
    }

    /// Load a CSV file with a header row, inferring column types
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or parsed
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;

        let csv_error = |stage: &str, e: arrow::error::ArrowError| {
            Error::StorageError(format!("Failed to {stage} CSV file {}: {e}", path.display()))
        };

        let (schema, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut file, None)
            .map_err(|e| csv_error("infer schema of", e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io(format!("rewind {}", path.display()), e))?;

        let schema: SchemaRef = schema.into();
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .build(file)
            .map_err(|e| csv_error("open reader for", e))?;

        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_error("parse", e))?;
        Self::from_batches(&schema, &batches)
    }

    /// Load a Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file {}: {e}", path.display()))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file {}: {e}", path.display()))
        })?;
        let schema = builder.schema().clone();

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!(
                "Failed to create Parquet reader for {}: {e}",
                path.display()
            ))
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!(
                    "Failed to read record batch from {}: {e}",
                    path.display()
                ))
            })?;
            batches.push(batch);
        }

        Self::from_batches(&schema, &batches)
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// True if the dataset has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Column names in schema order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// True if a column called `name` exists
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.column_by_name(name).is_some()
    }

    /// Check that every name is a column, reporting all missing names at once
    ///
    /// # Errors
    /// Returns `Error::Validation` listing the absent names
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.has_column(name))
            .map(ToString::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                missing,
                available: self.column_names(),
            })
        }
    }

    /// Raw column by name
    ///
    /// # Errors
    /// Returns `Error::Validation` if the column does not exist
    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch.column_by_name(name).ok_or_else(|| Error::Validation {
            missing: vec![name.to_string()],
            available: self.column_names(),
        })
    }

    /// Column values as `f64`, nulls read as NaN
    ///
    /// # Errors
    /// Returns error if the column is missing or not numeric
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.column(name)?;
        if !column.data_type().is_numeric() {
            return Err(Error::InvalidInput(format!(
                "Column '{name}' is {} and cannot be used numerically",
                column.data_type()
            )));
        }

        let casted = cast(column.as_ref(), &DataType::Float64)?;
        let values = casted
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| {
                Error::InvalidInput(format!("Column '{name}' did not cast to Float64"))
            })?;

        Ok(values
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Keep only `columns`, in the given order
    ///
    /// # Errors
    /// Returns `Error::Validation` if a column does not exist
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        self.require_columns(columns)?;
        let schema = self.batch.schema();
        let indices = columns
            .iter()
            .map(|name| schema.index_of(name.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            batch: self.batch.project(&indices)?,
        })
    }

    /// Build a new dataset from the rows at `indices`, in that order
    ///
    /// # Errors
    /// Returns error if an index is out of bounds
    pub fn take(&self, indices: &UInt32Array) -> Result<Self> {
        let batch = take_record_batch(&self.batch, indices)?;
        Ok(Self { batch })
    }

    /// Rows sorted ascending by `columns`, earlier columns taking precedence
    ///
    /// Nulls sort last.
    ///
    /// # Errors
    /// Returns error if a column is missing or not sortable
    pub fn sorted_by<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        if columns.is_empty() || self.is_empty() {
            return Ok(self.clone());
        }

        let sort_columns = columns
            .iter()
            .map(|name| {
                Ok(SortColumn {
                    values: self.column(name.as_ref())?.clone(),
                    options: Some(SortOptions {
                        descending: false,
                        nulls_first: false,
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let indices = lexsort_to_indices(&sort_columns, None)?;
        self.take(&indices)
    }

    /// Write the dataset as CSV with a header row
    ///
    /// # Errors
    /// Returns error if the file cannot be created or written
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_batch_csv(&self.batch, path.as_ref())
    }
}

/// Write a record batch as CSV with a header row
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_batch_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).map_err(|e| Error::io(format!("create {}", path.display()), e))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}
