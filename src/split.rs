//! Seeded train/test partitioning
//!
//! A split is a permutation of row indices driven only by the seed: the
//! first `floor(fraction * n)` permuted rows form the train set, the rest
//! the test set. Both subsets keep permutation order. `ChaCha8Rng` is used
//! because its stream is fixed across platforms and releases, so a seed
//! reproduces the same split bit-for-bit.

use crate::dataset::Dataset;
use crate::{Error, Result};
use arrow::array::UInt32Array;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Train and test partitions of one dataset
#[derive(Debug, Clone)]
pub struct Split {
    /// Training rows
    pub train: Dataset,
    /// Held-out rows
    pub test: Dataset,
}

/// Row indices of a split, before any rows are copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Indices of training rows, in permutation order
    pub train: Vec<u32>,
    /// Indices of test rows, in permutation order
    pub test: Vec<u32>,
}

/// Number of training rows for `n` rows at `fraction`
///
/// # Errors
/// Returns `Error::InvalidInput` unless `fraction` is finite and in `[0, 1]`
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn train_size(n: usize, fraction: f64) -> Result<usize> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(Error::InvalidInput(format!(
            "split fraction must be within [0, 1], got {fraction}"
        )));
    }
    Ok(((fraction * n as f64).floor() as usize).min(n))
}

/// Permute `0..n` with `seed` and cut at `floor(fraction * n)`
///
/// # Errors
/// Returns `Error::InvalidInput` for a fraction outside `[0, 1]` or more
/// rows than a `u32` index can address
pub fn split_indices(n: usize, fraction: f64, seed: u64) -> Result<SplitIndices> {
    let cut = train_size(n, fraction)?;
    let n = u32::try_from(n)
        .map_err(|_| Error::InvalidInput(format!("dataset too large to split: {n} rows")))?;

    let mut order: Vec<u32> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test = order.split_off(cut);
    Ok(SplitIndices { train: order, test })
}

/// Split `dataset` into train and test sets
///
/// # Errors
/// Returns `Error::InvalidInput` for a fraction outside `[0, 1]`
///
/// # Example
/// ```
/// use med_sweep::dataset::Dataset;
/// use med_sweep::split::split;
/// use arrow::array::{Float64Array, RecordBatch};
/// use arrow::datatypes::{DataType, Field, Schema};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Float64, false)]));
/// let batch = RecordBatch::try_new(
///     schema,
///     vec![Arc::new(Float64Array::from((0..10).map(f64::from).collect::<Vec<_>>()))],
/// )?;
///
/// let parts = split(&Dataset::new(batch), 0.7, 100)?;
/// assert_eq!(parts.train.num_rows(), 7);
/// assert_eq!(parts.test.num_rows(), 3);
/// # Ok(())
/// # }
/// ```
pub fn split(dataset: &Dataset, fraction: f64, seed: u64) -> Result<Split> {
    let indices = split_indices(dataset.num_rows(), fraction, seed)?;
    let train = dataset.take(&UInt32Array::from(indices.train))?;
    let test = dataset.take(&UInt32Array::from(indices.test))?;
    Ok(Split { train, test })
}
