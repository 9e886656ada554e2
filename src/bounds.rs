//! Parameter bounds: the search domain handed to the discovery backend
//!
//! Bounds are taken over the full dataset before splitting, so values that
//! only occur in the test partition still lie inside the search domain.

use crate::dataset::Dataset;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Observed `(minimum, maximum)` of one parameter column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    /// Smallest observed value
    pub min: f64,
    /// Largest observed value
    pub max: f64,
}

/// Bounds for every parameter, in declared parameter order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    names: Vec<String>,
    bounds: Vec<Bound>,
}

impl ParameterBounds {
    /// Compute bounds for `parameters` over every row of `dataset`
    ///
    /// NaN entries are ignored; a column with no finite-or-infinite values
    /// yields `(NaN, NaN)`.
    ///
    /// # Errors
    /// Returns `Error::Validation` if any parameter is absent, before reading
    /// any column
    pub fn from_dataset<S: AsRef<str>>(dataset: &Dataset, parameters: &[S]) -> Result<Self> {
        dataset.require_columns(parameters)?;

        let mut names = Vec::with_capacity(parameters.len());
        let mut bounds = Vec::with_capacity(parameters.len());
        for name in parameters {
            let values = dataset.numeric_column(name.as_ref())?;
            names.push(name.as_ref().to_string());
            bounds.push(min_max(&values));
        }

        Ok(Self { names, bounds })
    }

    /// Parameter names in declared order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Minimums in declared order
    #[must_use]
    pub fn minimums(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.min).collect()
    }

    /// Maximums in declared order
    #[must_use]
    pub fn maximums(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.max).collect()
    }

    /// Bound for one parameter
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if `name` was not a requested parameter
    pub fn get(&self, name: &str) -> Result<Bound> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.bounds[i])
            .ok_or_else(|| Error::InvalidInput(format!("No bounds computed for '{name}'")))
    }

    /// `(name, bound)` pairs in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Bound)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.bounds.iter().copied())
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if no parameters were requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn min_max(values: &[f64]) -> Bound {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<Bound>, v| {
            Some(acc.map_or(Bound { min: v, max: v }, |b| Bound {
                min: b.min.min(v),
                max: b.max.max(v),
            }))
        })
        .unwrap_or(Bound {
            min: f64::NAN,
            max: f64::NAN,
        })
}
