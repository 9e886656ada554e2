//! Sweep Record - root entity of a batch of experiments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sweep Record represents one batch invocation.
///
/// This is the root entity of the run-tracking schema. Each sweep owns one
/// run per (seed, parameter subset) combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepRecord {
    sweep_id: String,
    name: String,
    created_at: DateTime<Utc>,
    config: Option<serde_json::Value>,
}

impl SweepRecord {
    /// Create a new sweep record with the given ID and name.
    ///
    /// # Arguments
    ///
    /// * `sweep_id` - Unique identifier for the sweep
    /// * `name` - Human-readable name, typically the input file
    #[must_use]
    pub fn new(sweep_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sweep_id: sweep_id.into(),
            name: name.into(),
            created_at: Utc::now(),
            config: None,
        }
    }

    /// Create a builder for constructing a sweep record with optional fields.
    #[must_use]
    pub fn builder(sweep_id: impl Into<String>, name: impl Into<String>) -> SweepRecordBuilder {
        SweepRecordBuilder::new(sweep_id, name)
    }

    /// Get the sweep ID.
    #[must_use]
    pub fn sweep_id(&self) -> &str {
        &self.sweep_id
    }

    /// Get the sweep name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the sweep configuration, if recorded.
    #[must_use]
    pub const fn config(&self) -> Option<&serde_json::Value> {
        self.config.as_ref()
    }
}

/// Builder for `SweepRecord`.
#[derive(Debug)]
pub struct SweepRecordBuilder {
    sweep_id: String,
    name: String,
    created_at: DateTime<Utc>,
    config: Option<serde_json::Value>,
}

impl SweepRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(sweep_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sweep_id: sweep_id.into(),
            name: name.into(),
            created_at: Utc::now(),
            config: None,
        }
    }

    /// Record the sweep configuration.
    #[must_use]
    pub fn config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom creation timestamp (useful for testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `SweepRecord`.
    #[must_use]
    pub fn build(self) -> SweepRecord {
        SweepRecord {
            sweep_id: self.sweep_id,
            name: self.name,
            created_at: self.created_at,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_record_new() {
        let record = SweepRecord::new("sweep-1", "data.csv");
        assert_eq!(record.sweep_id(), "sweep-1");
        assert_eq!(record.name(), "data.csv");
        assert!(record.config().is_none());
    }

    #[test]
    fn test_sweep_record_builder() {
        let config = serde_json::json!({"seeds": [88, 92]});
        let record = SweepRecord::builder("sweep-1", "data.csv")
            .config(config.clone())
            .build();

        assert_eq!(record.config(), Some(&config));
    }
}
