//! Domain types for arbor-io.

use arbor_forest::{CrossValidationResult, LeaveOneOutResult, OobEstimate};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header and trimmed cells of a CSV file, before any typing.
///
/// Produced by [`CsvReader::read_raw`](crate::CsvReader::read_raw); used
/// directly when rows must be encoded against an existing model schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names from the header row.
    pub headers: Vec<String>,
    /// Data rows, each as wide as `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Return the number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Everything measured about one learner on one table.
///
/// Only the estimates that were actually run are written out.
#[derive(Debug, Clone, Default)]
pub struct EvaluationSummary {
    /// `"tree"` or `"forest"`.
    pub learner: String,
    /// Rows in the evaluated table.
    pub n_rows: usize,
    /// Out-of-bag estimate, for forests.
    pub oob: Option<OobEstimate>,
    /// Leave-one-out outcome, if run.
    pub leave_one_out: Option<LeaveOneOutResult>,
    /// k-fold outcome, if run.
    pub cross_validation: Option<CrossValidationResult>,
}
