//! Out-of-bag (OOB) error estimation for Random Forest.

use tracing::{debug, instrument};

use crate::counts::majority_vote;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::frame::DataFrame;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OobEstimate {
    /// Fraction of evaluated rows whose OOB vote missed the target.
    pub error: f64,
    /// Number of evaluated rows whose OOB vote missed the target.
    pub n_mismatches: usize,
    /// Number of rows that were out of bag for at least one tree.
    pub n_evaluated: usize,
}

impl RandomForest {
    /// For each training row, the trees (by forest index, ascending) that
    /// never drew it.
    #[must_use]
    pub fn out_of_bag_estimator_sets(&self) -> Vec<Vec<usize>> {
        let mut sets = vec![Vec::new(); self.n_training_rows];
        for (k, oob) in self.oob_indices.iter().enumerate() {
            for &row in oob {
                sets[row].push(k);
            }
        }
        sets
    }

    /// Estimate generalization error from the out-of-bag rows.
    ///
    /// `data` must be the table the forest was trained on. Each row is
    /// classified by a vote of only the trees that never drew it; rows drawn
    /// by every tree are skipped.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyModel`] | the forest has no trees |
    /// | [`RfError::RowCountMismatch`] | `data` is not the training size |
    /// | [`RfError::NoOutOfBagRows`] | every row was drawn by every tree |
    #[instrument(skip_all, fields(n_trees = self.trees.len(), n_rows = data.len()))]
    pub fn error_estimate(&self, data: &DataFrame) -> Result<OobEstimate, RfError> {
        if self.trees.is_empty() {
            return Err(RfError::EmptyModel);
        }
        if data.len() != self.n_training_rows {
            return Err(RfError::RowCountMismatch {
                expected: self.n_training_rows,
                got: data.len(),
            });
        }

        let mut n_mismatches = 0usize;
        let mut n_evaluated = 0usize;
        for (i, estimators) in self.out_of_bag_estimator_sets().iter().enumerate() {
            if estimators.is_empty() {
                continue;
            }
            let x = data.row(i);
            let votes = estimators
                .iter()
                .map(|&k| self.trees[k].classify(&x))
                .collect::<Result<Vec<_>, _>>()?;
            if majority_vote(votes) != Some(data.target(i)) {
                n_mismatches += 1;
            }
            n_evaluated += 1;
        }

        if n_evaluated == 0 {
            return Err(RfError::NoOutOfBagRows);
        }

        let error = n_mismatches as f64 / n_evaluated as f64;
        debug!(n_mismatches, n_evaluated, error, "out-of-bag estimate");
        Ok(OobEstimate {
            error,
            n_mismatches,
            n_evaluated,
        })
    }
}
