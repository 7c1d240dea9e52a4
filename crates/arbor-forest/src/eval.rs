//! Leave-one-out and k-fold cross-validation against any learner.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::column::Value;
use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::frame::DataFrame;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// Default seed for fold shuffling.
const DEFAULT_CV_SEED: u64 = 333_888_333;

/// A trained model that maps a feature vector to a target category code.
pub trait Classify {
    /// Predict the target category code for `x`.
    ///
    /// # Errors
    ///
    /// Whatever the model reports for an unusable input or empty model.
    fn classify(&self, x: &[Value]) -> Result<i32, RfError>;
}

/// Something that can be trained on a table to produce a [`Classify`] model.
pub trait Learner {
    type Model: Classify;

    /// Train a fresh model on `data`.
    ///
    /// # Errors
    ///
    /// Whatever the underlying training reports.
    fn fit(&self, data: &DataFrame) -> Result<Self::Model, RfError>;
}

impl Classify for DecisionTree {
    fn classify(&self, x: &[Value]) -> Result<i32, RfError> {
        DecisionTree::classify(self, x)
    }
}

impl Classify for RandomForest {
    fn classify(&self, x: &[Value]) -> Result<i32, RfError> {
        RandomForest::classify(self, x)
    }
}

impl Learner for DecisionTreeConfig {
    type Model = DecisionTree;

    fn fit(&self, data: &DataFrame) -> Result<DecisionTree, RfError> {
        DecisionTreeConfig::fit(self, data)
    }
}

impl Learner for RandomForestConfig {
    type Model = RandomForest;

    fn fit(&self, data: &DataFrame) -> Result<RandomForest, RfError> {
        RandomForestConfig::fit(self, data)
    }
}

/// Outcome of a leave-one-out run.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LeaveOneOutResult {
    /// Held-out rows the model got wrong.
    pub n_misses: usize,
    /// Rows evaluated (one model per row).
    pub n_rows: usize,
    /// `n_misses / n_rows`.
    pub error_rate: f64,
}

/// Retrain on every row but one and classify the held-out row, for each row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::EmptyDataset`] | `data` has no rows |
/// | Other errors | From training or classification |
#[instrument(skip_all, fields(n_rows = data.len()))]
pub fn leave_one_out<L: Learner>(
    learner: &L,
    data: &DataFrame,
) -> Result<LeaveOneOutResult, RfError> {
    if data.is_empty() {
        return Err(RfError::EmptyDataset);
    }

    let mut n_misses = 0usize;
    for held_out in 0..data.len() {
        let training = data.filter(|row| row.position() != held_out);
        let model = learner.fit(&training)?;
        if model.classify(&data.row(held_out))? != data.target(held_out) {
            n_misses += 1;
        }
    }

    let error_rate = n_misses as f64 / data.len() as f64;
    info!(n_misses, error_rate, "leave-one-out complete");
    Ok(LeaveOneOutResult {
        n_misses,
        n_rows: data.len(),
        error_rate,
    })
}

/// k-fold cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Results of k-fold cross-validation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CrossValidationResult {
    /// Error rate on each held-out fold.
    pub fold_error_rates: Vec<f64>,
    /// Mean of the fold error rates.
    pub mean_error_rate: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of rows.
    pub n_rows: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            seed: DEFAULT_CV_SEED,
        })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run k-fold cross-validation of `learner` over `data`.
    ///
    /// Rows are shuffled once and cut into `n_folds` contiguous folds; the
    /// last fold absorbs the remainder. Each fold is scored by a model
    /// trained on all other rows, kept in their original order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | zero rows |
    /// | [`RfError::TooFewRowsForFolds`] | more folds than rows |
    /// | Other errors | From training or classification |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_rows = data.len()))]
    pub fn evaluate<L: Learner>(
        &self,
        learner: &L,
        data: &DataFrame,
    ) -> Result<CrossValidationResult, RfError> {
        let n_rows = data.len();
        if n_rows == 0 {
            return Err(RfError::EmptyDataset);
        }
        if self.n_folds > n_rows {
            return Err(RfError::TooFewRowsForFolds {
                n_rows,
                n_folds: self.n_folds,
            });
        }

        let fold_of = self.assign_folds(n_rows);
        let mut fold_error_rates = Vec::with_capacity(self.n_folds);

        for fold in 0..self.n_folds {
            let training = data.filter(|row| fold_of[row.position()] != fold);
            let testing = data.filter(|row| fold_of[row.position()] == fold);
            let model = learner.fit(&training)?;

            let mut misses = 0usize;
            for i in 0..testing.len() {
                if model.classify(&testing.row(i))? != testing.target(i) {
                    misses += 1;
                }
            }
            let error_rate = misses as f64 / testing.len() as f64;
            fold_error_rates.push(error_rate);

            info!(fold, error_rate, "fold completed");
        }

        let mean_error_rate = fold_error_rates.iter().sum::<f64>() / self.n_folds as f64;
        info!(mean_error_rate, "cross-validation complete");

        Ok(CrossValidationResult {
            fold_error_rates,
            mean_error_rate,
            n_folds: self.n_folds,
            n_rows,
        })
    }

    /// Fold number of every row position.
    fn assign_folds(&self, n_rows: usize) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n_rows).collect();
        order.shuffle(&mut rng);

        let fold_size = n_rows / self.n_folds;
        let mut fold_of = vec![0usize; n_rows];
        for (slot, &row) in order.iter().enumerate() {
            fold_of[row] = (slot / fold_size).min(self.n_folds - 1);
        }
        debug!(fold_size, remainder = n_rows % self.n_folds, "folds assigned");
        fold_of
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnKind;
    use crate::config::MaxFeatures;

    /// Three classes separated along x0; x1 is constant noise.
    fn make_separable_data() -> DataFrame {
        let mut rows = Vec::new();
        for class in 0..3 {
            for i in 0..30 {
                rows.push(vec![class * 10 + i % 5, 5, class]);
            }
        }
        DataFrame::from_ints(&rows).unwrap()
    }

    fn noisy_data() -> DataFrame {
        let rows: Vec<Vec<i32>> = (0..24)
            .map(|i| vec![i % 6, (i * 5) % 7, i32::from(i % 6 >= 3) ^ i32::from(i % 5 == 0)])
            .collect();
        DataFrame::from_ints(&rows).unwrap()
    }

    #[test]
    fn five_fold_separable_error() {
        let data = make_separable_data();
        let forest = RandomForestConfig::new(15)
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        let cv = CrossValidation::new(5).unwrap().with_seed(42);
        let result = cv.evaluate(&forest, &data).unwrap();

        assert!(result.mean_error_rate < 0.1, "mean error = {}", result.mean_error_rate);
        assert_eq!(result.fold_error_rates.len(), 5);
        assert_eq!(result.n_folds, 5);
        assert_eq!(result.n_rows, 90);
    }

    #[test]
    fn last_fold_absorbs_remainder() {
        let cv = CrossValidation::new(4).unwrap();
        let fold_of = cv.assign_folds(11);
        let sizes: Vec<usize> = (0..4)
            .map(|f| fold_of.iter().filter(|&&g| g == f).count())
            .collect();
        assert_eq!(sizes, [2, 2, 2, 5]);
    }

    #[test]
    fn n_folds_equal_to_rows_matches_leave_one_out() {
        let data = noisy_data();
        let tree = DecisionTreeConfig::new();
        let loo = leave_one_out(&tree, &data).unwrap();
        let cv = CrossValidation::new(data.len()).unwrap().evaluate(&tree, &data).unwrap();
        assert!((cv.mean_error_rate - loo.error_rate).abs() < 1e-12);
        assert_eq!(loo.n_rows, 24);
    }

    #[test]
    fn leave_one_out_on_separable_data() {
        let data = make_separable_data();
        let result = leave_one_out(&DecisionTreeConfig::new(), &data).unwrap();
        assert_eq!(result.n_misses, 0);
        assert_eq!(result.error_rate, 0.0);
    }

    #[test]
    fn invalid_fold_count() {
        assert!(matches!(CrossValidation::new(0), Err(RfError::InvalidFoldCount { n_folds: 0 })));
        assert!(CrossValidation::new(1).is_err());
    }

    #[test]
    fn more_folds_than_rows() {
        let data = DataFrame::from_ints(&[vec![1, 1], vec![2, 2]]).unwrap();
        let err = CrossValidation::new(3)
            .unwrap()
            .evaluate(&DecisionTreeConfig::new(), &data)
            .unwrap_err();
        assert!(matches!(err, RfError::TooFewRowsForFolds { n_rows: 2, n_folds: 3 }));
    }

    #[test]
    fn empty_data_rejected() {
        let data = DataFrame::empty(vec![ColumnKind::NumericInt, ColumnKind::TargetCategoricalInt])
            .unwrap();
        assert!(matches!(
            leave_one_out(&DecisionTreeConfig::new(), &data),
            Err(RfError::EmptyDataset)
        ));
        assert!(matches!(
            CrossValidation::new(2).unwrap().evaluate(&DecisionTreeConfig::new(), &data),
            Err(RfError::EmptyDataset)
        ));
    }
}
