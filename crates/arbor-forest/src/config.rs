//! Configuration builder for Random Forest training.

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::frame::DataFrame;
use crate::split::SplitCriterion;
use crate::tree::DEFAULT_SEED;

/// Strategy for determining how many predictors each node considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    /// Square root of the predictor count, rounded to nearest.
    Sqrt,
    /// Log base 2 of the predictor count, rounded up, at least 1.
    Log2,
    /// A fixed count; 0 or anything past the predictor count means all.
    Fixed(usize),
    /// All predictors (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a per-node candidate count for `n_predictors` predictors.
    ///
    /// 0 means "every predictor".
    #[must_use]
    pub fn resolve(self, n_predictors: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_predictors as f64).sqrt().round() as usize,
            MaxFeatures::Log2 if n_predictors == 0 => 0,
            MaxFeatures::Log2 => (n_predictors as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => 0,
        }
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default     |
/// |------------------|-------------|
/// | `max_features`   | `Sqrt`      |
/// | `min_leaf_size`  | 1           |
/// | `criterion`      | `Entropy`   |
/// | `seed`           | 777111333   |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_estimators: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) min_leaf_size: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// Zero estimators is accepted and trains an empty forest.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_features: MaxFeatures::Sqrt,
            min_leaf_size: 1,
            criterion: SplitCriterion::Entropy,
            seed: DEFAULT_SEED,
        }
    }

    // --- Setters ---

    /// Set the per-node feature subsampling strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the partition size at or below which a node becomes a leaf.
    #[must_use]
    pub fn with_min_leaf_size(mut self, min_leaf_size: usize) -> Self {
        self.min_leaf_size = min_leaf_size;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    #[must_use]
    pub fn min_leaf_size(&self) -> usize {
        self.min_leaf_size
    }

    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a Random Forest on `data`.
    ///
    /// Each tree is built from a bootstrap resample of `data`; the rows it
    /// never drew are kept as its out-of-bag set.
    ///
    /// # Errors
    ///
    /// Currently infallible; zero estimators or zero rows give an empty
    /// forest, which fails later with [`RfError::EmptyModel`].
    pub fn fit(&self, data: &DataFrame) -> Result<RandomForest, RfError> {
        crate::forest::train(self, data)
    }
}
