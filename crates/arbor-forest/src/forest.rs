//! Random Forest training with parallel tree construction.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::frame::{DataFrame, Schema};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
///
/// Tree `i` and out-of-bag set `i` come from the same bootstrap draw. Every
/// tree shares the training schema.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) oob_indices: Vec<Vec<usize>>,
    pub(crate) schema: Arc<Schema>,
    pub(crate) n_training_rows: usize,
    pub(crate) vars_per_split: usize,
}

/// Generate a bootstrap sample and the out-of-bag indices.
pub(crate) fn bootstrap_sample(
    n_samples: usize,
    draw_count: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(draw_count);
    for _ in 0..draw_count {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_estimators = config.n_estimators, n_rows = data.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    data: &DataFrame,
) -> Result<RandomForest, RfError> {
    let n_rows = data.len();
    let n_predictors = data.n_predictor_variables();
    let vars_per_split = config.max_features.resolve(n_predictors);

    if config.n_estimators == 0 || n_rows == 0 {
        warn!(
            n_estimators = config.n_estimators,
            n_rows, "nothing to train on; returning empty forest"
        );
        return Ok(RandomForest {
            trees: Vec::new(),
            oob_indices: Vec::new(),
            schema: data.shared_schema(),
            n_training_rows: n_rows,
            vars_per_split,
        });
    }

    info!(
        n_estimators = config.n_estimators,
        n_rows,
        n_predictors,
        vars_per_split,
        "training random forest"
    );

    // Seeds are drawn in forest order so results do not depend on scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_estimators).map(|_| master_rng.r#gen()).collect();

    let tree_config = DecisionTreeConfig::new()
        .with_vars_per_split(vars_per_split)
        .with_min_leaf_size(config.min_leaf_size)
        .with_criterion(config.criterion);

    let tree_results: Vec<(DecisionTree, Vec<usize>)> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (bootstrap_indices, oob_indices) = bootstrap_sample(n_rows, n_rows, &mut rng);
            let resample = data.select_rows(&bootstrap_indices);
            let tree = tree_config.fit_with_rng(&resample, &mut rng)?;
            debug!(
                n_nodes = tree.n_nodes(),
                n_oob = oob_indices.len(),
                "tree trained"
            );
            Ok((tree, oob_indices))
        })
        .collect::<Result<_, RfError>>()?;

    let (trees, oob_indices): (Vec<_>, Vec<_>) = tree_results.into_iter().unzip();

    info!(n_trees = trees.len(), "random forest training complete");

    Ok(RandomForest {
        trees,
        oob_indices,
        schema: data.shared_schema(),
        n_training_rows: n_rows,
        vars_per_split,
    })
}

impl RandomForest {
    /// Return the tree at `index` in forest order.
    #[must_use]
    pub fn tree(&self, index: usize) -> Option<&DecisionTree> {
        self.trees.get(index)
    }

    /// Return every tree in forest order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the training rows tree `index` never drew.
    #[must_use]
    pub fn oob_indices(&self, index: usize) -> Option<&[usize]> {
        self.oob_indices.get(index).map(Vec::as_slice)
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Return the number of rows the forest was trained on.
    #[must_use]
    pub fn n_training_rows(&self) -> usize {
        self.n_training_rows
    }

    /// Return the resolved per-node candidate count (0 = all).
    #[must_use]
    pub fn vars_per_split(&self) -> usize {
        self.vars_per_split
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
