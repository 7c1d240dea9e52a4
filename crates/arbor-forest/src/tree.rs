use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    column::{INVALID_CATEGORY, Label, Value},
    counts::CategoryCounts,
    frame::{DataFrame, Schema},
    node::{Entropy, FeatureIndex, Node, NodeIndex},
    split::{SplitCriterion, SplitKey, find_best_split},
};

/// Default seed shared by tree and forest configs.
pub(crate) const DEFAULT_SEED: u64 = 777_111_333;

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default     |
/// |------------------|-------------|
/// | `vars_per_split` | 0 (all)     |
/// | `min_leaf_size`  | 1           |
/// | `criterion`      | `Entropy`   |
/// | `seed`           | 777111333   |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) vars_per_split: usize,
    pub(crate) min_leaf_size: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vars_per_split: 0,
            min_leaf_size: 1,
            criterion: SplitCriterion::Entropy,
            seed: DEFAULT_SEED,
        }
    }

    /// Set how many randomly chosen predictors each node considers.
    ///
    /// 0 means every predictor, in column order, with no randomness.
    #[must_use]
    pub fn with_vars_per_split(mut self, vars_per_split: usize) -> Self {
        self.vars_per_split = vars_per_split;
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

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    #[must_use]
    pub fn vars_per_split(&self) -> usize {
        self.vars_per_split
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

    /// Train a decision tree on `data`, seeding a fresh RNG from the config.
    ///
    /// Zero rows produce an empty tree, which refuses to classify.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps the signature aligned with
    /// [`RandomForestConfig::fit`](crate::RandomForestConfig::fit).
    pub fn fit(&self, data: &DataFrame) -> Result<DecisionTree, RfError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.fit_with_rng(data, &mut rng)
    }

    /// Train a decision tree, drawing feature subsets from `rng`.
    ///
    /// Nodes are built in pre-order (a node, then its whole left subtree,
    /// then its right subtree), so `rng` is consumed in the same order as a
    /// recursive build would.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit`].
    #[instrument(skip_all, fields(n_rows = data.len(), vars_per_split = self.vars_per_split))]
    pub fn fit_with_rng(
        &self,
        data: &DataFrame,
        rng: &mut impl Rng,
    ) -> Result<DecisionTree, RfError> {
        let schema = data.shared_schema();
        if data.is_empty() {
            debug!("no rows; returning empty tree");
            return Ok(DecisionTree {
                nodes: Vec::new(),
                schema,
            });
        }

        let mut arena: Vec<Node> = vec![placeholder()];
        let mut stack: Vec<(NodeIndex, DataFrame)> = vec![(NodeIndex::new(0), data.clone())];

        while let Some((slot, mut partition)) = stack.pop() {
            let counts = partition.target_counts();
            let entropy = Entropy::new(counts.entropy());
            let n_samples = partition.len();

            if counts.n_categories() == 1 || n_samples <= self.min_leaf_size {
                arena[slot.index()] = make_leaf(&counts, entropy);
                continue;
            }

            let candidates = schema.subset_of_variable_indexes(self.vars_per_split, rng);
            let Some(split) = find_best_split(&mut partition, &candidates, &counts, self.criterion)
            else {
                arena[slot.index()] = make_leaf(&counts, entropy);
                continue;
            };

            let (region1, region2) = split.partition(&partition);
            let left = NodeIndex::new(arena.len());
            let right = NodeIndex::new(arena.len() + 1);
            arena.push(placeholder());
            arena.push(placeholder());

            let feature = FeatureIndex::new(split.variable);
            arena[slot.index()] = match split.key {
                SplitKey::Threshold(threshold) => Node::NumericSplit {
                    feature,
                    threshold,
                    left,
                    right,
                    n_samples,
                    entropy,
                },
                SplitKey::Category(category) => Node::CategoricalSplit {
                    feature,
                    category,
                    left,
                    right,
                    n_samples,
                    entropy,
                },
            };

            // Right is pushed first so the left subtree is built next.
            stack.push((right, region2));
            stack.push((left, region1));
        }

        debug!(n_nodes = arena.len(), "decision tree built");

        Ok(DecisionTree {
            nodes: arena,
            schema,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholder() -> Node {
    Node::Leaf {
        prediction: INVALID_CATEGORY,
        probabilities: BTreeMap::new(),
        n_samples: 0,
        entropy: Entropy::new(0.0),
    }
}

fn make_leaf(counts: &CategoryCounts, entropy: Entropy) -> Node {
    Node::Leaf {
        prediction: counts.argmax().unwrap_or(INVALID_CATEGORY),
        probabilities: counts.probabilities(),
        n_samples: counts.total(),
        entropy,
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with the root at index 0. A tree
/// with no nodes is the empty model.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) schema: Arc<Schema>,
}

impl DecisionTree {
    /// Predict the target category code for feature vector `x`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyModel`] | the tree has no nodes |
    /// | [`RfError::FeatureVectorTooShort`] | `x` ends before a split variable |
    pub fn classify(&self, x: &[Value]) -> Result<i32, RfError> {
        match &self.nodes[self.traverse(x)?.index()] {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            _ => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the category probabilities of the leaf reached by `x`.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionTree::classify`].
    pub fn class_probabilities(&self, x: &[Value]) -> Result<&BTreeMap<i32, f64>, RfError> {
        match &self.nodes[self.traverse(x)?.index()] {
            Node::Leaf { probabilities, .. } => Ok(probabilities),
            _ => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Predict and decode the target for `x`.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionTree::classify`].
    pub fn predict_label(&self, x: &[Value]) -> Result<Label, RfError> {
        let code = self.classify(x)?;
        Ok(self.schema.decode(self.schema.target_index(), Value::Int(code)))
    }

    /// Return the schema of the data this tree was trained on.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the root node, or `None` for the empty model.
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Return the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a node of this tree.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0, as does the
    /// empty tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((NodeIndex::new(0), 0usize));

        while let Some((index, d)) = queue.pop_front() {
            match self.node(index).children() {
                Some((left, right)) => {
                    queue.push_back((left, d + 1));
                    queue.push_back((right, d + 1));
                }
                None => max_depth = max_depth.max(d),
            }
        }

        max_depth
    }

    /// Walk from the root to the leaf that `x` falls into.
    fn traverse(&self, x: &[Value]) -> Result<NodeIndex, RfError> {
        if self.nodes.is_empty() {
            return Err(RfError::EmptyModel);
        }
        let feature_value = |feature: FeatureIndex| {
            x.get(feature.index())
                .copied()
                .ok_or(RfError::FeatureVectorTooShort {
                    needed: feature.index(),
                    got: x.len(),
                })
        };

        let mut index = NodeIndex::new(0);
        loop {
            index = match self.node(index) {
                Node::Leaf { .. } => return Ok(index),
                Node::NumericSplit {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature_value(*feature)?.as_f64() < *threshold {
                        *left
                    } else {
                        *right
                    }
                }
                Node::CategoricalSplit {
                    feature,
                    category,
                    left,
                    right,
                    ..
                } => {
                    if feature_value(*feature)?.as_code() == Some(*category) {
                        *left
                    } else {
                        *right
                    }
                }
            };
        }
    }
}
