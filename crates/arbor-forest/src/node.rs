use std::collections::BTreeMap;
use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target entropy (bits) of the rows that reached a node.
///
/// Diagnostic only; reported regardless of the split criterion.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Entropy(f64);

impl Entropy {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw entropy value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return `true` when the entropy is indistinguishable from zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.abs() < 1e-9
    }
}

impl fmt::Display for Entropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Each child index is referenced by exactly one parent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Routes left when the feature value is strictly below `threshold`.
    NumericSplit {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        /// Number of training rows that reached this node.
        n_samples: usize,
        entropy: Entropy,
    },
    /// Routes left when the feature value equals `category`.
    CategoricalSplit {
        feature: FeatureIndex,
        category: i32,
        left: NodeIndex,
        right: NodeIndex,
        n_samples: usize,
        entropy: Entropy,
    },
    /// A terminal node predicting the majority target category.
    Leaf {
        prediction: i32,
        /// Fraction of this leaf's training rows in each category.
        probabilities: BTreeMap<i32, f64>,
        n_samples: usize,
        entropy: Entropy,
    },
}

impl Node {
    #[must_use]
    pub fn entropy(&self) -> Entropy {
        match self {
            Node::NumericSplit { entropy, .. }
            | Node::CategoricalSplit { entropy, .. }
            | Node::Leaf { entropy, .. } => *entropy,
        }
    }

    /// Return the number of training rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::NumericSplit { n_samples, .. }
            | Node::CategoricalSplit { n_samples, .. }
            | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return `(left, right)` for split nodes.
    #[must_use]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match self {
            Node::NumericSplit { left, right, .. } | Node::CategoricalSplit { left, right, .. } => {
                Some((*left, *right))
            }
            Node::Leaf { .. } => None,
        }
    }
}
