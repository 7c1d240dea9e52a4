//! CART decision trees and random forests over a typed column store.
//!
//! Provides a [`DataFrame`] of typed, string-interned columns; entropy/Gini
//! split search; decision-tree induction with JSON and DOT rendering; random
//! forests with parallel training via rayon, out-of-bag error estimation, and
//! model serialization; and leave-one-out / k-fold validation.

mod column;
mod config;
mod counts;
mod error;
mod eval;
mod forest;
mod frame;
mod node;
mod oob;
mod predict;
mod render;
mod serialize;
mod split;
mod tree;

pub use column::{ColumnKind, INVALID_CATEGORY, Label, StringTable, Value};
pub use config::{MaxFeatures, RandomForestConfig};
pub use counts::{CategoryCounts, majority_vote};
pub use error::RfError;
pub use eval::{
    Classify, CrossValidation, CrossValidationResult, Learner, LeaveOneOutResult, leave_one_out,
};
pub use forest::RandomForest;
pub use frame::{DataFrame, FrameBuilder, RowView, Schema};
pub use node::{Entropy, FeatureIndex, Node, NodeIndex};
pub use oob::OobEstimate;
pub use split::{
    BestSplit, SplitCriterion, SplitKey, best_categorical_split, best_numeric_split,
    find_best_split,
};
pub use tree::{DecisionTree, DecisionTreeConfig};
