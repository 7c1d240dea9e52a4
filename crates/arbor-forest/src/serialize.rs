//! Model serialization and deserialization via bincode.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::frame::Schema;
use crate::node::Node;
use crate::tree::DecisionTree;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
///
/// The schema is stored once; every tree shares it again after loading.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of rows the forest was trained on.
    n_training_rows: usize,
    /// Resolved per-node candidate count.
    vars_per_split: usize,
    /// Column names, kinds, and string tables of the training data.
    schema: Schema,
    /// Node arena of each tree, in forest order.
    trees: Vec<Vec<Node>>,
    /// Out-of-bag row indices of each tree, in forest order.
    oob_indices: Vec<Vec<usize>>,
}

impl ModelEnvelope {
    fn validate(&self) -> Result<(), String> {
        self.schema.validate()?;
        let n_columns = self.schema.n_columns();

        for (t, nodes) in self.trees.iter().enumerate() {
            for (i, node) in nodes.iter().enumerate() {
                let feature = match node {
                    Node::NumericSplit { feature, .. } | Node::CategoricalSplit { feature, .. } => {
                        feature.index()
                    }
                    Node::Leaf { .. } => continue,
                };
                if feature >= n_columns {
                    return Err(format!(
                        "tree {t} node {i} splits on column {feature} of {n_columns}"
                    ));
                }
                // Children always sit after their parent, which rules out cycles.
                if let Some((left, right)) = node.children() {
                    for child in [left.index(), right.index()] {
                        if child <= i || child >= nodes.len() {
                            return Err(format!(
                                "tree {t} node {i} links to node {child} of {}",
                                nodes.len()
                            ));
                        }
                    }
                }
            }
        }

        if self.oob_indices.len() != self.trees.len() {
            return Err(format!(
                "{} out-of-bag lists for {} trees",
                self.oob_indices.len(),
                self.trees.len()
            ));
        }
        for (t, rows) in self.oob_indices.iter().enumerate() {
            if let Some(row) = rows.iter().find(|&&row| row >= self.n_training_rows) {
                return Err(format!(
                    "tree {t} lists out-of-bag row {row} of {}",
                    self.n_training_rows
                ));
            }
        }
        Ok(())
    }
}

impl RandomForest {
    /// Save the model to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope for
    /// forward-compatibility checking.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_training_rows: self.n_training_rows,
            vars_per_split: self.vars_per_split,
            schema: Schema::clone(&self.schema),
            trees: self.trees.iter().map(|t| t.nodes.clone()).collect(),
            oob_indices: self.oob_indices.clone(),
        };

        let bytes = bincode::serialize(&envelope).map_err(|e| RfError::SerializeModel {
            source: e,
        })?;

        std::fs::write(path, &bytes).map_err(|e| RfError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// Checks the format version, then the structure of the decoded model,
    /// so a loaded forest never panics or loops while predicting.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`RfError::CorruptModel`] | schema, node links, or out-of-bag rows are inconsistent |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| RfError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope = bincode::deserialize(&bytes).map_err(|e| {
            RfError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        envelope
            .validate()
            .map_err(|reason| RfError::CorruptModel {
                path: path.to_path_buf(),
                reason,
            })?;

        debug!(
            n_trees = envelope.trees.len(),
            n_training_rows = envelope.n_training_rows,
            "model loaded"
        );

        let schema = Arc::new(envelope.schema);
        let trees = envelope
            .trees
            .into_iter()
            .map(|nodes| DecisionTree {
                nodes,
                schema: Arc::clone(&schema),
            })
            .collect();

        Ok(RandomForest {
            trees,
            oob_indices: envelope.oob_indices,
            schema,
            n_training_rows: envelope.n_training_rows,
            vars_per_split: envelope.vars_per_split,
        })
    }
}
