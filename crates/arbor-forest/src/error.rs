use std::path::PathBuf;

use crate::column::ColumnKind;

/// Errors from column store, tree, and forest operations.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when k-fold evaluation asks for more folds than rows.
    #[error("cannot split {n_rows} rows into {n_folds} folds")]
    TooFewRowsForFolds {
        /// The number of rows in the dataset.
        n_rows: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when a validation driver receives zero rows.
    #[error("dataset has zero rows")]
    EmptyDataset,

    /// Returned when zero rows are supplied and no column kinds describe the shape.
    #[error("cannot infer the column layout of an empty table without explicit column kinds")]
    EmptyShape,

    /// Returned when a raw row has a different number of cells than the first row.
    #[error("row {row_index} has {got} cells, expected {expected}")]
    RaggedRows {
        /// The expected number of cells.
        expected: usize,
        /// The actual number of cells in the row.
        got: usize,
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when supplied names or kinds disagree with the row width.
    #[error("{what} has {got} entries, but rows have {expected} columns")]
    ColumnCountMismatch {
        /// Which input disagrees (`"names"` or `"kinds"`).
        what: &'static str,
        /// The number of columns in each row.
        expected: usize,
        /// The number of entries supplied.
        got: usize,
    },

    /// Returned when no column is tagged as a target.
    #[error("no column is tagged as the target")]
    MissingTarget,

    /// Returned when more than one column is tagged as a target.
    #[error("columns {first} and {second} are both tagged as the target")]
    MultipleTargets {
        /// The first target column.
        first: usize,
        /// The second target column.
        second: usize,
    },

    /// Returned when a kind change would alter storage or target designation.
    #[error("column {column} cannot change kind from {from} to {to}")]
    InvalidKindChange {
        /// The zero-based column index.
        column: usize,
        /// The current kind.
        from: ColumnKind,
        /// The requested kind.
        to: ColumnKind,
    },

    /// Returned when a column index is past the last column.
    #[error("column {column} is out of range for a table with {n_columns} columns")]
    ColumnIndexOutOfRange {
        /// The offending column index.
        column: usize,
        /// The number of columns.
        n_columns: usize,
    },

    /// Returned when a raw cell cannot be parsed as its declared kind.
    #[error("cannot parse {raw:?} in row {row_index}, column {column} as {kind}")]
    ParseValue {
        /// The zero-based row index.
        row_index: usize,
        /// The zero-based column index.
        column: usize,
        /// The declared kind of the column.
        kind: ColumnKind,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when a numeric-float cell is NaN or infinite.
    #[error("non-finite value at row {row_index}, column {column}")]
    NonFiniteValue {
        /// The zero-based row index.
        row_index: usize,
        /// The zero-based column index.
        column: usize,
    },

    /// Returned when a column kind name is not recognized.
    #[error("unknown column kind {name:?}")]
    UnknownColumnKind {
        /// The unrecognized name.
        name: String,
    },

    /// Returned when category counts are requested from a non-countable column.
    #[error("column {column} of kind {kind} has no category counts")]
    InvalidColumnKind {
        /// The zero-based column index.
        column: usize,
        /// The kind of that column.
        kind: ColumnKind,
    },

    /// Returned when a feature vector cannot reach a split variable.
    #[error("feature vector has {got} values but the model reads variable {needed}")]
    FeatureVectorTooShort {
        /// The zero-based variable index the model needs.
        needed: usize,
        /// The length of the supplied feature vector.
        got: usize,
    },

    /// Returned when classifying with a tree or forest that holds no nodes.
    #[error("model is empty and cannot classify")]
    EmptyModel,

    /// Returned when OOB estimation is run against a table of a different size.
    #[error("OOB estimate needs the {expected} training rows, got {got}")]
    RowCountMismatch {
        /// The number of rows the forest was trained on.
        expected: usize,
        /// The number of rows supplied.
        got: usize,
    },

    /// Returned when every row was drawn into every bootstrap sample.
    #[error("no row is out of bag for any tree")]
    NoOutOfBagRows,

    /// Returned when a tree description cannot be rendered as JSON.
    #[error("failed to render tree as JSON")]
    RenderJson {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when a decoded model breaks a structural invariant, such as a
    /// child link that does not point further down the arena.
    #[error("corrupt model in {path}: {reason}")]
    CorruptModel {
        /// Path to the model file.
        path: PathBuf,
        /// Which invariant the model breaks.
        reason: String,
    },
}
