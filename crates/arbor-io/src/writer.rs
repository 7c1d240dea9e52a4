//! JSON and DOT report writer for trained models and their evaluations.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_forest::{
    CrossValidationResult, DecisionTree, Label, LeaveOneOutResult, OobEstimate,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{EvaluationSummary, ExperimentName};

/// Writes model renderings and evaluation results to files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_tree.json`, `{experiment}_tree.dot`,
/// `{experiment}_evaluation.json` and `{experiment}_predictions.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a tree as `{experiment}_tree.json` and `{experiment}_tree.dot`.
    ///
    /// Returns the two paths written, JSON first.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Render`] | The tree cannot be rendered as JSON |
    /// | [`IoError::WriteFile`] | Either file cannot be written |
    #[instrument(skip_all, fields(n_nodes = tree.n_nodes()))]
    pub fn write_tree(&self, tree: &DecisionTree) -> Result<(PathBuf, PathBuf), IoError> {
        let json_path = self.file_path("tree.json");
        let json = tree.to_json().map_err(|e| IoError::Render {
            path: json_path.clone(),
            source: e,
        })?;
        write_file(&json_path, &json)?;

        let dot_path = self.file_path("tree.dot");
        write_file(&dot_path, &tree.to_dot())?;

        info!(
            json = %json_path.display(),
            dot = %dot_path.display(),
            "tree written"
        );
        Ok((json_path, dot_path))
    }

    /// Write evaluation results to `{experiment}_evaluation.json`.
    ///
    /// Estimates that were not run are left out of the file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(learner = %summary.learner))]
    pub fn write_evaluation(&self, summary: &EvaluationSummary) -> Result<PathBuf, IoError> {
        let path = self.file_path("evaluation.json");
        let artifact = EvaluationArtifact {
            experiment: self.experiment.as_str(),
            learner: &summary.learner,
            n_rows: summary.n_rows,
            oob: summary.oob.as_ref(),
            leave_one_out: summary.leave_one_out.as_ref(),
            cross_validation: summary.cross_validation.as_ref(),
        };
        write_json(&path, &artifact)?;

        info!(path = %path.display(), "evaluation written");
        Ok(path)
    }

    /// Write one predicted label per input row to `{experiment}_predictions.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_rows = labels.len()))]
    pub fn write_predictions(&self, labels: &[Label]) -> Result<PathBuf, IoError> {
        let path = self.file_path("predictions.json");
        let artifact = PredictionsArtifact {
            experiment: self.experiment.as_str(),
            n_rows: labels.len(),
            predictions: labels,
        };
        write_json(&path, &artifact)?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Return the path where a serialized model should be written.
    ///
    /// The model file is `{experiment}_model.bin` in the output directory.
    pub fn model_path(&self) -> PathBuf {
        self.file_path("model.bin")
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }
}

fn write_json(path: &Path, artifact: &impl Serialize) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::SerializeReport {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_file(path, &json)
}

fn write_file(path: &Path, contents: &str) -> Result<(), IoError> {
    fs::write(path, contents).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Serialization structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EvaluationArtifact<'a> {
    experiment: &'a str,
    learner: &'a str,
    n_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    oob: Option<&'a OobEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    leave_one_out: Option<&'a LeaveOneOutResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cross_validation: Option<&'a CrossValidationResult>,
}

#[derive(Serialize)]
struct PredictionsArtifact<'a> {
    experiment: &'a str,
    n_rows: usize,
    predictions: &'a [Label],
}
