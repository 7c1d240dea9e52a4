//! CSV loading and report writing for the arbor pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{EvaluationSummary, ExperimentName, RawTable};
pub use error::IoError;
pub use reader::CsvReader;
pub use writer::ReportWriter;
