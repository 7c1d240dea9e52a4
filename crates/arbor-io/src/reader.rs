//! CSV table reader with input validation.

use std::path::{Path, PathBuf};

use arbor_forest::{ColumnKind, DataFrame, FrameBuilder};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::RawTable;

/// Reads a labelled table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; its cells become the column names
/// - The last column is the classification target unless explicit kinds
///   say otherwise
/// - All rows must have the same number of columns as the header
///
/// Cells are trimmed. Column kinds are inferred from the values unless
/// set with [`CsvReader::with_kinds`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::Frame`] | Cells don't fit the inferred or given kinds |
pub struct CsvReader {
    path: PathBuf,
    kinds: Option<Vec<ColumnKind>>,
}

impl CsvReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            kinds: None,
        }
    }

    /// Use these column kinds instead of inferring them.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<ColumnKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Return the path this reader loads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the CSV file without typing any column.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_raw(&self) -> Result<RawTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire instead
        // of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| self.parse_error(e))?
            .iter()
            .map(str::to_string)
            .collect();
        let expected = headers.len();
        debug!(expected, "read CSV header");

        let mut rows: Vec<Vec<String>> = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        Ok(RawTable { headers, rows })
    }

    /// Read the CSV file into a typed [`DataFrame`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<DataFrame, IoError> {
        let raw = self.read_raw()?;
        let mut builder = FrameBuilder::new().with_names(raw.headers);
        if let Some(kinds) = &self.kinds {
            builder = builder.with_kinds(kinds.clone());
        }
        let data = builder
            .build_from_strings(&raw.rows)
            .map_err(|e| IoError::Frame {
                path: self.path.clone(),
                source: e,
            })?;

        info!(
            n_rows = data.len(),
            n_columns = data.n_columns(),
            target = data.schema().name(data.target_index()),
            "loaded table"
        );
        Ok(data)
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arbor_forest::Label;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_infers_kinds_from_values() {
        let f = write_csv("age, city ,score,label\n31,Bern,0.5,1\n40, Zurich ,1.25,0\n");
        let data = CsvReader::new(f.path()).read().unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.schema().names(), ["age", "city", "score", "label"]);
        assert_eq!(data.schema().kind(0), ColumnKind::NumericInt);
        assert_eq!(data.schema().kind(1), ColumnKind::CategoricalString);
        assert_eq!(data.schema().kind(2), ColumnKind::NumericFloat);
        assert_eq!(data.schema().kind(3), ColumnKind::TargetCategoricalInt);
        assert_eq!(data.label(1, 1), Label::Text("Zurich".to_string()));
    }

    #[test]
    fn read_with_explicit_kinds() {
        let f = write_csv("a,b,y\n1,2,x\n3,4,z\n");
        let data = CsvReader::new(f.path())
            .with_kinds(vec![
                ColumnKind::CategoricalInt,
                ColumnKind::NumericFloat,
                ColumnKind::TargetCategoricalString,
            ])
            .read()
            .unwrap();

        assert_eq!(data.schema().kind(0), ColumnKind::CategoricalInt);
        assert_eq!(data.schema().kind(1), ColumnKind::NumericFloat);
        assert_eq!(data.label(1, 2), Label::Text("z".to_string()));
    }

    #[test]
    fn read_raw_keeps_text() {
        let f = write_csv("a,y\n007,yes\n");
        let raw = CsvReader::new(f.path()).read_raw().unwrap();
        assert_eq!(raw.headers, ["a", "y"]);
        assert_eq!(raw.rows, vec![vec!["007".to_string(), "yes".to_string()]]);
        assert_eq!(raw.n_rows(), 1);
    }

    #[test]
    fn file_not_found() {
        let result = CsvReader::new(Path::new("/no/such/table.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn empty_dataset() {
        let f = write_csv("a,b,y\n");
        let result = CsvReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn inconsistent_row_length() {
        let f = write_csv("a,b,y\n1,2,0\n1,2\n");
        let result = CsvReader::new(f.path()).read();
        match result {
            Err(IoError::InconsistentRowLength {
                row_index,
                expected,
                got,
                ..
            }) => {
                assert_eq!(row_index, 1);
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("expected InconsistentRowLength, got {other:?}"),
        }
    }

    #[test]
    fn kinds_that_do_not_fit_are_rejected() {
        let f = write_csv("a,y\nhello,0\n");
        let result = CsvReader::new(f.path())
            .with_kinds(vec![ColumnKind::NumericFloat, ColumnKind::TargetCategoricalInt])
            .read();
        assert!(matches!(result, Err(IoError::Frame { .. })));
    }
}
