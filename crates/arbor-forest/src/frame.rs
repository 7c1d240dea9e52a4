//! Typed column store: a rectangular table of typed columns with one target.
//!
//! A [`DataFrame`] owns only its sequence of row indices. The [`Schema`]
//! (names, kinds, string tables) and the column data sit behind `Arc` and
//! are shared by every frame derived through [`DataFrame::filter`] or
//! [`DataFrame::select_rows`], so partitioning a node never copies cells.

use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::column::{Column, ColumnKind, INVALID_CATEGORY, Label, StringTable, Value};
use crate::counts::CategoryCounts;
use crate::error::RfError;

/// Column metadata shared by a frame, its partitions, and trained models.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
    strings: Vec<Option<StringTable>>,
    target: usize,
}

impl Schema {
    fn new(
        names: Vec<String>,
        kinds: Vec<ColumnKind>,
        strings: Vec<Option<StringTable>>,
    ) -> Result<Self, RfError> {
        let mut target = None;
        for (j, kind) in kinds.iter().enumerate() {
            if kind.is_target() {
                if let Some(first) = target {
                    return Err(RfError::MultipleTargets { first, second: j });
                }
                target = Some(j);
            }
        }
        let target = target.ok_or(RfError::MissingTarget)?;
        Ok(Self {
            names,
            kinds,
            strings,
            target,
        })
    }

    /// Check the invariants [`Schema::new`] establishes on a schema that was
    /// decoded rather than built.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let n = self.kinds.len();
        if self.names.len() != n || self.strings.len() != n {
            return Err(format!(
                "schema has {} names and {} string tables for {n} columns",
                self.names.len(),
                self.strings.len()
            ));
        }
        let targets: Vec<usize> = (0..n).filter(|&j| self.kinds[j].is_target()).collect();
        if targets != [self.target] {
            return Err(format!(
                "schema target {} does not match target columns {targets:?}",
                self.target
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the name of `column`.
    ///
    /// # Panics
    ///
    /// Panics if `column` is out of range.
    #[must_use]
    pub fn name(&self, column: usize) -> &str {
        &self.names[column]
    }

    #[must_use]
    pub fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    /// Return the kind of `column`.
    ///
    /// # Panics
    ///
    /// Panics if `column` is out of range.
    #[must_use]
    pub fn kind(&self, column: usize) -> ColumnKind {
        self.kinds[column]
    }

    /// Return the index of the target column.
    #[must_use]
    pub fn target_index(&self) -> usize {
        self.target
    }

    /// Return the intern table of `column`, if it has one.
    #[must_use]
    pub fn string_table(&self, column: usize) -> Option<&StringTable> {
        self.strings.get(column).and_then(Option::as_ref)
    }

    /// Indices of every column eligible as a split variable, ascending.
    #[must_use]
    pub fn predictor_indexes(&self) -> Vec<usize> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.is_predictor())
            .map(|(j, _)| j)
            .collect()
    }

    #[must_use]
    pub fn n_predictor_variables(&self) -> usize {
        self.kinds.iter().filter(|kind| kind.is_predictor()).count()
    }

    /// Choose the candidate split variables for one node.
    ///
    /// When `m` is 0 or at least the number of predictors, every predictor
    /// is returned without touching `rng`. Otherwise the predictors are
    /// shuffled with `rng`, the first `m` kept, and the result sorted.
    pub fn subset_of_variable_indexes(&self, m: usize, rng: &mut impl Rng) -> Vec<usize> {
        let mut indexes = self.predictor_indexes();
        if m == 0 || m >= indexes.len() {
            return indexes;
        }
        indexes.shuffle(rng);
        indexes.truncate(m);
        indexes.sort_unstable();
        indexes
    }

    /// Decode a stored cell of `column` into a display value.
    #[must_use]
    pub fn decode(&self, column: usize, value: Value) -> Label {
        let kind = self.kinds[column];
        match value {
            Value::Float(v) => Label::Float(v),
            Value::Int(code) if kind.is_string() || kind == ColumnKind::Unused => {
                match self.string_table(column).and_then(|t| t.get(code)) {
                    Some(s) => Label::Text(s.to_string()),
                    None => Label::Int(code),
                }
            }
            Value::Int(v) => Label::Int(v),
        }
    }

    /// Encode raw text for `column` without growing any string table.
    ///
    /// Strings the table has never seen map to [`INVALID_CATEGORY`], which
    /// routes right at every categorical split.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ColumnIndexOutOfRange`] | `column` is past the last column |
    /// | [`RfError::ParseValue`] | text is not a number of the column's kind |
    /// | [`RfError::NonFiniteValue`] | a float cell is NaN or infinite |
    pub fn encode(&self, row_index: usize, column: usize, raw: &str) -> Result<Value, RfError> {
        let kind = *self.kinds.get(column).ok_or(RfError::ColumnIndexOutOfRange {
            column,
            n_columns: self.n_columns(),
        })?;
        if let Some(table) = self.string_table(column)
            && (kind.is_string() || kind == ColumnKind::Unused)
        {
            return Ok(Value::Int(table.code(raw.trim()).unwrap_or(INVALID_CATEGORY)));
        }
        parse_numeric(row_index, column, kind, raw)
    }

    /// Encode one raw row into a feature vector.
    ///
    /// Rows may omit trailing columns (typically the target); classification
    /// only reads the variables a model actually splits on.
    ///
    /// # Errors
    ///
    /// Same as [`Schema::encode`]; extra cells give
    /// [`RfError::ColumnCountMismatch`].
    pub fn encode_row<S: AsRef<str>>(
        &self,
        row_index: usize,
        raw: &[S],
    ) -> Result<Vec<Value>, RfError> {
        if raw.len() > self.n_columns() {
            return Err(RfError::ColumnCountMismatch {
                what: "row",
                expected: self.n_columns(),
                got: raw.len(),
            });
        }
        raw.iter()
            .enumerate()
            .map(|(j, cell)| self.encode(row_index, j, cell.as_ref()))
            .collect()
    }
}

fn parse_numeric(
    row_index: usize,
    column: usize,
    kind: ColumnKind,
    raw: &str,
) -> Result<Value, RfError> {
    let text = raw.trim();
    let parse_error = || RfError::ParseValue {
        row_index,
        column,
        kind,
        raw: raw.to_string(),
    };
    if kind == ColumnKind::NumericFloat {
        let v: f32 = text.parse().map_err(|_| parse_error())?;
        if !v.is_finite() {
            return Err(RfError::NonFiniteValue { row_index, column });
        }
        Ok(Value::Float(v))
    } else {
        text.parse().map(Value::Int).map_err(|_| parse_error())
    }
}

fn default_kinds(width: usize) -> Vec<ColumnKind> {
    (0..width)
        .map(|j| {
            if j + 1 == width {
                ColumnKind::TargetCategoricalInt
            } else {
                ColumnKind::NumericInt
            }
        })
        .collect()
}

fn default_names(kinds: &[ColumnKind]) -> Vec<String> {
    kinds
        .iter()
        .enumerate()
        .map(|(j, kind)| {
            if kind.is_target() {
                "y".to_string()
            } else {
                format!("x{j}")
            }
        })
        .collect()
}

/// Builder for [`DataFrame`] construction.
///
/// Kinds default to inference (string rows) or to numeric-int predictors
/// with an integer target in the last column (int rows). Names default to
/// `x{j}` for predictors and `y` for the target.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    kinds: Option<Vec<ColumnKind>>,
    names: Option<Vec<String>>,
}

impl FrameBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the kind of every column.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<ColumnKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Declare the name of every column.
    #[must_use]
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    /// Build from fixed-width integer rows.
    ///
    /// Numeric-float cells are carried as `f32` bit patterns.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyShape`] | no rows and no declared kinds |
    /// | [`RfError::RaggedRows`] | a row differs in width from the first |
    /// | [`RfError::ColumnCountMismatch`] | names or kinds disagree with the width |
    /// | [`RfError::MissingTarget`] / [`RfError::MultipleTargets`] | not exactly one target |
    /// | [`RfError::NonFiniteValue`] | a float bit pattern is NaN or infinite |
    pub fn build_from_ints(self, rows: &[Vec<i32>]) -> Result<DataFrame, RfError> {
        let width = self.width(rows.first().map(Vec::len))?;
        check_widths(rows.iter().map(Vec::len), width)?;
        let kinds = self.kinds.clone().unwrap_or_else(|| default_kinds(width));
        let names = self.resolve_names(&kinds, width)?;

        let mut columns = Vec::with_capacity(width);
        for (j, &kind) in kinds.iter().enumerate() {
            if kind == ColumnKind::NumericFloat {
                let mut values = Vec::with_capacity(rows.len());
                for (row_index, row) in rows.iter().enumerate() {
                    let v = f32::from_bits(row[j] as u32);
                    if !v.is_finite() {
                        return Err(RfError::NonFiniteValue { row_index, column: j });
                    }
                    values.push(v);
                }
                columns.push(Column::Float(values));
            } else {
                columns.push(Column::Int(rows.iter().map(|row| row[j]).collect()));
            }
        }

        let schema = Schema::new(names, kinds, vec![None; width])?;
        Ok(DataFrame::assemble(schema, columns, rows.len()))
    }

    /// Build from string rows, interning string columns.
    ///
    /// Without declared kinds every column's kind is inferred (see
    /// [`ColumnKind::infer`]) and the last column becomes the target.
    ///
    /// # Errors
    ///
    /// As [`FrameBuilder::build_from_ints`], plus [`RfError::ParseValue`]
    /// when a cell does not parse as its column's kind.
    pub fn build_from_strings<S: AsRef<str>>(self, rows: &[Vec<S>]) -> Result<DataFrame, RfError> {
        let width = self.width(rows.first().map(Vec::len))?;
        check_widths(rows.iter().map(Vec::len), width)?;
        let kinds = match self.kinds.clone() {
            Some(kinds) => kinds,
            None => (0..width)
                .map(|j| ColumnKind::infer(rows.iter().map(|r| r[j].as_ref()), j + 1 == width))
                .collect(),
        };
        let names = self.resolve_names(&kinds, width)?;

        let mut columns = Vec::with_capacity(width);
        let mut strings = Vec::with_capacity(width);
        for (j, &kind) in kinds.iter().enumerate() {
            if kind.is_string() || kind == ColumnKind::Unused {
                let mut table = StringTable::new();
                let codes = rows.iter().map(|r| table.add(r[j].as_ref().trim())).collect();
                columns.push(Column::Int(codes));
                strings.push(Some(table));
                continue;
            }
            let mut ints = Vec::new();
            let mut floats = Vec::new();
            for (row_index, row) in rows.iter().enumerate() {
                match parse_numeric(row_index, j, kind, row[j].as_ref())? {
                    Value::Int(v) => ints.push(v),
                    Value::Float(v) => floats.push(v),
                }
            }
            columns.push(if kind == ColumnKind::NumericFloat {
                Column::Float(floats)
            } else {
                Column::Int(ints)
            });
            strings.push(None);
        }

        let schema = Schema::new(names, kinds, strings)?;
        Ok(DataFrame::assemble(schema, columns, rows.len()))
    }

    /// Build a frame with zero rows.
    ///
    /// # Errors
    ///
    /// [`RfError::EmptyShape`] without declared kinds, otherwise as
    /// [`FrameBuilder::build_from_ints`].
    pub fn build_empty(self) -> Result<DataFrame, RfError> {
        self.build_from_ints(&[])
    }

    fn width(&self, first_row: Option<usize>) -> Result<usize, RfError> {
        let width = first_row
            .or_else(|| self.kinds.as_ref().map(Vec::len))
            .ok_or(RfError::EmptyShape)?;
        if let Some(kinds) = &self.kinds
            && kinds.len() != width
        {
            return Err(RfError::ColumnCountMismatch {
                what: "kinds",
                expected: width,
                got: kinds.len(),
            });
        }
        Ok(width)
    }

    fn resolve_names(&self, kinds: &[ColumnKind], width: usize) -> Result<Vec<String>, RfError> {
        match &self.names {
            Some(names) if names.len() != width => Err(RfError::ColumnCountMismatch {
                what: "names",
                expected: width,
                got: names.len(),
            }),
            Some(names) => Ok(names.clone()),
            None => Ok(default_names(kinds)),
        }
    }
}

fn check_widths(widths: impl Iterator<Item = usize>, expected: usize) -> Result<(), RfError> {
    for (row_index, got) in widths.enumerate() {
        if got != expected {
            return Err(RfError::RaggedRows {
                expected,
                got,
                row_index,
            });
        }
    }
    Ok(())
}

/// A view of one row of a [`DataFrame`], handed to filter predicates.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    frame: &'a DataFrame,
    position: usize,
}

impl RowView<'_> {
    /// Return the cell in `column`.
    #[must_use]
    pub fn value(&self, column: usize) -> Value {
        self.frame.value(self.position, column)
    }

    /// Return this row's target category code.
    #[must_use]
    pub fn target(&self) -> i32 {
        self.frame.target(self.position)
    }

    /// Return this row's position within the frame being filtered.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

/// A rectangular table of typed columns with exactly one target column.
#[derive(Debug, Clone)]
pub struct DataFrame {
    schema: Arc<Schema>,
    columns: Arc<Vec<Column>>,
    rows: Vec<usize>,
}

impl DataFrame {
    fn assemble(schema: Schema, columns: Vec<Column>, n_rows: usize) -> Self {
        Self {
            schema: Arc::new(schema),
            columns: Arc::new(columns),
            rows: (0..n_rows).collect(),
        }
    }

    fn derive(&self, rows: Vec<usize>) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            columns: Arc::clone(&self.columns),
            rows,
        }
    }

    /// Build from integer rows with default kinds and names.
    ///
    /// # Errors
    ///
    /// See [`FrameBuilder::build_from_ints`].
    pub fn from_ints(rows: &[Vec<i32>]) -> Result<Self, RfError> {
        FrameBuilder::new().build_from_ints(rows)
    }

    /// Build from string rows with inferred kinds and default names.
    ///
    /// # Errors
    ///
    /// See [`FrameBuilder::build_from_strings`].
    pub fn from_strings<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Self, RfError> {
        FrameBuilder::new().build_from_strings(rows)
    }

    /// Build a zero-row frame with the given kinds and default names.
    ///
    /// # Errors
    ///
    /// See [`FrameBuilder::build_empty`].
    pub fn empty(kinds: Vec<ColumnKind>) -> Result<Self, RfError> {
        FrameBuilder::new().with_kinds(kinds).build_empty()
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn shared_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Return `true` if both frames share the same metadata allocation.
    #[must_use]
    pub fn shares_schema_with(&self, other: &DataFrame) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.schema.n_columns()
    }

    #[must_use]
    pub fn target_index(&self) -> usize {
        self.schema.target_index()
    }

    #[must_use]
    pub fn n_predictor_variables(&self) -> usize {
        self.schema.n_predictor_variables()
    }

    /// Return the cell at row position `row`, column `column`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn value(&self, row: usize, column: usize) -> Value {
        self.columns[column].value(self.rows[row])
    }

    /// Return row `row` as a feature vector (target included).
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<Value> {
        let stored = self.rows[row];
        self.columns.iter().map(|c| c.value(stored)).collect()
    }

    /// Return the decoded display value at `row`, `column`.
    #[must_use]
    pub fn label(&self, row: usize, column: usize) -> Label {
        self.schema.decode(column, self.value(row, column))
    }

    /// Return the target category code of row `row`.
    #[must_use]
    pub fn target(&self, row: usize) -> i32 {
        match &self.columns[self.schema.target_index()] {
            Column::Int(values) => values[self.rows[row]],
            Column::Float(_) => unreachable!("target columns always use integer storage"),
        }
    }

    /// Tally the target categories of every row.
    #[must_use]
    pub fn target_counts(&self) -> CategoryCounts {
        (0..self.len()).map(|i| self.target(i)).collect()
    }

    /// Tally the values of `column` across every row.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ColumnIndexOutOfRange`] | `column` is past the last column |
    /// | [`RfError::InvalidColumnKind`] | the column is numeric-float or unused |
    pub fn value_counts_in_column(&self, column: usize) -> Result<CategoryCounts, RfError> {
        let kind = *self.schema.kinds.get(column).ok_or(RfError::ColumnIndexOutOfRange {
            column,
            n_columns: self.n_columns(),
        })?;
        match &self.columns[column] {
            Column::Int(values) if kind.is_countable() => {
                Ok(self.rows.iter().map(|&r| values[r]).collect())
            }
            _ => Err(RfError::InvalidColumnKind { column, kind }),
        }
    }

    /// Stable in-place sort of the rows by `column`.
    ///
    /// Integer storage compares codes, so string columns order by intern
    /// code (first-seen order), not lexically.
    ///
    /// # Panics
    ///
    /// Panics if `column` is out of range.
    pub fn sort_by(&mut self, column: usize) {
        match &self.columns[column] {
            Column::Int(values) => self.rows.sort_by_key(|&r| values[r]),
            Column::Float(values) => self.rows.sort_by(|&a, &b| values[a].total_cmp(&values[b])),
        }
    }

    /// Keep the rows for which `predicate` returns `true`.
    #[must_use]
    pub fn filter(&self, mut predicate: impl FnMut(RowView<'_>) -> bool) -> DataFrame {
        let rows = (0..self.len())
            .filter(|&position| predicate(RowView { frame: self, position }))
            .map(|position| self.rows[position])
            .collect();
        self.derive(rows)
    }

    /// Take the rows at `positions`, in order; repeats are allowed.
    ///
    /// # Panics
    ///
    /// Panics if a position is out of range.
    #[must_use]
    pub fn select_rows(&self, positions: &[usize]) -> DataFrame {
        self.derive(positions.iter().map(|&p| self.rows[p]).collect())
    }

    /// Change the kind of `column`.
    ///
    /// Frames already derived from this one keep the old metadata. Only
    /// changes that fit the column's storage, keep its target designation,
    /// and (for string kinds) have an intern table are allowed.
    ///
    /// # Errors
    ///
    /// [`RfError::ColumnIndexOutOfRange`] or [`RfError::InvalidKindChange`].
    pub fn set_column_kind(&mut self, column: usize, kind: ColumnKind) -> Result<(), RfError> {
        let from = *self.schema.kinds.get(column).ok_or(RfError::ColumnIndexOutOfRange {
            column,
            n_columns: self.n_columns(),
        })?;
        let allowed = self.columns[column].accepts(kind)
            && from.is_target() == kind.is_target()
            && (!kind.is_string() || self.schema.string_table(column).is_some());
        if !allowed {
            return Err(RfError::InvalidKindChange { column, from, to: kind });
        }
        Arc::make_mut(&mut self.schema).kinds[column] = kind;
        Ok(())
    }
}
