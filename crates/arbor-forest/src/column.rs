//! Column kinds, string interning, and cell values.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RfError;

/// Code given to strings that a column's table has never seen.
pub const INVALID_CATEGORY: i32 = -1;

/// Kind tag carried by every column of a [`DataFrame`](crate::DataFrame).
///
/// Every kind except [`ColumnKind::NumericFloat`] is stored as `i32`.
/// String kinds hold intern codes into the column's [`StringTable`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub enum ColumnKind {
    /// Integer-coded category.
    CategoricalInt,
    /// String category, stored as an intern code.
    CategoricalString,
    /// Ordered integer value.
    NumericInt,
    /// Ordered 32-bit float value.
    NumericFloat,
    /// Integer-coded target category.
    TargetCategoricalInt,
    /// String target category, stored as an intern code.
    TargetCategoricalString,
    /// Carried along but never used for splitting or prediction.
    Unused,
}

impl ColumnKind {
    /// Return `true` for the two target kinds.
    #[must_use]
    pub fn is_target(self) -> bool {
        matches!(
            self,
            ColumnKind::TargetCategoricalInt | ColumnKind::TargetCategoricalString
        )
    }

    /// Return `true` for kinds split one-vs-rest on equality.
    #[must_use]
    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            ColumnKind::CategoricalInt
                | ColumnKind::CategoricalString
                | ColumnKind::TargetCategoricalInt
                | ColumnKind::TargetCategoricalString
        )
    }

    /// Return `true` for kinds whose codes decode through a [`StringTable`].
    #[must_use]
    pub fn is_string(self) -> bool {
        matches!(
            self,
            ColumnKind::CategoricalString | ColumnKind::TargetCategoricalString
        )
    }

    /// Return `true` for kinds that may be chosen as a split variable.
    #[must_use]
    pub fn is_predictor(self) -> bool {
        !self.is_target() && self != ColumnKind::Unused
    }

    /// Return `true` for kinds whose values can be tallied as categories.
    #[must_use]
    pub fn is_countable(self) -> bool {
        !matches!(self, ColumnKind::NumericFloat | ColumnKind::Unused)
    }

    /// Short lowercase name, also accepted by [`FromStr`].
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            ColumnKind::CategoricalInt => "cat",
            ColumnKind::CategoricalString => "string",
            ColumnKind::NumericInt => "int",
            ColumnKind::NumericFloat => "float",
            ColumnKind::TargetCategoricalInt => "target",
            ColumnKind::TargetCategoricalString => "target-string",
            ColumnKind::Unused => "unused",
        }
    }

    /// Infer a kind from the raw text of one column.
    ///
    /// Integer literals give `NumericInt`, numbers with a decimal point give
    /// `NumericFloat`, anything else gives `CategoricalString`. A target
    /// column becomes `TargetCategoricalInt` when every value is an integer
    /// and `TargetCategoricalString` otherwise.
    pub fn infer<S: AsRef<str>>(values: impl IntoIterator<Item = S>, is_target: bool) -> Self {
        let mut all_int = true;
        let mut all_number = true;
        let mut any_decimal = false;
        for value in values {
            let value = value.as_ref().trim();
            if value.parse::<i32>().is_err() {
                all_int = false;
            }
            if value.parse::<f32>().is_err() {
                all_number = false;
            }
            any_decimal |= value.contains('.');
        }
        match (is_target, all_int) {
            (true, true) => ColumnKind::TargetCategoricalInt,
            (true, false) => ColumnKind::TargetCategoricalString,
            (false, true) => ColumnKind::NumericInt,
            (false, false) if all_number && any_decimal => ColumnKind::NumericFloat,
            (false, false) => ColumnKind::CategoricalString,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for ColumnKind {
    type Err = RfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cat" | "categorical" => Ok(ColumnKind::CategoricalInt),
            "string" | "str" => Ok(ColumnKind::CategoricalString),
            "int" | "numeric" => Ok(ColumnKind::NumericInt),
            "float" => Ok(ColumnKind::NumericFloat),
            "target" => Ok(ColumnKind::TargetCategoricalInt),
            "target-string" => Ok(ColumnKind::TargetCategoricalString),
            "unused" | "skip" => Ok(ColumnKind::Unused),
            _ => Err(RfError::UnknownColumnKind { name: s.to_string() }),
        }
    }
}

/// Bidirectional string ↔ code table for one string column.
///
/// Codes are assigned in first-seen order starting at 0.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StringTable {
    index: HashMap<String, i32>,
    strings: Vec<String>,
}

impl StringTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its existing code or a fresh one.
    pub fn add(&mut self, s: &str) -> i32 {
        if let Some(&code) = self.index.get(s) {
            return code;
        }
        let code = self.strings.len() as i32;
        self.index.insert(s.to_string(), code);
        self.strings.push(s.to_string());
        code
    }

    /// Return the code for `s`, if interned.
    #[must_use]
    pub fn code(&self, s: &str) -> Option<i32> {
        self.index.get(s).copied()
    }

    /// Return the string for `code`, if assigned.
    #[must_use]
    pub fn get(&self, code: i32) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// A single cell of a feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Any integer-coded cell (ints, categories, intern codes).
    Int(i32),
    /// A numeric-float cell.
    Float(f32),
}

impl Value {
    /// Widen to `f64` for threshold comparison.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(v) => f64::from(v),
            Value::Float(v) => f64::from(v),
        }
    }

    /// Return the integer code, or `None` for a float cell.
    #[must_use]
    pub fn as_code(self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(v),
            Value::Float(_) => None,
        }
    }
}

/// A decoded, human-readable cell value.
///
/// Serializes as a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Label {
    Int(i32),
    Float(f32),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Float(v) => write!(f, "{v}"),
            Label::Text(s) => f.write_str(s),
        }
    }
}

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Column {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Column {
    pub(crate) fn value(&self, row: usize) -> Value {
        match self {
            Column::Int(values) => Value::Int(values[row]),
            Column::Float(values) => Value::Float(values[row]),
        }
    }

    /// Return `true` if a column of `kind` may live in this storage.
    pub(crate) fn accepts(&self, kind: ColumnKind) -> bool {
        match self {
            Column::Int(_) => kind != ColumnKind::NumericFloat,
            Column::Float(_) => matches!(kind, ColumnKind::NumericFloat | ColumnKind::Unused),
        }
    }
}
