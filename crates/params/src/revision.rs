//! Revisions: sparse, future-dated parameter overrides.
//!
//! A revision arrives keyed `name -> year -> value`. Before it is applied it
//! is inverted into chronological [`YearBatch`]es, and each key is classified
//! as either a parameter value or a `name-indexed` switch.
//!
//! ```json
//! {
//!     "exemption": {"2021": [4200, 8400]},
//!     "exemption-indexed": {"2021": false},
//!     "rate_x": {"2022": 0.35}
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::{RawValue, Scalar};

/// Suffix of the sibling key that switches indexing status.
pub const INDEXED_SUFFIX: &str = "-indexed";

/// One revised value: a scalar, or a list of scalars for a vector parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RevisionValue {
    Vector(Vec<Scalar>),
    Scalar(Scalar),
}

impl RevisionValue {
    /// Wrap as a single-year raw value for expansion.
    pub fn to_raw(&self) -> RawValue {
        match self {
            RevisionValue::Scalar(cell) => RawValue::Cells(vec![cell.clone()]),
            RevisionValue::Vector(row) => RawValue::Rows(vec![row.clone()]),
        }
    }
}

impl fmt::Display for RevisionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionValue::Scalar(cell) => write!(f, "{cell}"),
            RevisionValue::Vector(row) => {
                f.write_str("[")?;
                for (idx, cell) in row.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{cell}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<Scalar> for RevisionValue {
    fn from(value: Scalar) -> Self {
        RevisionValue::Scalar(value)
    }
}

macro_rules! revision_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RevisionValue {
                fn from(value: $ty) -> Self {
                    RevisionValue::Scalar(value.into())
                }
            }

            impl From<Vec<$ty>> for RevisionValue {
                fn from(values: Vec<$ty>) -> Self {
                    RevisionValue::Vector(values.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

revision_value_from!(f64, i64, bool, &str);

/// Classified revision key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RevisionKey {
    /// New value for a parameter.
    Value(String),
    /// New indexing status for a parameter (`name-indexed`).
    Indexed(String),
}

impl RevisionKey {
    pub fn parse(key: &str) -> Self {
        match key.strip_suffix(INDEXED_SUFFIX) {
            Some(base) => RevisionKey::Indexed(base.to_string()),
            None => RevisionKey::Value(key.to_string()),
        }
    }

    /// Parameter the key refers to.
    pub fn base_name(&self) -> &str {
        match self {
            RevisionKey::Value(name) | RevisionKey::Indexed(name) => name,
        }
    }
}

impl fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionKey::Value(name) => f.write_str(name),
            RevisionKey::Indexed(name) => write!(f, "{name}{INDEXED_SUFFIX}"),
        }
    }
}

/// All revised entries taking effect in one year, in input order.
pub type YearBatch = IndexMap<RevisionKey, RevisionValue>;

/// A revision keyed `name -> year -> value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision {
    entries: IndexMap<String, BTreeMap<i32, RevisionValue>>,
}

impl Revision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, year: i32, value: impl Into<RevisionValue>) -> Self {
        self.insert(name, year, value);
        self
    }

    pub fn insert(&mut self, name: &str, year: i32, value: impl Into<RevisionValue>) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .insert(year, value.into());
    }

    /// True when no parameter has any revised year.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Sorted distinct years mentioned anywhere in the revision.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .entries
            .values()
            .flat_map(|by_year| by_year.keys().copied())
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Parameter names, including any `-indexed` siblings, in input order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Invert into chronological batches keyed by classified names.
    pub fn by_year(&self) -> BTreeMap<i32, YearBatch> {
        let mut batches: BTreeMap<i32, YearBatch> = BTreeMap::new();
        for (name, by_year) in &self.entries {
            for (year, value) in by_year {
                batches
                    .entry(*year)
                    .or_default()
                    .insert(RevisionKey::parse(name), value.clone());
            }
        }
        batches
    }

    /// Build a revision from parsed JSON with integer or numeric-string years.
    ///
    /// Fails with [`Error::MalformedRevision`] if the document is not an object
    /// of `year -> value` objects, a year is not an integer, or a value is not
    /// a scalar or a flat list of scalars.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(params) = value else {
            return Err(Error::MalformedRevision(format!(
                "revision {value} is not a dictionary"
            )));
        };
        let mut revision = Revision::new();
        for (name, years) in params {
            let JsonValue::Object(years) = years else {
                return Err(Error::MalformedRevision(format!(
                    "KEY {name} VAL {years} is not a year:value dictionary"
                )));
            };
            let by_year = revision.entries.entry(name.clone()).or_default();
            for (year, item) in years {
                let year: i32 = year.trim().parse().map_err(|_| {
                    Error::MalformedRevision(format!("KEY {name} YEAR {year} is not an integer year"))
                })?;
                let item: RevisionValue = serde_json::from_value(item.clone()).map_err(|_| {
                    Error::MalformedRevision(format!(
                        "KEY {name} YEAR {year} VAL {item} is not a scalar or list of scalars"
                    ))
                })?;
                by_year.insert(year, item);
            }
        }
        Ok(revision)
    }
}

/// Read a revision from a `.json` file path or from raw JSON text.
///
/// `//` comments are stripped first. If `topkey` names a top-level key of the
/// document (as in a compound `{"policy": {...}, "behavior": {...}}` file),
/// only that section is used; otherwise the whole document is the revision.
/// `None` yields an empty revision.
pub fn read_json_revision(source: Option<&str>, topkey: &str) -> Result<Revision> {
    let Some(source) = source else {
        return Ok(Revision::new());
    };
    let path = Path::new(source);
    let text = if path.is_file() {
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            return Err(Error::MalformedRevision(format!(
                "file does not end with \".json\": {source}"
            )));
        }
        std::fs::read_to_string(path)?
    } else {
        source.to_string()
    };
    let document: JsonValue = serde_json::from_str(&strip_line_comments(&text))?;
    match document.get(topkey) {
        Some(section) => Revision::from_json(section),
        None => Revision::from_json(&document),
    }
}

/// Blank out `//` comments outside string literals, keeping line numbers.
fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut in_string = false;
        let mut escaped = false;
        let mut cut = line.len();
        let bytes = line.as_bytes();
        for (idx, &byte) in bytes.iter().enumerate() {
            match byte {
                _ if escaped => escaped = false,
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'/' if !in_string && bytes.get(idx + 1) == Some(&b'/') => {
                    cut = idx;
                    break;
                }
                _ => {}
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}
