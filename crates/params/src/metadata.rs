//! Parameter metadata table.
//!
//! Built once from a defaults document: one JSON object per parameter with its
//! law-default `value` (one entry or row per known year from the start year),
//! `value_type`, indexing flags, `valid_values` bounds and, for vector
//! parameters, `vi_vals` column labels. Everything else in an entry (long
//! names, descriptions, notes) is carried through untouched for reporting.
//!
//! The table is immutable after loading except for each parameter's `indexed`
//! flag, which only the revision engine changes.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::{RawValue, Series, ValueType};

/// Kind of a numeric bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    Min,
    Max,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundKind::Min => f.write_str("min"),
            BoundKind::Max => f.write_str("max"),
        }
    }
}

/// Comparison value of a bound: a literal broadcast to the parameter's shape,
/// or another parameter whose per-year series is compared cell by cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Literal(f64),
    Parameter(String),
}

impl Bound {
    fn from_json(name: &str, kind: &str, value: &JsonValue) -> Result<Bound> {
        match value {
            JsonValue::String(other) => Ok(Bound::Parameter(other.clone())),
            JsonValue::Bool(flag) => Ok(Bound::Literal(if *flag { 1.0 } else { 0.0 })),
            JsonValue::Number(n) => n.as_f64().map(Bound::Literal).ok_or_else(|| {
                invalid(name, format!("{kind} bound {n} is not representable"))
            }),
            other => Err(invalid(name, format!("{kind} bound {other} is not a number or name"))),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Bound::Literal(v) => serde_json::json!(v),
            Bound::Parameter(name) => JsonValue::String(name.clone()),
        }
    }
}

/// What to do when a value falls outside a bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidAction {
    Warn,
    #[default]
    Stop,
}

/// Declared valid values of a parameter.
///
/// Deserialized from a JSON object whose `min`/`max` entries are numbers,
/// booleans or parameter names, whose `options` entry lists the permitted
/// strings, and which may also carry `invalid_minmsg`, `invalid_maxmsg` and
/// `invalid_action`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, JsonValue>",
    into = "IndexMap<String, JsonValue>"
)]
pub struct ValidValues {
    /// Bounds in declaration order.
    pub bounds: Vec<(BoundKind, Bound)>,
    /// Permitted values of a string parameter.
    pub options: Option<Vec<String>>,
    pub invalid_minmsg: Option<String>,
    pub invalid_maxmsg: Option<String>,
    pub invalid_action: Option<InvalidAction>,
}

impl ValidValues {
    /// True when nothing is declared.
    pub fn is_empty(&self) -> bool {
        *self == ValidValues::default()
    }
}

impl TryFrom<IndexMap<String, JsonValue>> for ValidValues {
    type Error = Error;

    fn try_from(map: IndexMap<String, JsonValue>) -> Result<Self> {
        let mut valid = ValidValues::default();
        for (key, value) in &map {
            match key.as_str() {
                "min" => valid
                    .bounds
                    .push((BoundKind::Min, Bound::from_json("valid_values", key, value)?)),
                "max" => valid
                    .bounds
                    .push((BoundKind::Max, Bound::from_json("valid_values", key, value)?)),
                "options" => valid.options = Some(serde_json::from_value(value.clone())?),
                "invalid_minmsg" => valid.invalid_minmsg = Some(serde_json::from_value(value.clone())?),
                "invalid_maxmsg" => valid.invalid_maxmsg = Some(serde_json::from_value(value.clone())?),
                "invalid_action" => valid.invalid_action = Some(serde_json::from_value(value.clone())?),
                other => {
                    return Err(invalid(
                        "valid_values",
                        format!("unsupported key '{other}'"),
                    ))
                }
            }
        }
        Ok(valid)
    }
}

impl From<ValidValues> for IndexMap<String, JsonValue> {
    fn from(valid: ValidValues) -> Self {
        let mut map = IndexMap::new();
        for (kind, bound) in &valid.bounds {
            map.insert(kind.to_string(), bound.to_json());
        }
        if let Some(options) = valid.options {
            map.insert("options".into(), serde_json::json!(options));
        }
        if let Some(msg) = valid.invalid_minmsg {
            map.insert("invalid_minmsg".into(), JsonValue::String(msg));
        }
        if let Some(msg) = valid.invalid_maxmsg {
            map.insert("invalid_maxmsg".into(), JsonValue::String(msg));
        }
        if let Some(action) = valid.invalid_action {
            map.insert("invalid_action".into(), serde_json::json!(action));
        }
        map
    }
}

/// Load-time description of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    /// Filled from the document key.
    #[serde(skip)]
    pub name: String,
    /// Law-default values, one entry (or row) per known year.
    pub value: RawValue,
    pub value_type: ValueType,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub indexable: bool,
    #[serde(default)]
    pub valid_values: ValidValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_minmsg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_maxmsg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_action: Option<InvalidAction>,
    /// Column labels; non-empty exactly for vector parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vi_vals: Vec<String>,
    /// Descriptive fields kept for the metadata snapshot.
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl ParameterMetadata {
    /// Describe a parameter in code, mainly for tests and embedded families.
    pub fn new(name: impl Into<String>, value_type: ValueType, value: RawValue) -> Self {
        Self {
            name: name.into(),
            value,
            value_type,
            indexed: false,
            indexable: false,
            valid_values: ValidValues::default(),
            invalid_minmsg: None,
            invalid_maxmsg: None,
            invalid_action: None,
            vi_vals: Vec::new(),
            extra: IndexMap::new(),
        }
    }

    pub fn indexable(mut self, indexable: bool) -> Self {
        self.indexable = indexable;
        self
    }

    /// Mark as indexed (which implies indexable).
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self.indexable |= indexed;
        self
    }

    pub fn with_bound(mut self, kind: BoundKind, bound: Bound) -> Self {
        self.valid_values.bounds.push((kind, bound));
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_values.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_action(mut self, action: InvalidAction) -> Self {
        self.invalid_action = Some(action);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vi_vals = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_messages(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.invalid_minmsg = min.map(str::to_string);
        self.invalid_maxmsg = max.map(str::to_string);
        self
    }

    /// Whether values are rows labelled by `vi_vals`.
    pub fn is_vector(&self) -> bool {
        !self.vi_vals.is_empty()
    }

    /// Effective action for out-of-range values; parameter level wins.
    pub fn action(&self) -> InvalidAction {
        self.invalid_action
            .or(self.valid_values.invalid_action)
            .unwrap_or_default()
    }

    /// Extra text appended to a violation message of this kind.
    pub fn violation_message(&self, kind: BoundKind) -> Option<&str> {
        let (own, nested) = match kind {
            BoundKind::Min => (&self.invalid_minmsg, &self.valid_values.invalid_minmsg),
            BoundKind::Max => (&self.invalid_maxmsg, &self.valid_values.invalid_maxmsg),
        };
        own.as_deref()
            .or(nested.as_deref())
            .filter(|msg| !msg.is_empty())
    }

    fn check(&self) -> Result<()> {
        if self.value.is_empty() {
            return Err(invalid(&self.name, "value list is empty"));
        }
        match (&self.value, self.is_vector()) {
            (RawValue::Rows(rows), true) => {
                if let Some(row) = rows.iter().find(|row| row.len() != self.vi_vals.len()) {
                    return Err(invalid(
                        &self.name,
                        format!(
                            "row has {} values but {} column labels are declared",
                            row.len(),
                            self.vi_vals.len()
                        ),
                    ));
                }
            }
            (RawValue::Rows(_), false) => {
                return Err(invalid(&self.name, "vector value without vi_vals labels"))
            }
            (RawValue::Cells(_), true) => {
                return Err(invalid(&self.name, "vi_vals labels on a scalar value"))
            }
            (RawValue::Cells(_), false) => {}
        }
        Series::from_raw(&self.name, &self.value, self.value_type).map_err(|err| match err {
            Error::TypeMismatch { message, .. } => invalid(&self.name, message),
            other => other,
        })?;
        Ok(())
    }
}

fn invalid(name: &str, message: impl Into<String>) -> Error {
    Error::InvalidMetadata {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Every parameter of one family, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    params: IndexMap<String, ParameterMetadata>,
}

impl MetadataTable {
    /// Build a table from parameter descriptions, checking each one.
    pub fn from_params<I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = ParameterMetadata>,
    {
        let params = params
            .into_iter()
            .map(|param| (param.name.clone(), param))
            .collect();
        let table = Self { params };
        table.check()?;
        Ok(table)
    }

    /// Parse a defaults document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: IndexMap<String, ParameterMetadata> = serde_json::from_str(text)?;
        Self::from_params(raw.into_iter().map(|(name, mut param)| {
            param.name = name;
            param
        }))
    }

    /// Read and parse a defaults document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn check(&self) -> Result<()> {
        for param in self.params.values() {
            param.check()?;
            for (kind, bound) in &param.valid_values.bounds {
                if let Bound::Parameter(other) = bound {
                    if !self.params.contains_key(other) {
                        return Err(invalid(
                            &param.name,
                            format!("{kind} bound refers to unknown parameter {other}"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterMetadata> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Current indexing status; `false` for unknown names.
    pub fn is_indexed(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|param| param.indexed)
    }

    pub(crate) fn set_indexed(&mut self, name: &str, indexed: bool) -> Result<()> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        param.indexed = indexed;
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterMetadata> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
