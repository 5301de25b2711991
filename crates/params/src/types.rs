//! Core value types.
//!
//! Parameters are typed by [`ValueType`] and shaped as either a scalar series
//! (one cell per year) or a row series (one fixed-width row per year, with a
//! column label per cell). [`Series`] is the tagged union over both axes and is
//! the only storage the engine keeps; the current-year [`CurrentValue`] is a
//! view derived from it on demand.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declared cell type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Real,
    Boolean,
    Integer,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Real => "real",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// A single cell as it appears in a defaults document or a revision.
///
/// Integers and reals are kept apart so that type checks can stay strict:
/// JSON `5` is an [`Scalar::Integer`], `5.0` is a [`Scalar::Real`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Scalar {
    /// Check a cell against a declared type without coercion.
    ///
    /// Reals accept integers; nothing accepts booleans except booleans.
    pub fn matches(&self, value_type: ValueType) -> bool {
        matches!(
            (self, value_type),
            (Scalar::Real(_) | Scalar::Integer(_), ValueType::Real)
                | (Scalar::Integer(_), ValueType::Integer)
                | (Scalar::Boolean(_), ValueType::Boolean)
                | (Scalar::Text(_), ValueType::String)
        )
    }

    /// Numeric view used for bound comparisons. Booleans compare as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Real(v) => Some(*v),
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Scalar::Text(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(v) => write!(f, "{v}"),
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Real(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Real(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

/// A terse, not yet expanded value list.
///
/// Defaults documents list one entry (or one row) per known year starting at
/// the model start year; revisions carry exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Rows(Vec<Vec<Scalar>>),
    Cells(Vec<Scalar>),
}

impl RawValue {
    /// Number of years specified.
    pub fn len(&self) -> usize {
        match self {
            RawValue::Rows(rows) => rows.len(),
            RawValue::Cells(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_rows(&self) -> bool {
        matches!(self, RawValue::Rows(_))
    }

    /// Keep at most the first `years` entries.
    pub fn truncated(&self, years: usize) -> RawValue {
        match self {
            RawValue::Rows(rows) => RawValue::Rows(rows.iter().take(years).cloned().collect()),
            RawValue::Cells(cells) => RawValue::Cells(cells.iter().take(years).cloned().collect()),
        }
    }
}

/// Typed cell stored inside a [`Series`].
pub trait Cell: Clone + Sized {
    const VALUE_TYPE: ValueType;

    /// Convert an input cell, or `None` if it cannot represent this type.
    fn from_scalar(scalar: &Scalar) -> Option<Self>;

    fn to_scalar(&self) -> Scalar;
}

impl Cell for f64 {
    const VALUE_TYPE: ValueType = ValueType::Real;

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Real(v) => Some(*v),
            Scalar::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::Real(*self)
    }
}

impl Cell for i64 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Integer(v) => Some(*v),
            Scalar::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::Integer(*self)
    }
}

impl Cell for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::Boolean(*self)
    }
}

impl Cell for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Text(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn to_scalar(&self) -> Scalar {
        Scalar::Text(self.clone())
    }
}

/// Per-year values of one parameter.
///
/// String parameters are scalar only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Real(Vec<f64>),
    Integer(Vec<i64>),
    Boolean(Vec<bool>),
    Text(Vec<String>),
    RealRows(Vec<Vec<f64>>),
    IntegerRows(Vec<Vec<i64>>),
    BooleanRows(Vec<Vec<bool>>),
}

/// Apply `$body` to the inner vector of any series variant.
macro_rules! each_series {
    ($series:expr, $v:ident => $body:expr) => {
        match $series {
            Series::Real($v) => $body,
            Series::Integer($v) => $body,
            Series::Boolean($v) => $body,
            Series::Text($v) => $body,
            Series::RealRows($v) => $body,
            Series::IntegerRows($v) => $body,
            Series::BooleanRows($v) => $body,
        }
    };
}

fn convert_cells<T: Cell>(name: &str, cells: &[Scalar]) -> Result<Vec<T>> {
    cells
        .iter()
        .map(|cell| {
            T::from_scalar(cell).ok_or_else(|| {
                Error::type_mismatch(name, format!("value {cell} is not {}", T::VALUE_TYPE))
            })
        })
        .collect()
}

fn convert_rows<T: Cell>(name: &str, rows: &[Vec<Scalar>]) -> Result<Vec<Vec<T>>> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return Err(Error::type_mismatch(name, "rows must not be empty"));
    }
    rows.iter()
        .map(|row| {
            if row.len() != width {
                return Err(Error::type_mismatch(
                    name,
                    format!("row has {} values but the first row has {width}", row.len()),
                ));
            }
            convert_cells(name, row)
        })
        .collect()
}

fn splice_tail<T>(name: &str, dst: &mut Vec<T>, offset: usize, src: Vec<T>) -> Result<()> {
    if offset > dst.len() || src.len() < dst.len() - offset {
        return Err(Error::type_mismatch(
            name,
            format!(
                "replacement of {} years at offset {offset} would shrink a series of {}",
                src.len(),
                dst.len()
            ),
        ));
    }
    dst.truncate(offset);
    dst.extend(src);
    Ok(())
}

fn scalar_row<T: Cell>(row: &[T]) -> Vec<Scalar> {
    row.iter().map(Cell::to_scalar).collect()
}

impl Series {
    /// Build a typed series from a raw value without expanding it.
    ///
    /// Fails with [`Error::TypeMismatch`] on an empty value list, ragged
    /// rows, string rows, or a cell that does not fit `value_type`.
    pub fn from_raw(name: &str, raw: &RawValue, value_type: ValueType) -> Result<Series> {
        if raw.is_empty() {
            return Err(Error::type_mismatch(name, "value list is empty"));
        }
        let series = match (raw, value_type) {
            (RawValue::Cells(c), ValueType::Real) => Series::Real(convert_cells(name, c)?),
            (RawValue::Cells(c), ValueType::Integer) => Series::Integer(convert_cells(name, c)?),
            (RawValue::Cells(c), ValueType::Boolean) => Series::Boolean(convert_cells(name, c)?),
            (RawValue::Cells(c), ValueType::String) => Series::Text(convert_cells(name, c)?),
            (RawValue::Rows(r), ValueType::Real) => Series::RealRows(convert_rows(name, r)?),
            (RawValue::Rows(r), ValueType::Integer) => Series::IntegerRows(convert_rows(name, r)?),
            (RawValue::Rows(r), ValueType::Boolean) => Series::BooleanRows(convert_rows(name, r)?),
            (RawValue::Rows(_), ValueType::String) => {
                return Err(Error::type_mismatch(
                    name,
                    "string parameters must be scalar (not vector)",
                ))
            }
        };
        Ok(series)
    }

    /// Number of years held.
    pub fn len(&self) -> usize {
        each_series!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_rows(&self) -> bool {
        matches!(
            self,
            Series::RealRows(_) | Series::IntegerRows(_) | Series::BooleanRows(_)
        )
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Series::Real(_) | Series::RealRows(_) => ValueType::Real,
            Series::Integer(_) | Series::IntegerRows(_) => ValueType::Integer,
            Series::Boolean(_) | Series::BooleanRows(_) => ValueType::Boolean,
            Series::Text(_) => ValueType::String,
        }
    }

    /// Value held for the year at `idx` (0 = start year).
    pub fn at(&self, idx: usize) -> Option<CurrentValue> {
        let value = match self {
            Series::Real(v) => CurrentValue::Scalar(v.get(idx)?.to_scalar()),
            Series::Integer(v) => CurrentValue::Scalar(v.get(idx)?.to_scalar()),
            Series::Boolean(v) => CurrentValue::Scalar(v.get(idx)?.to_scalar()),
            Series::Text(v) => CurrentValue::Scalar(v.get(idx)?.to_scalar()),
            Series::RealRows(v) => CurrentValue::Row(scalar_row(v.get(idx)?)),
            Series::IntegerRows(v) => CurrentValue::Row(scalar_row(v.get(idx)?)),
            Series::BooleanRows(v) => CurrentValue::Row(scalar_row(v.get(idx)?)),
        };
        Some(value)
    }

    /// The single-year raw value stored at `idx`, used as a new
    /// expansion baseline.
    pub fn raw_at(&self, idx: usize) -> Option<RawValue> {
        match self.at(idx)? {
            CurrentValue::Scalar(cell) => Some(RawValue::Cells(vec![cell])),
            CurrentValue::Row(row) => Some(RawValue::Rows(vec![row])),
        }
    }

    /// Overwrite everything from `offset` onward with `replacement`.
    ///
    /// Both series must share a variant and the result may not be shorter
    /// than before.
    pub fn splice_from(&mut self, name: &str, offset: usize, replacement: Series) -> Result<()> {
        match (self, replacement) {
            (Series::Real(dst), Series::Real(src)) => splice_tail(name, dst, offset, src),
            (Series::Integer(dst), Series::Integer(src)) => splice_tail(name, dst, offset, src),
            (Series::Boolean(dst), Series::Boolean(src)) => splice_tail(name, dst, offset, src),
            (Series::Text(dst), Series::Text(src)) => splice_tail(name, dst, offset, src),
            (Series::RealRows(dst), Series::RealRows(src)) => splice_tail(name, dst, offset, src),
            (Series::IntegerRows(dst), Series::IntegerRows(src)) => {
                splice_tail(name, dst, offset, src)
            }
            (Series::BooleanRows(dst), Series::BooleanRows(src)) => {
                splice_tail(name, dst, offset, src)
            }
            (dst, src) => Err(Error::type_mismatch(
                name,
                format!(
                    "cannot splice a {} {} series into a {} {} series",
                    src.value_type(),
                    shape_name(src.is_rows()),
                    dst.value_type(),
                    shape_name(dst.is_rows()),
                ),
            )),
        }
    }

    /// Numeric grid (years x columns) for bound checks; `None` for strings.
    pub fn numeric_grid(&self) -> Option<Vec<Vec<f64>>> {
        let as_f64 = |s: Scalar| s.as_f64().unwrap_or(f64::NAN);
        match self {
            Series::Text(_) => None,
            Series::Real(v) => Some(v.iter().map(|x| vec![*x]).collect()),
            Series::RealRows(v) => Some(v.clone()),
            _ => Some(
                (0..self.len())
                    .filter_map(|idx| self.at(idx))
                    .map(|value| match value {
                        CurrentValue::Scalar(cell) => vec![as_f64(cell)],
                        CurrentValue::Row(row) => row.into_iter().map(as_f64).collect(),
                    })
                    .collect(),
            ),
        }
    }

    /// Real-valued cells of a scalar real series.
    pub fn as_reals(&self) -> Option<&[f64]> {
        match self {
            Series::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Cells of a string series.
    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            Series::Text(v) => Some(v),
            _ => None,
        }
    }
}

fn shape_name(rows: bool) -> &'static str {
    if rows {
        "vector"
    } else {
        "scalar"
    }
}

/// A parameter's value for the current year: a cell or a row of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CurrentValue {
    Scalar(Scalar),
    Row(Vec<Scalar>),
}

impl CurrentValue {
    pub fn as_real(&self) -> Option<f64> {
        match self {
            CurrentValue::Scalar(Scalar::Real(v)) => Some(*v),
            CurrentValue::Scalar(Scalar::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CurrentValue::Scalar(Scalar::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CurrentValue::Scalar(Scalar::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CurrentValue::Scalar(Scalar::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&[Scalar]> {
        match self {
            CurrentValue::Row(row) => Some(row),
            _ => None,
        }
    }

    /// Row of reals, for vector parameters.
    pub fn as_real_row(&self) -> Option<Vec<f64>> {
        self.as_row()?
            .iter()
            .map(|cell| match cell {
                Scalar::Real(v) => Some(*v),
                Scalar::Integer(v) => Some(*v as f64),
                _ => None,
            })
            .collect()
    }
}
