//! Revision validation.
//!
//! Two independent passes:
//!
//! - [`validate_structure`] runs on the inverted revision before anything is
//!   mutated. It checks names, `-indexed` switches, scalar/vector shape and
//!   strict cell types. Any error aborts the revision.
//! - [`validate_values`] runs on the installed series after the replay. It
//!   checks string options and numeric bounds; each violation becomes a
//!   warning or an error according to the parameter's `invalid_action`.
//!
//! Both passes accumulate into [`Diagnostics`] so one report covers the whole
//! revision.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::metadata::{Bound, BoundKind, InvalidAction, MetadataTable, ParameterMetadata};
use crate::revision::{RevisionKey, RevisionValue, YearBatch};
use crate::storage::{ModelClock, SeriesStore};
use crate::types::{Scalar, ValueType};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Name not in the metadata table (possibly a removed parameter).
    UnknownParameter,
    /// `-indexed` switch on a parameter that cannot be indexed.
    NotIndexable,
    /// Wrong scalar/vector shape or cell type.
    TypeMismatch,
    /// Numeric value outside a declared bound.
    RangeViolation,
    /// String value outside the permitted options.
    InvalidOption,
    /// Revised parameter whose meaning changed; informational.
    Redefined,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Year the finding applies to, when it applies to one.
    pub year: Option<i32>,
    /// Parameter name, with a `[label]` suffix for vector cells.
    pub name: String,
    pub text: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.severity) {
            (IssueKind::Redefined, _) => f.write_str(&self.text),
            (_, Severity::Warning) => write!(f, "WARNING: {}", self.text),
            (_, Severity::Error) => write!(f, "ERROR: {}", self.text),
        }
    }
}

/// Accumulated warnings and errors of the latest revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => self.warnings.push(diagnostic),
            Severity::Error => self.errors.push(diagnostic),
        }
    }

    pub fn clear(&mut self) {
        self.warnings.clear();
        self.errors.clear();
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Warnings rendered one per line.
    pub fn warning_text(&self) -> String {
        render(&self.warnings)
    }

    /// Errors rendered one per line.
    pub fn error_text(&self) -> String {
        render(&self.errors)
    }

    fn error(&mut self, kind: IssueKind, year: Option<i32>, name: String, text: String) {
        self.push(Diagnostic {
            severity: Severity::Error,
            kind,
            year,
            name,
            text,
        });
    }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("{d}\n")).collect()
}

fn unknown_text(name: &str, removed: &IndexMap<String, String>) -> String {
    removed
        .get(name)
        .cloned()
        .unwrap_or_else(|| "is an unknown parameter name".to_string())
}

fn cell_label(param: &ParameterMetadata, idx: usize) -> String {
    match param.vi_vals.get(idx) {
        Some(label) => format!("{}[{label}]", param.name),
        None => format!("{}[{idx}]", param.name),
    }
}

fn type_complaint(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Real => "is not a number",
        ValueType::Boolean => "is not boolean",
        ValueType::Integer => "is not integer",
        ValueType::String => "is not a string",
    }
}

/// Check names, shapes and cell types of an inverted revision.
///
/// `removed` maps retired parameter names to the explanation reported in
/// place of "is an unknown parameter name".
pub fn validate_structure(
    batches: &BTreeMap<i32, YearBatch>,
    table: &MetadataTable,
    removed: &IndexMap<String, String>,
    diagnostics: &mut Diagnostics,
) {
    for (&year, batch) in batches {
        for (key, value) in batch {
            match key {
                RevisionKey::Indexed(base) => {
                    check_indexed_switch(year, key, base, value, table, removed, diagnostics)
                }
                RevisionKey::Value(name) => match table.get(name) {
                    None => diagnostics.error(
                        IssueKind::UnknownParameter,
                        Some(year),
                        name.clone(),
                        format!("{year} {name} {}", unknown_text(name, removed)),
                    ),
                    Some(param) => check_value(year, param, value, diagnostics),
                },
            }
        }
    }
}

fn check_indexed_switch(
    year: i32,
    key: &RevisionKey,
    base: &str,
    value: &RevisionValue,
    table: &MetadataTable,
    removed: &IndexMap<String, String>,
    diagnostics: &mut Diagnostics,
) {
    if !matches!(value, RevisionValue::Scalar(Scalar::Boolean(_))) {
        diagnostics.error(
            IssueKind::TypeMismatch,
            Some(year),
            key.to_string(),
            format!("{year} {key} parameter is not true or false"),
        );
        return;
    }
    match table.get(base) {
        None => diagnostics.error(
            IssueKind::UnknownParameter,
            Some(year),
            key.to_string(),
            format!("{year} {key} {}", unknown_text(base, removed)),
        ),
        Some(param) if !param.indexable => diagnostics.error(
            IssueKind::NotIndexable,
            Some(year),
            base.to_string(),
            format!("{year} {base} parameter is not indexable"),
        ),
        Some(_) => {}
    }
}

fn check_value(
    year: i32,
    param: &ParameterMetadata,
    value: &RevisionValue,
    diagnostics: &mut Diagnostics,
) {
    let name = &param.name;
    let (cells, labelled): (&[Scalar], bool) = match value {
        RevisionValue::Vector(row) if !param.is_vector() => {
            diagnostics.error(
                IssueKind::TypeMismatch,
                Some(year),
                name.clone(),
                format!("{year} {name} with value {value} should be a scalar parameter"),
            );
            (row.as_slice(), false)
        }
        RevisionValue::Vector(row) => {
            if row.len() != param.vi_vals.len() {
                diagnostics.error(
                    IssueKind::TypeMismatch,
                    Some(year),
                    name.clone(),
                    format!(
                        "{year} {name} with value {value} has {} values but {} are expected",
                        row.len(),
                        param.vi_vals.len()
                    ),
                );
            }
            (row.as_slice(), true)
        }
        RevisionValue::Scalar(cell) => {
            if param.is_vector() {
                diagnostics.error(
                    IssueKind::TypeMismatch,
                    Some(year),
                    name.clone(),
                    format!("{year} {name} with value {value} should be a vector parameter"),
                );
            }
            (std::slice::from_ref(cell), false)
        }
    };

    for (idx, cell) in cells.iter().enumerate() {
        if cell.matches(param.value_type) {
            continue;
        }
        let cell_name = if labelled {
            cell_label(param, idx)
        } else {
            name.clone()
        };
        let text = format!(
            "{year} {cell_name} value {cell} {}",
            type_complaint(param.value_type)
        );
        diagnostics.error(IssueKind::TypeMismatch, Some(year), cell_name, text);
    }
}

/// Check installed values of every parameter in `names` against its options
/// and bounds.
///
/// `redefined` maps parameters whose meaning changed to a message emitted as
/// a warning whenever they are revised. Fails only when the metadata itself
/// is inconsistent (a bound compared against a differently shaped series).
pub fn validate_values(
    names: &BTreeSet<String>,
    table: &MetadataTable,
    store: &SeriesStore,
    clock: &ModelClock,
    redefined: &IndexMap<String, String>,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    for name in names {
        if let Some(message) = redefined.get(name) {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                kind: IssueKind::Redefined,
                year: None,
                name: name.clone(),
                text: message.clone(),
            });
        }
        let (Some(param), Some(series)) = (table.get(name), store.get(name)) else {
            continue;
        };
        if let Some(texts) = series.as_texts() {
            check_options(param, texts, clock, diagnostics);
        } else {
            check_bounds(param, table, store, clock, diagnostics)?;
        }
    }
    Ok(())
}

fn check_options(
    param: &ParameterMetadata,
    texts: &[String],
    clock: &ModelClock,
    diagnostics: &mut Diagnostics,
) {
    let Some(options) = &param.valid_values.options else {
        return;
    };
    for (idx, text) in texts.iter().enumerate() {
        if options.contains(text) {
            continue;
        }
        let year = clock.start_year() + idx as i32;
        diagnostics.error(
            IssueKind::InvalidOption,
            Some(year),
            param.name.clone(),
            format!("{year} {} value '{text}' not in {options:?}", param.name),
        );
    }
}

fn bound_grid(
    param: &ParameterMetadata,
    bound: &Bound,
    shape: &[Vec<f64>],
    store: &SeriesStore,
) -> Result<Vec<Vec<f64>>> {
    let grid = match bound {
        Bound::Literal(limit) => shape.iter().map(|row| vec![*limit; row.len()]).collect(),
        Bound::Parameter(other) => store
            .get(other)
            .and_then(|series| series.numeric_grid())
            .ok_or_else(|| {
                Error::type_mismatch(&param.name, format!("bound parameter {other} is not numeric"))
            })?,
    };
    let same_shape = grid.len() == shape.len()
        && grid.iter().zip(shape).all(|(a, b)| a.len() == b.len());
    if !same_shape {
        return Err(Error::type_mismatch(
            &param.name,
            "bound does not have the same shape as the parameter",
        ));
    }
    Ok(grid)
}

fn check_bounds(
    param: &ParameterMetadata,
    table: &MetadataTable,
    store: &SeriesStore,
    clock: &ModelClock,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let Some(values) = store.get(&param.name).and_then(|s| s.numeric_grid()) else {
        return Ok(());
    };
    let vector = param.is_vector();
    for (kind, bound) in &param.valid_values.bounds {
        if let Bound::Parameter(other) = bound {
            if !table.contains(other) {
                return Err(Error::UnknownParameter(other.clone()));
            }
        }
        let limits = bound_grid(param, bound, &values, store)?;
        let extra = param.violation_message(*kind);
        for (row_idx, (row, limit_row)) in values.iter().zip(&limits).enumerate() {
            for (col, (&value, &limit)) in row.iter().zip(limit_row).enumerate() {
                let (violated, op) = match kind {
                    BoundKind::Min => (value < limit, "<"),
                    BoundKind::Max => (value > limit, ">"),
                };
                if !violated {
                    continue;
                }
                let year = clock.start_year() + row_idx as i32;
                let cell_name = if vector {
                    cell_label(param, col)
                } else {
                    param.name.clone()
                };
                let mut text = format!("{year} {cell_name} value {value} {op} {kind} value {limit}");
                if let Some(extra) = extra {
                    text.push(' ');
                    text.push_str(extra);
                    if let (true, Some(label)) = (vector, param.vi_vals.get(col)) {
                        text.push_str(&format!("[{label}]"));
                    }
                }
                let severity = match param.action() {
                    InvalidAction::Warn => Severity::Warning,
                    InvalidAction::Stop => Severity::Error,
                };
                diagnostics.push(Diagnostic {
                    severity,
                    kind: IssueKind::RangeViolation,
                    year: Some(year),
                    name: cell_name,
                    text,
                });
            }
        }
    }
    Ok(())
}
