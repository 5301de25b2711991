//! Array expansion.
//!
//! Stretches a short year-0 value list into a full per-year series. Each
//! missing year is derived from the year before it, either by repeating it or
//! by growing it with the rate at the preceding position:
//!
//! ```text
//! value[t] = round2(value[t - 1] * (1 + rates[t - 1]))
//! ```
//!
//! Every step rounds independently, so a compounded series is not the same as
//! `round2(last * (1 + r)^k)`. Rates are positional: callers slice the rate
//! series so that position 0 lines up with the first year of the output.

use crate::error::{Error, Result};
use crate::types::{Cell, RawValue, Series, ValueType};

/// Inflated values at or above this ceiling are pinned to it.
pub const VALUE_CEILING: f64 = 9e99;

/// Round to two decimal places, pinning overflow-sized values to the ceiling.
pub fn round_money(value: f64) -> f64 {
    if value < VALUE_CEILING {
        round_to(value, 2)
    } else {
        VALUE_CEILING
    }
}

/// Round to six decimal places, the precision kept for growth rates.
pub fn round_rate(value: f64) -> f64 {
    round_to(value, 6)
}

/// Round the exact binary value to `places` decimals, ties to even.
///
/// Fixed-precision formatting works on the exact value of the double, so
/// `50.024999...` stays below the tie where `(v * 100.0).round()` would not.
fn round_to(value: f64, places: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.places$}").parse().unwrap_or(value)
}

/// Cells that can be carried forward into a new year.
///
/// Growth compounds through a `Carry` value so that integer cells keep the
/// rounded fractional amount between years and truncate only when stored.
pub trait Extrapolate: Cell {
    type Carry: Clone;

    fn carry(&self) -> Self::Carry;

    /// Carry for the next year when growing at `rate`.
    fn compound(carry: &Self::Carry, rate: f64) -> Self::Carry;

    fn settle(carry: &Self::Carry) -> Self;

    /// Value for the next year when growing at `rate`.
    fn grow(&self, rate: f64) -> Self {
        Self::settle(&Self::compound(&self.carry(), rate))
    }
}

impl Extrapolate for f64 {
    type Carry = f64;

    fn carry(&self) -> f64 {
        *self
    }

    fn compound(carry: &f64, rate: f64) -> f64 {
        round_money(carry * (1.0 + rate))
    }

    fn settle(carry: &f64) -> Self {
        *carry
    }
}

impl Extrapolate for i64 {
    type Carry = f64;

    fn carry(&self) -> f64 {
        *self as f64
    }

    fn compound(carry: &f64, rate: f64) -> f64 {
        round_money(carry * (1.0 + rate))
    }

    fn settle(carry: &f64) -> Self {
        *carry as i64
    }
}

impl Extrapolate for bool {
    type Carry = bool;

    fn carry(&self) -> bool {
        *self
    }

    fn compound(carry: &bool, _rate: f64) -> bool {
        *carry
    }

    fn settle(carry: &bool) -> Self {
        *carry
    }
}

impl Extrapolate for String {
    type Carry = String;

    fn carry(&self) -> String {
        self.clone()
    }

    fn compound(carry: &String, _rate: f64) -> String {
        carry.clone()
    }

    fn settle(carry: &String) -> Self {
        carry.clone()
    }
}

fn growth_rates(inflate: bool, rates: Option<&[f64]>, needed: usize) -> Result<Option<&[f64]>> {
    if !inflate || needed == 0 {
        return Ok(None);
    }
    let rates = rates.unwrap_or(&[]);
    if rates.len() < needed {
        return Err(Error::InsufficientRates {
            needed,
            available: rates.len(),
        });
    }
    Ok(Some(rates))
}

/// Expand a scalar series to `num_years` entries.
///
/// Inputs already at least `num_years` long are returned unchanged.
pub fn expand_1d<T: Extrapolate>(
    values: &[T],
    inflate: bool,
    rates: Option<&[f64]>,
    num_years: usize,
) -> Result<Vec<T>> {
    if values.len() >= num_years {
        return Ok(values.to_vec());
    }
    let Some(last) = values.last() else {
        return Err(Error::type_mismatch("expansion input", "value list is empty"));
    };
    let rates = growth_rates(inflate, rates, num_years - 1)?;

    let mut out = Vec::with_capacity(num_years);
    out.extend_from_slice(values);
    let mut carry = last.carry();
    for t in values.len()..num_years {
        if let Some(rates) = rates {
            carry = T::compound(&carry, rates[t - 1]);
        }
        out.push(T::settle(&carry));
    }
    Ok(out)
}

/// Expand a row series to `num_years` rows, column by column.
///
/// Each row grows from the stored row before it, so integer columns
/// compound from their truncated values.
pub fn expand_2d<T: Extrapolate>(
    rows: &[Vec<T>],
    inflate: bool,
    rates: Option<&[f64]>,
    num_years: usize,
) -> Result<Vec<Vec<T>>> {
    if rows.len() >= num_years {
        return Ok(rows.to_vec());
    }
    let Some(last) = rows.last() else {
        return Err(Error::type_mismatch("expansion input", "row list is empty"));
    };
    let width = last.len();
    if rows.iter().any(|row| row.len() != width) {
        return Err(Error::type_mismatch("expansion input", "rows differ in width"));
    }
    let rates = growth_rates(inflate, rates, num_years - 1)?;

    let mut out = Vec::with_capacity(num_years);
    out.extend_from_slice(rows);
    for t in rows.len()..num_years {
        let prev = &out[t - 1];
        let next: Vec<T> = match rates {
            Some(rates) => prev.iter().map(|cell| cell.grow(rates[t - 1])).collect(),
            None => prev.clone(),
        };
        out.push(next);
    }
    Ok(out)
}

impl Series {
    /// Expand this series to `num_years` entries.
    ///
    /// String series are never inflated.
    pub fn expand(&self, inflate: bool, rates: Option<&[f64]>, num_years: usize) -> Result<Series> {
        let series = match self {
            Series::Real(v) => Series::Real(expand_1d(v, inflate, rates, num_years)?),
            Series::Integer(v) => Series::Integer(expand_1d(v, inflate, rates, num_years)?),
            Series::Boolean(v) => Series::Boolean(expand_1d(v, inflate, rates, num_years)?),
            Series::Text(v) => Series::Text(expand_1d(v, false, None, num_years)?),
            Series::RealRows(v) => Series::RealRows(expand_2d(v, inflate, rates, num_years)?),
            Series::IntegerRows(v) => Series::IntegerRows(expand_2d(v, inflate, rates, num_years)?),
            Series::BooleanRows(v) => Series::BooleanRows(expand_2d(v, inflate, rates, num_years)?),
        };
        Ok(series)
    }
}

/// Convert a raw value to a typed series and expand it.
pub fn expand_array(
    name: &str,
    raw: &RawValue,
    value_type: ValueType,
    inflate: bool,
    rates: Option<&[f64]>,
    num_years: usize,
) -> Result<Series> {
    Series::from_raw(name, raw, value_type)?.expand(inflate, rates, num_years)
}
