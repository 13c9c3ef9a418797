// Total Order
//
// A single total order over every value. Used by ORDER BY, MIN/MAX, DISTINCT,
// grouping and the set operators, and exposed through the `Ord`/`Eq` impls on
// `Value`.
//
// Categories, lowest first:
//   missing, null, bool, numbers, date, time, timestamp, text, lob,
//   list, sexp, struct, bag
//
// Within a category values compare by content: numbers by numeric value across
// representations (NaN below every other number, -0.0 equal to 0.0), text by
// code point, lobs bytewise, temporal values chronologically after normalizing
// to UTC, lists and s-expressions element by element, structs and bags after
// sorting their fields/elements.

use std::cmp::Ordering;

use chrono::{FixedOffset, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;

use super::Value;

fn category(value: &Value) -> u8 {
    match value {
        Value::Missing => 0,
        Value::Null(_) => 1,
        Value::Bool(_) => 2,
        Value::Int8(_)
        | Value::Int16(_)
        | Value::Int32(_)
        | Value::Int64(_)
        | Value::Int(_)
        | Value::Decimal(_)
        | Value::Real(_)
        | Value::Double(_) => 3,
        Value::Date(_) => 4,
        Value::Time(_) | Value::TimeTz(..) => 5,
        Value::Timestamp(_) | Value::TimestampTz(_) => 6,
        Value::Char(_) | Value::VarChar(_) | Value::String(_) | Value::Symbol(_) => 7,
        Value::Blob(_) | Value::Clob(_) => 8,
        Value::List(_) => 9,
        Value::Sexp(_) => 10,
        Value::Struct(_) => 11,
        Value::Bag(_) => 12,
    }
}

/// Numeric content lifted out of its representation
#[derive(Debug, Clone, Copy)]
pub(crate) enum Numeric {
    Exact(i128),
    Decimal(Decimal),
    Approx(f64),
}

impl Numeric {
    pub(crate) fn of(value: &Value) -> Option<Numeric> {
        match value {
            Value::Decimal(d) => Some(Numeric::Decimal(*d)),
            Value::Real(r) => Some(Numeric::Approx(f64::from(*r))),
            Value::Double(d) => Some(Numeric::Approx(*d)),
            other => other.as_i128().map(Numeric::Exact),
        }
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        // -0.0 and 0.0 compare equal here
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact integer against a double without rounding the integer.
fn compare_exact_approx(i: i128, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Greater;
    }
    if f.is_infinite() {
        return if f > 0.0 { Ordering::Less } else { Ordering::Greater };
    }
    let truncated = f.trunc();
    // 2^127
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    if truncated >= LIMIT {
        return Ordering::Less;
    }
    if truncated < -LIMIT {
        return Ordering::Greater;
    }
    match i.cmp(&(truncated as i128)) {
        Ordering::Equal => {
            let fraction = f - truncated;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    }
}

fn compare_exact_decimal(i: i128, d: &Decimal) -> Ordering {
    match Decimal::try_from_i128_with_scale(i, 0) {
        Ok(exact) => exact.cmp(d),
        // Outside the decimal range, so larger in magnitude than any decimal
        Err(_) => {
            if i > 0 {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
    }
}

/// `a * 2^shift` against `b`, without overflowing.
fn compare_shifted(a: u128, shift: u32, b: u128) -> Ordering {
    if a != 0 && shift > a.leading_zeros() {
        Ordering::Greater
    } else {
        (a << shift).cmp(&b)
    }
}

/// `numerator / 10^scale` against a double, both strictly between 0 and 1.
fn compare_fraction_magnitudes(numerator: u128, scale: u32, f: f64) -> Ordering {
    let bits = f.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as u32;
    let significand = bits & ((1u64 << 52) - 1);
    // f == k / 2^p
    let (k, p) = if exponent == 0 {
        (significand, 1074)
    } else {
        (significand | (1u64 << 52), 1075 - exponent)
    };
    // Compare numerator * 2^p with k * 10^scale = (k * 5^scale) * 2^scale
    let k = u128::from(k) * 5u128.pow(scale);
    if p >= scale {
        compare_shifted(numerator, p - scale, k)
    } else {
        compare_shifted(k, scale - p, numerator).reverse()
    }
}

/// Signed fractional parts: `numerator / 10^scale` against `f`, both in (-1, 1).
fn compare_fractions(numerator: i128, scale: u32, f: f64) -> Ordering {
    let f_sign: i128 = if f > 0.0 {
        1
    } else if f < 0.0 {
        -1
    } else {
        0
    };
    let d_sign = numerator.signum();
    if d_sign != f_sign || d_sign == 0 {
        return d_sign.cmp(&f_sign);
    }
    let magnitude = compare_fraction_magnitudes(numerator.unsigned_abs(), scale, f.abs());
    if d_sign > 0 { magnitude } else { magnitude.reverse() }
}

/// Decimal against a double, exactly: whole parts first, then fractions.
fn compare_decimal_approx(d: &Decimal, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Greater;
    }
    if f.is_infinite() {
        return if f > 0.0 { Ordering::Less } else { Ordering::Greater };
    }
    let scale = d.scale();
    let unit = 10i128.pow(scale);
    let (whole, fraction) = (d.mantissa() / unit, d.mantissa() % unit);
    let truncated = f.trunc();
    match compare_exact_approx(whole, truncated) {
        Ordering::Equal => compare_fractions(fraction, scale, f - truncated),
        other => other,
    }
}

pub(crate) fn compare_numeric(a: Numeric, b: Numeric) -> Ordering {
    match (a, b) {
        (Numeric::Exact(x), Numeric::Exact(y)) => x.cmp(&y),
        (Numeric::Decimal(x), Numeric::Decimal(y)) => x.cmp(&y),
        (Numeric::Approx(x), Numeric::Approx(y)) => compare_f64(x, y),
        (Numeric::Exact(x), Numeric::Decimal(y)) => compare_exact_decimal(x, &y),
        (Numeric::Decimal(x), Numeric::Exact(y)) => compare_exact_decimal(y, &x).reverse(),
        (Numeric::Exact(x), Numeric::Approx(y)) => compare_exact_approx(x, y),
        (Numeric::Approx(x), Numeric::Exact(y)) => compare_exact_approx(y, x).reverse(),
        (Numeric::Decimal(x), Numeric::Approx(y)) => compare_decimal_approx(&x, y),
        (Numeric::Approx(x), Numeric::Decimal(y)) => compare_decimal_approx(&y, x).reverse(),
    }
}

fn time_in_utc(time: &NaiveTime, offset: Option<&FixedOffset>) -> NaiveTime {
    match offset {
        Some(offset) => {
            let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
            time.overflowing_sub_signed(shift).0
        }
        None => *time,
    }
}

fn timestamp_in_utc(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::TimestampTz(ts) => Some(ts.naive_utc()),
        _ => None,
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match compare(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

fn sorted_fields(fields: &[(String, Value)]) -> Vec<&(String, Value)> {
    let mut sorted: Vec<&(String, Value)> = fields.iter().collect();
    sorted.sort_by(|(ka, va), (kb, vb)| ka.cmp(kb).then_with(|| compare(va, vb)));
    sorted
}

fn compare_structs(a: &[(String, Value)], b: &[(String, Value)]) -> Ordering {
    let a = sorted_fields(a);
    let b = sorted_fields(b);
    for ((ka, va), (kb, vb)) in a.iter().map(|f| (&f.0, &f.1)).zip(b.iter().map(|f| (&f.0, &f.1))) {
        let ord = ka.cmp(kb).then_with(|| compare(va, vb));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_bags(a: &[Value], b: &[Value]) -> Ordering {
    let mut a: Vec<&Value> = a.iter().collect();
    let mut b: Vec<&Value> = b.iter().collect();
    a.sort_by(|x, y| compare(x, y));
    b.sort_by(|x, y| compare(x, y));
    for (x, y) in a.iter().zip(b.iter()) {
        match compare(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Compare two values under the engine-wide total order.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let (ca, cb) = (category(a), category(b));
    if ca != cb {
        return ca.cmp(&cb);
    }

    match (a, b) {
        (Value::Missing, Value::Missing) | (Value::Null(_), Value::Null(_)) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::Time(x), Value::TimeTz(y, oy)) => x.cmp(&time_in_utc(y, Some(oy))),
        (Value::TimeTz(x, ox), Value::Time(y)) => time_in_utc(x, Some(ox)).cmp(y),
        (Value::TimeTz(x, ox), Value::TimeTz(y, oy)) => {
            time_in_utc(x, Some(ox)).cmp(&time_in_utc(y, Some(oy)))
        }
        (Value::Blob(x) | Value::Clob(x), Value::Blob(y) | Value::Clob(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) | (Value::Sexp(x), Value::Sexp(y)) => compare_sequences(x, y),
        (Value::Struct(x), Value::Struct(y)) => compare_structs(x, y),
        (Value::Bag(x), Value::Bag(y)) => compare_bags(x, y),
        _ => {
            if let (Some(x), Some(y)) = (Numeric::of(a), Numeric::of(b)) {
                return compare_numeric(x, y);
            }
            if let (Some(x), Some(y)) = (a.as_text(), b.as_text()) {
                // UTF-8 byte order is code point order
                return x.cmp(y);
            }
            if let (Some(x), Some(y)) = (timestamp_in_utc(a), timestamp_in_utc(b)) {
                return x.cmp(&y);
            }
            // Every pair sharing a category is matched above
            Ordering::Equal
        }
    }
}

/// Same category and same content; the equality of the total order.
pub fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other)
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}
