use std::cmp::Ordering;
use std::str::FromStr;

use anyhow::Result;
use chrono::{FixedOffset, NaiveDate, TimeZone};
use partiql_exec::query::executor::operators::{create_scan, create_sort, NullOrder, SortSpec};
use partiql_exec::query::executor::Expr;
use partiql_exec::value::{compare, equals};
use partiql_exec::Value;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

#[path = "../common/mod.rs"]
mod common;
use common::{row, run};

fn scalar_pool() -> Vec<Value> {
    let date = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
    let noon = date.and_hms_opt(12, 0, 0).unwrap();
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    vec![
        Value::Missing,
        Value::null(),
        Value::Bool(false),
        Value::Bool(true),
        Value::Int8(-3),
        Value::Int32(0),
        Value::Int64(2),
        Value::Int(1_000_000_000_000),
        Value::Decimal(Decimal::from_str("2.0").unwrap()),
        Value::Decimal(Decimal::from_str("-0.5").unwrap()),
        Value::Decimal(Decimal::from_str("0.0000000000000000000000000001").unwrap()),
        Value::Decimal(Decimal::from_str("0.1").unwrap()),
        Value::Decimal(Decimal::ZERO),
        Value::Double(1e-30),
        Value::Double(-5e-324),
        Value::Double(0.1),
        Value::Double(2.5),
        Value::Double(f64::NAN),
        Value::Double(f64::NEG_INFINITY),
        Value::Real(0.0),
        Value::Date(date),
        Value::Timestamp(noon),
        Value::TimestampTz(plus_two.from_local_datetime(&noon).unwrap()),
        Value::from(""),
        Value::from("apple"),
        Value::symbol("apple"),
        Value::from("Zebra"),
        Value::Blob(vec![0xde, 0xad]),
    ]
}

fn children(rng: &mut StdRng, pool: &[Value], depth: u32) -> Vec<Value> {
    let n = rng.gen_range(0..3);
    (0..n).map(|_| random_value(rng, pool, depth - 1)).collect()
}

fn random_value(rng: &mut StdRng, pool: &[Value], depth: u32) -> Value {
    let choice = if depth == 0 { 0 } else { rng.gen_range(0..8) };
    match choice {
        4 => Value::list(children(rng, pool, depth)),
        5 => Value::bag(children(rng, pool, depth)),
        6 => Value::sexp(children(rng, pool, depth)),
        7 => {
            let keys = ["a", "b", "A"];
            let fields: Vec<(String, Value)> = children(rng, pool, depth)
                .into_iter()
                .map(|v| (keys[rng.gen_range(0..keys.len())].to_string(), v))
                .collect();
            Value::Struct(fields)
        }
        _ => pool.choose(rng).cloned().unwrap_or(Value::Missing),
    }
}

fn sample(seed: u64, count: usize) -> Vec<Value> {
    let pool = scalar_pool();
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| random_value(&mut rng, &pool, 2)).collect()
}

#[test]
fn test_total_order_is_antisymmetric_and_total() -> Result<()> {
    let values = sample(7, 120);
    for a in &values {
        assert_eq!(compare(a, a), Ordering::Equal, "{} is not equal to itself", a);
        for b in &values {
            assert_eq!(compare(a, b), compare(b, a).reverse(), "{} vs {}", a, b);
            assert_eq!(equals(a, b), compare(a, b) == Ordering::Equal);
        }
    }
    Ok(())
}

#[test]
fn test_total_order_is_transitive() -> Result<()> {
    let values = sample(11, 45);
    for a in &values {
        for b in &values {
            for c in &values {
                if compare(a, b) != Ordering::Greater && compare(b, c) != Ordering::Greater {
                    assert_ne!(compare(a, c), Ordering::Greater, "{} <= {} <= {}", a, b, c);
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_sorting_agrees_with_pairwise_order() -> Result<()> {
    let mut values = sample(23, 200);
    values.sort();
    for pair in values.windows(2) {
        assert_ne!(compare(&pair[0], &pair[1]), Ordering::Greater);
    }
    Ok(())
}

#[test]
fn test_numeric_representations_compare_by_value() -> Result<()> {
    let two = [
        Value::Int8(2),
        Value::Int64(2),
        Value::Int(2),
        Value::Decimal(Decimal::from_str("2.000")?),
        Value::Real(2.0),
        Value::Double(2.0),
    ];
    for a in &two {
        for b in &two {
            assert!(equals(a, b), "{} != {}", a, b);
        }
    }
    // 2^53 + 1 is not representable as a double
    let big = Value::Int64(9_007_199_254_740_993);
    assert_eq!(compare(&big, &Value::Double(9_007_199_254_740_992.0)), Ordering::Greater);

    // Below the finest decimal scale, but still above zero
    let tiny = Value::Double(1e-30);
    assert_eq!(compare(&Value::Decimal(Decimal::ZERO), &tiny), Ordering::Less);
    assert_eq!(compare(&Value::Int32(0), &tiny), Ordering::Less);
    Ok(())
}

#[test]
fn test_order_by_mixed_types_and_null_placement() -> Result<()> {
    let rows = vec![
        row(&[("v", Value::from("text"))]),
        row(&[("v", Value::Int64(3))]),
        row(&[("v", Value::null())]),
        row(&[]),
        row(&[("v", Value::Bool(true))]),
        row(&[("v", Value::Double(1.5))]),
    ];
    let field = || Expr::field(Expr::slot(0), "v");

    let ascending = create_sort(
        create_scan(Expr::lit(Value::bag(rows.clone())), 0, None)?,
        vec![SortSpec::asc(field())],
    )?;
    assert_eq!(
        run(ascending, field(), &["r"])?,
        Value::list(vec![
            Value::Missing,
            Value::null(),
            Value::Bool(true),
            Value::Double(1.5),
            Value::Int64(3),
            Value::from("text"),
        ])
    );

    let nulls_last = create_sort(
        create_scan(Expr::lit(Value::bag(rows)), 0, None)?,
        vec![SortSpec::asc(field()).nulls(NullOrder::Last)],
    )?;
    let result = run(nulls_last, field(), &["r"])?;
    let sorted = result.elements().unwrap_or_default();
    assert_eq!(sorted.first(), Some(&Value::Bool(true)));
    assert!(sorted[4].is_missing());
    assert!(sorted[5].is_null());
    Ok(())
}
