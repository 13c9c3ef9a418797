use anyhow::Result;
use partiql_exec::query::executor::operators::{
    create_aggregate, create_scan, create_sort, AggregateCall, AggregateFunction, SortSpec,
};
use partiql_exec::query::executor::Expr;
use partiql_exec::Value;
use rust_decimal::Decimal;

#[path = "../common/mod.rs"]
mod common;
use common::{int_bag, ints, row, run, scan_values};

fn sales() -> Vec<Value> {
    vec![
        row(&[("region", Value::from("east")), ("amount", Value::Int64(10)), ("ok", Value::Bool(true))]),
        row(&[("region", Value::from("west")), ("amount", Value::Int64(4)), ("ok", Value::Bool(true))]),
        row(&[("region", Value::from("east")), ("amount", Value::Int64(6)), ("ok", Value::Bool(false))]),
        row(&[("region", Value::from("east")), ("amount", Value::null()), ("ok", Value::Bool(true))]),
        row(&[("region", Value::from("west")), ("ok", Value::Bool(true))]),
    ]
}

fn amount() -> Expr {
    Expr::field(Expr::slot(0), "amount")
}

#[test]
fn test_group_by_with_every_builtin() -> Result<()> {
    let calls = vec![
        AggregateCall::new(AggregateFunction::CountStar, Expr::lit(true), 2),
        AggregateCall::new(AggregateFunction::Count, amount(), 3),
        AggregateCall::new(AggregateFunction::Sum, amount(), 4),
        AggregateCall::new(AggregateFunction::Avg, amount(), 5),
        AggregateCall::new(AggregateFunction::Min, amount(), 6),
        AggregateCall::new(AggregateFunction::Max, amount(), 7),
        AggregateCall::new(AggregateFunction::Every, Expr::field(Expr::slot(0), "ok"), 8),
    ];
    let grouped = create_aggregate(
        scan_values(sales(), 0)?,
        vec![(Expr::field(Expr::slot(0), "region"), 1)],
        calls,
    )?;
    let sorted = create_sort(grouped, vec![SortSpec::asc(Expr::slot(1))])?;
    let result = run(
        sorted,
        Expr::ListCtor((1..=8).map(Expr::slot).collect()),
        &["s", "region", "rows", "n", "sum", "avg", "min", "max", "every_ok"],
    )?;

    assert_eq!(
        result,
        Value::list(vec![
            Value::list(vec![
                Value::from("east"),
                Value::Int64(3),
                Value::Int64(2),
                Value::Int64(16),
                Value::Decimal(Decimal::from(8)),
                Value::Int64(6),
                Value::Int64(10),
                Value::Bool(false),
            ]),
            Value::list(vec![
                Value::from("west"),
                Value::Int64(2),
                Value::Int64(1),
                Value::Int64(4),
                Value::Decimal(Decimal::from(4)),
                Value::Int64(4),
                Value::Int64(4),
                Value::Bool(true),
            ]),
        ])
    );
    Ok(())
}

#[test]
fn test_empty_input_aggregates() -> Result<()> {
    let calls = vec![
        AggregateCall::new(AggregateFunction::Sum, Expr::slot(0), 1),
        AggregateCall::new(AggregateFunction::Avg, Expr::slot(0), 2),
        AggregateCall::new(AggregateFunction::Count, Expr::slot(0), 3),
        AggregateCall::new(AggregateFunction::CountStar, Expr::lit(true), 4),
    ];
    let aggregate = create_aggregate(create_scan(int_bag(&[]), 0, None)?, vec![], calls)?;
    let result = run(
        aggregate,
        Expr::ListCtor((1..=4).map(Expr::slot).collect()),
        &["x", "sum", "avg", "count", "count_star"],
    )?;
    assert_eq!(
        result,
        Value::bag(vec![Value::list(vec![
            Value::null(),
            Value::null(),
            Value::Int64(0),
            Value::Int64(0),
        ])])
    );
    Ok(())
}

#[test]
fn test_distinct_aggregates() -> Result<()> {
    let calls = vec![
        AggregateCall::new(AggregateFunction::Sum, Expr::slot(0), 1).distinct(),
        AggregateCall::new(AggregateFunction::Count, Expr::slot(0), 2).distinct(),
        AggregateCall::new(AggregateFunction::Sum, Expr::slot(0), 3),
    ];
    let aggregate = create_aggregate(create_scan(int_bag(&[2, 2, 2, 5]), 0, None)?, vec![], calls)?;
    let result = run(
        aggregate,
        Expr::ListCtor((1..=3).map(Expr::slot).collect()),
        &["x", "sum_distinct", "count_distinct", "sum"],
    )?;
    assert_eq!(result, Value::bag(vec![Value::list(ints(&[7, 2, 11]))]));
    Ok(())
}

#[test]
fn test_group_as_collects_rows() -> Result<()> {
    let grouped = create_aggregate(
        create_scan(int_bag(&[1, 2, 3, 4, 5]), 0, None)?,
        vec![(
            Expr::binary(
                partiql_exec::query::executor::expression::BinaryOp::Mod,
                Expr::slot(0),
                Expr::lit(2i64),
            ),
            1,
        )],
        vec![AggregateCall::new(AggregateFunction::GroupAs, Expr::slot(0), 2)],
    )?;
    let sorted = create_sort(grouped, vec![SortSpec::asc(Expr::slot(1))])?;
    let result = run(sorted, Expr::slot(2), &["n", "parity", "members"])?;
    assert_eq!(
        result,
        Value::list(vec![Value::bag(ints(&[2, 4])), Value::bag(ints(&[1, 3, 5]))])
    );
    Ok(())
}

#[test]
fn test_mixed_numeric_sum_widens() -> Result<()> {
    let values = vec![Value::Int64(1), Value::Double(0.5), Value::Int32(2)];
    let aggregate = create_aggregate(
        scan_values(values, 0)?,
        vec![],
        vec![AggregateCall::new(AggregateFunction::Sum, Expr::slot(0), 1)],
    )?;
    let result = run(aggregate, Expr::slot(1), &["x", "sum"])?;
    assert_eq!(result, Value::bag(vec![Value::Double(3.5)]));
    Ok(())
}
