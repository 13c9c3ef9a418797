use anyhow::Result;
use partiql_exec::query::executor::operators::window::{Navigation, Rank, RowNumber};
use partiql_exec::query::executor::operators::{create_window, SortSpec, WindowCall};
use partiql_exec::query::executor::Expr;
use partiql_exec::{ErrorKind, ExecutionEngine, QueryPlan, Statement, Value};

#[path = "../common/mod.rs"]
mod common;
use common::{bindings, ints, row, run, scan_values};

fn scores() -> Vec<Value> {
    vec![
        row(&[("team", Value::from("red")), ("score", Value::Int64(7))]),
        row(&[("team", Value::from("blue")), ("score", Value::Int64(3))]),
        row(&[("team", Value::from("red")), ("score", Value::Int64(9))]),
        row(&[("team", Value::from("red")), ("score", Value::Int64(7))]),
        row(&[("team", Value::from("blue")), ("score", Value::Int64(5))]),
    ]
}

fn score() -> Expr {
    Expr::field(Expr::slot(0), "score")
}

fn team() -> Expr {
    Expr::field(Expr::slot(0), "team")
}

#[test]
fn test_ranking_functions_per_partition() -> Result<()> {
    let window = create_window(
        scan_values(scores(), 0)?,
        vec![team()],
        vec![SortSpec::desc(score())],
        vec![
            WindowCall::new(RowNumber, 1),
            WindowCall::new(Rank::rank(), 2),
            WindowCall::new(Rank::dense_rank(), 3),
        ],
    )?;
    let result = run(
        window,
        Expr::ListCtor(vec![team(), score(), Expr::slot(1), Expr::slot(2), Expr::slot(3)]),
        &["s", "row_number", "rank", "dense_rank"],
    )?;

    let expect = |t: &str, s: i64, n: i64, r: i64, d: i64| {
        Value::list(vec![Value::from(t), Value::Int64(s), Value::Int64(n), Value::Int64(r), Value::Int64(d)])
    };
    assert_eq!(
        result,
        Value::list(vec![
            expect("blue", 5, 1, 1, 1),
            expect("blue", 3, 2, 2, 2),
            expect("red", 9, 1, 1, 1),
            expect("red", 7, 2, 2, 2),
            expect("red", 7, 3, 2, 2),
        ])
    );
    Ok(())
}

#[test]
fn test_lag_and_lead_over_whole_input() -> Result<()> {
    let window = create_window(
        scan_values(ints(&[30, 10, 20]), 0)?,
        vec![],
        vec![SortSpec::asc(Expr::slot(0))],
        vec![
            WindowCall::new(Navigation::lag(Expr::slot(0), Some(Expr::lit(1i64)), Some(Expr::lit(-1i64))), 1),
            WindowCall::new(Navigation::lead(Expr::slot(0), None, None), 2),
        ],
    )?;
    let result = run(
        window,
        Expr::ListCtor(vec![Expr::slot(0), Expr::slot(1), Expr::slot(2)]),
        &["x", "prev", "next"],
    )?;
    assert_eq!(
        result,
        Value::list(vec![
            Value::list(vec![Value::Int64(10), Value::Int64(-1), Value::Int64(20)]),
            Value::list(vec![Value::Int64(20), Value::Int64(10), Value::Int64(30)]),
            Value::list(vec![Value::Int64(30), Value::Int64(20), Value::null()]),
        ])
    );
    Ok(())
}

#[test]
fn test_lag_reads_expression_at_target_row() -> Result<()> {
    // LAG(score * 2) sees the previous row's score, not the current one
    let doubled = Expr::binary(
        partiql_exec::query::executor::expression::BinaryOp::Mul,
        score(),
        Expr::lit(2i64),
    );
    let window = create_window(
        scan_values(scores(), 0)?,
        vec![team()],
        vec![SortSpec::asc(score())],
        vec![WindowCall::new(Navigation::lag(doubled, None, None), 1)],
    )?;
    let result = run(window, Expr::ListCtor(vec![score(), Expr::slot(1)]), &["s", "prev_doubled"])?;
    assert_eq!(
        result,
        Value::list(vec![
            Value::list(vec![Value::Int64(3), Value::null()]),
            Value::list(vec![Value::Int64(5), Value::Int64(6)]),
            Value::list(vec![Value::Int64(7), Value::null()]),
            Value::list(vec![Value::Int64(7), Value::Int64(14)]),
            Value::list(vec![Value::Int64(9), Value::Int64(14)]),
        ])
    );
    Ok(())
}

#[test]
fn test_negative_offset_fails_in_any_mode() -> Result<()> {
    let window = create_window(
        scan_values(ints(&[1, 2]), 0)?,
        vec![],
        vec![],
        vec![WindowCall::new(Navigation::lead(Expr::slot(0), Some(Expr::lit(-2i64)), None), 1)],
    )?;
    let plan = QueryPlan::new(window, Expr::slot(1), bindings(&["x", "next"]));
    // Permissive is the default typing mode
    let err = ExecutionEngine::default().execute(Statement::Query(plan)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgumentValue);
    Ok(())
}
