use anyhow::Result;
use partiql_exec::query::executor::expression::BinaryOp;
use partiql_exec::query::executor::operators::{create_nested_loop_join, create_scan, create_sort, JoinKind, SortSpec};
use partiql_exec::query::executor::Expr;
use partiql_exec::Value;

#[path = "../common/mod.rs"]
mod common;
use common::{int_bag, ints, row, run, scan_values, sorted_elements};

fn customers() -> Vec<Value> {
    vec![
        row(&[("id", Value::Int64(1)), ("name", Value::from("ada"))]),
        row(&[("id", Value::Int64(2)), ("name", Value::from("bob"))]),
        row(&[("id", Value::Int64(3)), ("name", Value::from("cy"))]),
    ]
}

fn orders() -> Vec<Value> {
    vec![
        row(&[("customer", Value::Int64(1)), ("total", Value::Int64(10))]),
        row(&[("customer", Value::Int64(1)), ("total", Value::Int64(15))]),
        row(&[("customer", Value::Int64(3)), ("total", Value::Int64(7))]),
    ]
}

fn same_customer() -> Expr {
    Expr::binary(
        BinaryOp::Eq,
        Expr::field(Expr::slot(0), "id"),
        Expr::field(Expr::slot(1), "customer"),
    )
}

fn name_and_total() -> Expr {
    Expr::ListCtor(vec![Expr::field(Expr::slot(0), "name"), Expr::field(Expr::slot(1), "total")])
}

fn pair(name: &str, total: Option<i64>) -> Value {
    Value::list(vec![Value::from(name), total.map_or(Value::Missing, Value::Int64)])
}

#[test]
fn test_cross_join_produces_every_pair() -> Result<()> {
    for (m, n) in [(0usize, 3usize), (3, 0), (2, 5), (4, 4)] {
        let left: Vec<i64> = (0..m as i64).collect();
        let right: Vec<i64> = (0..n as i64).collect();
        let join = create_nested_loop_join(
            JoinKind::Cross,
            create_scan(int_bag(&left), 0, None)?,
            create_scan(int_bag(&right), 1, None)?,
            None,
            vec![1],
        )?;
        let result = run(join, Expr::ListCtor(vec![Expr::slot(0), Expr::slot(1)]), &["l", "r"])?;
        assert_eq!(result.elements().map_or(0, |e| e.len()), m * n);
    }
    Ok(())
}

#[test]
fn test_inner_join_on_key() -> Result<()> {
    let join = create_nested_loop_join(
        JoinKind::Inner,
        scan_values(customers(), 0)?,
        scan_values(orders(), 1)?,
        Some(same_customer()),
        vec![1],
    )?;
    let result = run(join, name_and_total(), &["c", "o"])?;
    assert_eq!(
        sorted_elements(result),
        vec![pair("ada", Some(10)), pair("ada", Some(15)), pair("cy", Some(7))]
    );
    Ok(())
}

#[test]
fn test_left_join_binds_missing_for_unmatched_rows() -> Result<()> {
    let join = create_nested_loop_join(
        JoinKind::Left,
        scan_values(customers(), 0)?,
        scan_values(orders(), 1)?,
        Some(same_customer()),
        vec![1],
    )?;
    let result = run(join, name_and_total(), &["c", "o"])?;
    assert_eq!(
        sorted_elements(result),
        vec![
            pair("ada", Some(10)),
            pair("ada", Some(15)),
            pair("bob", None),
            pair("cy", Some(7)),
        ]
    );
    Ok(())
}

#[test]
fn test_lateral_join_over_nested_collection() -> Result<()> {
    // SELECT c.name, t FROM customers c, c.tags t
    let tagged = vec![
        row(&[("name", Value::from("ada")), ("tags", Value::list(vec![Value::from("vip"), Value::from("new")]))]),
        row(&[("name", Value::from("bob")), ("tags", Value::list(vec![]))]),
    ];
    let join = create_nested_loop_join(
        JoinKind::Left,
        scan_values(tagged, 0)?,
        create_scan(Expr::field(Expr::slot(0), "tags"), 1, None)?,
        None,
        vec![1],
    )?;
    let sorted = create_sort(
        join,
        vec![SortSpec::asc(Expr::field(Expr::slot(0), "name")), SortSpec::asc(Expr::slot(1))],
    )?;
    let result = run(
        sorted,
        Expr::ListCtor(vec![Expr::field(Expr::slot(0), "name"), Expr::slot(1)]),
        &["c", "t"],
    )?;
    assert_eq!(
        result,
        Value::list(vec![
            Value::list(vec![Value::from("ada"), Value::from("new")]),
            Value::list(vec![Value::from("ada"), Value::from("vip")]),
            Value::list(vec![Value::from("bob"), Value::Missing]),
        ])
    );
    Ok(())
}

#[test]
fn test_join_output_is_a_bag() -> Result<()> {
    let join = create_nested_loop_join(
        JoinKind::Cross,
        create_scan(Expr::lit(Value::list(ints(&[1]))), 0, None)?,
        create_scan(Expr::lit(Value::list(ints(&[2]))), 1, None)?,
        None,
        vec![1],
    )?;
    let result = run(join, Expr::slot(1), &["a", "b"])?;
    assert_eq!(result, Value::bag(ints(&[2])));
    Ok(())
}
