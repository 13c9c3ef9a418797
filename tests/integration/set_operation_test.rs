use anyhow::Result;
use partiql_exec::query::executor::operators::{create_scan, create_set_operation, SetOpKind, SetQuantifier};
use partiql_exec::query::executor::Expr;
use partiql_exec::Value;

#[path = "../common/mod.rs"]
mod common;
use common::{int_bag, ints, run, sorted_elements};

fn set_op(kind: SetOpKind, quantifier: SetQuantifier, left: &[i64], right: &[i64]) -> Result<Value> {
    let op = create_set_operation(
        kind,
        quantifier,
        create_scan(int_bag(left), 0, None)?,
        Expr::slot(0),
        create_scan(int_bag(right), 1, None)?,
        Expr::slot(1),
        2,
    )?;
    run(op, Expr::slot(2), &["l", "r", "v"])
}

#[test]
fn test_all_variants_use_multiplicity_arithmetic() -> Result<()> {
    let union = set_op(SetOpKind::Union, SetQuantifier::All, &[7, 7], &[7])?;
    assert_eq!(sorted_elements(union), ints(&[7, 7, 7]));

    let except = set_op(SetOpKind::Except, SetQuantifier::All, &[7, 7, 7], &[7])?;
    assert_eq!(sorted_elements(except), ints(&[7, 7]));

    let floored = set_op(SetOpKind::Except, SetQuantifier::All, &[7], &[7, 7, 7])?;
    assert!(sorted_elements(floored).is_empty());

    let intersect = set_op(SetOpKind::Intersect, SetQuantifier::All, &[1, 1, 2, 3], &[1, 1, 1, 3, 4])?;
    assert_eq!(sorted_elements(intersect), ints(&[1, 1, 3]));
    Ok(())
}

#[test]
fn test_distinct_variants_cap_multiplicity() -> Result<()> {
    let union = set_op(SetOpKind::Union, SetQuantifier::Distinct, &[1, 1, 2], &[2, 3])?;
    assert_eq!(sorted_elements(union), ints(&[1, 2, 3]));

    let intersect = set_op(SetOpKind::Intersect, SetQuantifier::Distinct, &[1, 1, 2], &[1, 3])?;
    assert_eq!(sorted_elements(intersect), ints(&[1]));

    let except = set_op(SetOpKind::Except, SetQuantifier::Distinct, &[1, 1, 2, 3], &[3])?;
    assert_eq!(sorted_elements(except), ints(&[1, 2]));
    Ok(())
}

#[test]
fn test_equal_numbers_across_representations_match() -> Result<()> {
    let op = create_set_operation(
        SetOpKind::Intersect,
        SetQuantifier::All,
        create_scan(Expr::lit(Value::bag(vec![Value::Int64(1), Value::Double(2.5)])), 0, None)?,
        Expr::slot(0),
        create_scan(Expr::lit(Value::bag(vec![Value::Double(1.0), Value::Int32(2)])), 1, None)?,
        Expr::slot(1),
        2,
    )?;
    let result = run(op, Expr::slot(2), &["l", "r", "v"])?;
    assert_eq!(result.elements().map_or(0, |e| e.len()), 1);
    assert_eq!(sorted_elements(result), ints(&[1]));
    Ok(())
}

#[test]
fn test_set_operation_result_is_a_bag() -> Result<()> {
    let result = set_op(SetOpKind::Union, SetQuantifier::All, &[1], &[2])?;
    assert!(matches!(result, Value::Bag(_)));
    Ok(())
}
