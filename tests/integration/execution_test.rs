use anyhow::Result;
use partiql_exec::query::executor::expression::{BinaryOp, PathStep, Subquery, SubqueryKind};
use partiql_exec::query::executor::operators::{
    create_aggregate, create_distinct, create_external_scan, create_filter, create_limit, create_projection,
    create_scan, create_singleton, create_sort, AggregateCall, AggregateFunction, SortSpec,
};
use partiql_exec::query::executor::source::{shared, BindingSource, MemorySource};
use partiql_exec::query::executor::{BindingName, Expr};
use partiql_exec::{CollectionKind, ErrorKind, ExecutionEngine, QueryPlan, Statement, Value};

#[path = "../common/mod.rs"]
mod common;
use common::{bindings, int_bag, ints, row, run, scan_values, sorted_elements};

fn x_greater_than_two() -> Expr {
    Expr::binary(BinaryOp::Gt, Expr::slot(0), Expr::lit(2i64))
}

#[test]
fn test_filter_sort_sum_pipeline() -> Result<()> {
    // SELECT VALUE x FROM <<1,2,3,4>> AS x WHERE x > 2
    let filtered = create_filter(create_scan(int_bag(&[1, 2, 3, 4]), 0, None)?, x_greater_than_two())?;
    let result = run(filtered, Expr::slot(0), &["x"])?;
    assert!(matches!(result, Value::Bag(_)));
    assert_eq!(sorted_elements(result), ints(&[3, 4]));

    // ... ORDER BY x
    let filtered = create_filter(create_scan(int_bag(&[1, 2, 3, 4]), 0, None)?, x_greater_than_two())?;
    let sorted = create_sort(filtered, vec![SortSpec::asc(Expr::slot(0))])?;
    assert_eq!(run(sorted, Expr::slot(0), &["x"])?, Value::list(ints(&[3, 4])));

    // SELECT SUM(x) ...
    let filtered = create_filter(create_scan(int_bag(&[1, 2, 3, 4]), 0, None)?, x_greater_than_two())?;
    let summed = create_aggregate(filtered, vec![], vec![AggregateCall::new(AggregateFunction::Sum, Expr::slot(0), 1)])?;
    let result = run(summed, Expr::slot(1), &["x", "total"])?;
    assert_eq!(result, Value::bag(ints(&[7])));
    Ok(())
}

#[test]
fn test_projection_builds_structs() -> Result<()> {
    let people = vec![
        row(&[("name", Value::from("ada")), ("age", Value::Int64(36))]),
        row(&[("name", Value::from("bob"))]),
    ];
    let scan = scan_values(people, 0)?;
    let projected = create_projection(
        scan,
        vec![(
            1,
            Expr::StructCtor(vec![
                (Expr::lit("who"), Expr::field(Expr::slot(0), "name")),
                (Expr::lit("age"), Expr::field(Expr::slot(0), "age")),
            ]),
        )],
    )?;
    let sorted = create_sort(projected, vec![SortSpec::asc(Expr::field(Expr::slot(1), "who"))])?;
    let result = run(sorted, Expr::slot(1), &["p", "out"])?;

    // bob has no age, so the field is dropped rather than bound to MISSING
    assert_eq!(
        result,
        Value::list(vec![
            row(&[("who", Value::from("ada")), ("age", Value::Int64(36))]),
            row(&[("who", Value::from("bob"))]),
        ])
    );
    Ok(())
}

#[test]
fn test_dynamic_lookup_falls_back_to_attributes() -> Result<()> {
    let scan = scan_values(vec![row(&[("price", Value::Int64(5))]), row(&[("price", Value::Int64(12))])], 0)?;
    let cheap = Expr::binary(
        BinaryOp::Lt,
        Expr::DynamicLookup(BindingName::regular("PRICE")),
        Expr::lit(10i64),
    );
    let filtered = create_filter(scan, cheap)?;
    let result = run(filtered, Expr::DynamicLookup(BindingName::regular("price")), &["item"])?;
    assert_eq!(result, Value::bag(ints(&[5])));
    Ok(())
}

#[test]
fn test_select_without_from() -> Result<()> {
    let root = create_singleton()?;
    let result = run(root, Expr::ListCtor(vec![Expr::lit(1i64), Expr::lit("a")]), &[])?;
    assert_eq!(result, Value::bag(vec![Value::list(vec![Value::Int64(1), Value::from("a")])]));
    Ok(())
}

#[test]
fn test_scan_position_binding() -> Result<()> {
    let list = Expr::lit(Value::list(vec![Value::from("a"), Value::from("b")]));
    let scan = create_scan(list, 0, Some(1))?;
    let result = run(scan, Expr::ListCtor(vec![Expr::slot(0), Expr::slot(1)]), &["v", "i"])?;
    assert_eq!(
        result,
        Value::list(vec![
            Value::list(vec![Value::from("a"), Value::Int64(0)]),
            Value::list(vec![Value::from("b"), Value::Int64(1)]),
        ])
    );
    Ok(())
}

#[test]
fn test_limit_offset_and_distinct() -> Result<()> {
    let scan = create_scan(int_bag(&[5, 1, 5, 3, 1, 4]), 0, None)?;
    let distinct = create_distinct(scan, vec![Expr::slot(0)])?;
    let sorted = create_sort(distinct, vec![SortSpec::asc(Expr::slot(0))])?;
    let limited = create_limit(sorted, Some(Expr::lit(2i64)), Some(Expr::lit(1i64)))?;
    assert_eq!(run(limited, Expr::slot(0), &["n"])?, Value::list(ints(&[3, 4])));
    Ok(())
}

#[test]
fn test_wildcard_path_over_nested_data() -> Result<()> {
    let order = row(&[(
        "lines",
        Value::list(vec![
            row(&[("sku", Value::from("a1"))]),
            row(&[("qty", Value::Int64(2))]),
            row(&[("sku", Value::from("b2"))]),
        ]),
    )]);
    let skus = Expr::path(
        Expr::slot(0),
        vec![
            PathStep::Field(BindingName::regular("lines")),
            PathStep::Wildcard,
            PathStep::Field(BindingName::regular("sku")),
        ],
    );
    let result = run(scan_values(vec![order], 0)?, skus, &["o"])?;
    assert_eq!(
        result,
        Value::bag(vec![Value::bag(vec![Value::from("a1"), Value::from("b2")])])
    );
    Ok(())
}

#[test]
fn test_correlated_scalar_subquery() -> Result<()> {
    // SELECT VALUE (SELECT VALUE COUNT(*) FROM o.items) FROM orders AS o
    let orders = vec![
        row(&[("items", Value::bag(ints(&[1, 2, 3])))]),
        row(&[("items", Value::bag(vec![]))]),
    ];
    let inner_scan = create_scan(Expr::field(Expr::slot(0), "items"), 1, None)?;
    let count = create_aggregate(
        inner_scan,
        vec![],
        vec![AggregateCall::new(AggregateFunction::CountStar, Expr::lit(true), 2)],
    )?;
    let subquery = Expr::Subquery(Box::new(Subquery {
        root: count,
        result: Expr::slot(2),
        bindings: vec![Some("i".to_string()), Some("n".to_string())],
        kind: SubqueryKind::Scalar,
    }));
    let sorted = create_sort(scan_values(orders, 0)?, vec![SortSpec::desc(subquery.clone())])?;
    assert_eq!(run(sorted, subquery, &["o"])?, Value::list(ints(&[3, 0])));
    Ok(())
}

#[test]
fn test_external_source_is_closed_after_query() -> Result<()> {
    let source = shared(MemorySource::new("numbers", ints(&[1, 2, 3])).ordered());
    let scan = create_external_scan(source.clone(), 0, None)?;
    let plan = QueryPlan::new(scan, Expr::slot(0), bindings(&["n"]));
    let engine = ExecutionEngine::default();

    let cursor = engine.open_cursor(plan)?;
    assert_eq!(cursor.kind(), CollectionKind::List);
    let values = cursor.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(values, ints(&[1, 2, 3]));
    Ok(())
}

struct FailingSource {
    produced: usize,
    closed: bool,
}

impl BindingSource for FailingSource {
    fn name(&self) -> &str {
        "flaky"
    }

    fn open(&mut self) -> anyhow::Result<()> {
        self.produced = 0;
        Ok(())
    }

    fn advance(&mut self) -> anyhow::Result<Option<Value>> {
        if self.produced == 2 {
            anyhow::bail!("connection reset");
        }
        self.produced += 1;
        Ok(Some(Value::Int64(self.produced as i64)))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[test]
fn test_external_failure_aborts_and_closes() -> Result<()> {
    let failing = std::sync::Arc::new(parking_lot::Mutex::new(FailingSource { produced: 0, closed: false }));
    let scan = create_external_scan(failing.clone(), 0, None)?;
    let plan = QueryPlan::new(scan, Expr::slot(0), bindings(&["n"]));

    let err = ExecutionEngine::default().execute(Statement::Query(plan)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalSourceFailure);
    assert!(err.to_string().contains("flaky"));
    assert!(failing.lock().closed);
    Ok(())
}

#[test]
fn test_bad_slot_is_plan_malformed() -> Result<()> {
    let scan = create_scan(int_bag(&[1]), 3, None)?;
    let plan = QueryPlan::new(scan, Expr::slot(0), bindings(&["n"]));
    let err = ExecutionEngine::default().execute(Statement::Query(plan)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PlanMalformed);
    Ok(())
}
