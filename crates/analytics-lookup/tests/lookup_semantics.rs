use analytics_columnar::{Column, Dataset, Value};
use analytics_lookup::{
    apply, lookup_column, query, Association, FilterPredicate, LookupError, MatchMode,
    MatchRequest, TableSide,
};
use pretty_assertions::assert_eq;

fn prices() -> Dataset {
    Dataset::new(vec![
        Column::from_values("Product", vec!["A".into(), "B".into(), "A".into()]),
        Column::from_values("Price", vec![1.into(), 2.into(), 3.into()]),
        Column::from_values("Region", vec!["East".into(), "West".into(), "West".into()]),
    ])
    .unwrap()
}

fn orders(products: &[&str]) -> Dataset {
    Dataset::new(vec![Column::from_values(
        "Product",
        products.iter().map(|p| Value::from(*p)).collect(),
    )])
    .unwrap()
}

fn tiers() -> Association {
    Association::from_pairs([
        (10.into(), "bronze".into()),
        (20.into(), "silver".into()),
        (30.into(), "gold".into()),
    ])
}

#[test]
fn duplicate_keys_resolve_to_last_row() {
    let request = MatchRequest::keyed("Product", "Price", "Price", MatchMode::Exact);
    let out = apply(&orders(&["A", "B", "C"]), &prices(), &request).unwrap();
    assert_eq!(
        out.column("Price").unwrap().values(),
        &[Value::from(3), Value::from(2), Value::Missing]
    );
}

#[test]
fn approximate_match_boundaries() {
    let assoc = tiers();
    let nearest = |probe: f64| {
        query(&assoc, &probe.into(), MatchMode::ApproximateNearest, &Value::Missing).unwrap()
    };
    assert_eq!(nearest(35.0), Value::from("gold"));
    assert_eq!(nearest(5.0), Value::from("bronze"));
    assert_eq!(nearest(15.0), Value::from("bronze"));
    assert_eq!(nearest(25.0), Value::from("silver"));
    assert_eq!(nearest(26.0), Value::from("gold"));
}

#[test]
fn exact_or_next_and_previous() {
    let assoc = tiers();
    let run = |probe: f64, mode| query(&assoc, &probe.into(), mode, &Value::Missing).unwrap();
    assert_eq!(run(25.0, MatchMode::ExactOrNext), Value::from("gold"));
    assert_eq!(run(25.0, MatchMode::ExactOrPrevious), Value::from("silver"));
    assert_eq!(run(30.0, MatchMode::ExactOrNext), Value::from("gold"));
    assert_eq!(run(30.0, MatchMode::ExactOrPrevious), Value::from("gold"));
}

#[test]
fn wildcard_is_case_insensitive() {
    let assoc = Association::from_pairs([("Product-ABC".into(), "hit".into())]);
    let value = query(&assoc, &"abc".into(), MatchMode::Wildcard, &Value::Missing).unwrap();
    assert_eq!(value, Value::from("hit"));
}

#[test]
fn missing_probes_get_the_fallback_in_every_mode() {
    let source = Dataset::new(vec![Column::from_values(
        "k",
        vec![Value::Missing, 10.into()],
    )])
    .unwrap();
    let lookup = Dataset::new(vec![
        Column::from_values("k", vec![10.into()]),
        Column::from_values("v", vec!["ten".into()]),
    ])
    .unwrap();
    for mode in [
        MatchMode::Exact,
        MatchMode::ApproximateNearest,
        MatchMode::ExactOrNext,
        MatchMode::ExactOrPrevious,
        MatchMode::Wildcard,
    ] {
        let request = MatchRequest::keyed("k", "v", "out", mode).with_fallback("none");
        let column = lookup_column(&source, &lookup, &request).unwrap();
        assert_eq!(column.values(), &[Value::from("none"), Value::from("ten")]);
    }
}

#[test]
fn filtered_first_is_deterministic_over_large_sources() {
    let products: Vec<String> = (0..1000).map(|i| format!("P{i}")).collect();
    let refs: Vec<&str> = products.iter().map(String::as_str).collect();
    let source = orders(&refs);
    let request = MatchRequest::filtered_first(
        "Price",
        "WestPrice",
        vec![FilterPredicate::new("Region", "West")],
    );
    let out = apply(&source, &prices(), &request).unwrap();
    let column = out.column("WestPrice").unwrap();
    assert_eq!(column.len(), 1000);
    assert!(column.values().iter().all(|v| *v == Value::from(2)));
}

#[test]
fn reapplying_the_same_request_is_idempotent() {
    let request = MatchRequest::keyed("Product", "Price", "Price", MatchMode::Exact);
    let once = apply(&orders(&["A", "B"]), &prices(), &request).unwrap();
    let twice = apply(&once, &prices(), &request).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.column_count(), 2);
}

#[test]
fn validation_errors_name_the_side() {
    let request = MatchRequest::keyed("Product", "Cost", "Cost", MatchMode::Exact);
    let err = apply(&orders(&["A"]), &prices(), &request).unwrap_err();
    assert_eq!(
        err,
        LookupError::ColumnNotFound {
            column: "Cost".into(),
            side: TableSide::Lookup
        }
    );
    assert_eq!(err.to_string(), "column 'Cost' not found in lookup table");
}

#[test]
fn nearest_over_text_keys_resolves_exact_hits_and_missing_cells() {
    let source = Dataset::new(vec![Column::from_values(
        "k",
        vec![Value::Missing, "b".into()],
    )])
    .unwrap();
    let lookup = Dataset::new(vec![
        Column::from_values("k", vec!["a".into(), "b".into()]),
        Column::from_values("v", vec![1.into(), 2.into()]),
    ])
    .unwrap();
    let request =
        MatchRequest::keyed("k", "v", "out", MatchMode::ApproximateNearest).with_fallback("fb");
    let out = apply(&source, &lookup, &request).unwrap();
    assert_eq!(
        out.column("out").unwrap().values(),
        &[Value::from("fb"), Value::from(2)]
    );

    let source = Dataset::new(vec![Column::from_values("k", vec!["c".into()])]).unwrap();
    assert!(matches!(
        apply(&source, &lookup, &request),
        Err(LookupError::NonNumericKey(_))
    ));
}

#[test]
fn mixed_lookup_keys_only_fail_when_ordering_is_needed() {
    let lookup = Dataset::new(vec![
        Column::from_values("k", vec![1.into(), "a".into()]),
        Column::from_values("v", vec!["one".into(), "alpha".into()]),
    ])
    .unwrap();
    let request = MatchRequest::keyed("k", "v", "out", MatchMode::ExactOrPrevious);

    let source = Dataset::new(vec![Column::from_values(
        "k",
        vec![Value::Missing, "a".into(), 1.into()],
    )])
    .unwrap();
    let out = apply(&source, &lookup, &request).unwrap();
    assert_eq!(
        out.column("out").unwrap().values(),
        &[Value::Missing, Value::from("alpha"), Value::from("one")]
    );

    let source = Dataset::new(vec![Column::from_values("k", vec![2.into()])]).unwrap();
    assert!(matches!(
        apply(&source, &lookup, &request),
        Err(LookupError::IncomparableKeys { .. })
    ));
}

#[test]
fn incomparable_probe_aborts_without_partial_output() {
    let source = Dataset::new(vec![Column::from_values(
        "k",
        vec![15.into(), "oops".into()],
    )])
    .unwrap();
    let lookup = Dataset::new(vec![
        Column::from_values("k", vec![10.into(), 20.into()]),
        Column::from_values("v", vec!["a".into(), "b".into()]),
    ])
    .unwrap();
    let request = MatchRequest::keyed("k", "v", "out", MatchMode::ExactOrNext);
    assert!(matches!(
        apply(&source, &lookup, &request),
        Err(LookupError::IncomparableKeys { .. })
    ));
}
