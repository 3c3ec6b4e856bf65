use super::*;
use fs_core::{
    FeatureTableDefinition, LogicalType, SchemaField, SourceDefinition, SourceFormat, SourceName,
};
use fs_sql::DuckDbDialect;

fn events() -> SourceDefinition {
    SourceDefinition {
        name: SourceName::try_new("events").unwrap(),
        path: "events.parquet".to_string(),
        format: SourceFormat::Parquet,
        schema: Some(vec![
            SchemaField::new("user_id", LogicalType::Int64),
            SchemaField::new("amount", LogicalType::Float64),
            SchemaField::new("event_ts", LogicalType::Datetime),
        ]),
    }
}

fn table(yaml: &str) -> FeatureTableDefinition {
    serde_yaml::from_str(yaml).unwrap()
}

fn chain_tables() -> Vec<FeatureTableDefinition> {
    vec![
        table(
            "name: a\nfrom: { source: events }\nentity: { name: user, join_keys: [user_id] }\ncolumns:\n  - { name: amount, not_null: true }",
        ),
        table("name: b\nfrom: { table: a }\nentity: { name: user, join_keys: [user_id] }\ncolumns:\n  - name: amount"),
        table("name: c\nfrom: { table: b }\nentity: { name: user, join_keys: [user_id] }"),
        table("name: d\nfrom: { source: events }\nentity: { name: user, join_keys: [user_id] }"),
    ]
}

fn chain() -> DefinitionSet {
    DefinitionSet::new(vec![events()], chain_tables()).unwrap()
}

fn name(s: &str) -> TableName {
    TableName::try_new(s).unwrap()
}

fn names(order: &[TableName]) -> Vec<&str> {
    order.iter().map(|t| t.as_str()).collect()
}

fn select(options: BuildOptions) -> Vec<String> {
    let dag = chain().dag().unwrap();
    select_tables(&dag, &options)
        .unwrap()
        .into_iter()
        .map(TableName::into_inner)
        .collect()
}

#[test]
fn test_full_selection_is_graph_order() {
    assert_eq!(select(BuildOptions::default()), vec!["a", "d", "b", "c"]);
}

#[test]
fn test_start_and_end_slice_the_order() {
    let from_b = BuildOptions {
        start: Some(name("b")),
        ..Default::default()
    };
    assert_eq!(select(from_b), vec!["b", "c"]);

    let until_d = BuildOptions {
        end: Some(name("d")),
        ..Default::default()
    };
    assert_eq!(select(until_d), vec!["a", "d"]);
}

#[test]
fn test_table_selects_upstream_closure() {
    let c = BuildOptions {
        table: Some(name("c")),
        ..Default::default()
    };
    assert_eq!(select(c), vec!["a", "b", "c"]);

    let d = BuildOptions {
        table: Some(name("d")),
        ..Default::default()
    };
    assert_eq!(select(d), vec!["d"]);
}

#[test]
fn test_table_and_slice_combine() {
    let options = BuildOptions {
        table: Some(name("c")),
        start: Some(name("d")),
        ..Default::default()
    };
    assert_eq!(select(options), vec!["b", "c"]);
}

#[test]
fn test_unknown_table_is_rejected() {
    let dag = chain().dag().unwrap();
    let options = BuildOptions {
        table: Some(name("ghost")),
        ..Default::default()
    };
    let err = select_tables(&dag, &options).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Definition(CoreError::UnknownTable { .. })
    ));
}

#[test]
fn test_plan_run_plans_selected_tables_only() {
    let options = BuildOptions {
        table: Some(name("b")),
        ..Default::default()
    };
    let plan = plan_run(&chain(), &options, &DuckDbDialect::new(), &Validator::default()).unwrap();
    assert_eq!(names(&plan.order), vec!["a", "b"]);
    assert_eq!(plan.plans.len(), 2);
    assert_eq!(plan.constraints[&name("a")].len(), 1);
    assert!(plan.constraints[&name("b")].is_empty());
    // b reads a's planned output
    let b_cols: Vec<&str> = plan.plans[&name("b")].output_schema.names().collect();
    assert_eq!(b_cols, vec!["user_id", "amount"]);
}

#[test]
fn test_unresolved_reference_aborts_planning() {
    let defs = DefinitionSet::new(
        vec![events()],
        vec![table(
            "name: a\nfrom: { source: events }\nentity: { name: user, join_keys: [user_id] }\ncolumns:\n  - name: missing",
        )],
    )
    .unwrap();
    let err = plan_run(
        &defs,
        &BuildOptions::default(),
        &DuckDbDialect::new(),
        &Validator::default(),
    )
    .unwrap_err();
    assert!(matches!(err, BuildError::Compile(_)), "{err}");
    assert!(err.to_string().contains("[C001]"));
}

#[test]
fn test_malformed_constraint_aborts_planning() {
    let defs = DefinitionSet::new(
        vec![events()],
        vec![table(
            "name: a\nfrom: { source: events }\nentity: { name: user, join_keys: [user_id] }\ncolumns:\n  - { name: amount, pattern: \"^[0-9]+$\" }",
        )],
    )
    .unwrap();
    let err = plan_run(
        &defs,
        &BuildOptions::default(),
        &DuckDbDialect::new(),
        &Validator::default(),
    )
    .unwrap_err();
    assert!(
        matches!(err, BuildError::ConstraintDefinition { ref table, .. } if table == "a"),
        "{err}"
    );
}

/// `chain()` plus `e`, whose transforms reference a later transform.
fn chain_with_broken_e() -> DefinitionSet {
    let mut tables = chain_tables();
    tables.push(table(
        "name: e\nfrom: { table: d }\nentity: { name: user, join_keys: [user_id] }\ntransforms:\n  - { name: x, expr: \"y + 1\", dtype: float64 }\n  - { name: y, expr: \"amount\", dtype: float64 }",
    ));
    tables.push(table(
        "name: f\nfrom: { table: e }\nentity: { name: user, join_keys: [user_id] }",
    ));
    DefinitionSet::new(vec![events()], tables).unwrap()
}

#[test]
fn test_compile_error_fails_only_its_table() {
    let plan = plan_run(
        &chain_with_broken_e(),
        &BuildOptions::default(),
        &DuckDbDialect::new(),
        &Validator::default(),
    )
    .unwrap();

    assert_eq!(plan.order.len(), 6);
    assert_eq!(plan.plans.len(), 4);
    assert!(plan.compile_errors[&name("e")].contains("[C003]"));
    assert!(plan.compile_errors[&name("f")].contains("[C007]"));
    assert!(plan.plans.contains_key(&name("d")));
    assert!(!plan.constraints.contains_key(&name("e")));
}

#[test]
fn test_unselected_broken_table_is_not_planned() {
    let options = BuildOptions {
        table: Some(name("d")),
        ..Default::default()
    };
    let plan = plan_run(
        &chain_with_broken_e(),
        &options,
        &DuckDbDialect::new(),
        &Validator::default(),
    )
    .unwrap();

    assert_eq!(names(&plan.order), vec!["d"]);
    assert_eq!(plan.plans.len(), 1);
    assert!(plan.compile_errors.is_empty());
}

#[test]
fn test_upstream_of_selection_is_planned_but_not_ordered() {
    let options = BuildOptions {
        start: Some(name("c")),
        ..Default::default()
    };
    let plan = plan_run(&chain(), &options, &DuckDbDialect::new(), &Validator::default()).unwrap();
    assert_eq!(names(&plan.order), vec!["c"]);
    assert_eq!(plan.plans.len(), 1);
    let c_cols: Vec<&str> = plan.plans[&name("c")].output_schema.names().collect();
    assert_eq!(c_cols, vec!["user_id"]);
}
