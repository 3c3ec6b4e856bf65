use super::*;

fn ints(name: &str, values: &[Option<i64>]) -> Column {
    Column::new(
        name,
        LogicalType::Int64,
        values
            .iter()
            .map(|v| v.map_or(ScalarValue::Null, ScalarValue::Int))
            .collect(),
    )
}

#[test]
fn test_new_rejects_ragged_columns() {
    let err = TableData::new(vec![ints("a", &[Some(1), Some(2)]), ints("b", &[Some(1)])])
        .unwrap_err();
    assert!(err.to_string().contains("column 'b' has 1 rows"));
}

#[test]
fn test_new_rejects_duplicate_columns() {
    let err = TableData::new(vec![ints("a", &[Some(1)]), ints("a", &[Some(2)])]).unwrap_err();
    assert!(err.to_string().contains("duplicate column 'a'"));
}

#[test]
fn test_row_access_and_counts() {
    let data = TableData::new(vec![
        ints("a", &[Some(1), None, Some(3)]),
        Column::new(
            "s",
            LogicalType::String,
            vec![
                ScalarValue::Str("x".into()),
                ScalarValue::Str("y".into()),
                ScalarValue::Null,
            ],
        ),
    ])
    .unwrap();
    assert_eq!(data.num_rows(), 3);
    assert_eq!(data.num_columns(), 2);
    assert_eq!(data.row(1), vec![&ScalarValue::Null, &ScalarValue::Str("y".into())]);
    assert_eq!(data.column("a").unwrap().null_count(), 1);
    assert_eq!(data.column("s").unwrap().non_null().count(), 2);
}

#[test]
fn test_schema_follows_column_order() {
    let data = TableData::new(vec![
        ints("z", &[Some(1)]),
        Column::new("a", LogicalType::Bool, vec![ScalarValue::Bool(true)]),
    ])
    .unwrap();
    let schema = data.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["z", "a"]);
    assert_eq!(schema.field("a").unwrap().dtype, LogicalType::Bool);
}

#[test]
fn test_max_datetime_promotes_dates() {
    let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let d2 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let data = TableData::new(vec![Column::new(
        "d",
        LogicalType::Date,
        vec![ScalarValue::Date(d2), ScalarValue::Null, ScalarValue::Date(d1)],
    )])
    .unwrap();
    assert_eq!(data.max_datetime("d"), d2.and_hms_opt(0, 0, 0));
    assert_eq!(data.max_datetime("missing"), None);
}

#[test]
fn test_sample_is_deterministic_stride() {
    let values: Vec<Option<i64>> = (0..10).map(Some).collect();
    let data = TableData::new(vec![ints("a", &values)]).unwrap();

    let half = data.sample(50);
    assert_eq!(half.num_rows(), 5);
    assert_eq!(
        half.column("a").unwrap().values,
        vec![0, 2, 4, 6, 8].into_iter().map(ScalarValue::Int).collect::<Vec<_>>()
    );
    assert_eq!(data.sample(50), half);

    assert_eq!(data.sample(1).num_rows(), 1);
    assert_eq!(data.sample(100).num_rows(), 10);
}

#[test]
fn test_empty_table_data() {
    let data = TableData::default();
    assert_eq!(data.num_rows(), 0);
    assert!(data.schema().is_empty());
    assert_eq!(data.sample(10).num_rows(), 0);
}

fn at(day: u32, hour: u32) -> ScalarValue {
    ScalarValue::Datetime(
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap(),
    )
}

#[test]
fn test_latest_by_keeps_newest_row_per_entity() {
    let data = TableData::new(vec![
        ints("user_id", &[Some(1), Some(2), Some(1), Some(2), Some(3)]),
        ints("spend", &[Some(10), Some(20), Some(11), Some(19), Some(30)]),
        Column::new(
            "ts",
            LogicalType::Datetime,
            vec![at(2, 0), at(3, 0), at(4, 0), at(1, 0), ScalarValue::Null],
        ),
    ])
    .unwrap();

    let latest = data
        .latest_by(&["user_id".to_string()], Some("ts"))
        .unwrap();
    assert_eq!(latest.num_rows(), 3);
    assert_eq!(
        latest.column("spend").unwrap().values,
        vec![ScalarValue::Int(11), ScalarValue::Int(20), ScalarValue::Int(30)]
    );
}

#[test]
fn test_latest_by_without_timestamp_takes_last_row() {
    let data = TableData::new(vec![
        ints("user_id", &[Some(1), Some(1), Some(2)]),
        ints("spend", &[Some(5), Some(6), Some(7)]),
    ])
    .unwrap();

    let latest = data.latest_by(&["user_id".to_string()], None).unwrap();
    assert_eq!(
        latest.column("spend").unwrap().values,
        vec![ScalarValue::Int(6), ScalarValue::Int(7)]
    );

    let err = data.latest_by(&["account".to_string()], None).unwrap_err();
    assert!(err.to_string().contains("column 'account' not found"));
}
