use super::*;
use crate::error::CoreError;

#[test]
fn test_valid_identifiers() {
    let t = TableName::try_new("user_spend_90d").unwrap();
    assert_eq!(t.as_str(), "user_spend_90d");
    assert_eq!(t, "user_spend_90d");
    assert_eq!(t.to_string(), "user_spend_90d");
    assert!(SourceName::try_new("_raw").is_ok());
}

#[test]
fn test_empty_name_rejected() {
    let err = TableName::try_new("").unwrap_err();
    assert!(matches!(err, CoreError::EmptyName { .. }));
}

#[test]
fn test_non_identifier_rejected() {
    for bad in ["1table", "user-spend", "a b", "schema.table", "tbl;drop"] {
        let err = TableName::try_new(bad).unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidIdentifier { .. }),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_deserialize_validates() {
    let ok: TableName = serde_yaml::from_str("orders").unwrap();
    assert_eq!(ok, "orders");
    let bad: Result<TableName, _> = serde_yaml::from_str("\"has space\"");
    assert!(bad.is_err());
}

#[test]
fn test_ordering_is_lexicographic() {
    let mut names = vec![
        TableName::try_new("b").unwrap(),
        TableName::try_new("a").unwrap(),
        TableName::try_new("c").unwrap(),
    ];
    names.sort();
    let as_str: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(as_str, vec!["a", "b", "c"]);
}
