use super::*;
use crate::dialect::DuckDbDialect;

fn parse(sql: &str) -> Expr {
    parse_expression(&DuckDbDialect::new(), sql).unwrap()
}

#[test]
fn test_parse_rejects_trailing_input() {
    let err = parse_expression(&DuckDbDialect::new(), "a + b c").unwrap_err();
    assert!(err.contains("trailing input"), "{err}");
    assert!(parse_expression(&DuckDbDialect::new(), "a +").is_err());
}

#[test]
fn test_referenced_columns_in_order() {
    let expr = parse("spend_30d / NULLIF(spend_90d, 0) + spend_30d");
    assert_eq!(referenced_columns(&expr).unwrap(), vec!["spend_30d", "spend_90d"]);
}

#[test]
fn test_referenced_columns_ignores_literals() {
    let expr = parse("CASE WHEN amount > 100 THEN 'big' ELSE NULL END");
    assert_eq!(referenced_columns(&expr).unwrap(), vec!["amount"]);
}

#[test]
fn test_qualified_reference_rejected() {
    let expr = parse("t.amount * 2");
    let err = referenced_columns(&expr).unwrap_err();
    assert!(err.contains("t.amount"));
}

#[test]
fn test_function_names_lowercased() {
    let expr = parse("COALESCE(IFF(a > 0, a, NULL), abs(b))");
    assert_eq!(function_names(&expr), vec!["coalesce", "iff", "abs"]);
}

#[test]
fn test_find_aggregate() {
    assert_eq!(find_aggregate(&parse("SUM(amount) / 2")), Some("sum".to_string()));
    assert_eq!(
        find_aggregate(&parse("lag(amount) OVER (ORDER BY ts)")),
        Some("lag".to_string())
    );
    assert_eq!(find_aggregate(&parse("abs(amount)")), None);
}

#[test]
fn test_inline_references() {
    let mut defs = HashMap::new();
    defs.insert("ratio".to_string(), parse("a / b"));
    let mut expr = parse("ratio * 100");
    inline_references(&mut expr, &defs);
    assert_eq!(expr.to_string(), "(a / b) * 100");
}
