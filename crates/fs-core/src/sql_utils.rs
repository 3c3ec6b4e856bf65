//! SQL quoting helpers shared by the compiler, the engine and the registry.

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use fs_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("spend_90d"), r#""spend_90d""#);
/// assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each identifier and join with `, `.
pub fn quote_ident_list<S: AsRef<str>>(idents: &[S]) -> String {
    idents
        .iter()
        .map(|i| quote_ident(i.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a complete single-quoted SQL string literal.
///
/// # Examples
/// ```
/// use fs_core::sql_utils::string_literal;
/// assert_eq!(string_literal("data/tx.parquet"), "'data/tx.parquet'");
/// assert_eq!(string_literal("O'Brien"), "'O''Brien'");
/// ```
pub fn string_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
