//! Analysis of user-written SQL expressions (filters and transforms).

use crate::dialect::SqlDialect;
use sqlparser::ast::{visit_expressions, visit_expressions_mut, Expr};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;
use std::collections::HashMap;
use std::ops::ControlFlow;

/// Aggregate and window functions are not allowed inside transforms or
/// filters: both are evaluated row by row.
const AGGREGATE_FUNCTIONS: &[&str] = &[
    "sum",
    "count",
    "avg",
    "min",
    "max",
    "arg_max",
    "arg_min",
    "max_by",
    "min_by",
    "median",
    "stddev",
    "variance",
    "list",
    "array_agg",
    "string_agg",
    "listagg",
];

/// Parse a single SQL expression. Trailing input is an error.
pub fn parse_expression(dialect: &dyn SqlDialect, sql: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(dialect.parser_dialect())
        .try_with_sql(sql)
        .map_err(|e| e.to_string())?;
    let expr = parser.parse_expr().map_err(|e| e.to_string())?;
    let next = parser.peek_token();
    if next.token != Token::EOF {
        return Err(format!("unexpected trailing input starting at '{}'", next.token));
    }
    Ok(expr)
}

/// Bare column names referenced by an expression, first occurrence order.
///
/// Qualified names (`t.col`) are rejected: expressions only see the columns
/// of the relation they are evaluated against.
pub fn referenced_columns(expr: &Expr) -> Result<Vec<String>, String> {
    let mut columns: Vec<String> = Vec::new();
    let flow = visit_expressions(expr, |e| {
        match e {
            Expr::Identifier(ident) => {
                if !columns.contains(&ident.value) {
                    columns.push(ident.value.clone());
                }
            }
            Expr::CompoundIdentifier(parts) => {
                let name = parts
                    .iter()
                    .map(|p| p.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                return ControlFlow::Break(format!(
                    "qualified reference '{}' is not allowed",
                    name
                ));
            }
            _ => {}
        }
        ControlFlow::Continue(())
    });
    match flow {
        ControlFlow::Break(message) => Err(message),
        ControlFlow::Continue(()) => Ok(columns),
    }
}

/// Lowercase names of every function called in an expression.
pub fn function_names(expr: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    let _ = visit_expressions(expr, |e| {
        if let Expr::Function(func) = e {
            let name = func.name.to_string().to_ascii_lowercase();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        ControlFlow::<()>::Continue(())
    });
    names
}

/// First aggregate or window function used in an expression, if any.
pub fn find_aggregate(expr: &Expr) -> Option<String> {
    let flow = visit_expressions(expr, |e| {
        if let Expr::Function(func) = e {
            let name = func.name.to_string().to_ascii_lowercase();
            if func.over.is_some() || AGGREGATE_FUNCTIONS.contains(&name.as_str()) {
                return ControlFlow::Break(name);
            }
        }
        ControlFlow::Continue(())
    });
    match flow {
        ControlFlow::Break(name) => Some(name),
        ControlFlow::Continue(()) => None,
    }
}

/// Replace references to earlier transforms with their (parenthesized)
/// definitions, so the final projection only reads physical columns.
pub fn inline_references(expr: &mut Expr, definitions: &HashMap<String, Expr>) {
    if definitions.is_empty() {
        return;
    }
    let _ = visit_expressions_mut(expr, |e| {
        if let Expr::Identifier(ident) = e {
            if let Some(def) = definitions.get(&ident.value) {
                *e = Expr::Nested(Box::new(def.clone()));
            }
        }
        ControlFlow::<()>::Continue(())
    });
}

#[cfg(test)]
#[path = "expr_test.rs"]
mod tests;
