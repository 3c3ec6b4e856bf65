//! Rendering of logical plans into dialect-specific SQL.

use crate::dialect::SqlDialect;
use crate::error::{RenderError, RenderResult};
use crate::expr::function_names;
use crate::ir::{AggregateOp, LogicalOp, LogicalPlan, OutputExpr, PlanMode};
use fs_core::AggFunction;

const SOURCE_CTE: &str = "__source";
const FEATURES_CTE: &str = "__features";

/// Render a plan to SQL.
///
/// The output is a single `SELECT` whose columns are the plan's outputs in
/// order. Rendering is deterministic: the same plan always yields the same
/// string.
pub fn render(plan: &LogicalPlan, dialect: &dyn SqlDialect) -> RenderResult<String> {
    for expr in plan.expressions() {
        for function in function_names(expr) {
            if !dialect.supports_function(&function) {
                return Err(RenderError::UnsupportedFunction {
                    function,
                    dialect: dialect.name().to_string(),
                });
            }
        }
    }

    let q = |ident: &str| dialect.quote_ident(ident);
    let mut ctes = Vec::new();
    let mut current = String::new();

    for op in &plan.ops {
        match op {
            LogicalOp::Scan { relation, .. } => {
                current = q(relation);
            }
            LogicalOp::Filter { .. } => {}
            LogicalOp::Features(mode) => {
                let predicates: Vec<String> =
                    plan.filters().map(|p| format!("({})", p)).collect();
                let mut source = format!("SELECT *\n  FROM {}", current);
                if !predicates.is_empty() {
                    source.push_str(&format!("\n  WHERE {}", predicates.join("\n    AND ")));
                }
                ctes.push(format!("{} AS (\n  {}\n)", q(SOURCE_CTE), source));
                current = q(SOURCE_CTE);

                if let PlanMode::Aggregate {
                    group_by,
                    timestamp,
                    carried,
                    aggregates,
                } = mode
                {
                    let ts = q(timestamp);
                    let mut items: Vec<String> = group_by.iter().map(|k| q(k)).collect();
                    items.push(format!("MAX({}) AS {}", ts, ts));
                    for column in carried {
                        items.push(format!(
                            "{} AS {}",
                            dialect.latest_value(&q(column), &ts),
                            q(column)
                        ));
                    }
                    for agg in aggregates {
                        items.push(render_aggregate(agg, &ts, dialect));
                    }
                    ctes.push(format!(
                        "{} AS (\n  SELECT\n    {}\n  FROM {}\n  GROUP BY {}\n)",
                        q(FEATURES_CTE),
                        items.join(",\n    "),
                        current,
                        group_by.iter().map(|k| q(k)).collect::<Vec<_>>().join(", ")
                    ));
                    current = q(FEATURES_CTE);
                }
            }
            LogicalOp::Select { .. } => {}
        }
    }

    let projection: Vec<String> = plan
        .outputs()
        .iter()
        .map(|output| match &output.expr {
            OutputExpr::Column { name, cast: None } => q(name),
            OutputExpr::Column {
                name,
                cast: Some(ty),
            } => format!("CAST({} AS {}) AS {}", q(name), dialect.type_name(*ty), q(name)),
            OutputExpr::Derived { expr, cast } => format!(
                "CAST({} AS {}) AS {}",
                expr,
                dialect.type_name(*cast),
                q(&output.name)
            ),
        })
        .collect();

    let mut sql = String::new();
    if !ctes.is_empty() {
        sql.push_str("WITH ");
        sql.push_str(&ctes.join(",\n"));
        sql.push('\n');
    }
    sql.push_str(&format!(
        "SELECT\n  {}\nFROM {}",
        projection.join(",\n  "),
        current
    ));
    Ok(sql)
}

fn render_aggregate(agg: &AggregateOp, ts: &str, dialect: &dyn SqlDialect) -> String {
    let (function, distinct) = match agg.function {
        AggFunction::Sum => ("SUM", false),
        AggFunction::Count => ("COUNT", false),
        AggFunction::Avg => ("AVG", false),
        AggFunction::Min => ("MIN", false),
        AggFunction::Max => ("MAX", false),
        AggFunction::CountDistinct => ("COUNT", true),
    };
    let predicate = agg.window.map(|w| dialect.window_predicate(ts, w));
    let call = dialect.filtered_aggregate(
        function,
        distinct,
        &dialect.quote_ident(&agg.column),
        predicate.as_deref(),
    );
    format!(
        "CAST({} AS {}) AS {}",
        call,
        dialect.type_name(agg.output_type),
        dialect.quote_ident(&agg.output)
    )
}
