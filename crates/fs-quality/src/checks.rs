//! Built-in constraint evaluators.

use crate::error::{QualityError, QualityResult};
use crate::evaluator::{column_type, ConstraintEvaluator, EvalContext};
use crate::predicate::{CustomPredicate, PredicateRegistry};
use chrono::Duration;
use fs_core::{
    Constraint, ConstraintKind, ConstraintResult, ConstraintTag, ConstraintTarget, Diagnostic,
    LogicalType, ScalarValue, SchemaSnapshot,
};
use regex::Regex;

/// Number of failing values kept in a diagnostic.
pub const SAMPLE_LIMIT: usize = 5;

fn finish(
    constraint: &Constraint,
    ctx: &EvalContext<'_>,
    passed: bool,
    expected: String,
    actual: String,
    diagnostic: Option<Diagnostic>,
) -> ConstraintResult {
    ConstraintResult {
        id: constraint.id(),
        tag: constraint.tag(),
        target: constraint.target.clone(),
        passed,
        severity: constraint.effective_severity(),
        expected,
        actual,
        rows_checked: ctx.rows(),
        diagnostic: if passed { None } else { diagnostic },
    }
}

/// Count failing values and keep the first few for display.
fn diagnose<'v>(failing: impl IntoIterator<Item = &'v ScalarValue>) -> Diagnostic {
    let mut diagnostic = Diagnostic::default();
    for value in failing {
        diagnostic.failing_rows += 1;
        if diagnostic.sample_values.len() < SAMPLE_LIMIT {
            diagnostic.sample_values.push(value.to_string());
        }
    }
    diagnostic
}

fn require_type(
    constraint: &Constraint,
    schema: &SchemaSnapshot,
    accepts: fn(&LogicalType) -> bool,
    expected: &'static str,
) -> QualityResult<()> {
    let dtype = column_type(constraint, schema)?;
    if accepts(&dtype) {
        return Ok(());
    }
    let column = constraint.target.to_string();
    Err(QualityError::IncompatibleType {
        constraint: constraint.id(),
        column,
        dtype,
        expected,
    })
}

fn require_table_target(constraint: &Constraint) -> QualityResult<()> {
    match &constraint.target {
        ConstraintTarget::Table => Ok(()),
        ConstraintTarget::Column(name) => Err(QualityError::InvalidTarget {
            constraint: constraint.id(),
            target: format!("column '{}'", name),
        }),
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Render a non-negative duration with its two largest units.
pub(crate) fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        secs % 86_400 / 3_600,
        secs % 3_600 / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Inclusive numeric bounds.
pub struct RangeCheck;

impl RangeCheck {
    fn bounds(constraint: &Constraint) -> (Option<f64>, Option<f64>) {
        match constraint.kind {
            ConstraintKind::Range { ge, le } => (ge, le),
            _ => (None, None),
        }
    }

    fn describe(ge: Option<f64>, le: Option<f64>) -> String {
        match (ge, le) {
            (Some(ge), Some(le)) => format!(">= {} and <= {}", ge, le),
            (Some(ge), None) => format!(">= {}", ge),
            (None, Some(le)) => format!("<= {}", le),
            (None, None) => "any value".to_string(),
        }
    }
}

impl ConstraintEvaluator for RangeCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::Range
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        let invalid = |message: &str| QualityError::InvalidBounds {
            constraint: constraint.id(),
            message: message.to_string(),
        };
        match Self::bounds(constraint) {
            (None, None) => return Err(invalid("at least one of ge or le is required")),
            (Some(ge), Some(le)) if ge > le => return Err(invalid("ge is greater than le")),
            (ge, le) if ge.is_some_and(f64::is_nan) || le.is_some_and(f64::is_nan) => {
                return Err(invalid("bounds must be numbers"))
            }
            _ => {}
        }
        require_type(constraint, schema, LogicalType::is_numeric, "numeric")
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let column = ctx.column(constraint)?;
        let (ge, le) = Self::bounds(constraint);
        let expected = Self::describe(ge, le);

        let numeric: Vec<(&ScalarValue, f64)> = column
            .non_null()
            .filter_map(|v| v.as_f64().map(|x| (v, x)))
            .collect();
        if numeric.is_empty() {
            return Ok(finish(
                constraint,
                ctx,
                true,
                expected,
                "no non-null values".to_string(),
                None,
            ));
        }

        let (min, max) = numeric
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, x)| {
                (lo.min(*x), hi.max(*x))
            });
        let out_of_range = |x: f64| ge.is_some_and(|g| x < g) || le.is_some_and(|l| x > l);
        let diagnostic = diagnose(
            numeric
                .iter()
                .filter(|(_, x)| out_of_range(*x))
                .map(|(v, _)| *v),
        );
        Ok(finish(
            constraint,
            ctx,
            diagnostic.failing_rows == 0,
            expected,
            format!("min={}, max={}", min, max),
            Some(diagnostic),
        ))
    }
}

/// No null values.
pub struct NotNullCheck;

impl ConstraintEvaluator for NotNullCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::NotNull
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        column_type(constraint, schema).map(|_| ())
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let column = ctx.column(constraint)?;
        let nulls = column.null_count() as u64;
        Ok(finish(
            constraint,
            ctx,
            nulls == 0,
            "no nulls".to_string(),
            format!("{} nulls ({:.1}%)", nulls, percent(nulls, ctx.rows()) * 100.0),
            Some(Diagnostic {
                failing_rows: nulls,
                sample_values: Vec::new(),
            }),
        ))
    }
}

/// Fraction of null rows at most a threshold.
pub struct MaxNullPctCheck;

impl MaxNullPctCheck {
    fn threshold(constraint: &Constraint) -> f64 {
        match constraint.kind {
            ConstraintKind::MaxNullPct { threshold } => threshold,
            _ => 1.0,
        }
    }
}

impl ConstraintEvaluator for MaxNullPctCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::MaxNullPct
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        let threshold = Self::threshold(constraint);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(QualityError::InvalidThreshold {
                constraint: constraint.id(),
                value: threshold,
            });
        }
        column_type(constraint, schema).map(|_| ())
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let column = ctx.column(constraint)?;
        let threshold = Self::threshold(constraint);
        let nulls = column.null_count() as u64;
        // An empty result has no nulls to count.
        let ratio = percent(nulls, column.len() as u64);
        Ok(finish(
            constraint,
            ctx,
            ratio <= threshold,
            format!("nulls <= {:.1}%", threshold * 100.0),
            format!("{:.1}% nulls", ratio * 100.0),
            Some(Diagnostic {
                failing_rows: nulls,
                sample_values: Vec::new(),
            }),
        ))
    }
}

/// Every non-null value is in a fixed set.
pub struct AllowedValuesCheck;

impl ConstraintEvaluator for AllowedValuesCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::AllowedValues
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        if let ConstraintKind::AllowedValues { values } = &constraint.kind {
            if values.is_empty() {
                return Err(QualityError::EmptyAllowedValues {
                    constraint: constraint.id(),
                });
            }
        }
        require_type(
            constraint,
            schema,
            LogicalType::is_categorical,
            "categorical (bool, integer or string)",
        )
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let column = ctx.column(constraint)?;
        let values = match &constraint.kind {
            ConstraintKind::AllowedValues { values } => values.as_slice(),
            _ => &[],
        };
        let listed = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let diagnostic = diagnose(
            column
                .non_null()
                .filter(|v| !values.iter().any(|allowed| allowed.matches(v))),
        );
        Ok(finish(
            constraint,
            ctx,
            diagnostic.failing_rows == 0,
            format!("in [{}]", listed),
            format!("{} invalid values", diagnostic.failing_rows),
            Some(diagnostic),
        ))
    }
}

/// Every non-null string contains a match of a regular expression.
pub struct PatternCheck;

impl PatternCheck {
    fn compile(constraint: &Constraint) -> QualityResult<Regex> {
        let pattern = match &constraint.kind {
            ConstraintKind::Pattern { regex } => regex.as_str(),
            _ => "",
        };
        Regex::new(pattern).map_err(|e| QualityError::InvalidPattern {
            constraint: constraint.id(),
            message: e.to_string(),
        })
    }
}

impl ConstraintEvaluator for PatternCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::Pattern
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        Self::compile(constraint)?;
        require_type(
            constraint,
            schema,
            |t| *t == LogicalType::String,
            "string",
        )
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let column = ctx.column(constraint)?;
        let regex = Self::compile(constraint)?;
        let diagnostic = diagnose(
            column
                .non_null()
                .filter(|v| !v.as_str().is_some_and(|s| regex.is_match(s))),
        );
        Ok(finish(
            constraint,
            ctx,
            diagnostic.failing_rows == 0,
            format!("matches '{}'", regex.as_str()),
            format!("{} non-matching", diagnostic.failing_rows),
            Some(diagnostic),
        ))
    }
}

/// Named predicate from the [`PredicateRegistry`].
pub struct CustomCheck;

impl CustomCheck {
    fn name(constraint: &Constraint) -> &str {
        match &constraint.kind {
            ConstraintKind::Custom { name } => name,
            _ => "",
        }
    }

    fn predicate<'p>(
        constraint: &Constraint,
        predicates: &'p PredicateRegistry,
    ) -> QualityResult<&'p CustomPredicate> {
        let name = Self::name(constraint);
        predicates
            .get(name)
            .ok_or_else(|| QualityError::UnknownPredicate {
                constraint: constraint.id(),
                name: name.to_string(),
            })
    }
}

impl ConstraintEvaluator for CustomCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::Custom
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        let predicate = Self::predicate(constraint, predicates)?;
        match (&constraint.target, predicate.is_row()) {
            (ConstraintTarget::Column(_), _) => column_type(constraint, schema).map(|_| ()),
            (ConstraintTarget::Table, false) => Ok(()),
            (ConstraintTarget::Table, true) => Err(QualityError::InvalidTarget {
                constraint: constraint.id(),
                target: "the table (row predicates need a column)".to_string(),
            }),
        }
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let predicate = Self::predicate(constraint, ctx.predicates)?;
        let expected = format!("custom check '{}'", Self::name(constraint));
        match predicate {
            CustomPredicate::Row(check) => {
                let column = ctx.column(constraint)?;
                let diagnostic = diagnose(column.values.iter().filter(|v| !check(*v)));
                Ok(finish(
                    constraint,
                    ctx,
                    diagnostic.failing_rows == 0,
                    expected,
                    format!("{} failing rows", diagnostic.failing_rows),
                    Some(diagnostic),
                ))
            }
            CustomPredicate::Table(check) => {
                let passed = check(ctx.data);
                let actual = if passed { "passed" } else { "failed" };
                Ok(finish(
                    constraint,
                    ctx,
                    passed,
                    expected,
                    actual.to_string(),
                    None,
                ))
            }
        }
    }
}

/// Table holds at least a minimum number of rows.
pub struct MinRowCountCheck;

impl ConstraintEvaluator for MinRowCountCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::MinRowCount
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        _schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        require_table_target(constraint)
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let min = match constraint.kind {
            ConstraintKind::MinRowCount { min } => min,
            _ => 0,
        };
        let rows = ctx.rows();
        Ok(finish(
            constraint,
            ctx,
            rows >= min,
            format!(">= {} rows", min),
            format!("{} rows", rows),
            None,
        ))
    }
}

/// Newest timestamp in the data is no older than a bound.
pub struct MaxStalenessCheck;

impl ConstraintEvaluator for MaxStalenessCheck {
    fn tag(&self) -> ConstraintTag {
        ConstraintTag::MaxStaleness
    }

    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        _predicates: &PredicateRegistry,
    ) -> QualityResult<()> {
        require_table_target(constraint)?;
        let ConstraintKind::MaxStaleness {
            timestamp_field, ..
        } = &constraint.kind
        else {
            return Ok(());
        };
        let dtype = schema
            .field(timestamp_field)
            .map(|f| f.dtype)
            .ok_or_else(|| QualityError::UnknownColumn {
                constraint: constraint.id(),
                column: timestamp_field.clone(),
            })?;
        if dtype.is_temporal() {
            Ok(())
        } else {
            Err(QualityError::IncompatibleType {
                constraint: constraint.id(),
                column: timestamp_field.clone(),
                dtype,
                expected: "date or datetime",
            })
        }
    }

    fn evaluate(
        &self,
        constraint: &Constraint,
        ctx: &EvalContext<'_>,
    ) -> QualityResult<ConstraintResult> {
        let ConstraintKind::MaxStaleness {
            max,
            timestamp_field,
        } = &constraint.kind
        else {
            return Err(QualityError::MissingEvaluator {
                tag: constraint.tag(),
            });
        };
        let expected = format!("newest {} within {}", timestamp_field, max);
        let Some(newest) = ctx.data.max_datetime(timestamp_field) else {
            return Ok(finish(
                constraint,
                ctx,
                false,
                expected,
                "no timestamp values".to_string(),
                None,
            ));
        };
        let age = ctx.now - newest;
        Ok(finish(
            constraint,
            ctx,
            age <= max.to_chrono(),
            expected,
            format!("newest {} ({} old)", newest, format_age(age)),
            None,
        ))
    }
}

#[cfg(test)]
#[path = "checks_test.rs"]
mod tests;
