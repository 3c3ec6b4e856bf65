//! Aggregation of constraint results into a build decision.

use fs_core::ConstraintResult;
use serde::Serialize;

/// Constraint results of one table, with the write decision derived from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub results: Vec<ConstraintResult>,
}

impl QualityReport {
    pub fn new(results: Vec<ConstraintResult>) -> Self {
        Self { results }
    }

    /// True when no error-severity constraint failed; the write may proceed.
    pub fn passed(&self) -> bool {
        !self.results.iter().any(ConstraintResult::is_blocking)
    }

    pub fn error_failures(&self) -> Vec<&ConstraintResult> {
        self.results.iter().filter(|r| r.is_blocking()).collect()
    }

    pub fn warnings(&self) -> Vec<&ConstraintResult> {
        self.results.iter().filter(|r| r.is_warning()).collect()
    }

    pub fn warning_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_warning()).count()
    }

    /// One-line reason for a blocked write, e.g.
    /// `2 constraints failed: amount:range, user_id:not_null`.
    pub fn failure_summary(&self) -> Option<String> {
        let failures = self.error_failures();
        if failures.is_empty() {
            return None;
        }
        let ids: Vec<&str> = failures.iter().map(|r| r.id.as_str()).collect();
        let noun = if ids.len() == 1 {
            "constraint"
        } else {
            "constraints"
        };
        Some(format!("{} {} failed: {}", ids.len(), noun, ids.join(", ")))
    }

    pub fn into_results(self) -> Vec<ConstraintResult> {
        self.results
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
