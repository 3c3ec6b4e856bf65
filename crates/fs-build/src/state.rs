//! Per-table build state machine.

use crate::error::{BuildError, BuildResult};
use chrono::{DateTime, Utc};
use fs_core::TableName;
use serde::Serialize;
use std::fmt;

/// Where a table is in its build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableState {
    Pending,
    Compiling,
    Executing,
    Validating,
    Writing,
    Persisting,
    Succeeded,
    Failed,
    Skipped,
}

impl TableState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableState::Pending => "pending",
            TableState::Compiling => "compiling",
            TableState::Executing => "executing",
            TableState::Validating => "validating",
            TableState::Writing => "writing",
            TableState::Persisting => "persisting",
            TableState::Succeeded => "succeeded",
            TableState::Failed => "failed",
            TableState::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TableState::Succeeded | TableState::Failed | TableState::Skipped
        )
    }

    /// The state after this one on the success path.
    pub fn next(&self) -> Option<TableState> {
        match self {
            TableState::Pending => Some(TableState::Compiling),
            TableState::Compiling => Some(TableState::Executing),
            TableState::Executing => Some(TableState::Validating),
            TableState::Validating => Some(TableState::Writing),
            TableState::Writing => Some(TableState::Persisting),
            TableState::Persisting => Some(TableState::Succeeded),
            TableState::Succeeded | TableState::Failed | TableState::Skipped => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    ///
    /// Any non-terminal state may fail; only `pending` may be skipped.
    pub fn can_transition_to(&self, to: TableState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            TableState::Failed => true,
            TableState::Skipped => *self == TableState::Pending,
            _ => self.next() == Some(to),
        }
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: TableState,
    pub to: TableState,
    pub at: DateTime<Utc>,
}

/// State of one table plus the transitions that led there.
#[derive(Debug, Clone)]
pub struct TableStateMachine {
    table: TableName,
    state: TableState,
    history: Vec<Transition>,
}

impl TableStateMachine {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            state: TableState::Pending,
            history: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, to: TableState) -> BuildResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(BuildError::InvalidTransition {
                table: self.table.to_string(),
                from: self.state,
                to,
            });
        }
        log::debug!("{}: {} -> {}", self.table, self.state, to);
        self.history.push(Transition {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
        Ok(())
    }

    /// Step along the success path.
    pub fn advance(&mut self) -> BuildResult<TableState> {
        let next = self.state.next().ok_or_else(|| BuildError::InvalidTransition {
            table: self.table.to_string(),
            from: self.state,
            to: self.state,
        })?;
        self.transition(next)?;
        Ok(next)
    }

    /// States visited, starting with `pending`.
    pub fn path(&self) -> Vec<TableState> {
        std::iter::once(TableState::Pending)
            .chain(self.history.iter().map(|t| t.to))
            .collect()
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
