//! Named custom predicates referenced by `custom:` field checks.

use fs_core::{ScalarValue, TableData};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type RowFn = dyn Fn(&ScalarValue) -> bool + Send + Sync;
type TableFn = dyn Fn(&TableData) -> bool + Send + Sync;

/// A user-supplied check.
#[derive(Clone)]
pub enum CustomPredicate {
    /// Called once per value of the target column (nulls included); every
    /// value must pass.
    Row(Arc<RowFn>),
    /// Called once with the whole result set.
    Table(Arc<TableFn>),
}

impl CustomPredicate {
    pub fn is_row(&self) -> bool {
        matches!(self, CustomPredicate::Row(_))
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomPredicate::Row(_) => f.write_str("CustomPredicate::Row"),
            CustomPredicate::Table(_) => f.write_str("CustomPredicate::Table"),
        }
    }
}

/// Predicates by name.
#[derive(Debug, Clone, Default)]
pub struct PredicateRegistry {
    predicates: BTreeMap<String, CustomPredicate>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_row<F>(&mut self, name: &str, predicate: F)
    where
        F: Fn(&ScalarValue) -> bool + Send + Sync + 'static,
    {
        self.predicates
            .insert(name.to_string(), CustomPredicate::Row(Arc::new(predicate)));
    }

    pub fn register_table<F>(&mut self, name: &str, predicate: F)
    where
        F: Fn(&TableData) -> bool + Send + Sync + 'static,
    {
        self.predicates
            .insert(name.to_string(), CustomPredicate::Table(Arc::new(predicate)));
    }

    pub fn get(&self, name: &str) -> Option<&CustomPredicate> {
        self.predicates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }
}
