//! CLI command implementations

pub(crate) mod build;
pub(crate) mod common;
pub(crate) mod compile;
pub(crate) mod freshness;
pub(crate) mod ls;
