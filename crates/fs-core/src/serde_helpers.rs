//! Shared serde default functions.

/// Serde default function that returns `true`.
pub fn default_true() -> bool {
    true
}

/// Serde default for project versions.
pub fn default_version() -> String {
    "1.0.0".to_string()
}
