//! Discovery and parsing of feature table files

use crate::error::{CoreError, CoreResult};
use crate::feature_table::FeatureTableDefinition;
use std::path::{Path, PathBuf};

/// Recursively collect `.yml`/`.yaml` files under `dir`, sorted by path so
/// discovery order does not depend on the filesystem.
pub(crate) fn discover_table_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_yaml_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_yaml_files(dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_yaml_files(&path, files)?;
            continue;
        }
        if path.extension().is_some_and(|e| e == "yml" || e == "yaml") {
            files.push(path);
        }
    }
    Ok(())
}

/// Parse one feature table file.
pub(crate) fn load_table_file(path: &Path) -> CoreResult<FeatureTableDefinition> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidDefinition {
        table: path.display().to_string(),
        message: e.to_string(),
    })
}
