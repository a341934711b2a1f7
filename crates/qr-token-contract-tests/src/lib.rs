//! Locates and loads the frozen JSON contracts under the workspace
//! `contracts/` directory.

use std::path::PathBuf;

use serde_json::Value;

/// Returns the absolute path of `relative` inside `contracts/`.
pub fn contract_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../contracts")
        .join(relative)
}

/// Reads and parses one contract document.
///
/// # Errors
/// Returns a description of the read or parse failure.
pub fn load_contract(relative: &str) -> Result<Value, String> {
    let path = contract_path(relative);
    let raw = std::fs::read_to_string(&path)
        .map_err(|error| format!("{}: {error}", path.display()))?;
    serde_json::from_str(&raw).map_err(|error| format!("{}: {error}", path.display()))
}
