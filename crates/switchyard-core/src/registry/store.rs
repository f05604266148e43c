use std::fs;
use std::path::Path;

use switchyard_types::ApiKeyRecord;

use crate::error::AppResult;

/// Missing file is an empty registry.
pub(super) fn load_records(path: &Path) -> AppResult<Vec<ApiKeyRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

pub(super) fn save_records(path: &Path, records: &[ApiKeyRecord]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(records)?;

    // Atomic write
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
