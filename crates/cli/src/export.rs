//! JSON artifact writers.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write `value` as two-space-indented JSON, creating parent directories.
///
/// The file is written next to its destination and renamed into place so a
/// reader never sees a partial artifact.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let body = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    fs::write(tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(e).with_context(|| format!("failed to move into {}", path.display()));
    }

    info!(path = %path.display(), "wrote artifact");
    Ok(())
}

/// Load raw observations from a JSON array file.
pub fn read_raw(path: &Path) -> Result<Vec<gapfill_core::RawCandle>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
