// atomic.rs — Temp-file-then-rename writes.
//
// Replace-whole artifacts (capability index, revocation set, issuer
// keys) must never be written in place: a crash mid-write would lose
// both the old and new state. The temp file lives in the same directory
// as the target so the rename stays on one filesystem.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::StoreError;

/// Serialize `value` as pretty JSON and swap it into place atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp = path.with_file_name(format!("{}.tmp", file_name));

    let io_err = |source: std::io::Error, p: &Path| StoreError::Io {
        path: p.display().to_string(),
        source,
    };

    let mut file = File::create(&tmp).map_err(|e| io_err(e, &tmp))?;
    file.write_all(json.as_bytes()).map_err(|e| io_err(e, &tmp))?;
    file.write_all(b"\n").map_err(|e| io_err(e, &tmp))?;
    // The data must be durable before the rename makes it visible.
    file.sync_all().map_err(|e| io_err(e, &tmp))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| io_err(e, path))?;
    Ok(())
}
