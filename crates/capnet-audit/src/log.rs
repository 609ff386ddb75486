// log.rs — Append-only JSONL audit log.
//
// One JSON receipt per line. Appends are flushed before the decision is
// returned to the caller, so the log's on-disk order is a linear
// extension of emission order. Reads isolate errors per line: a
// truncated or garbled record (a crash mid-append) is skipped with a
// warning, never a reason to fail the whole read.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::AuditError;
use crate::receipt::Receipt;

/// An append-only receipt log backed by a JSONL file.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl AuditLog {
    /// Open (or create) an audit log at the given path. Parent
    /// directories are created as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        // Append mode: existing receipts are never overwritten.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append a receipt and flush.
    pub fn append(&mut self, receipt: &Receipt) -> Result<(), AuditError> {
        let json = serde_json::to_string(receipt)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read all parseable receipts, oldest first. Malformed lines are
    /// skipped with a warning.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Receipt>, AuditError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut receipts = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Receipt>(&line) {
                Ok(receipt) => receipts.push(receipt),
                Err(err) => {
                    tracing::warn!(
                        line = line_num + 1,
                        path = %path.display(),
                        %err,
                        "skipping malformed audit log line"
                    );
                }
            }
        }

        Ok(receipts)
    }

    /// Read receipts filtered for the list_receipts operation: only
    /// those at or after `since`, keeping the newest `limit`.
    pub fn read_recent(
        path: impl AsRef<Path>,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Receipt>, AuditError> {
        let mut receipts = Self::read_all(path)?;
        if let Some(since) = since {
            receipts.retain(|r| r.ts >= since);
        }
        if let Some(limit) = limit {
            let start = receipts.len().saturating_sub(limit);
            receipts.drain(..start);
        }
        Ok(receipts)
    }

    /// The path this log writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
