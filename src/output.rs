// src/output.rs
//! Artifact persistence. Readers never see a half-written file: content goes
//! to a temp file in the target directory, is synced, then renamed over the
//! artifact.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::WriteError;
use crate::ingest::types::Posting;

fn ensure_parent(path: &Path) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| WriteError::new(parent, "create_dir", e))?;
        }
    }
    Ok(())
}

/// Write `path` atomically with whatever `fill` produces. When `fill` fails
/// the temp file is removed and the existing artifact is left untouched.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<(), WriteError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(|e| WriteError::new(dir, "create_temp", e))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        fill(&mut out).map_err(|e| WriteError::new(path, "serialize", e))?;
        out.flush().map_err(|e| WriteError::new(path, "flush", e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| WriteError::new(path, "sync", e))?;
    tmp.persist(path)
        .map_err(|e| WriteError::new(path, "rename", e.error))?;
    Ok(())
}

/// Persist the run's postings as a pretty-printed JSON array.
pub fn write_snapshot(path: &Path, postings: &[Posting]) -> Result<(), WriteError> {
    write_atomic(path, |w| {
        serde_json::to_writer_pretty(&mut *w, postings).map_err(io::Error::from)?;
        w.write_all(b"\n")
    })
}
