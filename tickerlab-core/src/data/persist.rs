//! Atomic CSV persistence.
//!
//! Layout: `{output_dir}/{TICKER}_{source}.csv`
//!
//! Writes go to a uniquely named temp file in the destination directory, are
//! fsynced, then renamed into place. A reader sees either the previous complete
//! file or the new complete file, never a truncated one. Two tasks writing the
//! same destination never share a temp file; the last rename wins.

use super::provider::{DataError, SourceKind};
use super::schema::RecordSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Destination file for one (ticker, source) pair.
///
/// Path separators inside a ticker are replaced so the file always lands
/// directly inside `dir`.
pub fn output_path(dir: &Path, ticker: &str, source: SourceKind) -> PathBuf {
    let safe: String = ticker
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    dir.join(format!("{safe}_{}.csv", source.file_tag()))
}

/// Write a record set as CSV (header + rows). Returns the number of data rows.
pub fn write_atomic(path: &Path, records: &RecordSet) -> Result<usize, DataError> {
    write_atomic_with(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(records.header())
            .map_err(|e| DataError::Io(format!("write header: {e}")))?;
        for row in records.rows() {
            writer
                .write_record(row.iter().map(|f| f.to_string()))
                .map_err(|e| DataError::Io(format!("write row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| DataError::Io(format!("flush: {e}")))?;
        Ok(())
    })?;
    Ok(records.len())
}

/// Write plain lines joined by `\n` (no trailing newline).
pub fn write_lines_atomic<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<(), DataError> {
    let body = lines
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    write_bytes_atomic(path, body.as_bytes())
}

pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    write_atomic_with(path, |file| {
        file.write_all(bytes)
            .map_err(|e| DataError::Io(format!("write: {e}")))
    })
}

/// Run `fill` against a temp file next to `path`, then atomically rename it
/// over `path`. The temp file is removed on every error path.
fn write_atomic_with<F>(path: &Path, fill: F) -> Result<(), DataError>
where
    F: FnOnce(&mut fs::File) -> Result<(), DataError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| DataError::Io(format!("create dir {}: {e}", dir.display())))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| DataError::Io(format!("create temp file in {}: {e}", dir.display())))?;

    fill(tmp.as_file_mut())?;

    tmp.as_file()
        .sync_all()
        .map_err(|e| DataError::Io(format!("sync {}: {e}", path.display())))?;

    // Dropping the returned error drops its NamedTempFile, which deletes the temp file.
    tmp.persist(path)
        .map_err(|e| DataError::Io(format!("atomic rename to {}: {}", path.display(), e.error)))?;

    Ok(())
}
