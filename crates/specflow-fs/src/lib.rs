//! File system utilities for Specflow.
//!
//! All mutation of shared directories goes through [`write_atomic`]: the full
//! payload is written to a dot-prefixed temp file in the same directory,
//! synced, and renamed into place. A concurrent reader therefore sees either
//! the prior complete file or the new complete file, never a mixture. No
//! locks are taken anywhere in this crate.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use specflow_core::{Error, Result};

/// Suffix used for in-flight temp files; readers and the change watcher
/// must ignore paths carrying it.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Read a file to string with a size limit.
pub fn read_to_string(path: impl AsRef<Path>, max_size: u64) -> Result<String> {
    let path = path.as_ref();

    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::not_found(format!("file: {}", path.display())),
        _ => Error::io(path, e),
    })?;

    if metadata.len() > max_size {
        return Err(Error::validation(format!(
            "file too large: {} bytes (max: {}): {}",
            metadata.len(),
            max_size,
            path.display()
        )));
    }

    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Temp-file path alongside `path`, carrying [`TEMP_SUFFIX`].
fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    match path.file_name() {
        Some(name) => temp.set_file_name(format!(".{}{TEMP_SUFFIX}", name.to_string_lossy())),
        None => temp.push(TEMP_SUFFIX),
    }
    temp
}

/// Write to a file atomically (write to temp, sync, then rename).
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or(Path::new("."));

    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let temp_path = temp_path_for(path);
    {
        let mut file = File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| Error::io(&temp_path, e))?;
        file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })
}

/// Write string to file atomically.
pub fn write_string_atomic(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    write_atomic(path, contents.as_bytes())
}

/// Ensure a directory exists.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Copy a file with optional overwrite protection.
pub fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>, overwrite: bool) -> Result<u64> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !overwrite && dst.exists() {
        return Err(Error::conflict(format!(
            "destination already exists: {}",
            dst.display()
        )));
    }

    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    fs::copy(src, dst).map_err(|e| Error::io(dst, e))
}

/// Delete a file if it exists. Returns whether anything was removed.
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_file(path).map_err(|e| Error::io(path, e))?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// List regular files in a directory, non-recursively.
///
/// In-flight temp files are excluded so a half-committed write never shows
/// up in a listing.
pub fn list_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    let read_dir = fs::read_dir(dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::not_found(format!("directory: {}", dir.display())),
        _ => Error::io(dir, e),
    })?;

    for entry in read_dir {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TEMP_SUFFIX))
        {
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Modification time of a file.
pub fn modified_at(path: impl AsRef<Path>) -> Result<SystemTime> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::not_found(format!("file: {}", path.display())),
        _ => Error::io(path, e),
    })?;
    metadata.modified().map_err(|e| Error::io(path, e))
}
