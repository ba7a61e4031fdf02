//! Change watcher: polling-based observation of specification and state
//! directories.
//!
//! Implemented by directory listing plus modification-time comparison rather
//! than a filesystem-event subscription, because the target environment may
//! be a network or sandboxed filesystem without reliable notifications. A
//! caller resumes after its own restart by passing the cursor (latest
//! timestamp) returned from its previous run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use specflow_core::{Error, Result};
use tracing::debug;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File appeared since the last poll (or since the cursor).
    Created,
    /// File's modification time advanced since the last poll.
    Modified,
}

/// One observed change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Path of the changed file.
    pub path: PathBuf,
    /// Created or modified.
    pub kind: ChangeKind,
    /// The file's modification time.
    pub timestamp: DateTime<Utc>,
}

/// Polls one directory for additions and modifications.
///
/// Backup files and in-flight temp files never produce events; a
/// half-committed write is invisible here just as it is to readers.
#[derive(Debug)]
pub struct ChangeWatcher {
    dir: PathBuf,
    since: Option<DateTime<Utc>>,
    known: HashMap<PathBuf, DateTime<Utc>>,
    cursor: Option<DateTime<Utc>>,
}

impl ChangeWatcher {
    /// Watch `dir`, reporting every existing file as created on the first
    /// poll.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::since(dir, None)
    }

    /// Watch `dir`, resuming from a cursor: files not modified after `since`
    /// are treated as already seen and produce no event.
    pub fn since(dir: impl Into<PathBuf>, since: Option<DateTime<Utc>>) -> Self {
        Self {
            dir: dir.into(),
            since,
            known: HashMap::new(),
            cursor: since,
        }
    }

    /// The latest modification time observed so far; pass back into
    /// [`ChangeWatcher::since`] to resume after a restart.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// List the directory and report changes since the previous poll (or the
    /// cursor, on the first poll).
    pub fn poll(&mut self) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();

        for path in specflow_fs::list_files(&self.dir)? {
            if is_ignored(&path) {
                continue;
            }
            // A file can vanish between the listing and the stat (concurrent
            // delete or cleanup); that is not this watcher's error to report.
            let modified: DateTime<Utc> = match specflow_fs::modified_at(&path) {
                Ok(time) => time.into(),
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };

            match self.known.get(&path) {
                Some(prev) if modified > *prev => {
                    events.push(ChangeEvent {
                        path: path.clone(),
                        kind: ChangeKind::Modified,
                        timestamp: modified,
                    });
                }
                Some(_) => {}
                None => {
                    // Unknown path: new to this watcher. Under a resume
                    // cursor, files older than the cursor were seen by the
                    // previous run.
                    if self.since.map_or(true, |s| modified > s) {
                        events.push(ChangeEvent {
                            path: path.clone(),
                            kind: ChangeKind::Created,
                            timestamp: modified,
                        });
                    }
                }
            }

            self.known.insert(path, modified);
            if self.cursor.map_or(true, |c| modified > c) {
                self.cursor = Some(modified);
            }
        }

        if !events.is_empty() {
            debug!(dir = %self.dir.display(), count = events.len(), "observed changes");
        }
        Ok(events)
    }
}

/// Paths that must never produce change events.
fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".backup") || n.ends_with(".tmp"))
}
