//! Added/removed/modified classification of a single commit
//!
//! The name-status report is consumed as it streams out of git: a scanner
//! thread classifies lines while the calling thread drains stderr and waits
//! for the process. The scanner hands its result back over a one-shot
//! channel, which is always received before the process status is checked.

use serde::Serialize;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use crate::core::error::{GitError, Result};
use crate::core::frame;
use crate::core::model::{Kind, ResultItem, Source};
use crate::git::repository::Repository;

/// Paths touched by a commit, grouped by change type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitFileStatus {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl CommitFileStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn to_result_item(&self, commit_id: &str) -> ResultItem {
        ResultItem::structured(
            Kind::FileStatus,
            Source::Log,
            serde_json::to_value(self).unwrap_or_default(),
        )
        .with_commit(commit_id)
    }
}

/// Classify a `--name-status` report record by record.
///
/// Only `A`, `D` and `M` are recognised; renames, copies and type changes are
/// dropped, as are lines with fewer than two fields. Paths are taken verbatim
/// after the tab, so names containing spaces survive. Records are split on raw
/// bytes: a path that is not valid UTF-8 is decoded lossily and scanning
/// continues. A read error fails the whole report.
pub fn classify_name_status<R: BufRead>(reader: R) -> io::Result<CommitFileStatus> {
    let mut status = CommitFileStatus::new();

    for record in reader.split(b'\n') {
        let record = record?;
        let line = String::from_utf8_lossy(&record);
        let line = line.trim_end_matches('\r');

        // `<code> TAB <path>`; paths may contain spaces
        let Some((code, path)) = frame::split_pair(line, '\t') else {
            continue;
        };
        let (code, path) = (code.trim(), path.trim_end());
        if code.is_empty() || path.is_empty() {
            continue;
        }

        let path = path.to_string();
        match code.chars().next() {
            Some('A') => status.added.push(path),
            Some('D') => status.removed.push(path),
            Some('M') => status.modified.push(path),
            _ => debug!("ignoring status line {:?}", line),
        }
    }

    Ok(status)
}

impl Repository {
    /// File status of `commit_id` relative to its first parent
    pub fn get_commit_file_status(&self, commit_id: &str) -> Result<CommitFileStatus> {
        let cmd = self.command(["log", "-1", "--name-status", "--pretty=format:", commit_id]);
        let mut child = cmd.spawn_in_dir(self.path())?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::ParseFailure("git stdout was not captured".to_string()))?;
        let mut stderr_pipe = child.stderr.take();

        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let scanner = thread::spawn(move || {
            let status = classify_name_status(BufReader::new(stdout));
            // receiver outlives the scanner; a failed send only means the
            // caller already bailed out
            let _ = done_tx.send(status);
        });

        let mut stderr = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            if let Err(e) = pipe.read_to_end(&mut stderr) {
                warn!("could not read git stderr: {}", e);
            }
        }
        let stderr = String::from_utf8_lossy(&stderr);

        // git exiting closes the write end of stdout, which ends the scan
        let exit = child.wait();
        let scanned = done_rx.recv();
        if scanner.join().is_err() {
            return Err(GitError::ParseFailure(
                "name-status scanner panicked".to_string(),
            ));
        }

        let exit = exit?;
        if !exit.success() {
            return Err(cmd.streamed_failure(exit, &stderr));
        }

        let status = scanned
            .map_err(|_| GitError::ParseFailure("name-status scanner ended early".to_string()))??;
        if status.is_empty() {
            debug!("{} touches no added, removed or modified paths", commit_id);
        }
        debug!(
            added = status.added.len(),
            removed = status.removed.len(),
            modified = status.modified.len(),
            "classified {}",
            commit_id
        );
        Ok(status)
    }
}
