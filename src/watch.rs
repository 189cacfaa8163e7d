//! The reconcile loop: keeps the tracked-file set in sync with the
//! filesystem and drains every tracked file once per poll cycle.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cursor::TailCursor;
use crate::discover::discover_files;
use crate::glob::GlobSet;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot watch {path}: {source}")]
    Root { path: PathBuf, source: io::Error },
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("interval must be strictly positive, got {0}")]
    NonPositiveInterval(f64),
}

/// Converts a user-supplied interval in seconds into a `Duration`,
/// rejecting zero, negative and non-finite values.
pub fn interval_from_secs(secs: f64) -> Result<Duration, Error> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(Error::NonPositiveInterval(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Event emitted by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// A path started matching after startup and is now tracked.
    NewFile(PathBuf),
    /// A complete line appended to a tracked file.
    Line { source: PathBuf, line: String },
}

/// Follows every file under a root whose name matches a glob set.
///
/// Owns one [`TailCursor`] per tracked path. Two cadences share the map on
/// a single task: `scan` reconciles the tracked set against a fresh
/// discovery pass, `poll` drains every cursor. They never run concurrently
/// with each other or themselves, so the map needs no locking.
#[derive(Debug)]
pub struct TailMux {
    root: PathBuf,
    globs: GlobSet,
    cursors: BTreeMap<PathBuf, TailCursor>,
}

impl TailMux {
    /// Canonicalizes the root, verifies it is a directory, and performs
    /// initial discovery. Files found now start at their current end, so
    /// pre-existing content is not replayed.
    pub async fn new(root: impl Into<PathBuf>, globs: GlobSet) -> Result<Self, Error> {
        let root = root.into();
        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|source| Error::Root {
                path: root.clone(),
                source,
            })?;

        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|source| Error::Root {
                path: root.clone(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory(root));
        }

        let mut mux = TailMux {
            root,
            globs,
            cursors: BTreeMap::new(),
        };

        for path in discover_files(&mux.root, &mux.globs) {
            let cursor = TailCursor::at_end(&path).await;
            mux.cursors.insert(path, cursor);
        }

        Ok(mux)
    }

    /// The canonicalized root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tracked_count(&self) -> usize {
        self.cursors.len()
    }

    /// Tracked paths in lexicographic order.
    pub fn tracked_paths(&self) -> impl Iterator<Item = &Path> {
        self.cursors.keys().map(PathBuf::as_path)
    }

    /// Reconciles the tracked set against the filesystem.
    ///
    /// Newly matching paths are tracked from offset 0 and returned so the
    /// caller can announce them. Paths no longer observed are dropped
    /// immediately, buffered fragments included; an in-flight partial line
    /// at removal time is never emitted.
    pub fn scan(&mut self) -> Vec<PathBuf> {
        let current = discover_files(&self.root, &self.globs);

        self.cursors.retain(|path, _| current.contains(path));

        let mut added = Vec::new();
        for path in current {
            self.cursors.entry(path.clone()).or_insert_with(|| {
                added.push(path.clone());
                TailCursor::from_start(path)
            });
        }

        added
    }

    /// Drains every tracked file once, in lexicographic path order, and
    /// returns the emitted lines as `(path, line)` pairs.
    pub async fn poll(&mut self) -> Vec<(PathBuf, String)> {
        let mut out = Vec::new();

        for (path, cursor) in self.cursors.iter_mut() {
            for line in cursor.drain().await {
                out.push((path.clone(), line));
            }
        }

        out
    }

    /// Runs both cadences until the token is cancelled.
    ///
    /// Cancellation is observed between cycles; the pass in flight always
    /// completes, and no partial state is persisted afterwards.
    pub async fn run<F>(
        &mut self,
        scan_every: Duration,
        poll_every: Duration,
        shutdown: CancellationToken,
        mut emit: F,
    ) where
        F: FnMut(TailEvent),
    {
        let mut scan_tick = time::interval(scan_every);
        let mut poll_tick = time::interval(poll_every);
        scan_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = scan_tick.tick() => {
                    for path in self.scan() {
                        emit(TailEvent::NewFile(path));
                    }
                }
                _ = poll_tick.tick() => {
                    for (source, line) in self.poll().await {
                        emit(TailEvent::Line { source, line });
                    }
                }
            }
        }
    }
}
