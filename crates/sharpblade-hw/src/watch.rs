//! Polling file watcher.
//!
//! Watches a single path by sampling it on a fixed interval and reports
//! changes as [`FsEvent`]s on an mpsc queue. A sample is the file's length,
//! modification time and a CRC-32 of its contents, so a rewrite with the same
//! length inside one mtime tick is still seen as a change.

use crate::{Error, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shortest poll interval; a zero interval is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// What happened to the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Changed,
    Removed,
}

/// A change notification for a watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    len: u64,
    modified: Option<SystemTime>,
    checksum: Option<u32>,
}

fn snapshot(path: &Path) -> Option<Snapshot> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    Some(Snapshot {
        len: metadata.len(),
        modified: metadata.modified().ok(),
        checksum: std::fs::read(path).ok().map(|data| CRC32.checksum(&data)),
    })
}

fn diff(before: &Option<Snapshot>, after: &Option<Snapshot>) -> Option<FsEventKind> {
    match (before, after) {
        (None, Some(_)) => Some(FsEventKind::Created),
        (Some(_), None) => Some(FsEventKind::Removed),
        (Some(a), Some(b)) if a != b => Some(FsEventKind::Changed),
        _ => None,
    }
}

/// Background task polling one file for changes.
pub struct PollWatcher {
    path: PathBuf,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollWatcher {
    /// Starts watching `path`, sending events to `events`.
    ///
    /// The file's state at the time of the call is the baseline; only later
    /// changes are reported. Must be called from within a Tokio runtime.
    pub fn spawn(
        path: PathBuf,
        interval: Duration,
        events: mpsc::UnboundedSender<FsEvent>,
    ) -> Result<Self> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;

        let interval = if interval.is_zero() {
            warn!(
                "Poll interval of zero for {:?}, using {:?}",
                path, MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        let baseline = snapshot(&path);
        let watched = path.clone();
        let task = handle.spawn(async move {
            let mut last = baseline;
            loop {
                tokio::time::sleep(interval).await;
                let current = snapshot(&watched);
                if let Some(kind) = diff(&last, &current) {
                    debug!("{:?}: {:?}", watched, kind);
                    let event = FsEvent {
                        kind,
                        path: watched.clone(),
                    };
                    if events.send(event).is_err() {
                        // Receiver gone, nobody is listening
                        break;
                    }
                }
                last = current;
            }
        });

        debug!("Watching {:?} every {:?}", path, interval);
        Ok(Self {
            path,
            interval,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the polling task is running.
    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops polling. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
            debug!("Stopped watching {:?}", self.path);
        }
    }
}

impl Drop for PollWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff() {
        let a = Some(Snapshot {
            len: 1,
            modified: None,
            checksum: Some(1),
        });
        let b = Some(Snapshot {
            len: 2,
            modified: None,
            checksum: Some(1),
        });
        let c = Some(Snapshot {
            len: 1,
            modified: None,
            checksum: Some(2),
        });
        assert_eq!(diff(&None, &a), Some(FsEventKind::Created));
        assert_eq!(diff(&a, &b), Some(FsEventKind::Changed));
        assert_eq!(diff(&a, &c), Some(FsEventKind::Changed));
        assert_eq!(diff(&a, &None), Some(FsEventKind::Removed));
        assert_eq!(diff(&a, &a.clone()), None);
        assert_eq!(diff(&None, &None), None);
    }

    #[tokio::test]
    async fn test_reports_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("My.App");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = PollWatcher::spawn(path.clone(), Duration::from_millis(10), tx).unwrap();
        assert!(watcher.is_active());

        std::fs::write(&path, b"state").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, FsEventKind::Created);
        assert_eq!(event.path, path);

        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_active());
    }

    #[test]
    fn test_same_length_rewrite_is_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("My.App");
        std::fs::write(&path, b"aaaa").unwrap();
        let before = snapshot(&path);
        let modified = before.as_ref().and_then(|s| s.modified).unwrap();

        std::fs::write(&path, b"bbbb").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        let after = snapshot(&path);

        assert_eq!(after.as_ref().map(|s| s.len), Some(4));
        assert_eq!(after.as_ref().and_then(|s| s.modified), Some(modified));
        assert_eq!(diff(&before, &after), Some(FsEventKind::Changed));
    }

    #[tokio::test]
    async fn test_zero_interval_uses_floor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("My.App");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = PollWatcher::spawn(path.clone(), Duration::ZERO, tx).unwrap();
        assert_eq!(watcher.interval(), MIN_POLL_INTERVAL);

        std::fs::write(&path, b"state").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, FsEventKind::Created);
        assert!(watcher.is_active());
    }
}
