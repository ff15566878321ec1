//! Workaround for misnamed `.rzdisplaystate` files.
//!
//! The SDK saves a thumbnail state file for each app named
//! `<app>.rzdisplaystate`. When the app's executable name contains a dot
//! (`Foo.Bar.exe`), Razer's generator drops the extension and writes a file
//! named just `Foo.Bar`, which the device then ignores. [`DisplayStateFile`]
//! watches for that file and copies it to the name the device expects.

use crate::watch::{FsEvent, FsEventKind, PollWatcher};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Extension the device expects on state files.
pub const DISPLAY_STATE_EXTENSION: &str = "rzdisplaystate";

/// Names involved in the workaround for one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayStateDescriptor {
    app: String,
    file: String,
    compatible: bool,
}

impl DisplayStateDescriptor {
    /// Derives the state file names for an app name (executable name without
    /// extension).
    pub fn new(app: impl Into<String>) -> Self {
        let app = app.into();
        // Razer's generator breaks when there's a dot in the name
        let compatible = !app.contains('.');
        let file = format!("{}.{}", app, DISPLAY_STATE_EXTENSION);
        Self {
            app,
            file,
            compatible,
        }
    }

    /// Builds the descriptor for the running executable.
    pub fn for_current_process() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let app = exe
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("executable path {:?} has no file name", exe),
                ))
            })?;
        Ok(Self::new(app))
    }

    /// Name of the running app; also the name of the misnamed file.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Name the device expects.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// True if Razer's own generator handles this app correctly.
    pub fn is_compatible(&self) -> bool {
        self.compatible
    }

    pub fn workaround_required(&self) -> bool {
        !self.compatible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disabled,
    Armed,
}

struct Reconciler {
    raw: PathBuf,
    corrected: PathBuf,
    state: Mutex<State>,
}

impl Reconciler {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies the raw file to the corrected name. Failures are logged; the
    /// next notification retries.
    fn reconcile(&self) {
        if !self.raw.exists() {
            return;
        }

        let result = (|| -> std::io::Result<()> {
            if self.corrected.exists() {
                std::fs::remove_file(&self.corrected)?;
            }
            std::fs::copy(&self.raw, &self.corrected)?;
            Ok(())
        })();

        match result {
            Ok(()) => debug!("Copied {:?} to {:?}", self.raw, self.corrected),
            Err(e) => error!("Failed to fix RzDisplayState file: {}", e),
        }
    }

    fn handle(&self, event: &FsEvent) {
        if !matches!(event.kind, FsEventKind::Created | FsEventKind::Changed) {
            return;
        }
        if event.path.file_name() != self.raw.file_name() {
            return;
        }

        let state = self.lock();
        if *state == State::Armed {
            self.reconcile();
        }
    }
}

struct Watch {
    watcher: PollWatcher,
    consumer: JoinHandle<()>,
}

impl Watch {
    fn stop(self) {
        self.watcher.stop();
        self.consumer.abort();
    }
}

/// Monitors for and fixes misnamed `.rzdisplaystate` files.
pub struct DisplayStateFile {
    descriptor: DisplayStateDescriptor,
    reconciler: Arc<Reconciler>,
    poll_interval: Duration,
    watch: Mutex<Option<Watch>>,
}

impl DisplayStateFile {
    /// Creates a disabled monitor for files in `directory`.
    pub fn new(
        descriptor: DisplayStateDescriptor,
        directory: impl AsRef<Path>,
        poll_interval: Duration,
    ) -> Self {
        let directory = directory.as_ref();
        info!(
            "Serving {}:{} (RzDisplayState compatible: {})",
            descriptor.app(),
            descriptor.file(),
            if descriptor.is_compatible() { "YES" } else { "NO" }
        );

        let reconciler = Arc::new(Reconciler {
            raw: directory.join(descriptor.app()),
            corrected: directory.join(descriptor.file()),
            state: Mutex::new(State::Disabled),
        });

        Self {
            descriptor,
            reconciler,
            poll_interval,
            watch: Mutex::new(None),
        }
    }

    /// Creates a disabled monitor for the running executable in the current
    /// working directory.
    pub fn for_current_process(poll_interval: Duration) -> Result<Self> {
        let descriptor = DisplayStateDescriptor::for_current_process()?;
        let directory = std::env::current_dir()?;
        Ok(Self::new(descriptor, directory, poll_interval))
    }

    pub fn descriptor(&self) -> &DisplayStateDescriptor {
        &self.descriptor
    }

    /// True if the app needs this workaround for thumbnails to work.
    pub fn workaround_required(&self) -> bool {
        self.descriptor.workaround_required()
    }

    /// Path of the misnamed file the SDK writes.
    pub fn raw_path(&self) -> &Path {
        &self.reconciler.raw
    }

    /// Path the device reads.
    pub fn corrected_path(&self) -> &Path {
        &self.reconciler.corrected
    }

    /// Returns true while monitoring.
    pub fn is_enabled(&self) -> bool {
        *self.reconciler.lock() == State::Armed
    }

    /// Returns true while the file watcher is running.
    pub fn is_watching(&self) -> bool {
        self.watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|watch| watch.watcher.is_active())
    }

    /// Turns monitoring on or off. Returns whether monitoring is now enabled.
    ///
    /// Enabling is refused (and monitoring forced off) for apps that don't
    /// need the workaround. Enabling runs one fix immediately and must be done
    /// from within a Tokio runtime.
    pub fn set_enabled(&self, enabled: bool) -> Result<bool> {
        if !enabled {
            self.disable();
            return Ok(false);
        }

        if !self.workaround_required() {
            warn!("Tried to enable RzDisplayState monitoring on app that is already compatible, aborting.");
            self.disable();
            return Ok(false);
        }

        let mut state = self.reconciler.lock();
        if *state == State::Armed {
            return Ok(true);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = PollWatcher::spawn(self.reconciler.raw.clone(), self.poll_interval, tx)?;
        let consumer = tokio::spawn(consume(self.reconciler.clone(), rx));
        *self.watch.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Watch { watcher, consumer });

        *state = State::Armed;
        info!("Now monitoring for invalid RzDisplayState generation.");
        self.reconciler.reconcile();
        Ok(true)
    }

    fn disable(&self) {
        let was_armed = {
            let mut state = self.reconciler.lock();
            std::mem::replace(&mut *state, State::Disabled) == State::Armed
        };

        if let Some(watch) = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            watch.stop();
        }

        if was_armed {
            info!("No longer monitoring for invalid RzDisplayState generation.");
        }
    }

    /// Feeds a filesystem event to the monitor, as the watcher does.
    /// Ignored unless monitoring is enabled.
    pub fn notify(&self, event: &FsEvent) {
        self.reconciler.handle(event);
    }

    /// Runs the fix once regardless of compatibility or monitoring state.
    ///
    /// On an app that is already compatible this may fight Razer's own
    /// generator.
    pub fn fix(&self) {
        let _state = self.reconciler.lock();
        self.reconciler.reconcile();
    }
}

impl Drop for DisplayStateFile {
    fn drop(&mut self) {
        self.disable();
    }
}

async fn consume(reconciler: Arc<Reconciler>, mut events: mpsc::UnboundedReceiver<FsEvent>) {
    while let Some(event) = events.recv().await {
        reconciler.handle(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(dir: &Path, app: &str) -> DisplayStateFile {
        DisplayStateFile::new(
            DisplayStateDescriptor::new(app),
            dir,
            Duration::from_millis(10),
        )
    }

    fn changed(path: &Path) -> FsEvent {
        FsEvent {
            kind: FsEventKind::Changed,
            path: path.to_path_buf(),
        }
    }

    #[test]
    fn test_descriptor_names() {
        let plain = DisplayStateDescriptor::new("MyApp");
        assert!(plain.is_compatible());
        assert!(!plain.workaround_required());
        assert_eq!(plain.file(), "MyApp.rzdisplaystate");

        for app in ["My.App", "Foo.Bar.Baz", ".hidden", "trailing."] {
            let dotted = DisplayStateDescriptor::new(app);
            assert!(!dotted.is_compatible(), "{} should need the workaround", app);
            assert_eq!(dotted.file(), format!("{}.rzdisplaystate", app));
            assert_eq!(dotted.app(), app);
        }
    }

    #[test]
    fn test_compatible_app_cannot_be_armed() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "MyApp");

        assert!(!state.set_enabled(true).unwrap());
        assert!(!state.is_enabled());
        assert!(!state.is_watching());
    }

    #[tokio::test]
    async fn test_arming_fixes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");
        std::fs::write(state.raw_path(), b"existing").unwrap();

        assert!(state.set_enabled(true).unwrap());
        assert!(state.is_enabled());
        assert!(state.is_watching());

        assert_eq!(std::fs::read(state.corrected_path()).unwrap(), b"existing");
    }

    #[tokio::test]
    async fn test_watcher_copies_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");
        assert!(state.set_enabled(true).unwrap());
        assert!(!state.corrected_path().exists());

        let content = b"0123456789";
        std::fs::write(dir.path().join("My.App"), content).unwrap();

        let corrected = dir.path().join("My.App.rzdisplaystate");
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while std::fs::read(&corrected).ok().as_deref() != Some(&content[..]) {
            assert!(tokio::time::Instant::now() < deadline, "file was never fixed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_notification_replaces_stale_copy() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");
        std::fs::write(state.corrected_path(), b"stale").unwrap();
        assert!(state.set_enabled(true).unwrap());

        std::fs::write(state.raw_path(), b"fresh").unwrap();
        state.notify(&changed(state.raw_path()));

        assert_eq!(std::fs::read(state.corrected_path()).unwrap(), b"fresh");
    }

    #[test]
    fn test_fix_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");
        std::fs::write(state.raw_path(), b"thumbnail").unwrap();

        state.fix();
        let once = std::fs::read(state.corrected_path()).unwrap();
        state.fix();
        let twice = std::fs::read(state.corrected_path()).unwrap();

        assert_eq!(once, b"thumbnail");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fix_ignores_compatibility_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "MyApp");
        std::fs::write(state.raw_path(), b"forced").unwrap();

        state.fix();

        assert!(!state.is_enabled());
        assert_eq!(std::fs::read(state.corrected_path()).unwrap(), b"forced");
    }

    #[test]
    fn test_missing_raw_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");

        state.fix();

        assert!(!state.corrected_path().exists());
    }

    #[test]
    fn test_copy_failure_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");
        std::fs::write(state.raw_path(), b"data").unwrap();
        // A directory in the way makes the delete fail
        std::fs::create_dir(state.corrected_path()).unwrap();

        state.fix();

        assert!(state.corrected_path().is_dir());
        assert!(state.raw_path().exists());
    }

    #[tokio::test]
    async fn test_disable_is_idempotent_and_stops_fixing() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");
        assert!(state.set_enabled(true).unwrap());

        assert!(!state.set_enabled(false).unwrap());
        assert!(!state.set_enabled(false).unwrap());
        assert!(!state.is_enabled());
        assert!(!state.is_watching());

        std::fs::write(state.raw_path(), b"late").unwrap();
        state.notify(&changed(state.raw_path()));
        assert!(!state.corrected_path().exists());

        drop(state);
    }

    #[tokio::test]
    async fn test_unrelated_events_ignored() {
        let dir = tempfile::tempdir().unwrap();
        // Slow poll so only the events below can trigger a fix
        let state = DisplayStateFile::new(
            DisplayStateDescriptor::new("My.App"),
            dir.path(),
            Duration::from_secs(3600),
        );
        assert!(state.set_enabled(true).unwrap());
        std::fs::write(state.raw_path(), b"data").unwrap();

        state.notify(&FsEvent {
            kind: FsEventKind::Removed,
            path: state.raw_path().to_path_buf(),
        });
        state.notify(&changed(&dir.path().join("Other.App")));

        // Only the initial pass could have run, before the raw file existed
        assert!(!state.corrected_path().exists());
    }

    #[test]
    fn test_enable_outside_runtime_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = monitor(dir.path(), "My.App");

        assert!(matches!(state.set_enabled(true), Err(Error::NoRuntime(_))));
        assert!(!state.is_enabled());
    }
}
