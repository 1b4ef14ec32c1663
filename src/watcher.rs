//! File watching plumbing built on the notify crate.
//!
//! One `FileWatcher` wraps one live notify handle. It watches the target
//! file's containing directory non-recursively and the watch loop filters
//! events down to the exact file name.

use crate::error::Result;
use crate::monitor::ChangeKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A watch handle for a single file.
pub(crate) struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    file_path: PathBuf,
}

impl FileWatcher {
    /// Creates a new file watcher for the specified path. Watching does not
    /// begin until `start_watching` is called.
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();

        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            file_path,
        })
    }

    /// Starts watching the file's containing directory for changes.
    pub(crate) fn start_watching(&mut self) -> Result<()> {
        let watch_path = self.file_path.parent().unwrap_or(&self.file_path);
        self._watcher.watch(watch_path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// Returns the next file system event, waiting if none is queued.
    pub(crate) async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.receiver.recv().await
    }

    /// Returns a queued event without waiting, if one is available.
    pub(crate) fn try_next_event(&mut self) -> Option<notify::Result<Event>> {
        self.receiver.try_recv().ok()
    }

    #[cfg(test)]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// A watcher fed from a caller-held channel instead of a live notify
    /// callback, so tests can inject infrastructure errors or close the
    /// event channel at will.
    #[cfg(test)]
    pub(crate) fn with_receiver<P: AsRef<Path>>(
        path: P,
        receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    ) -> Result<Self> {
        let watcher = RecommendedWatcher::new(|_| {}, Config::default())?;
        Ok(Self {
            _watcher: watcher,
            receiver,
            file_path: path.as_ref().to_path_buf(),
        })
    }
}

/// Map a notify event to a change kind, or `None` when the event is for a
/// different file or a kind we do not track (access, rename metadata, ...).
pub(crate) fn classify_event(event: &Event, target_file_name: &str) -> Option<ChangeKind> {
    if !is_event_relevant_to_file(event, target_file_name) {
        return None;
    }
    match event.kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// Check if a notify event touches the watched file name.
pub(crate) fn is_event_relevant_to_file(event: &Event, target_file_name: &str) -> bool {
    event.paths.iter().any(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy() == target_file_name)
            .unwrap_or(false)
    })
}
