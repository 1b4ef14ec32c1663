//! The file watch loop.
//!
//! A `FileMonitor` owns at most one live watch session at a time. The
//! session's background task waits for raw filesystem signals, lets writers
//! settle, re-reads the tail and delivers a `ChangeRecord` per change. A
//! watch-infrastructure failure gets one restart attempt after a fixed
//! delay; if that fails the session ends and the monitor reports idle.

use crate::config::TailConfig;
use crate::error::{Error, Result};
use crate::strategy::TailReader;
use crate::tail::FileLine;
use crate::watcher::{FileWatcher, classify_event};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// What happened to the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Created,
    Deleted,
}

/// One detected change: the file's current tail plus what happened and when.
/// `lines` is empty for `Deleted`.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub path: PathBuf,
    pub lines: Vec<FileLine>,
    pub kind: ChangeKind,
    pub timestamp: SystemTime,
}

impl ChangeRecord {
    fn now(path: &Path, lines: Vec<FileLine>, kind: ChangeKind) -> Self {
        Self {
            path: path.to_path_buf(),
            lines,
            kind,
            timestamp: SystemTime::now(),
        }
    }
}

/// The single active session: its path, shutdown signal and task handle.
/// The watch handle itself lives inside the task and dies with it.
struct WatchSession {
    path: PathBuf,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Watches one file and delivers a `ChangeRecord` per detected change.
pub struct FileMonitor {
    reader: Arc<TailReader>,
    session: Option<WatchSession>,
}

impl FileMonitor {
    pub fn new(config: TailConfig) -> Self {
        Self::with_reader(Arc::new(TailReader::new(config)))
    }

    /// Build around an existing reader, sharing its strategy set and config.
    pub fn with_reader(reader: Arc<TailReader>) -> Self {
        Self {
            reader,
            session: None,
        }
    }

    /// Whether a session is live: started, not stopped, and its watch task
    /// has not died.
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// The path being watched, while a session is live.
    pub fn monitored_path(&self) -> Option<&Path> {
        self.session
            .as_ref()
            .filter(|s| !s.task.is_finished())
            .map(|s| s.path.as_path())
    }

    /// Start watching `path`, delivering `ChangeRecord`s to the returned
    /// channel. An already-active session is stopped first, so there is
    /// never more than one live watch handle per monitor.
    ///
    /// One tail read runs immediately and is delivered as a `Modified`
    /// snapshot; a failure there is logged but does not fail the start.
    pub async fn start(
        &mut self,
        path: impl AsRef<Path>,
        line_count: usize,
    ) -> Result<mpsc::UnboundedReceiver<ChangeRecord>> {
        let path = path.as_ref().to_path_buf();
        if line_count == 0 {
            return Err(Error::invalid_argument("line count must be at least 1"));
        }
        if !path.exists() {
            return Err(Error::not_found(&path));
        }

        self.stop();

        let mut watcher = FileWatcher::new(&path)?;
        watcher.start_watching()?;

        self.start_session(path, line_count, watcher).await
    }

    /// Tests drive the session with an injected watch handle.
    #[cfg(test)]
    pub(crate) async fn start_with_watcher(
        &mut self,
        path: impl AsRef<Path>,
        line_count: usize,
        watcher: FileWatcher,
    ) -> Result<mpsc::UnboundedReceiver<ChangeRecord>> {
        self.stop();
        self.start_session(path.as_ref().to_path_buf(), line_count, watcher)
            .await
    }

    /// Shared tail of `start`: snapshot, spawn the watch task, record the
    /// session.
    async fn start_session(
        &mut self,
        path: PathBuf,
        line_count: usize,
        watcher: FileWatcher,
    ) -> Result<mpsc::UnboundedReceiver<ChangeRecord>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let reader = Arc::clone(&self.reader);

        // Initial snapshot, best effort.
        match reader.read_last_lines_async(&path, line_count).await {
            Ok(lines) => {
                let _ = tx.send(ChangeRecord::now(&path, lines, ChangeKind::Modified));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "initial tail read failed");
            }
        }

        tracing::info!(path = %path.display(), line_count, "monitoring started");

        let task_path = path.clone();
        let task = tokio::spawn(async move {
            watch_task(task_path, line_count, reader, watcher, tx, shutdown_rx).await;
        });

        self.session = Some(WatchSession {
            path,
            shutdown_tx,
            task,
        });
        Ok(rx)
    }

    /// Stop the active session, if any. Idempotent.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.shutdown_tx.send(());
            session.task.abort();
            tracing::info!(path = %session.path.display(), "monitoring stopped");
        }
    }
}

impl Drop for FileMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background loop for one session. Runs until shutdown, or until the watch
/// infrastructure fails and its single restart attempt fails too.
async fn watch_task(
    path: PathBuf,
    line_count: usize,
    reader: Arc<TailReader>,
    mut watcher: FileWatcher,
    tx: mpsc::UnboundedSender<ChangeRecord>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let settle_delay = reader.config().settle_delay;
    let restart_delay = reader.config().restart_delay;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                break;
            }

            event = watcher.next_event() => {
                match event {
                    Some(Ok(event)) => {
                        let Some(kind) = classify_event(&event, &file_name) else {
                            continue;
                        };
                        handle_change(kind, &path, line_count, &reader, &mut watcher, &file_name, &tx, settle_delay).await;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(path = %path.display(), error = %e, "watch infrastructure error");
                        match restart_watch(&path, restart_delay).await {
                            Ok(rebuilt) => {
                                watcher = rebuilt;
                                // A restart re-issues the start sequence,
                                // initial snapshot included.
                                emit_tail(&path, line_count, &reader, ChangeKind::Modified, &tx).await;
                            }
                            Err(e) => {
                                tracing::error!(path = %path.display(), error = %e, "watch restart failed, session stopped");
                                break;
                            }
                        }
                    }
                    None => {
                        // The notify callback dropped its channel end.
                        tracing::warn!(path = %path.display(), "watch event channel closed");
                        match restart_watch(&path, restart_delay).await {
                            Ok(rebuilt) => {
                                watcher = rebuilt;
                                emit_tail(&path, line_count, &reader, ChangeKind::Modified, &tx).await;
                            }
                            Err(e) => {
                                tracing::error!(path = %path.display(), error = %e, "watch restart failed, session stopped");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// React to one classified change signal.
#[allow(clippy::too_many_arguments)]
async fn handle_change(
    kind: ChangeKind,
    path: &Path,
    line_count: usize,
    reader: &Arc<TailReader>,
    watcher: &mut FileWatcher,
    file_name: &str,
    tx: &mpsc::UnboundedSender<ChangeRecord>,
    settle_delay: std::time::Duration,
) {
    if kind == ChangeKind::Deleted {
        // No delay and no read for deletions.
        tracing::debug!(path = %path.display(), "change detected: deleted");
        let _ = tx.send(ChangeRecord::now(path, Vec::new(), ChangeKind::Deleted));
        return;
    }

    // Let the writer finish, then fold the burst of signals that queued up
    // during the settle window into this one read.
    tokio::time::sleep(settle_delay).await;
    let mut kind = kind;
    while let Some(queued) = watcher.try_next_event() {
        match queued {
            Ok(event) => match classify_event(&event, file_name) {
                Some(ChangeKind::Deleted) => {
                    tracing::debug!(path = %path.display(), "change detected: deleted");
                    let _ = tx.send(ChangeRecord::now(path, Vec::new(), ChangeKind::Deleted));
                    return;
                }
                Some(coalesced) => kind = coalesced,
                None => {}
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "watch error while settling");
            }
        }
    }

    if !path.exists() {
        // Vanished during the settle window; the delete signal follows.
        return;
    }

    tracing::debug!(path = %path.display(), kind = ?kind, "change detected");
    emit_tail(path, line_count, reader, kind, tx).await;
}

/// Re-read the tail and deliver it. Read errors are reported and swallowed
/// so the session outlives transient file problems.
async fn emit_tail(
    path: &Path,
    line_count: usize,
    reader: &Arc<TailReader>,
    kind: ChangeKind,
    tx: &mpsc::UnboundedSender<ChangeRecord>,
) {
    match reader.read_last_lines_async(path, line_count).await {
        Ok(lines) => {
            // A dropped receiver must not kill the session.
            let _ = tx.send(ChangeRecord::now(path, lines, kind));
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "tail re-read failed");
        }
    }
}

/// The single restart attempt: wait the fixed delay, then rebuild and
/// re-arm the watch handle.
async fn restart_watch(path: &Path, restart_delay: std::time::Duration) -> Result<FileWatcher> {
    tokio::time::sleep(restart_delay).await;
    let mut watcher = FileWatcher::new(path)?;
    watcher.start_watching()?;
    tracing::info!(path = %path.display(), "watch restarted");
    Ok(watcher)
}

/// A stream of `ChangeRecord`s that owns its monitor; dropping the stream
/// stops the session.
pub struct ChangeStream {
    monitor: FileMonitor,
    receiver: mpsc::UnboundedReceiver<ChangeRecord>,
}

impl ChangeStream {
    pub(crate) fn new(monitor: FileMonitor, receiver: mpsc::UnboundedReceiver<ChangeRecord>) -> Self {
        Self { monitor, receiver }
    }

    pub fn is_active(&self) -> bool {
        self.monitor.is_active()
    }

    pub fn monitored_path(&self) -> Option<&Path> {
        self.monitor.monitored_path()
    }
}

impl Stream for ChangeStream {
    type Item = ChangeRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}
