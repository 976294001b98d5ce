//! Watcher lifecycle: the notify-backed watcher and its factory.

use super::events::{convert_event, EventCoalescer, WatchEvent};
use crate::config::WatchConfig;
use crate::error::WatchError;
use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

/// Channel every watcher delivers into. One sink outlives all watchers; events
/// carry the producing watcher's epoch.
pub type EventSink = mpsc::UnboundedSender<WatchEvent>;

/// A running watcher over one root.
#[async_trait]
pub trait FsWatcher: Send {
    fn root(&self) -> &Path;

    fn epoch(&self) -> u64;

    /// Stop delivering events. Once this returns, no further events with this
    /// watcher's epoch reach the sink.
    async fn stop(self: Box<Self>);
}

/// Starts watchers. Each started watcher gets a fresh epoch.
#[async_trait]
pub trait WatcherFactory: Send + Sync {
    async fn start(
        &self,
        root: &Path,
        config: &WatchConfig,
        sink: EventSink,
    ) -> Result<Box<dyn FsWatcher>, WatchError>;
}

/// Factory for [`NotifyWatcher`].
#[derive(Debug, Default)]
pub struct NotifyWatcherFactory {
    next_epoch: AtomicU64,
}

impl NotifyWatcherFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatcherFactory for NotifyWatcherFactory {
    async fn start(
        &self,
        root: &Path,
        config: &WatchConfig,
        sink: EventSink,
    ) -> Result<Box<dyn FsWatcher>, WatchError> {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let watcher = NotifyWatcher::start(root, config, epoch, sink)?;
        Ok(Box::new(watcher))
    }
}

/// Recursive OS watcher feeding a coalescing forwarder task.
pub struct NotifyWatcher {
    root: PathBuf,
    epoch: u64,
    watcher: Option<RecommendedWatcher>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NotifyWatcher {
    pub fn start(root: &Path, config: &WatchConfig, epoch: u64, sink: EventSink) -> Result<Self, WatchError> {
        let coalescer = EventCoalescer::new(root, config)?;
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })
        .map_err(|e| WatchError::Create(e.to_string()))?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch {
                path: root.to_path_buf(),
                message: e.to_string(),
            })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(forward(raw_rx, shutdown_rx, coalescer, sink, epoch));
        info!(root = %root.display(), epoch, "Watching workspace");
        Ok(Self {
            root: root.to_path_buf(),
            epoch,
            watcher: Some(watcher),
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

#[async_trait]
impl FsWatcher for NotifyWatcher {
    fn root(&self) -> &Path {
        &self.root
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    async fn stop(self: Box<Self>) {
        let mut this = self;
        drop(this.watcher.take());
        if let Some(shutdown) = this.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = this.task.take() {
            if let Err(e) = task.await {
                warn!(epoch = this.epoch, error = %e, "Watcher forwarder ended abnormally");
            }
        }
        info!(root = %this.root.display(), epoch = this.epoch, "Watcher stopped");
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn forward(
    mut raw: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    mut shutdown: oneshot::Receiver<()>,
    mut coalescer: EventCoalescer,
    sink: EventSink,
    epoch: u64,
) {
    loop {
        let deadline = coalescer.next_deadline();
        let idle = Instant::now() + Duration::from_secs(3600);
        tokio::select! {
            _ = &mut shutdown => return,
            message = raw.recv() => match message {
                Some(Ok(event)) => {
                    let now = Instant::now();
                    for (kind, path) in convert_event(&event) {
                        coalescer.add(kind, path, now);
                    }
                }
                Some(Err(e)) => warn!(epoch, error = %e, "Watch error"),
                None => return,
            },
            _ = sleep_until(deadline.unwrap_or(idle)), if deadline.is_some() => {}
        }
        for (kind, path) in coalescer.drain_ready(Instant::now()) {
            if sink.send(WatchEvent { kind, path, epoch }).is_err() {
                return;
            }
        }
    }
}
