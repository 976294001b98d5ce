//! Filesystem watching: change events, coalescing, and watcher lifecycle.

mod events;
mod runtime;

pub use events::{convert_event, ChangeKind, WatchEvent};
pub use runtime::{EventSink, FsWatcher, NotifyWatcher, NotifyWatcherFactory, WatcherFactory};
