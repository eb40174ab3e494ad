use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::RegexSet;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::scan::{MarkerScan, MarkerSpec, scan_markers};
use crate::walker::relative_str;
use crate::watcher::event::FsEvent;
use crate::watcher::{self, WatchHandle, WatchOptions};

/// One file's marker comments, pending until a trigger dispatch clears them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRef {
    /// File the markers were found in.
    pub path: PathBuf,
    /// 1-based line number of the first marker line in the file.
    pub line: usize,
    /// Raw text of every marker line, in file order.
    pub lines: Vec<String>,
    /// True if any of the marker lines carries the trigger prefix.
    pub has_trigger: bool,
}

impl CommentRef {
    pub fn from_scan(path: PathBuf, scan: MarkerScan) -> Self {
        Self {
            path,
            line: scan.line,
            lines: scan.lines,
            has_trigger: scan.has_trigger,
        }
    }
}

/// What handling one filesystem event produced.
#[derive(Debug)]
pub enum ScanOutcome {
    /// A passive marker group was recorded; `pending` is the full snapshot
    /// including the new group.
    Reference {
        group: CommentRef,
        pending: Vec<CommentRef>,
    },
    /// A trigger marker landed; `pending` is the snapshot across all watched
    /// files, and pending state has already been cleared.
    Trigger { pending: Vec<CommentRef> },
}

/// Callback bundle invoked from the dispatch loop.
///
/// Callbacks run synchronously with respect to event handling and must not
/// block for long; panics inside them are not caught here.
pub struct TriggerHooks {
    /// Fired once per newly recorded passive marker group, with the full
    /// pending snapshot.
    pub on_reference: Box<dyn Fn(&CommentRef, &[CommentRef]) + Send + Sync>,
    /// Fired when a file's scan carries a trigger, with every pending
    /// comment across all watched files.
    pub on_trigger: Box<dyn Fn(&[CommentRef]) + Send + Sync>,
    /// Fired once the backend finishes its initial setup.
    pub on_ready: Box<dyn Fn() + Send + Sync>,
    /// Fired on backend-level watch errors. Watching continues.
    pub on_error: Box<dyn Fn(&str) + Send + Sync>,
}

impl Default for TriggerHooks {
    fn default() -> Self {
        Self {
            on_reference: Box::new(|_, _| {}),
            on_trigger: Box::new(|_| {}),
            on_ready: Box::new(|| {}),
            on_error: Box::new(|_| {}),
        }
    }
}

/// Factory producing a watch backend bound to a root path. The default is
/// `watcher::start_watcher`; tests inject channel-fed fakes.
pub type WatcherFactory =
    Box<dyn Fn(&Path, &WatchOptions) -> Result<(WatchHandle, mpsc::Receiver<FsEvent>)> + Send + Sync>;

/// All mutable trigger state: the pending-comment map and the pause gate.
///
/// Driven synchronously from a single dispatch task; the surrounding
/// `CommentTriggerWatcher` wraps it in a mutex only because callers outside
/// the loop (pause, snapshots) need access too.
pub struct TriggerEngine {
    marker: MarkerSpec,
    ignores: RegexSet,
    root: PathBuf,
    /// Insertion-ordered, one entry per file. A rescan of a known file
    /// replaces its entry in place, keeping its original position.
    pending: Vec<CommentRef>,
    paused: bool,
}

impl TriggerEngine {
    pub fn new(marker: MarkerSpec, ignores: RegexSet) -> Self {
        Self {
            marker,
            ignores,
            root: PathBuf::new(),
            pending: Vec::new(),
            paused: false,
        }
    }

    pub fn set_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();
    }

    /// Handle one add/change/unlink event for `path`.
    ///
    /// Reads the file's current on-disk content and rescans it in full, so
    /// rapid pause/resume cycles can't lose state: every un-paused event is
    /// evaluated against what the file says now, not a queue of missed
    /// events. Read failures (deleted or unreadable files) drop any stale
    /// pending entry and are otherwise silent.
    pub fn handle_path_event(&mut self, path: &Path) -> Option<ScanOutcome> {
        if self.paused {
            return None;
        }
        if self.ignores.is_match(&relative_str(&self.root, path)) {
            return None;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                self.remove_pending(path);
                return None;
            }
        };

        let Some(scan) = scan_markers(&content, &self.marker) else {
            // The file no longer carries markers.
            self.remove_pending(path);
            return None;
        };

        let group = CommentRef::from_scan(path.to_path_buf(), scan);
        self.upsert_pending(group.clone());

        if group.has_trigger {
            let pending = self.pending_comments();
            self.clear_pending();
            debug!(
                "trigger at {}:{} dispatching {} pending comment(s)",
                group.path.display(),
                group.line,
                pending.len()
            );
            Some(ScanOutcome::Trigger { pending })
        } else {
            Some(ScanOutcome::Reference {
                pending: self.pending_comments(),
                group,
            })
        }
    }

    /// Flattened snapshot of every pending comment, in insertion order.
    pub fn pending_comments(&self) -> Vec<CommentRef> {
        self.pending.clone()
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn remove_pending(&mut self, path: &Path) {
        self.pending.retain(|entry| entry.path != path);
    }

    fn upsert_pending(&mut self, group: CommentRef) {
        match self.pending.iter_mut().find(|entry| entry.path == group.path) {
            Some(entry) => *entry = group,
            None => self.pending.push(group),
        }
    }
}

/// Watches a directory tree for marker comments and fires the hook bundle.
///
/// One instance owns one watch session at a time: `watch()` on an already
/// watching instance closes the previous session first. All pending state is
/// private to the instance and torn down on `close()`.
pub struct CommentTriggerWatcher {
    factory: WatcherFactory,
    hooks: Arc<TriggerHooks>,
    options: WatchOptions,
    engine: Arc<Mutex<TriggerEngine>>,
    backend: Option<WatchHandle>,
    dispatch_task: Option<JoinHandle<()>>,
    watching: bool,
}

impl CommentTriggerWatcher {
    pub fn new(
        factory: WatcherFactory,
        hooks: TriggerHooks,
        marker: MarkerSpec,
        options: WatchOptions,
    ) -> Result<Self> {
        let ignores = options
            .ignore_set()
            .context("invalid ignored-path pattern")?;
        Ok(Self {
            factory,
            hooks: Arc::new(hooks),
            engine: Arc::new(Mutex::new(TriggerEngine::new(marker, ignores))),
            options,
            backend: None,
            dispatch_task: None,
            watching: false,
        })
    }

    /// Construct with the notify-based backend.
    pub fn with_default_backend(
        hooks: TriggerHooks,
        marker: MarkerSpec,
        options: WatchOptions,
    ) -> Result<Self> {
        Self::new(
            Box::new(|root, opts| watcher::start_watcher(root, opts)),
            hooks,
            marker,
            options,
        )
    }

    /// Start watching `root`. Must be called from within a tokio runtime.
    ///
    /// If this instance is already watching, the previous session is fully
    /// closed first — one instance never watches two roots concurrently.
    pub fn watch(&mut self, root: &Path) -> Result<()> {
        if self.watching {
            self.close();
        }

        self.lock_engine().set_root(root);

        let (handle, mut rx) = (self.factory)(root, &self.options)?;

        let engine = Arc::clone(&self.engine);
        let hooks = Arc::clone(&self.hooks);
        let dispatch_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatch_event(event, &engine, &hooks);
            }
        });

        self.backend = Some(handle);
        self.dispatch_task = Some(dispatch_task);
        self.watching = true;
        Ok(())
    }

    /// Stop watching and clear all pending state. Best-effort: releasing the
    /// backend cannot fail in a way the caller could recover from.
    pub fn close(&mut self) {
        self.backend.take();
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        self.lock_engine().clear_pending();
        self.watching = false;
    }

    /// Gate the watcher while the consumer edits watched files itself, so
    /// those writes don't feed back into a new trigger.
    pub fn pause(&self) {
        self.lock_engine().pause();
    }

    pub fn resume(&self) {
        self.lock_engine().resume();
    }

    pub fn is_paused(&self) -> bool {
        self.lock_engine().is_paused()
    }

    /// Empty the pending map without firing any callback.
    pub fn clear_pending(&self) {
        self.lock_engine().clear_pending();
    }

    /// Snapshot of every pending comment across all watched files — the
    /// exact payload a trigger dispatch would deliver.
    pub fn pending_comments(&self) -> Vec<CommentRef> {
        self.lock_engine().pending_comments()
    }

    fn lock_engine(&self) -> MutexGuard<'_, TriggerEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Route one backend event through the engine and into the hooks.
///
/// The engine lock is released before any hook runs, so hooks may call back
/// into the watcher (snapshots, pause) without deadlocking.
fn dispatch_event(event: FsEvent, engine: &Arc<Mutex<TriggerEngine>>, hooks: &TriggerHooks) {
    match event {
        FsEvent::Ready => (hooks.on_ready)(),
        FsEvent::Error(message) => {
            warn!("watch backend error: {message}");
            (hooks.on_error)(&message);
        }
        FsEvent::Added(path) | FsEvent::Changed(path) | FsEvent::Removed(path) => {
            let outcome = {
                let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
                engine.handle_path_event(&path)
            };
            match outcome {
                Some(ScanOutcome::Reference { group, pending }) => {
                    (hooks.on_reference)(&group, &pending);
                }
                Some(ScanOutcome::Trigger { pending }) => (hooks.on_trigger)(&pending),
                None => {}
            }
        }
    }
}
