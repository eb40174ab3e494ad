pub mod event;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::debug;
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer_opt};
use regex::RegexSet;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;

use event::FsEvent;

use crate::walker;

/// Path patterns excluded from watching by default, matched against the
/// root-relative path. Covers version-control metadata, dependency and build
/// output directories, and comment-watch's own state directory.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    r"(^|/)\.git(/|$)",
    r"(^|/)\.jj(/|$)",
    r"(^|/)\.hg(/|$)",
    r"(^|/)\.svn(/|$)",
    r"(^|/)node_modules(/|$)",
    r"(^|/)vendor(/|$)",
    r"(^|/)target(/|$)",
    r"(^|/)dist(/|$)",
    r"(^|/)build(/|$)",
    r"(^|/)out(/|$)",
    r"(^|/)\.comment-watch(/|$)",
];

/// Options for one `watch()` session, merged over documented defaults.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Quiet time a file must see before its events are delivered. Keeps the
    /// watcher from firing on partially-written files mid-save.
    pub debounce: Duration,
    /// Poll interval handed to the notify backend (only used by its polling
    /// fallback on platforms without native file notification).
    pub poll_interval: Duration,
    /// When true, emit `Added` for every file already in the tree before
    /// `Ready`. Default is off so markers that predate the watch don't fire.
    pub include_existing: bool,
    /// Ignored-path regexes, matched against the root-relative path.
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            poll_interval: Duration::from_secs(1),
            include_existing: false,
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl WatchOptions {
    /// Compile the ignored-path patterns into a single `RegexSet`.
    pub fn ignore_set(&self) -> Result<RegexSet> {
        Ok(RegexSet::new(&self.ignore_patterns)?)
    }
}

/// Handle to a running watch backend. Keeps the debouncer alive (dropping
/// stops the OS watcher).
pub struct WatchHandle {
    _debouncer: Option<Debouncer<RecommendedWatcher>>,
    _bridge_task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// A handle that owns no OS watcher. Injected backends that feed the
    /// event channel themselves return this from their factory.
    pub fn detached() -> Self {
        Self {
            _debouncer: None,
            _bridge_task: None,
        }
    }
}

/// Build a Gitignore matcher from the watch root's .gitignore file.
/// If no .gitignore exists, returns an empty matcher that matches nothing.
fn build_gitignore_matcher(root: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);
    let gitignore_path = root.join(".gitignore");
    if gitignore_path.exists() {
        let _ = builder.add(&gitignore_path);
    }
    builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Start a debounced file watcher on `root`.
///
/// Returns a `WatchHandle` (must be kept alive) and a tokio mpsc receiver
/// that yields `FsEvent`s. `Ready` is delivered once setup completes; when
/// `include_existing` is set it is preceded by an `Added` event per existing
/// file, discovered with the same walk `scan` uses.
///
/// The backend:
/// - Debounces at `options.debounce` via notify-debouncer-mini
/// - Filters out paths matching `options.ignore_patterns`
/// - Filters out .gitignore'd paths (pre-filter only — the trigger engine
///   re-checks the ignore patterns on every event it handles)
/// - Classifies surviving events into Changed/Removed by file existence
pub fn start_watcher(
    root: &Path,
    options: &WatchOptions,
) -> Result<(WatchHandle, tokio_mpsc::Receiver<FsEvent>)> {
    let ignores = options.ignore_set()?;
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let debouncer_config = notify_debouncer_mini::Config::default()
        .with_timeout(options.debounce)
        .with_notify_config(NotifyConfig::default().with_poll_interval(options.poll_interval));
    let mut debouncer = new_debouncer_opt::<_, RecommendedWatcher>(debouncer_config, move |res| {
        let _ = std_tx.send(res);
    })?;
    debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

    let gitignore = build_gitignore_matcher(root);

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<FsEvent>(256);

    // Bridge: spawn_blocking to receive from the std channel, classify,
    // forward to the tokio channel.
    let root_buf = root.to_path_buf();
    let include_existing = options.include_existing;
    let bridge_task = tokio::task::spawn_blocking(move || {
        if include_existing {
            for path in walker::collect_files(&root_buf, &ignores) {
                if tokio_tx.blocking_send(FsEvent::Added(path)).is_err() {
                    return;
                }
            }
        }
        if tokio_tx.blocking_send(FsEvent::Ready).is_err() {
            return;
        }
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(events) => {
                    for debounced_event in events {
                        let path = debounced_event.path;
                        if let Some(fs_event) =
                            classify_event(path, &root_buf, &ignores, &gitignore)
                        {
                            if tokio_tx.blocking_send(fs_event).is_err() {
                                return; // receiver dropped, shutdown
                            }
                        }
                    }
                }
                Err(err) => {
                    debug!("watch backend error: {err}");
                    if tokio_tx.blocking_send(FsEvent::Error(err.to_string())).is_err() {
                        return;
                    }
                }
            }
        }
    });

    Ok((
        WatchHandle {
            _debouncer: Some(debouncer),
            _bridge_task: Some(bridge_task),
        },
        tokio_rx,
    ))
}

/// Classify a debounced event path into an `FsEvent`, or None if it should
/// be dropped before reaching the trigger engine.
fn classify_event(
    path: PathBuf,
    root: &Path,
    ignores: &RegexSet,
    gitignore: &Gitignore,
) -> Option<FsEvent> {
    if ignores.is_match(&walker::relative_str(root, &path)) {
        return None;
    }

    let is_dir = path.is_dir();
    if gitignore.matched(&path, is_dir).is_ignore() {
        return None;
    }

    // Directory events carry no scannable content; files under a new
    // directory produce their own events.
    if is_dir {
        return None;
    }

    // notify-debouncer-mini doesn't distinguish create from modify; both are
    // handled identically downstream, so existence alone decides the kind.
    if path.exists() {
        Some(FsEvent::Changed(path))
    } else {
        Some(FsEvent::Removed(path))
    }
}
