use std::path::PathBuf;

/// Filesystem events after debouncing and ignore filtering.
#[derive(Debug, Clone)]
pub enum FsEvent {
    /// A file that existed before watching began (initial-scan mode only).
    Added(PathBuf),
    /// A file was created or its content changed.
    Changed(PathBuf),
    /// A file was deleted.
    Removed(PathBuf),
    /// The backend finished setting up and is delivering live events.
    Ready,
    /// A backend-level failure (the watch itself keeps running).
    Error(String),
}
