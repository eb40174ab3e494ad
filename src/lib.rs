//! Watches a project tree for inline marker comments left for a coding agent
//! and fires a batched trigger dispatch when a fire-now marker lands.
//!
//! The core type is [`trigger::CommentTriggerWatcher`]: construct it with a
//! [`trigger::TriggerHooks`] callback bundle, call `watch(root)`, and pause it
//! around your own writes so they don't feed back into a new trigger. The
//! `comment-watch` binary is a thin CLI over these types.

pub mod config;
pub mod scan;
pub mod trigger;
pub mod walker;
pub mod watcher;

pub use scan::{MarkerSpec, scan_markers};
pub use trigger::{CommentRef, CommentTriggerWatcher, TriggerHooks};
pub use watcher::WatchOptions;
