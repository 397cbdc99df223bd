// src/watch/mod.rs

//! File watching and change dispatch for development mode.
//!
//! - [`binding`]: watch globs and the sub-trees they rerun.
//! - [`watcher`]: `notify` watcher forwarding changed paths into a channel.
//! - [`dispatch`]: per-target run locks and run drivers.

pub mod binding;
pub mod dispatch;
pub mod path_utils;
pub mod watcher;

pub use binding::{build_bindings, targets_for, WatchBinding};
pub use dispatch::{Dispatcher, RunCompleted};
pub use watcher::{spawn_watcher, watch_roots, WatcherHandle};
