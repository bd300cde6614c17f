// src/watch/mod.rs

//! Source watching for `assetpipe watch`.
//!
//! Every task is bound to the input globs of its Path Table categories
//! ([`patterns`]). Debounced changes under the project root are matched
//! against those bindings and sent to the runtime as triggers; a task whose
//! ancestor was also hit is left out, since the scheduler pulls dependents
//! into the run anyway ([`dag_filter`]).

pub mod dag_filter;
pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{TaskWatchProfile, build_profiles};
pub use watcher::{WatcherHandle, spawn_watcher};
