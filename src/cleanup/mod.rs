//! Track and via cleanup
//!
//! Runs the cleanup phases over a board in a fixed order: redundant vias and
//! null or duplicate tracks, shorting copper, tracks inside pads, dangling
//! tracks and vias, and collinear segment merging. Every detected action is
//! reported as a [`CleanupRecord`]; outside a dry run it is also applied and
//! logged to a [`CommitLog`](crate::board::CommitLog).
//!
//! # Submodules
//! - `types` - Record kinds, records, options and run summary
//! - `state` - Per-item removal and examined state
//! - `pool` - Worker pool for the parallel merge search
//! - `progress` - Progress reporting
//! - `cleaner` - Orchestration and the null/duplicate/redundant-via pass
//! - `shorting` - Items touching another net
//! - `pads` - Tracks inside pads
//! - `dangling` - Iterative dangling removal
//! - `merge` - Collinear segment merging

mod types;
mod state;
mod pool;
mod progress;
mod cleaner;
mod shorting;
mod pads;
mod dangling;
mod merge;

pub use types::{CleanupKind, CleanupOptions, CleanupRecord, CleanupSummary};
pub use state::{ItemState, ItemStates};
pub use pool::{WorkerPool, DEFAULT_BLOCK_SIZE};
pub use progress::{ProgressReporter, TracingReporter};
pub use cleaner::{ItemFilter, TracksCleaner};
