//! Track and via cleanup for printed circuit boards
//!
//! Loads tracks, vias and pads from JSON, removes redundant, degenerate,
//! shorting and dangling copper, and merges collinear segments, reporting
//! each action as a typed record.
//!
//! # Modules
//! - `board` - Board model, geometry, spatial index and commit log
//! - `connectivity` - Connectivity graph and dangling-end test
//! - `cleanup` - Cleanup phases and their orchestration
//! - `config` - JSON configuration file
//! - `error` - Library error types
//!
//! # Example
//! ```ignore
//! let mut board: Board = serde_json::from_str(&json)?;
//! let mut records = Vec::new();
//! let summary = TracksCleaner::new(&mut board)
//!     .cleanup_board(false, &mut records, &CleanupOptions::all(), None)?;
//! ```

pub mod board;
pub mod cleanup;
pub mod config;
pub mod connectivity;
pub mod error;

pub use board::{Board, BoardCommit, ItemId, Pad, Track};
pub use cleanup::{CleanupKind, CleanupOptions, CleanupRecord, CleanupSummary, TracksCleaner};
pub use config::Config;
pub use error::{CleanupError, ConfigError};
