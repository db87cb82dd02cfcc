//! Connectivity service for copper items
//!
//! Computes, for every live track, via and pad, the items electrically
//! touching it, grouped by anchor point, and answers the dangling-end query
//! used by the cleanup phases. The graph is built with an R-tree for
//! candidate filtering and Rayon for per-item entry computation.
//!
//! # Submodules
//! - `types` - Connection entry structures
//! - `graph` - Graph construction, incremental updates and queries

mod types;
mod graph;

pub use types::{AnchorEntry, ConnectivityEntry};
pub use graph::Connectivity;
