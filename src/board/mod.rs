//! Board model for the cleanup engine
//!
//! Tracks, vias and pads with the geometry, spatial indexing and change
//! logging the cleanup phases rely on.
//!
//! # Submodules
//! - `types` - Core primitives (Point, Layer, Track, Pad, ...)
//! - `geometry` - Distances, hit tests, outline and swept polygons
//! - `spatial` - R-tree collision index
//! - `container` - Insertion-ordered item storage
//! - `commit` - Commit log contract and undo

mod types;
mod geometry;
mod spatial;
mod container;
mod commit;

pub use types::{
    Point,
    ItemId,
    NetCode,
    Layer,
    InvalidLayer,
    LayerSet,
    ViaType,
    TrackKind,
    Track,
    PadShape,
    Pad,
    ItemRef,
    COPPER_LAYER_COUNT,
};

pub use geometry::{
    point_segment_distance,
    point_line_distance,
    segments_approx_collinear,
    flatten_arc,
    pad_polygon,
    point_in_polygon,
    polygon_boundary_distance,
    to_geo_polygon,
    track_swept_polygon,
    track_bounds,
    pad_bounds,
    COLLINEAR_ANGLE_TOLERANCE,
};

pub use spatial::{IndexedItem, SpatialIndex};

pub use container::{Board, BoardData};

pub use commit::{BoardCommit, CommitEntry, CommitLog, DiscardCommit};
