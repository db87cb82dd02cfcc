//! Cleanup data types
//!
//! Record kinds, records, phase options and the run summary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::board::ItemId;

/// What a cleanup record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanupKind {
    RedundantVia,
    ZeroLengthTrack,
    DuplicateTrack,
    ShortingTrack,
    ShortingVia,
    TrackInPad,
    DanglingTrack,
    DanglingVia,
    MergeTracks,
}

impl CleanupKind {
    /// Human readable description for reports
    pub fn description(self) -> &'static str {
        match self {
            CleanupKind::RedundantVia => "Redundant via",
            CleanupKind::ZeroLengthTrack => "Track has zero length",
            CleanupKind::DuplicateTrack => "Duplicate track",
            CleanupKind::ShortingTrack => "Track connects items of different nets",
            CleanupKind::ShortingVia => "Via connects items of different nets",
            CleanupKind::TrackInPad => "Track is inside pad",
            CleanupKind::DanglingTrack => "Track has unconnected end",
            CleanupKind::DanglingVia => "Via is not connected or connected on only one layer",
            CleanupKind::MergeTracks => "Collinear tracks can be merged",
        }
    }
}

/// One detected (dry run) or applied cleanup action.
///
/// `items[0]` is the item acted on; a second item is the pad that makes a via
/// redundant, or the segment absorbed by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleanupRecord {
    kind: CleanupKind,
    items: Vec<ItemId>,
}

impl CleanupRecord {
    pub fn single(kind: CleanupKind, item: ItemId) -> Self {
        Self { kind, items: vec![item] }
    }

    pub fn pair(kind: CleanupKind, main: ItemId, aux: ItemId) -> Self {
        Self { kind, items: vec![main, aux] }
    }

    pub fn kind(&self) -> CleanupKind {
        self.kind
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn main_item(&self) -> ItemId {
        self.items[0]
    }

    pub fn aux_item(&self) -> Option<ItemId> {
        self.items.get(1).copied()
    }
}

/// Which cleanup phases to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupOptions {
    /// Remove tracks and vias that short different nets
    #[serde(default = "default_true")]
    pub remove_misconnected: bool,

    /// Remove redundant vias
    #[serde(default = "default_true")]
    pub clean_vias: bool,

    /// Merge collinear segments
    #[serde(default = "default_true")]
    pub merge_segments: bool,

    /// Remove tracks with an unconnected end
    #[serde(default = "default_true")]
    pub delete_unconnected_tracks: bool,

    /// Remove tracks lying entirely inside a pad
    #[serde(default = "default_true")]
    pub delete_tracks_in_pads: bool,

    /// Remove vias not connected on at least two different layers
    #[serde(default = "default_true")]
    pub delete_dangling_vias: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl CleanupOptions {
    pub const fn all() -> Self {
        Self {
            remove_misconnected: true,
            clean_vias: true,
            merge_segments: true,
            delete_unconnected_tracks: true,
            delete_tracks_in_pads: true,
            delete_dangling_vias: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            remove_misconnected: false,
            clean_vias: false,
            merge_segments: false,
            delete_unconnected_tracks: false,
            delete_tracks_in_pads: false,
            delete_dangling_vias: false,
        }
    }
}

/// Statistics of one cleanup invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupSummary {
    pub dry_run: bool,
    pub records_by_kind: IndexMap<CleanupKind, usize>,
    pub dangling_rounds: usize,
    pub merge_rounds: usize,
    pub elapsed_ms: f64,
}

impl CleanupSummary {
    pub fn total(&self) -> usize {
        self.records_by_kind.values().sum()
    }

    pub fn count(&self, kind: CleanupKind) -> usize {
        self.records_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub(crate) fn tally(&mut self, records: &[CleanupRecord]) {
        for record in records {
            *self.records_by_kind.entry(record.kind()).or_default() += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&CleanupKind::ZeroLengthTrack).unwrap();
        assert_eq!(json, "\"ZERO_LENGTH_TRACK\"");
    }

    #[test]
    fn test_options_default_fields() {
        let options: CleanupOptions = serde_json::from_str(r#"{ "merge_segments": false }"#).unwrap();
        assert!(!options.merge_segments);
        assert!(options.clean_vias);
        assert!(serde_json::from_str::<CleanupOptions>(r#"{ "bogus": true }"#).is_err());
    }

    #[test]
    fn test_record_items() {
        let record = CleanupRecord::pair(CleanupKind::MergeTracks, ItemId(1), ItemId(2));
        assert_eq!(record.main_item(), ItemId(1));
        assert_eq!(record.aux_item(), Some(ItemId(2)));
        assert_eq!(CleanupRecord::single(CleanupKind::DanglingVia, ItemId(3)).aux_item(), None);
    }
}
