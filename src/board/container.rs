//! Board item storage
//!
//! Insertion-ordered collections of tracks and pads keyed by [`ItemId`].
//! Ids come from a single generation counter shared by tracks and pads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::types::{ItemId, ItemRef, Pad, Track};

/// Live copper items of a board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "BoardData", into = "BoardData")]
pub struct Board {
    tracks: IndexMap<ItemId, Track>,
    pads: IndexMap<ItemId, Pad>,
    next_id: u64,
}

/// Interchange form of a board: plain item lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardData {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub pads: Vec<Pad>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }

    /// Add a track, assigning it a fresh id
    pub fn add_track(&mut self, mut track: Track) -> ItemId {
        let id = self.allocate_id();
        track.id = id;
        self.tracks.insert(id, track);
        id
    }

    /// Add a pad, assigning it a fresh id
    pub fn add_pad(&mut self, mut pad: Pad) -> ItemId {
        let id = self.allocate_id();
        pad.id = id;
        self.pads.insert(id, pad);
        id
    }

    /// Re-insert a track under its existing id (used by undo)
    pub fn restore_track(&mut self, track: Track) {
        self.next_id = self.next_id.max(track.id.0);
        self.tracks.insert(track.id, track);
    }

    /// Detach a track, keeping the order of the remaining ones
    pub fn remove_track(&mut self, id: ItemId) -> Option<Track> {
        self.tracks.shift_remove(&id)
    }

    /// Reorder tracks to follow `order`; ids not listed keep their relative
    /// order after the listed ones
    pub fn reorder_tracks(&mut self, order: &[ItemId]) {
        let rank: std::collections::HashMap<ItemId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        self.tracks
            .sort_by_cached_key(|id, _| rank.get(id).copied().unwrap_or(usize::MAX));
    }

    pub fn track(&self, id: ItemId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn track_mut(&mut self, id: ItemId) -> Option<&mut Track> {
        self.tracks.get_mut(&id)
    }

    pub fn pad(&self, id: ItemId) -> Option<&Pad> {
        self.pads.get(&id)
    }

    /// Any connectable item by id
    pub fn item(&self, id: ItemId) -> Option<ItemRef<'_>> {
        self.tracks
            .get(&id)
            .map(ItemRef::Track)
            .or_else(|| self.pads.get(&id).map(ItemRef::Pad))
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn pads(&self) -> impl Iterator<Item = &Pad> {
        self.pads.values()
    }

    /// Snapshot of track ids in board order
    pub fn track_ids(&self) -> Vec<ItemId> {
        self.tracks.keys().copied().collect()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn pad_count(&self) -> usize {
        self.pads.len()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.tracks.contains_key(&id) || self.pads.contains_key(&id)
    }
}

impl From<BoardData> for Board {
    /// Keeps ids given in the data; items without one (id 0) or with a
    /// clashing id get a fresh id after the highest existing one.
    fn from(data: BoardData) -> Self {
        let mut board = Board::new();
        board.next_id = data
            .tracks
            .iter()
            .map(|t| t.id.0)
            .chain(data.pads.iter().map(|p| p.id.0))
            .max()
            .unwrap_or(0);

        for mut pad in data.pads {
            if pad.id.0 == 0 || board.contains(pad.id) {
                pad.id = board.allocate_id();
            }
            board.pads.insert(pad.id, pad);
        }
        for mut track in data.tracks {
            if track.id.0 == 0 || board.contains(track.id) {
                track.id = board.allocate_id();
            }
            board.tracks.insert(track.id, track);
        }
        board
    }
}

impl From<Board> for BoardData {
    fn from(board: Board) -> Self {
        Self {
            tracks: board.tracks.into_values().collect(),
            pads: board.pads.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::{Layer, LayerSet, PadShape, Point};

    #[test]
    fn test_ids_are_monotonic_across_kinds() {
        let mut board = Board::new();
        let a = board.add_track(Track::segment(Point::new(0, 0), Point::new(1, 0), 1, Layer::F_CU, 1));
        let p = board.add_pad(Pad::new(Point::new(0, 0), PadShape::Circle { diameter: 10 }, LayerSet::all_copper(), 1));
        let b = board.add_track(Track::segment(Point::new(1, 0), Point::new(2, 0), 1, Layer::F_CU, 1));
        assert!(a < p && p < b);
        assert!(matches!(board.item(p), Some(ItemRef::Pad(_))));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut board = Board::new();
        let ids: Vec<ItemId> = (0..4)
            .map(|i| board.add_track(Track::segment(Point::new(i, 0), Point::new(i + 1, 0), 1, Layer::F_CU, 1)))
            .collect();
        board.remove_track(ids[1]);
        assert_eq!(board.track_ids(), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_from_data_fixes_missing_and_clashing_ids() {
        let mut t1 = Track::segment(Point::new(0, 0), Point::new(1, 0), 1, Layer::F_CU, 1);
        t1.id = ItemId(7);
        let mut t2 = t1.clone();
        t2.id = ItemId(7);
        let t3 = Track::segment(Point::new(5, 0), Point::new(6, 0), 1, Layer::F_CU, 1);
        let board = Board::from(BoardData { tracks: vec![t1, t2, t3], pads: vec![] });
        assert_eq!(board.track_ids(), vec![ItemId(7), ItemId(8), ItemId(9)]);
    }

    #[test]
    fn test_board_with_bad_layer_does_not_load() {
        let json = r#"{"tracks":[{"start":{"x":0,"y":0},"end":{"x":1,"y":0},"width":1,"net":1,"type":"segment","layer":40}],"pads":[]}"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }
}
