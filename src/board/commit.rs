//! Commit log for board edits
//!
//! The cleanup engine reports every change through [`CommitLog`] so a host can
//! record it for undo. [`BoardCommit`] is the in-process implementation;
//! [`DiscardCommit`] ignores everything.

use serde::Serialize;

use super::container::Board;
use super::types::{ItemId, Track};

/// Change notifications issued by the cleanup engine
pub trait CommitLog {
    /// Called with the item's state before it is changed in place
    fn modify(&mut self, item: &Track);

    /// Called for an item staged for deletion; the engine detaches it right after
    fn remove(&mut self, item: &Track);

    /// Called for an item the engine has already detached from the board
    fn removed(&mut self, item: &Track);
}

/// One recorded change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CommitEntry {
    Modified { before: Track },
    Removed { item: Track },
}

impl CommitEntry {
    pub fn item_id(&self) -> ItemId {
        match self {
            CommitEntry::Modified { before } => before.id,
            CommitEntry::Removed { item } => item.id,
        }
    }
}

/// Undoable record of the changes applied to one board
#[derive(Debug, Clone, Default)]
pub struct BoardCommit {
    entries: Vec<CommitEntry>,
    original_order: Vec<ItemId>,
}

impl BoardCommit {
    /// Start a commit for `board`, remembering its track order for undo
    pub fn new(board: &Board) -> Self {
        Self {
            entries: Vec::new(),
            original_order: board.track_ids(),
        }
    }

    pub fn entries(&self) -> &[CommitEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn modified_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CommitEntry::Modified { .. }))
            .count()
    }

    pub fn removed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CommitEntry::Removed { .. }))
            .count()
    }

    /// Revert every recorded change, newest first, and restore track order
    pub fn undo(self, board: &mut Board) {
        for entry in self.entries.into_iter().rev() {
            match entry {
                CommitEntry::Modified { before } => {
                    if let Some(track) = board.track_mut(before.id) {
                        *track = before;
                    }
                }
                CommitEntry::Removed { item } => board.restore_track(item),
            }
        }
        board.reorder_tracks(&self.original_order);
    }
}

impl CommitLog for BoardCommit {
    fn modify(&mut self, item: &Track) {
        self.entries.push(CommitEntry::Modified { before: item.clone() });
    }

    fn remove(&mut self, item: &Track) {
        self.entries.push(CommitEntry::Removed { item: item.clone() });
    }

    fn removed(&mut self, item: &Track) {
        self.entries.push(CommitEntry::Removed { item: item.clone() });
    }
}

/// Commit log that drops every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardCommit;

impl CommitLog for DiscardCommit {
    fn modify(&mut self, _item: &Track) {}
    fn remove(&mut self, _item: &Track) {}
    fn removed(&mut self, _item: &Track) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::{Layer, Point};

    #[test]
    fn test_undo_restores_geometry_and_order() {
        let mut board = Board::new();
        let a = board.add_track(Track::segment(Point::new(0, 0), Point::new(10, 0), 1, Layer::F_CU, 1));
        let b = board.add_track(Track::segment(Point::new(10, 0), Point::new(20, 0), 1, Layer::F_CU, 1));
        let c = board.add_track(Track::segment(Point::new(20, 0), Point::new(30, 0), 1, Layer::F_CU, 1));
        let before: Vec<Track> = board.tracks().cloned().collect();

        let mut commit = BoardCommit::new(&board);
        let track = board.track(a).cloned().unwrap();
        commit.modify(&track);
        board.track_mut(a).unwrap().end = Point::new(20, 0);
        let removed = board.remove_track(b).unwrap();
        commit.removed(&removed);

        assert_eq!(commit.modified_count(), 1);
        assert_eq!(commit.removed_count(), 1);
        commit.undo(&mut board);

        let after: Vec<Track> = board.tracks().cloned().collect();
        assert_eq!(after, before);
        assert_eq!(board.track_ids(), vec![a, b, c]);
    }
}
