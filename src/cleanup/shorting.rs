//! Removal of tracks and vias touching copper of another net

use std::time::Instant;
use tracing::info;

use super::cleaner::CleanupRun;
use super::types::{CleanupKind, CleanupRecord};

impl CleanupRun<'_, '_> {
    /// Remove every candidate whose connected pads or tracks carry a
    /// different net. Marked items still count as neighbours within the pass.
    pub(super) fn remove_shorting_track_segments(&mut self) {
        let start = Instant::now();
        self.rebuild_connectivity();

        let mut to_remove = Vec::new();

        for id in self.board.track_ids() {
            let Some(track) = self.board.track(id) else {
                continue;
            };
            if !self.is_candidate(track) {
                continue;
            }

            let shorts_pad = self
                .connectivity
                .connected_pads(self.board, id)
                .iter()
                .any(|pad| pad.net != track.net);
            let shorts_track = shorts_pad
                || self
                    .connectivity
                    .connected_tracks(self.board, id)
                    .iter()
                    .any(|other| other.net != track.net);

            if !shorts_track {
                continue;
            }

            let kind = if track.is_via() {
                CleanupKind::ShortingVia
            } else {
                CleanupKind::ShortingTrack
            };

            if self.states.mark_pending(id) {
                self.push_record(CleanupRecord::single(kind, id));
                to_remove.push(id);
            }
        }

        info!(
            "[Cleanup] Shorting check: {} items in {:?}",
            to_remove.len(),
            start.elapsed()
        );
        self.remove_items(&to_remove);
    }
}
