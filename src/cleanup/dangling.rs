//! Iterative removal of dangling tracks and vias

use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::CleanupError;

use super::cleaner::{yield_point, CleanupRun};
use super::types::{CleanupKind, CleanupRecord};

impl CleanupRun<'_, '_> {
    /// Remove items with a free end until a round removes nothing.
    ///
    /// Removal is immediate, so later items in the same round already see
    /// the shortened network. Returns true if anything was removed.
    pub(super) fn delete_dangling_tracks(
        &mut self,
        tracks: bool,
        vias: bool,
    ) -> Result<bool, CleanupError> {
        if !tracks && !vias {
            return Ok(false);
        }

        let start = Instant::now();
        let cap = self.board.track_count() + 1;
        let mut rounds = 0;
        let mut total = 0;

        loop {
            if rounds >= cap {
                error!("[Cleanup] Dangling removal still changing after {} rounds", rounds);
                return Err(CleanupError::FixpointNotReached {
                    phase: "dangling removal",
                    rounds,
                });
            }
            rounds += 1;

            self.rebuild_connectivity();
            let mut removed = 0;

            for id in self.board.track_ids() {
                let Some(track) = self.board.track(id) else {
                    continue;
                };
                if !self.is_candidate(track) {
                    continue;
                }
                let is_via = track.is_via();
                if (is_via && !vias) || (!is_via && !tracks) {
                    continue;
                }
                if !self.connectivity.test_track_endpoint_dangling(self.board, track, false) {
                    continue;
                }

                let kind = if is_via {
                    CleanupKind::DanglingVia
                } else {
                    CleanupKind::DanglingTrack
                };
                self.states.mark_pending(id);
                self.push_record(CleanupRecord::single(kind, id));
                self.remove_now(id);
                removed += 1;
            }

            self.summary.dangling_rounds += 1;
            debug!("[Cleanup] Dangling round {}: {} removed", rounds, removed);
            yield_point();

            if removed == 0 {
                break;
            }
            total += removed;
        }

        info!(
            "[Cleanup] Dangling removal: {} items in {} rounds, {:?}",
            total,
            rounds,
            start.elapsed()
        );

        Ok(total > 0)
    }
}
