//! Collinear segment merging
//!
//! Each round searches every segment for a collinear, same-width neighbour in
//! parallel, then applies the found pairs one at a time on the calling thread,
//! re-checking each against the current geometry before applying it. Rounds
//! repeat until nothing merges.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::board::{segments_approx_collinear, Board, ItemId, ItemRef, Point, Track};
use crate::connectivity::Connectivity;
use crate::error::CleanupError;

use super::cleaner::{yield_point, CleanupRun, ItemFilter};
use super::state::ItemStates;
use super::types::{CleanupKind, CleanupRecord};

/// Connected items per segment, filled lazily by the search tasks and
/// cleared whenever connectivity changes
#[derive(Default)]
struct ConnectionCache {
    map: Mutex<HashMap<ItemId, Arc<[ItemId]>>>,
}

impl ConnectionCache {
    fn connections(&self, connectivity: &Connectivity, id: ItemId) -> Arc<[ItemId]> {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(id)
            .or_insert_with(|| connectivity.connected_items(id).into())
            .clone()
    }

    fn clear(&self) {
        self.map.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// A pair found by the search: `absorbed` folds into `survivor`
#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    survivor: ItemId,
    absorbed: ItemId,
}

/// Read-only view shared by the search tasks
struct MergeSearch<'s> {
    board: &'s Board,
    connectivity: &'s Connectivity,
    states: &'s ItemStates,
    filter: Option<&'s ItemFilter<'s>>,
    cache: &'s ConnectionCache,
}

impl MergeSearch<'_> {
    fn is_mergeable(&self, track: &Track) -> bool {
        track.is_segment()
            && self.states.is_live(track.id)
            && !self.filter.is_some_and(|filter| filter(track))
    }

    fn find_candidates(&self, ids: &[ItemId]) -> Vec<MergeCandidate> {
        let mut found = Vec::new();

        for &id in ids {
            let Some(segment) = self.board.track(id) else {
                continue;
            };
            if !self.is_mergeable(segment) {
                continue;
            }
            let Some(entry) = self.connectivity.entry(id) else {
                continue;
            };

            for anchor in &entry.anchors {
                let mut same_width = Vec::new();
                let mut width_change = false;

                for &n in &anchor.items {
                    let Some(other) = self.board.track(n) else {
                        continue;
                    };
                    if !self.is_mergeable(other) {
                        continue;
                    }
                    if other.width != segment.width {
                        // Deliberate neck-down
                        width_change = true;
                        break;
                    }
                    same_width.push(other);
                }

                if width_change {
                    continue;
                }

                for other in same_width {
                    if other.id > segment.id
                        && segments_approx_collinear(segment.start, segment.end, other.start, other.end)
                        && self.merged_extents(segment, other).is_some()
                    {
                        found.push(MergeCandidate {
                            survivor: segment.id,
                            absorbed: other.id,
                        });
                    }
                }
            }
        }

        found
    }

    /// Ends of the segment replacing `s1` and `s2`, or `None` when merging
    /// would change what the pair connects to.
    fn merged_extents(&self, s1: &Track, s2: &Track) -> Option<(Point, Point)> {
        if s1.locked || s2.locked {
            return None;
        }

        let ends = [s1.start, s1.end, s2.start, s2.end];
        let accuracy = (s1.width + 1) / 2;
        let mut connected_points: Vec<Point> = Vec::new();

        for segment in [s1, s2] {
            for &n in self.cache.connections(self.connectivity, segment.id).iter() {
                if n == s1.id || n == s2.id {
                    continue;
                }
                let Some(item) = self.board.item(n) else {
                    continue;
                };
                if item.as_track().is_some_and(|t| !self.states.is_live(t.id)) {
                    continue;
                }
                for p in ends {
                    let touches = match item {
                        ItemRef::Track(t) => t.is_point_on_ends(p),
                        ItemRef::Pad(pad) => pad.hit_test(p, accuracy),
                    };
                    if touches && !connected_points.contains(&p) {
                        connected_points.push(p);
                    }
                }
            }
        }

        // A third connection point would end up mid-segment
        if connected_points.len() > 2 {
            return None;
        }

        let min_x = ends.iter().map(|p| p.x).min()?;
        let max_x = ends.iter().map(|p| p.x).max()?;
        let min_y = ends.iter().map(|p| p.y).min()?;
        let max_y = ends.iter().map(|p| p.y).max()?;

        let (start, end) = if (s1.start.x > s1.end.x) == (s1.start.y > s1.end.y) {
            (Point::new(min_x, min_y), Point::new(max_x, max_y))
        } else {
            (Point::new(min_x, max_y), Point::new(max_x, min_y))
        };

        if connected_points.iter().any(|&p| p != start && p != end) {
            return None;
        }

        for p in [s1.start, s1.end] {
            if p != start && p != end && self.is_node(s1, p) {
                return None;
            }
        }

        Some((start, end))
    }

    /// More than one other live branch has an anchor exactly at `point`.
    /// Segments collinear with `track` continue it and are not branches.
    fn is_node(&self, track: &Track, point: Point) -> bool {
        let Some(entry) = self.connectivity.entry(track.id) else {
            return false;
        };

        entry
            .items()
            .into_iter()
            .filter(|&n| n != track.id)
            .filter_map(|n| self.board.item(n))
            .filter(|item| match item {
                ItemRef::Track(t) => {
                    self.states.is_live(t.id)
                        && !(t.is_segment()
                            && segments_approx_collinear(track.start, track.end, t.start, t.end))
                }
                ItemRef::Pad(_) => true,
            })
            .filter(|item| item.anchors().contains(&point))
            .count()
            > 1
    }
}

impl CleanupRun<'_, '_> {
    fn search<'s>(&'s self, cache: &'s ConnectionCache) -> MergeSearch<'s> {
        MergeSearch {
            board: &*self.board,
            connectivity: &self.connectivity,
            states: &self.states,
            filter: self.filter,
            cache,
        }
    }

    /// Merge collinear segment pairs until a round merges nothing
    pub(super) fn merge_collinear_segments(&mut self) -> Result<(), CleanupError> {
        let start = Instant::now();
        let cache = ConnectionCache::default();
        let cap = self.board.track_count() + 1;
        let mut rounds = 0;
        let mut total = 0;

        loop {
            if rounds >= cap {
                error!("[Cleanup] Collinear merge still changing after {} rounds", rounds);
                return Err(CleanupError::FixpointNotReached {
                    phase: "collinear merge",
                    rounds,
                });
            }
            rounds += 1;

            self.rebuild_connectivity();
            cache.clear();

            let segments: Vec<ItemId> = self
                .board
                .tracks()
                .filter(|t| t.is_segment())
                .map(|t| t.id)
                .collect();

            let batches = {
                let search = self.search(&cache);
                self.pool
                    .submit_blocks(segments.len(), |range| search.find_candidates(&segments[range]))
            };
            let found: usize = batches.iter().map(Vec::len).sum();

            let mut merged = 0;
            for candidate in batches.into_iter().flatten() {
                if self.apply_merge(candidate, &cache) {
                    merged += 1;
                }
            }

            self.summary.merge_rounds += 1;
            debug!(
                "[Cleanup] Merge round {}: {} candidates, {} merged",
                rounds, found, merged
            );
            yield_point();

            if merged == 0 {
                break;
            }
            total += merged;
        }

        info!(
            "[Cleanup] Collinear merge: {} merges in {} rounds, {:?}",
            total,
            rounds,
            start.elapsed()
        );

        Ok(())
    }

    /// Apply one found pair if it still holds against the current board
    fn apply_merge(&mut self, candidate: MergeCandidate, cache: &ConnectionCache) -> bool {
        if !self.states.is_live(candidate.survivor) || !self.states.is_live(candidate.absorbed) {
            return false;
        }
        let (Some(survivor), Some(absorbed)) = (
            self.board.track(candidate.survivor).cloned(),
            self.board.track(candidate.absorbed).cloned(),
        ) else {
            return false;
        };

        // Earlier merges this round may have moved either segment
        let extents = {
            let search = self.search(cache);
            let connected = search
                .connectivity
                .entry(survivor.id)
                .is_some_and(|entry| entry.contains(absorbed.id));
            if connected
                && segments_approx_collinear(survivor.start, survivor.end, absorbed.start, absorbed.end)
            {
                search.merged_extents(&survivor, &absorbed)
            } else {
                None
            }
        };
        let Some((start, end)) = extents else {
            return false;
        };

        self.push_record(CleanupRecord::pair(CleanupKind::MergeTracks, survivor.id, absorbed.id));
        self.states.mark_pending(absorbed.id);

        self.commit.modify(&survivor);
        if let Some(track) = self.board.track_mut(survivor.id) {
            track.start = start;
            track.end = end;
        }
        self.remove_now(absorbed.id);
        self.connectivity.update(self.board, survivor.id);
        cache.clear();

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Layer, LayerSet, Pad, PadShape};

    fn seg(x0: i64, y0: i64, x1: i64, y1: i64) -> Track {
        Track::segment(Point::new(x0, y0), Point::new(x1, y1), 200, Layer::F_CU, 1)
    }

    fn extents(board: &Board, a: ItemId, b: ItemId) -> Option<(Point, Point)> {
        let connectivity = Connectivity::build(board, |_| true);
        let states = ItemStates::new();
        let cache = ConnectionCache::default();
        let search = MergeSearch {
            board,
            connectivity: &connectivity,
            states: &states,
            filter: None,
            cache: &cache,
        };
        search.merged_extents(board.track(a).unwrap(), board.track(b).unwrap())
    }

    #[test]
    fn test_extents_follow_orientation() {
        let mut board = Board::new();
        let a = board.add_track(seg(0, 1000, 1000, 0));
        let b = board.add_track(seg(1000, 0, 2000, -1000));
        assert_eq!(
            extents(&board, a, b),
            Some((Point::new(0, 1000), Point::new(2000, -1000)))
        );
    }

    #[test]
    fn test_junction_blocks_merge() {
        let mut board = Board::new();
        let a = board.add_track(seg(0, 0, 1000, 0));
        let b = board.add_track(seg(1000, 0, 2000, 0));
        board.add_track(seg(1000, 0, 1000, 1000));
        assert_eq!(extents(&board, a, b), None);
    }

    #[test]
    fn test_pad_at_outer_end_allows_merge() {
        let mut board = Board::new();
        board.add_pad(Pad::new(
            Point::new(0, 0),
            PadShape::Circle { diameter: 600 },
            LayerSet::single(Layer::F_CU),
            1,
        ));
        let a = board.add_track(seg(0, 0, 1000, 0));
        let b = board.add_track(seg(1000, 0, 2000, 0));
        assert_eq!(
            extents(&board, a, b),
            Some((Point::new(0, 0), Point::new(2000, 0)))
        );
    }

    #[test]
    fn test_locked_segment_is_not_merged() {
        let mut board = Board::new();
        let a = board.add_track(seg(0, 0, 1000, 0).locked());
        let b = board.add_track(seg(1000, 0, 2000, 0));
        assert_eq!(extents(&board, a, b), None);
    }

    #[test]
    fn test_node_ignores_collinear_continuation() {
        let mut board = Board::new();
        let a = board.add_track(seg(0, 0, 1000, 0));
        board.add_track(seg(1000, 0, 2000, 0));
        board.add_track(seg(1000, 0, 1000, 1000));
        let junction = Point::new(1000, 0);

        let is_node = |board: &Board| {
            let connectivity = Connectivity::build(board, |_| true);
            let states = ItemStates::new();
            let cache = ConnectionCache::default();
            let search = MergeSearch {
                board,
                connectivity: &connectivity,
                states: &states,
                filter: None,
                cache: &cache,
            };
            search.is_node(board.track(a).unwrap(), junction)
        };

        // Continuation plus one branch
        assert!(!is_node(&board));

        board.add_track(seg(1000, 0, 1000, -1000));
        assert!(is_node(&board));
    }

    #[test]
    fn test_cache_is_filled_lazily() {
        let mut board = Board::new();
        let a = board.add_track(seg(0, 0, 1000, 0));
        let b = board.add_track(seg(1000, 0, 2000, 0));
        let connectivity = Connectivity::build(&board, |_| true);
        let cache = ConnectionCache::default();

        assert_eq!(&*cache.connections(&connectivity, a), &[b]);
        assert_eq!(cache.map.lock().unwrap().len(), 1);
        cache.clear();
        assert!(cache.map.lock().unwrap().is_empty());
    }
}
