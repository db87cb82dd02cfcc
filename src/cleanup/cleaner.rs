//! Cleanup orchestration
//!
//! [`TracksCleaner`] is the public entry point. Each invocation builds a
//! [`CleanupRun`] holding the per-invocation state (item states,
//! connectivity, output records) and runs the phases in a fixed order. The
//! phases themselves live in sibling modules as further `impl CleanupRun`
//! blocks; the null/duplicate/redundant-via pass is here.

use std::time::Instant;
use tracing::{debug, info};

use crate::board::{
    Board, CommitLog, DiscardCommit, ItemId, LayerSet, SpatialIndex, Track, ViaType,
};
use crate::connectivity::Connectivity;
use crate::error::CleanupError;

use super::pool::WorkerPool;
use super::progress::ProgressReporter;
use super::state::ItemStates;
use super::types::{CleanupKind, CleanupOptions, CleanupRecord, CleanupSummary};

/// Exclusion predicate: items for which it returns true are never touched
pub type ItemFilter<'f> = dyn Fn(&Track) -> bool + Sync + 'f;

/// Removes redundant, null, shorting and dangling copper and merges
/// collinear segments on one board
pub struct TracksCleaner<'a> {
    board: &'a mut Board,
    filter: Option<Box<ItemFilter<'a>>>,
    pool: WorkerPool,
}

impl<'a> TracksCleaner<'a> {
    pub fn new(board: &'a mut Board) -> Self {
        Self {
            board,
            filter: None,
            pool: WorkerPool::default(),
        }
    }

    /// Exclude every track for which `filter` returns true
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Track) -> bool + Sync + 'a,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Run the selected cleanup phases, appending one record per detected
    /// action to `records`.
    ///
    /// With `dry_run` the board is left untouched: the phases run on a
    /// scratch copy, so the records are exactly those a real run produces.
    pub fn cleanup_board(
        &mut self,
        dry_run: bool,
        records: &mut Vec<CleanupRecord>,
        options: &CleanupOptions,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<CleanupSummary, CleanupError> {
        let mut discard = DiscardCommit;
        self.cleanup_board_with_commit(dry_run, records, options, &mut discard, reporter)
    }

    /// Same as [`cleanup_board`](Self::cleanup_board), reporting every board
    /// change to `commit`. Nothing is reported in a dry run.
    pub fn cleanup_board_with_commit(
        &mut self,
        dry_run: bool,
        records: &mut Vec<CleanupRecord>,
        options: &CleanupOptions,
        commit: &mut dyn CommitLog,
        reporter: Option<&mut dyn ProgressReporter>,
    ) -> Result<CleanupSummary, CleanupError> {
        let start = Instant::now();
        let first_record = records.len();

        let mut scratch = None;
        let mut discard = DiscardCommit;
        let board: &mut Board = if dry_run {
            scratch.insert(self.board.clone())
        } else {
            &mut *self.board
        };
        let commit: &mut dyn CommitLog = if dry_run { &mut discard } else { commit };

        info!(
            "[Cleanup] Starting {} on {} tracks, {} pads",
            if dry_run { "dry run" } else { "cleanup" },
            board.track_count(),
            board.pad_count()
        );

        let mut run = CleanupRun {
            board,
            commit,
            filter: self.filter.as_deref(),
            pool: &self.pool,
            states: ItemStates::new(),
            connectivity: Connectivity::new(),
            records: &mut *records,
            reporter,
            dry_run,
            summary: CleanupSummary {
                dry_run,
                ..CleanupSummary::default()
            },
        };
        let outcome = run.run_phases(options);
        let CleanupRun { mut summary, .. } = run;

        summary.tally(&records[first_record..]);
        summary.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            "[Cleanup] Finished in {:.2}ms: {} records ({} dangling rounds, {} merge rounds)",
            summary.elapsed_ms,
            summary.total(),
            summary.dangling_rounds,
            summary.merge_rounds
        );

        outcome.map(|()| summary)
    }
}

/// State of one cleanup invocation
pub(super) struct CleanupRun<'r, 'p> {
    pub(super) board: &'r mut Board,
    pub(super) commit: &'r mut dyn CommitLog,
    pub(super) filter: Option<&'r ItemFilter<'r>>,
    pub(super) pool: &'r WorkerPool,
    pub(super) states: ItemStates,
    pub(super) connectivity: Connectivity,
    pub(super) records: &'r mut Vec<CleanupRecord>,
    pub(super) reporter: Option<&'p mut dyn ProgressReporter>,
    pub(super) dry_run: bool,
    pub(super) summary: CleanupSummary,
}

/// Cooperative yield between phases and fixpoint rounds
pub(super) fn yield_point() {
    std::thread::yield_now();
}

impl CleanupRun<'_, '_> {
    fn run_phases(&mut self, options: &CleanupOptions) -> Result<(), CleanupError> {
        self.report("Checking null tracks and vias...", "Removing null tracks and vias...");
        let remove_null_segments = options.merge_segments || options.remove_misconnected;
        self.cleanup(
            options.clean_vias,
            remove_null_segments,
            options.merge_segments,
            options.merge_segments,
        )?;
        yield_point();

        // Duplicates go even when merging is off
        if !options.merge_segments {
            self.report("Checking redundant tracks...", "Removing redundant tracks...");
            self.cleanup(false, false, true, false)?;
            yield_point();
        }

        if options.remove_misconnected {
            self.report("Checking shorting tracks...", "Removing shorting tracks...");
            self.remove_shorting_track_segments();
            yield_point();
        }

        if options.delete_tracks_in_pads {
            self.report("Checking tracks in pads...", "Removing tracks in pads...");
            self.delete_tracks_in_pads();
            yield_point();
        }

        let has_deleted = if options.delete_unconnected_tracks || options.delete_dangling_vias {
            self.report(
                "Checking dangling tracks and vias...",
                "Removing dangling tracks and vias...",
            );
            self.delete_dangling_tracks(options.delete_unconnected_tracks, options.delete_dangling_vias)?
        } else {
            false
        };

        // Removing a stub can line up segments that were split by it
        if has_deleted && options.merge_segments {
            self.report("Checking collinear tracks...", "Merging collinear tracks...");
            self.cleanup(false, false, true, true)?;
        }

        Ok(())
    }

    fn report(&mut self, checking: &str, removing: &str) {
        let message = if self.dry_run { checking } else { removing };
        if let Some(reporter) = self.reporter.as_deref_mut() {
            reporter.report(message);
        }
    }

    pub(super) fn is_filtered(&self, track: &Track) -> bool {
        self.filter.is_some_and(|filter| filter(track))
    }

    /// Live, unlocked and not excluded
    pub(super) fn is_candidate(&self, track: &Track) -> bool {
        self.states.is_live(track.id) && !track.locked && !self.is_filtered(track)
    }

    pub(super) fn push_record(&mut self, record: CleanupRecord) {
        debug!(
            "[Cleanup] {}: {:?}",
            record.kind().description(),
            record.items()
        );
        self.records.push(record);
    }

    /// Rebuild connectivity over the live items
    pub(super) fn rebuild_connectivity(&mut self) {
        let states = &self.states;
        self.connectivity.rebuild(self.board, |id| states.is_live(id));
    }

    /// Stage and detach a batch of marked items
    pub(super) fn remove_items(&mut self, ids: &[ItemId]) {
        for &id in ids {
            if let Some(track) = self.board.track(id) {
                self.commit.remove(track);
            }
            self.board.remove_track(id);
            self.connectivity.remove(self.board, id);
            self.states.mark_removed(id);
        }
    }

    /// Detach one item immediately so later checks in the same round no
    /// longer see it
    pub(super) fn remove_now(&mut self, id: ItemId) {
        if let Some(track) = self.board.remove_track(id) {
            self.commit.removed(&track);
        }
        self.connectivity.remove(self.board, id);
        self.states.mark_removed(id);
    }

    /// Geometric cleanup pass: redundant vias, zero-length tracks, duplicate
    /// segments, then (optionally) collinear merging.
    pub(super) fn cleanup(
        &mut self,
        delete_duplicate_vias: bool,
        delete_null_segments: bool,
        delete_duplicate_segments: bool,
        merge_segments: bool,
    ) -> Result<(), CleanupError> {
        let start = Instant::now();
        let first_record = self.records.len();

        self.states.clear_examined();
        self.rebuild_connectivity();
        let index = {
            let states = &self.states;
            SpatialIndex::build(self.board.tracks().filter(|t| states.is_live(t.id)))
        };

        let mut to_remove: Vec<ItemId> = Vec::new();

        for id in self.board.track_ids() {
            let Some(track) = self.board.track(id) else {
                continue;
            };
            if !self.is_candidate(track) {
                continue;
            }
            let mut track = track.clone();

            if delete_duplicate_vias && track.is_via() {
                if track.end != track.start {
                    self.commit.modify(&track);
                    track.end = track.start;
                    if let Some(via) = self.board.track_mut(id) {
                        via.end = track.start;
                    }
                }
                self.remove_redundant_vias(&index, &track, &mut to_remove);
                self.states.set_examined(id);
            }

            if delete_null_segments && !track.is_via() && track.is_null() && self.states.mark_pending(id) {
                self.push_record(CleanupRecord::single(CleanupKind::ZeroLengthTrack, id));
                to_remove.push(id);
            }

            if delete_duplicate_segments && track.is_segment() && !track.is_null() {
                if self.is_duplicate_segment(&index, &track) && self.states.mark_pending(id) {
                    self.push_record(CleanupRecord::single(CleanupKind::DuplicateTrack, id));
                    to_remove.push(id);
                }
                self.states.set_examined(id);
            }
        }

        self.remove_items(&to_remove);

        info!(
            "[Cleanup] Geometric pass: {} records in {:?}",
            self.records.len() - first_record,
            start.elapsed()
        );

        if merge_segments {
            self.merge_collinear_segments()?;
        }

        Ok(())
    }

    /// Mark every later via stacked on `via`, and `via` itself if it sits on
    /// a pad that already spans every copper layer
    fn remove_redundant_vias(&mut self, index: &SpatialIndex, via: &Track, to_remove: &mut Vec<ItemId>) {
        let mut stacked: Vec<ItemId> = Vec::new();
        {
            let board = &*self.board;
            let states = &self.states;
            index.query_colliding(
                via,
                via.layer(),
                via.bottom_layer(),
                |id| {
                    board.track(id).is_some_and(Track::is_via)
                        && !states.is_examined(id)
                        && states.is_live(id)
                },
                |id| {
                    if let Some(other) = board.track(id) {
                        if other.position() == via.position()
                            && other.via_type() == via.via_type()
                            && other.layer_set() == via.layer_set()
                        {
                            stacked.push(id);
                        }
                    }
                    true
                },
            );
        }

        for other in stacked {
            let removable = self.board.track(other).is_some_and(|t| self.is_candidate(t));
            if removable {
                self.states.mark_pending(other);
                self.push_record(CleanupRecord::single(CleanupKind::RedundantVia, other));
                to_remove.push(other);
            } else if self.states.mark_pending(via.id) {
                // The other via is locked or excluded: keep it instead
                self.push_record(CleanupRecord::single(CleanupKind::RedundantVia, via.id));
                to_remove.push(via.id);
                break;
            }
        }

        if via.via_type() != Some(ViaType::Through) || !self.states.is_live(via.id) {
            return;
        }

        let through_pad = self
            .connectivity
            .connected_pads(self.board, via.id)
            .into_iter()
            .find(|pad| pad.layers.contains_all(LayerSet::all_copper()))
            .map(|pad| pad.id);

        if let Some(pad) = through_pad {
            self.states.mark_pending(via.id);
            self.push_record(CleanupRecord::pair(CleanupKind::RedundantVia, via.id, pad));
            to_remove.push(via.id);
        }
    }

    /// True if another unexamined segment covers exactly the same ends with
    /// the same width on the same layer
    fn is_duplicate_segment(&self, index: &SpatialIndex, track: &Track) -> bool {
        let board = &*self.board;
        let states = &self.states;
        let mut duplicate = false;

        index.query_colliding(
            track,
            track.layer(),
            track.layer(),
            |id| {
                board.track(id).is_some_and(|t| t.is_segment() && !t.is_null())
                    && !states.is_examined(id)
                    && states.is_live(id)
            },
            |id| {
                if let Some(other) = board.track(id) {
                    if track.is_point_on_ends(other.start)
                        && track.is_point_on_ends(other.end)
                        && other.width == track.width
                        && other.layer() == track.layer()
                    {
                        duplicate = true;
                        return false;
                    }
                }
                true
            },
        );

        duplicate
    }
}
