// Whole-engine properties: idempotence, dry-run fidelity, net safety, undo
use track_cleanup::board::{Board, BoardCommit, Layer, LayerSet, Pad, PadShape, Point, Track, ViaType};
use track_cleanup::cleanup::{CleanupKind, CleanupOptions, CleanupRecord, TracksCleaner, WorkerPool};
use track_cleanup::connectivity::Connectivity;
use track_cleanup::ItemId;

fn smd_pad(x: i64, y: i64, net: i32) -> Pad {
    Pad::new(Point::new(x, y), PadShape::Circle { diameter: 400 }, LayerSet::single(Layer::F_CU), net)
}

fn seg(x0: i64, y0: i64, x1: i64, y1: i64, net: i32) -> Track {
    Track::segment(Point::new(x0, y0), Point::new(x1, y1), 200, Layer::F_CU, net)
}

/// A board with one of everything the cleaner removes
fn messy_board() -> Board {
    let mut board = Board::new();
    board.add_pad(smd_pad(0, 0, 1));
    board.add_pad(smd_pad(3000, 0, 1));
    // Chain split in three, with a duplicate of the last piece
    board.add_track(seg(0, 0, 1000, 0, 1));
    board.add_track(seg(1000, 0, 2000, 0, 1));
    board.add_track(seg(2000, 0, 3000, 0, 1));
    board.add_track(seg(2000, 0, 3000, 0, 1));
    // Stub hanging off the chain
    board.add_track(seg(1500, 0, 1500, 800, 1));
    // Zero length
    board.add_track(seg(5000, 5000, 5000, 5000, 1));
    // Stacked, unconnected vias
    board.add_track(Track::via(Point::new(5000, 0), 400, ViaType::Through, Layer::F_CU, Layer::B_CU, 1));
    board.add_track(Track::via(Point::new(5000, 0), 400, ViaType::Through, Layer::F_CU, Layer::B_CU, 1));
    // Net 2 track landing on a net 1 pad
    board.add_pad(smd_pad(0, 3000, 2));
    board.add_pad(smd_pad(500, 3000, 1));
    board.add_track(seg(0, 3000, 500, 3000, 2));
    board
}

fn run(board: &mut Board, dry_run: bool) -> Vec<CleanupRecord> {
    let mut records = Vec::new();
    TracksCleaner::new(board)
        .cleanup_board(dry_run, &mut records, &CleanupOptions::all(), None)
        .expect("cleanup failed");
    records
}

fn snapshot(board: &Board) -> serde_json::Value {
    serde_json::to_value(board).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messy_board_hits_every_kind() {
        let mut board = messy_board();
        let records = run(&mut board, false);

        let kinds: Vec<CleanupKind> = records.iter().map(|r| r.kind()).collect();
        for expected in [
            CleanupKind::ZeroLengthTrack,
            CleanupKind::DuplicateTrack,
            CleanupKind::RedundantVia,
            CleanupKind::MergeTracks,
            CleanupKind::ShortingTrack,
            CleanupKind::DanglingTrack,
            CleanupKind::DanglingVia,
        ] {
            assert!(kinds.contains(&expected), "Missing {:?} in {:?}", expected, kinds);
        }

        // Only the merged chain is left
        assert_eq!(board.track_count(), 1);
        let chain = board.tracks().next().unwrap();
        assert_eq!((chain.start, chain.end), (Point::new(0, 0), Point::new(3000, 0)));
        println!("✓ {} records on messy board", records.len());
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let mut board = messy_board();
        let first = run(&mut board, false);
        assert!(!first.is_empty());

        let before = snapshot(&board);
        let second = run(&mut board, false);
        assert!(second.is_empty(), "Second run produced {:?}", second);
        assert_eq!(snapshot(&board), before);
    }

    #[test]
    fn test_dry_run_matches_real_run() {
        let mut board = messy_board();
        let original = snapshot(&board);

        let mut records = Vec::new();
        let mut commit = BoardCommit::new(&board);
        let summary = TracksCleaner::new(&mut board)
            .cleanup_board_with_commit(true, &mut records, &CleanupOptions::all(), &mut commit, None)
            .unwrap();

        assert!(summary.dry_run);
        assert_eq!(snapshot(&board), original, "Dry run modified the board");
        assert!(commit.is_empty(), "Dry run reported changes");

        let real = run(&mut board, false);
        assert_eq!(records, real);
        assert_eq!(summary.total(), real.len());
    }

    #[test]
    fn test_no_short_survives() {
        let mut board = messy_board();
        board.add_track(seg(3000, 0, 3000, 1500, 3));
        run(&mut board, false);

        let connectivity = Connectivity::build(&board, |_| true);
        for track in board.tracks() {
            for id in connectivity.connected_items(track.id) {
                let net = board.item(id).unwrap().net();
                assert_eq!(net, track.net, "{} still touches net {}", track.id, net);
            }
        }
    }

    #[test]
    fn test_fully_connected_track_is_kept() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_pad(smd_pad(1000, 1000, 1));
        let track = board.add_track(seg(0, 0, 1000, 1000, 1));

        let records = run(&mut board, false);
        assert!(records.is_empty());
        assert!(board.contains(track));
    }

    #[test]
    fn test_merge_keeps_pads_connected() {
        let mut board = Board::new();
        let left = board.add_pad(smd_pad(0, 0, 1));
        let right = board.add_pad(smd_pad(3000, 3000, 1));
        board.add_track(seg(0, 0, 1000, 1000, 1));
        board.add_track(seg(1000, 1000, 2000, 2000, 1));
        board.add_track(seg(2000, 2000, 3000, 3000, 1));

        let records = run(&mut board, false);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind() == CleanupKind::MergeTracks));
        assert_eq!(board.track_count(), 1);

        let connectivity = Connectivity::build(&board, |_| true);
        let track = board.tracks().next().unwrap();
        let connected = connectivity.connected_items(track.id);
        assert!(connected.contains(&left));
        assert!(connected.contains(&right));
    }

    #[test]
    fn test_duplicate_survivor_does_not_depend_on_order() {
        for reversed in [false, true] {
            let mut board = Board::new();
            board.add_pad(smd_pad(0, 0, 1));
            board.add_pad(smd_pad(1000, 0, 1));
            let mut pair = vec![seg(0, 0, 1000, 0, 1), seg(1000, 0, 0, 0, 1)];
            if reversed {
                pair.reverse();
            }
            for track in pair {
                board.add_track(track);
            }

            let records = run(&mut board, false);
            assert_eq!(records.len(), 1, "reversed={}: {:?}", reversed, records);
            assert_eq!(records[0].kind(), CleanupKind::DuplicateTrack);
            assert_eq!(board.track_count(), 1);
        }
    }

    #[test]
    fn test_undo_restores_board() {
        let mut board = messy_board();
        let original = snapshot(&board);

        let mut records = Vec::new();
        let mut commit = BoardCommit::new(&board);
        TracksCleaner::new(&mut board)
            .cleanup_board_with_commit(false, &mut records, &CleanupOptions::all(), &mut commit, None)
            .unwrap();
        assert_ne!(snapshot(&board), original);
        assert!(commit.modified_count() > 0);
        for record in &records {
            let removed = record.aux_item().filter(|_| record.kind() == CleanupKind::MergeTracks).unwrap_or(record.main_item());
            assert!(
                commit.entries().iter().any(|e| e.item_id() == removed),
                "{:?} has no commit entry",
                record
            );
        }

        commit.undo(&mut board);
        assert_eq!(snapshot(&board), original);
    }

    #[test]
    fn test_locked_and_filtered_items_untouched() {
        let mut board = Board::new();
        let locked = board.add_track(seg(0, 0, 1000, 0, 1).locked());
        let excluded = board.add_track(seg(5000, 5000, 5000, 5000, 1));
        let free = board.add_track(seg(8000, 0, 9000, 0, 1));

        let mut records = Vec::new();
        TracksCleaner::new(&mut board)
            .with_filter(move |track: &Track| track.id == excluded)
            .cleanup_board(false, &mut records, &CleanupOptions::all(), None)
            .unwrap();

        assert_eq!(records, vec![CleanupRecord::single(CleanupKind::DanglingTrack, free)]);
        assert!(board.contains(locked));
        assert!(board.contains(excluded));
    }

    #[test]
    fn test_locked_via_survives_its_duplicate() {
        let mut board = Board::new();
        let locked = board.add_track(Track::via(Point::new(0, 0), 400, ViaType::Through, Layer::F_CU, Layer::B_CU, 1).locked());
        let other = board.add_track(Track::via(Point::new(0, 0), 400, ViaType::Through, Layer::F_CU, Layer::B_CU, 1));

        let options = CleanupOptions {
            clean_vias: true,
            ..CleanupOptions::none()
        };
        let mut records = Vec::new();
        TracksCleaner::new(&mut board)
            .cleanup_board(false, &mut records, &options, None)
            .unwrap();

        assert_eq!(records, vec![CleanupRecord::single(CleanupKind::RedundantVia, other)]);
        assert!(board.contains(locked));
    }

    #[test]
    fn test_long_chain_merges_completely() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_pad(smd_pad(20_000, 0, 1));
        let first = board.add_track(seg(0, 0, 1000, 0, 1));
        for i in 1..20 {
            board.add_track(seg(i * 1000, 0, (i + 1) * 1000, 0, 1));
        }

        let mut records = Vec::new();
        let summary = TracksCleaner::new(&mut board)
            .cleanup_board(false, &mut records, &CleanupOptions::all(), None)
            .unwrap();

        assert_eq!(records.len(), 19);
        assert!(summary.merge_rounds > 1);
        assert_eq!(board.track_count(), 1);
        let merged = board.track(first).unwrap();
        assert_eq!((merged.start, merged.end), (Point::new(0, 0), Point::new(20_000, 0)));
    }

    #[test]
    fn test_block_size_does_not_change_result() {
        let build = || {
            let mut board = Board::new();
            board.add_pad(smd_pad(0, 0, 1));
            board.add_pad(smd_pad(0, 12_000, 1));
            for i in 0..12 {
                board.add_track(seg(0, i * 1000, 0, (i + 1) * 1000, 1));
            }
            board
        };

        let mut results: Vec<Vec<CleanupRecord>> = Vec::new();
        for pool in [WorkerPool::new(1), WorkerPool::new(5), WorkerPool::with_threads(3, 2).unwrap()] {
            let mut board = build();
            let mut records = Vec::new();
            TracksCleaner::new(&mut board)
                .with_pool(pool)
                .cleanup_board(false, &mut records, &CleanupOptions::all(), None)
                .unwrap();
            assert_eq!(board.track_count(), 1);
            results.push(records);
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn test_arcs_are_not_merged() {
        let mut board = Board::new();
        board.add_pad(smd_pad(-1000, 0, 1));
        board.add_pad(smd_pad(1000, 0, 1));
        board.add_track(Track::arc(Point::new(-1000, 0), Point::new(-707, 707), Point::new(0, 1000), 200, Layer::F_CU, 1));
        board.add_track(Track::arc(Point::new(0, 1000), Point::new(707, 707), Point::new(1000, 0), 200, Layer::F_CU, 1));

        let records = run(&mut board, false);
        assert!(records.is_empty(), "Arcs were touched: {:?}", records);
        assert_eq!(board.track_count(), 2);
        assert!(board.tracks().all(Track::is_arc));
    }

    #[test]
    fn test_progress_messages_follow_mode() {
        let mut board = messy_board();

        let mut messages: Vec<String> = Vec::new();
        let mut records = Vec::new();
        TracksCleaner::new(&mut board)
            .cleanup_board(true, &mut records, &CleanupOptions::all(), Some(&mut messages))
            .unwrap();
        assert_eq!(
            messages,
            vec![
                "Checking null tracks and vias...",
                "Checking shorting tracks...",
                "Checking tracks in pads...",
                "Checking dangling tracks and vias...",
                "Checking collinear tracks...",
            ]
        );

        let mut messages: Vec<String> = Vec::new();
        let mut records = Vec::new();
        TracksCleaner::new(&mut board)
            .cleanup_board(false, &mut records, &CleanupOptions::all(), Some(&mut messages))
            .unwrap();
        assert_eq!(messages[0], "Removing null tracks and vias...");
        assert_eq!(messages.last().map(String::as_str), Some("Merging collinear tracks..."));
    }

    #[test]
    fn test_duplicate_pass_reported_only_without_merging() {
        let options = CleanupOptions {
            merge_segments: false,
            ..CleanupOptions::all()
        };
        let mut board = messy_board();
        let mut messages: Vec<String> = Vec::new();
        let mut records = Vec::new();
        TracksCleaner::new(&mut board)
            .cleanup_board(false, &mut records, &options, Some(&mut messages))
            .unwrap();

        assert_eq!(messages[1], "Removing redundant tracks...");
        assert!(!messages.iter().any(|m| m == "Merging collinear tracks..."));
    }

    #[test]
    fn test_records_serialize_with_kind_names() {
        let record = CleanupRecord::pair(CleanupKind::MergeTracks, ItemId(3), ItemId(7));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "MERGE_TRACKS");
        assert_eq!(json["items"], serde_json::json!([3, 7]));
    }
}
