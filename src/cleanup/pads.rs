//! Removal of tracks lying entirely inside a connected pad

use geo::{Area, BooleanOps, MultiPolygon};
use std::time::Instant;
use tracing::info;

use crate::board::{to_geo_polygon, track_swept_polygon, Pad, Track};

use super::cleaner::CleanupRun;
use super::types::{CleanupKind, CleanupRecord};

/// Copper left outside the pad below this area (nm²) is rounding noise
const RESIDUAL_AREA: f64 = 1.0;

impl CleanupRun<'_, '_> {
    pub(super) fn delete_tracks_in_pads(&mut self) {
        let start = Instant::now();
        self.rebuild_connectivity();

        let mut to_remove = Vec::new();

        for id in self.board.track_ids() {
            let Some(track) = self.board.track(id) else {
                continue;
            };
            if track.is_via() || !self.is_candidate(track) {
                continue;
            }

            let inside = self
                .connectivity
                .connected_pads(self.board, id)
                .into_iter()
                .any(|pad| track_inside_pad(track, pad));

            if inside && self.states.mark_pending(id) {
                self.push_record(CleanupRecord::single(CleanupKind::TrackInPad, id));
                to_remove.push(id);
            }
        }

        info!(
            "[Cleanup] Track-in-pad check: {} tracks in {:?}",
            to_remove.len(),
            start.elapsed()
        );
        self.remove_items(&to_remove);
    }
}

/// Both ends inside the pad and no copper of the track outside its outline
fn track_inside_pad(track: &Track, pad: &Pad) -> bool {
    let Some(outline) = pad.effective_polygon(track.layer()) else {
        return false;
    };
    if !pad.hit_test(track.start, 0) || !pad.hit_test(track.end, 0) {
        return false;
    }

    let pad_shape = MultiPolygon::new(vec![to_geo_polygon(&outline)]);
    let outside = track_swept_polygon(track).difference(&pad_shape);
    outside.unsigned_area() <= RESIDUAL_AREA
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Layer, LayerSet, PadShape, Point};

    fn rect_pad() -> Pad {
        Pad::new(
            Point::new(0, 0),
            PadShape::Rect { width: 2000, height: 1000 },
            LayerSet::single(Layer::F_CU),
            1,
        )
    }

    #[test]
    fn test_short_track_is_inside() {
        let track = Track::segment(Point::new(-500, 0), Point::new(500, 0), 200, Layer::F_CU, 1);
        assert!(track_inside_pad(&track, &rect_pad()));
    }

    #[test]
    fn test_wide_track_spills_out() {
        // Ends inside, copper past the pad edge
        let track = Track::segment(Point::new(-500, 0), Point::new(500, 0), 1200, Layer::F_CU, 1);
        assert!(!track_inside_pad(&track, &rect_pad()));
    }

    #[test]
    fn test_track_leaving_pad() {
        let track = Track::segment(Point::new(0, 0), Point::new(3000, 0), 200, Layer::F_CU, 1);
        assert!(!track_inside_pad(&track, &rect_pad()));
    }

    #[test]
    fn test_other_layer_is_ignored() {
        let track = Track::segment(Point::new(-500, 0), Point::new(500, 0), 200, Layer::B_CU, 1);
        assert!(!track_inside_pad(&track, &rect_pad()));
    }
}
