//! Geometry helpers for copper items
//!
//! Point/segment distances, arc flattening, pad outline polygons and swept
//! track polygons used by hit testing and the track-in-pad check.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use std::f64::consts::PI;

use super::types::{Pad, PadShape, Point, Track, TrackKind};

/// Segments used to approximate a full circle
const CIRCLE_SEGMENTS: usize = 32;

/// Segments used to flatten an arc
const ARC_SEGMENTS: usize = 16;

/// Angular tolerance (radians) for treating two directions as parallel
pub const COLLINEAR_ANGLE_TOLERANCE: f64 = 1e-4;

/// Point-to-segment minimum distance
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    point_segment_distance_f64(p.as_f64(), a.as_f64(), b.as_f64())
}

fn point_segment_distance_f64(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let ab_len2 = ab[0] * ab[0] + ab[1] * ab[1];

    if ab_len2 < 1e-12 {
        // Degenerate segment
        return ((p[0] - a[0]).powi(2) + (p[1] - a[1]).powi(2)).sqrt();
    }

    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / ab_len2).clamp(0.0, 1.0);
    let closest = [a[0] + t * ab[0], a[1] + t * ab[1]];
    ((p[0] - closest[0]).powi(2) + (p[1] - closest[1]).powi(2)).sqrt()
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`
pub fn point_line_distance(p: Point, a: Point, b: Point) -> f64 {
    let len = a.distance(b);
    if len < 1e-12 {
        return p.distance(a);
    }
    let cross = (b.x - a.x) as f64 * (p.y - a.y) as f64 - (b.y - a.y) as f64 * (p.x - a.x) as f64;
    cross.abs() / len
}

/// Two segments are approximately collinear when their directions are
/// parallel within [`COLLINEAR_ANGLE_TOLERANCE`] and both ends of `b` sit on
/// the supporting line of `a` (within one nanometre).
pub fn segments_approx_collinear(a_start: Point, a_end: Point, b_start: Point, b_end: Point) -> bool {
    let la = a_start.distance(a_end);
    let lb = b_start.distance(b_end);
    if la < 1e-12 || lb < 1e-12 {
        return false;
    }

    let da = [(a_end.x - a_start.x) as f64 / la, (a_end.y - a_start.y) as f64 / la];
    let db = [(b_end.x - b_start.x) as f64 / lb, (b_end.y - b_start.y) as f64 / lb];
    let sin_angle = (da[0] * db[1] - da[1] * db[0]).abs();
    if sin_angle > COLLINEAR_ANGLE_TOLERANCE {
        return false;
    }

    point_line_distance(b_start, a_start, a_end) <= 1.0
        && point_line_distance(b_end, a_start, a_end) <= 1.0
}

/// Flatten an arc through `mid` into a polyline from `start` to `end`.
/// Degenerate (collinear) arcs come back as the straight chord.
pub fn flatten_arc(start: Point, mid: Point, end: Point) -> Vec<Point> {
    let [ax, ay] = start.as_f64();
    let [bx, by] = mid.as_f64();
    let [cx, cy] = end.as_f64();

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-9 {
        return vec![start, end];
    }

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
    let radius = ((ax - ux).powi(2) + (ay - uy).powi(2)).sqrt();

    let angle_start = (ay - uy).atan2(ax - ux);
    let angle_mid = (by - uy).atan2(bx - ux);
    let angle_end = (cy - uy).atan2(cx - ux);

    // Sweep counter-clockwise from start to end, flip if mid is not on the way
    let ccw = |from: f64, to: f64| (to - from).rem_euclid(2.0 * PI);
    let mut sweep = ccw(angle_start, angle_end);
    if ccw(angle_start, angle_mid) > sweep {
        sweep -= 2.0 * PI;
    }

    let mut points = Vec::with_capacity(ARC_SEGMENTS + 1);
    points.push(start);
    for i in 1..ARC_SEGMENTS {
        let angle = angle_start + sweep * (i as f64 / ARC_SEGMENTS as f64);
        points.push(Point::new(
            (ux + radius * angle.cos()).round() as i64,
            (uy + radius * angle.sin()).round() as i64,
        ));
    }
    points.push(end);
    points
}

/// Regular polygon approximating a circle
fn circle_points(center: [f64; 2], radius: f64, segments: usize) -> Vec<[f64; 2]> {
    (0..segments)
        .map(|i| {
            let angle = (i as f64 / segments as f64) * 2.0 * PI;
            [center[0] + angle.cos() * radius, center[1] + angle.sin() * radius]
        })
        .collect()
}

/// Quarter-circle corner arc, counter-clockwise from `start_angle`
fn corner_points(center: [f64; 2], radius: f64, start_angle: f64) -> Vec<[f64; 2]> {
    let segments = CIRCLE_SEGMENTS / 4;
    (0..=segments)
        .map(|i| {
            let angle = start_angle + (i as f64 / segments as f64) * (PI / 2.0);
            [center[0] + angle.cos() * radius, center[1] + angle.sin() * radius]
        })
        .collect()
}

/// Pad outline in pad-local coordinates (before rotation and translation)
fn pad_local_outline(shape: &PadShape) -> Vec<[f64; 2]> {
    match shape {
        PadShape::Circle { diameter } => {
            circle_points([0.0, 0.0], *diameter as f64 / 2.0, CIRCLE_SEGMENTS)
        }
        PadShape::Rect { width, height } => {
            let hw = *width as f64 / 2.0;
            let hh = *height as f64 / 2.0;
            vec![[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]]
        }
        PadShape::Oval { width, height } => {
            let (w, h) = (*width as f64, *height as f64);
            if (w - h).abs() < 1e-9 {
                return circle_points([0.0, 0.0], w / 2.0, CIRCLE_SEGMENTS);
            }
            // Stadium: two half circles joined by straight sides
            let r = w.min(h) / 2.0;
            let half_len = (w.max(h) - w.min(h)) / 2.0;
            let (c1, c2, a1, a2) = if w > h {
                ([half_len, 0.0], [-half_len, 0.0], -PI / 2.0, PI / 2.0)
            } else {
                ([0.0, half_len], [0.0, -half_len], 0.0, PI)
            };
            let half = CIRCLE_SEGMENTS / 2;
            let mut points = Vec::with_capacity(2 * (half + 1));
            for (center, start) in [(c1, a1), (c2, a2)] {
                for i in 0..=half {
                    let angle = start + (i as f64 / half as f64) * PI;
                    points.push([center[0] + angle.cos() * r, center[1] + angle.sin() * r]);
                }
            }
            points
        }
        PadShape::RoundRect { width, height, corner_radius } => {
            let hw = *width as f64 / 2.0;
            let hh = *height as f64 / 2.0;
            let r = (*corner_radius as f64).clamp(0.0, hw.min(hh));
            if r <= 0.0 {
                return vec![[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]];
            }
            let mut points = Vec::new();
            points.extend(corner_points([hw - r, -hh + r], r, -PI / 2.0));
            points.extend(corner_points([hw - r, hh - r], r, 0.0));
            points.extend(corner_points([-hw + r, hh - r], r, PI / 2.0));
            points.extend(corner_points([-hw + r, -hh + r], r, PI));
            points
        }
        PadShape::Custom { points } => points.iter().map(|p| p.as_f64()).collect(),
    }
}

/// Pad outline in board coordinates
pub fn pad_polygon(pad: &Pad) -> Vec<[f64; 2]> {
    let (sin, cos) = pad.rotation.to_radians().sin_cos();
    let [px, py] = pad.position.as_f64();
    pad_local_outline(&pad.shape)
        .into_iter()
        .map(|[x, y]| [px + x * cos - y * sin, py + x * sin + y * cos])
        .collect()
}

/// Even-odd point in polygon test; points on an edge count as inside
pub fn point_in_polygon(p: [f64; 2], polygon: &[[f64; 2]]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    if polygon_boundary_distance(p, polygon) <= 1e-6 {
        return true;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi[1] > p[1]) != (pj[1] > p[1]) {
            let x_cross = pj[0] + (p[1] - pj[1]) / (pi[1] - pj[1]) * (pi[0] - pj[0]);
            if p[0] < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the nearest edge of a closed polygon
pub fn polygon_boundary_distance(p: [f64; 2], polygon: &[[f64; 2]]) -> f64 {
    if polygon.is_empty() {
        return f64::MAX;
    }
    let n = polygon.len();
    (0..n)
        .map(|i| point_segment_distance_f64(p, polygon[i], polygon[(i + 1) % n]))
        .fold(f64::MAX, f64::min)
}

/// Convert an outline into a `geo` polygon (closing ring added by geo)
pub fn to_geo_polygon(outline: &[[f64; 2]]) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = outline.iter().map(|&[x, y]| Coord { x, y }).collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Rectangle covering a straight run of copper of the given width.
/// A zero-length run becomes a width × width square.
fn segment_rectangle(a: Point, b: Point, width: i64) -> Vec<[f64; 2]> {
    let hw = width as f64 / 2.0;
    let [ax, ay] = a.as_f64();
    let [bx, by] = b.as_f64();
    let len = a.distance(b);
    if len < 1e-12 {
        return vec![[ax - hw, ay - hw], [ax + hw, ay - hw], [ax + hw, ay + hw], [ax - hw, ay + hw]];
    }
    let nx = -(by - ay) / len * hw;
    let ny = (bx - ax) / len * hw;
    vec![[ax + nx, ay + ny], [ax - nx, ay - ny], [bx - nx, by - ny], [bx + nx, by + ny]]
}

/// Copper swept by a track: a width × length rectangle for a segment, the
/// union of such rectangles along the flattened path for an arc.
pub fn track_swept_polygon(track: &Track) -> MultiPolygon<f64> {
    match track.kind {
        TrackKind::Arc { mid, .. } => {
            let path = flatten_arc(track.start, mid, track.end);
            path.windows(2)
                .map(|w| MultiPolygon::new(vec![to_geo_polygon(&segment_rectangle(w[0], w[1], track.width))]))
                .reduce(|acc, piece| acc.union(&piece))
                .unwrap_or_else(|| MultiPolygon::new(vec![]))
        }
        TrackKind::Via { .. } => {
            let outline = circle_points(track.start.as_f64(), track.width as f64 / 2.0, CIRCLE_SEGMENTS);
            MultiPolygon::new(vec![to_geo_polygon(&outline)])
        }
        TrackKind::Segment { .. } => MultiPolygon::new(vec![to_geo_polygon(&segment_rectangle(
            track.start,
            track.end,
            track.width,
        ))]),
    }
}

/// Bounding box `(min, max)` of a track including half its width
pub fn track_bounds(track: &Track) -> ([i64; 2], [i64; 2]) {
    let hw = (track.width + 1) / 2;
    let points = match track.kind {
        TrackKind::Arc { mid, .. } => flatten_arc(track.start, mid, track.end),
        _ => vec![track.start, track.end],
    };
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(track.start.x);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(track.start.y);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(track.start.x);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(track.start.y);
    ([min_x - hw, min_y - hw], [max_x + hw, max_y + hw])
}

/// Bounding box `(min, max)` of a pad outline
pub fn pad_bounds(pad: &Pad) -> ([i64; 2], [i64; 2]) {
    let outline = pad_polygon(pad);
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for [x, y] in &outline {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    if outline.is_empty() {
        let p = pad.position;
        return ([p.x, p.y], [p.x, p.y]);
    }
    (
        [min_x.floor() as i64, min_y.floor() as i64],
        [max_x.ceil() as i64, max_y.ceil() as i64],
    )
}
