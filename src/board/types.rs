//! Core board primitives
//!
//! Tracks (straight segments, arcs and vias) and pads, plus the small value
//! types they are built from. Coordinates are integer nanometres so that
//! end-point coincidence is exact.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::geometry;

/// Number of copper layers a board can carry
pub const COPPER_LAYER_COUNT: u8 = 32;

/// A 2D point in nanometres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn as_f64(self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(i64, i64)> for Point {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

/// Stable item identity.
///
/// Assigned from a generation counter when an item is inserted into a board,
/// so ids order items by creation and never depend on memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Net identifier; 0 is the unconnected net
pub type NetCode = i32;

/// Copper layer index (0 = F.Cu, 31 = B.Cu, inner layers in between)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Layer(pub u8);

/// Layer index past the last copper layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("copper layer {0} out of range (0..{max})", max = COPPER_LAYER_COUNT)]
pub struct InvalidLayer(pub u8);

impl TryFrom<u8> for Layer {
    type Error = InvalidLayer;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if index < COPPER_LAYER_COUNT {
            Ok(Layer(index))
        } else {
            Err(InvalidLayer(index))
        }
    }
}

impl From<Layer> for u8 {
    fn from(layer: Layer) -> u8 {
        layer.0
    }
}

impl Layer {
    pub const F_CU: Layer = Layer(0);
    pub const B_CU: Layer = Layer(COPPER_LAYER_COUNT - 1);

    pub const fn inner(n: u8) -> Layer {
        Layer(n)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Layer::F_CU => write!(f, "F.Cu"),
            Layer::B_CU => write!(f, "B.Cu"),
            Layer(n) => write!(f, "In{}.Cu", n),
        }
    }
}

/// Set of copper layers stored as a bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerSet(pub u32);

impl LayerSet {
    pub const fn empty() -> Self {
        LayerSet(0)
    }

    pub const fn all_copper() -> Self {
        LayerSet(u32::MAX)
    }

    pub const fn single(layer: Layer) -> Self {
        LayerSet(1 << layer.0)
    }

    /// Every layer from `a` to `b` inclusive, in either order
    pub fn span(a: Layer, b: Layer) -> Self {
        let (lo, hi) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        (lo..=hi).fold(LayerSet::empty(), |set, l| set.with(Layer(l)))
    }

    pub const fn with(self, layer: Layer) -> Self {
        LayerSet(self.0 | (1 << layer.0))
    }

    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & (1 << layer.0) != 0
    }

    pub const fn intersects(self, other: LayerSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn contains_all(self, other: LayerSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersection(self, other: LayerSet) -> Self {
        LayerSet(self.0 & other.0)
    }

    /// Number of layers in the set
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Layer> {
        (0..COPPER_LAYER_COUNT)
            .map(Layer)
            .filter(move |l| self.contains(*l))
    }
}

/// Via construction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViaType {
    #[default]
    Through,
    BlindBuried,
    Micro,
}

/// What kind of copper a track item is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackKind {
    Segment { layer: Layer },
    /// Arc through `mid`; treated as opaque by the merge logic
    Arc { layer: Layer, mid: Point },
    /// Point connector; `start` is the position and `width` the diameter
    Via {
        #[serde(default)]
        via_type: ViaType,
        top: Layer,
        bottom: Layer,
    },
}

/// A track item: straight segment, arc or via
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: ItemId,
    pub start: Point,
    pub end: Point,
    pub width: i64,
    pub net: NetCode,
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub kind: TrackKind,
}

impl Track {
    /// Straight segment; the id is assigned when added to a board
    pub fn segment(start: Point, end: Point, width: i64, layer: Layer, net: NetCode) -> Self {
        Self {
            id: ItemId::default(),
            start,
            end,
            width,
            net,
            locked: false,
            kind: TrackKind::Segment { layer },
        }
    }

    pub fn arc(start: Point, mid: Point, end: Point, width: i64, layer: Layer, net: NetCode) -> Self {
        Self {
            id: ItemId::default(),
            start,
            end,
            width,
            net,
            locked: false,
            kind: TrackKind::Arc { layer, mid },
        }
    }

    pub fn via(
        position: Point,
        diameter: i64,
        via_type: ViaType,
        top: Layer,
        bottom: Layer,
        net: NetCode,
    ) -> Self {
        Self {
            id: ItemId::default(),
            start: position,
            end: position,
            width: diameter,
            net,
            locked: false,
            kind: TrackKind::Via { via_type, top, bottom },
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn is_via(&self) -> bool {
        matches!(self.kind, TrackKind::Via { .. })
    }

    pub fn is_segment(&self) -> bool {
        matches!(self.kind, TrackKind::Segment { .. })
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, TrackKind::Arc { .. })
    }

    /// Primary layer (the top layer for vias)
    pub fn layer(&self) -> Layer {
        match self.kind {
            TrackKind::Segment { layer } | TrackKind::Arc { layer, .. } => layer,
            TrackKind::Via { top, .. } => top,
        }
    }

    /// Bottom-most layer the item occupies
    pub fn bottom_layer(&self) -> Layer {
        match self.kind {
            TrackKind::Segment { layer } | TrackKind::Arc { layer, .. } => layer,
            TrackKind::Via { bottom, .. } => bottom,
        }
    }

    pub fn layer_set(&self) -> LayerSet {
        match self.kind {
            TrackKind::Segment { layer } | TrackKind::Arc { layer, .. } => LayerSet::single(layer),
            TrackKind::Via { top, bottom, .. } => LayerSet::span(top, bottom),
        }
    }

    pub fn via_type(&self) -> Option<ViaType> {
        match self.kind {
            TrackKind::Via { via_type, .. } => Some(via_type),
            _ => None,
        }
    }

    /// Via position (same as `start` for every kind)
    pub fn position(&self) -> Point {
        self.start
    }

    /// Zero length; a closed arc still has length through its midpoint
    pub fn is_null(&self) -> bool {
        match self.kind {
            TrackKind::Arc { mid, .. } => self.start == self.end && self.start == mid,
            _ => self.start == self.end,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Exact end-point test (the position for vias)
    pub fn is_point_on_ends(&self, p: Point) -> bool {
        if self.is_via() {
            return self.start == p;
        }
        self.start == p || self.end == p
    }

    /// Points at which other copper attaches to this item
    pub fn anchors(&self) -> Vec<Point> {
        if self.is_via() {
            vec![self.start]
        } else {
            vec![self.start, self.end]
        }
    }

    /// True if `p` lies on the copper of this track, widened by `accuracy`
    pub fn hit_test(&self, p: Point, accuracy: i64) -> bool {
        let reach = (self.width as f64) / 2.0 + accuracy as f64;
        match self.kind {
            TrackKind::Segment { .. } => {
                geometry::point_segment_distance(p, self.start, self.end) <= reach
            }
            TrackKind::Arc { mid, .. } => geometry::flatten_arc(self.start, mid, self.end)
                .windows(2)
                .any(|w| geometry::point_segment_distance(p, w[0], w[1]) <= reach),
            TrackKind::Via { .. } => self.start.distance(p) <= reach,
        }
    }
}

/// Pad outline shape, relative to the pad position before rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PadShape {
    Circle { diameter: i64 },
    Rect { width: i64, height: i64 },
    Oval { width: i64, height: i64 },
    RoundRect { width: i64, height: i64, corner_radius: i64 },
    Custom { points: Vec<Point> },
}

/// Footprint pad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    #[serde(default)]
    pub id: ItemId,
    pub position: Point,
    /// Degrees, counter-clockwise
    #[serde(default)]
    pub rotation: f64,
    #[serde(flatten)]
    pub shape: PadShape,
    pub layers: LayerSet,
    pub net: NetCode,
}

impl Pad {
    pub fn new(position: Point, shape: PadShape, layers: LayerSet, net: NetCode) -> Self {
        Self {
            id: ItemId::default(),
            position,
            rotation: 0.0,
            shape,
            layers,
            net,
        }
    }

    pub fn rotated(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn is_on_layer(&self, layer: Layer) -> bool {
        self.layers.contains(layer)
    }

    /// Outline polygon on `layer`, or `None` if the pad has no copper there
    pub fn effective_polygon(&self, layer: Layer) -> Option<Vec<[f64; 2]>> {
        self.is_on_layer(layer).then(|| geometry::pad_polygon(self))
    }

    /// True if `p` lies inside the pad outline, widened by `accuracy`
    pub fn hit_test(&self, p: Point, accuracy: i64) -> bool {
        if let PadShape::Circle { diameter } = self.shape {
            return self.position.distance(p) <= diameter as f64 / 2.0 + accuracy as f64;
        }
        let outline = geometry::pad_polygon(self);
        let q = p.as_f64();
        geometry::point_in_polygon(q, &outline)
            || (accuracy > 0 && geometry::polygon_boundary_distance(q, &outline) <= accuracy as f64)
    }
}

/// Borrowed view of any connectable board item
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Track(&'a Track),
    Pad(&'a Pad),
}

impl<'a> ItemRef<'a> {
    pub fn id(&self) -> ItemId {
        match self {
            ItemRef::Track(t) => t.id,
            ItemRef::Pad(p) => p.id,
        }
    }

    pub fn net(&self) -> NetCode {
        match self {
            ItemRef::Track(t) => t.net,
            ItemRef::Pad(p) => p.net,
        }
    }

    pub fn layer_set(&self) -> LayerSet {
        match self {
            ItemRef::Track(t) => t.layer_set(),
            ItemRef::Pad(p) => p.layers,
        }
    }

    pub fn anchors(&self) -> Vec<Point> {
        match self {
            ItemRef::Track(t) => t.anchors(),
            ItemRef::Pad(p) => vec![p.position],
        }
    }

    pub fn hit_test(&self, p: Point, accuracy: i64) -> bool {
        match self {
            ItemRef::Track(t) => t.hit_test(p, accuracy),
            ItemRef::Pad(pad) => pad.hit_test(p, accuracy),
        }
    }

    /// Distance from `p` to the nearest anchor of this item
    pub fn anchor_distance(&self, p: Point) -> f64 {
        self.anchors()
            .into_iter()
            .map(|a| a.distance(p))
            .fold(f64::MAX, f64::min)
    }

    /// Bounding box `(min, max)` including copper width
    pub fn bounds(&self) -> ([i64; 2], [i64; 2]) {
        match self {
            ItemRef::Track(t) => geometry::track_bounds(t),
            ItemRef::Pad(p) => geometry::pad_bounds(p),
        }
    }

    pub fn as_track(&self) -> Option<&'a Track> {
        match self {
            ItemRef::Track(t) => Some(t),
            ItemRef::Pad(_) => None,
        }
    }

    pub fn as_pad(&self) -> Option<&'a Pad> {
        match self {
            ItemRef::Pad(p) => Some(p),
            ItemRef::Track(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_set_span() {
        let set = LayerSet::span(Layer::B_CU, Layer::F_CU);
        assert_eq!(set, LayerSet::all_copper());
        assert!(LayerSet::span(Layer(1), Layer(2)).contains(Layer(2)));
        assert!(!LayerSet::span(Layer(1), Layer(2)).contains(Layer::F_CU));
        assert_eq!(LayerSet::span(Layer(3), Layer(5)).iter().count(), 3);
    }

    #[test]
    fn test_via_anchors_and_ends() {
        let via = Track::via(Point::new(10, 10), 600, ViaType::Through, Layer::F_CU, Layer::B_CU, 1);
        assert_eq!(via.anchors(), vec![Point::new(10, 10)]);
        assert!(via.is_point_on_ends(Point::new(10, 10)));
        assert_eq!(via.layer_set(), LayerSet::all_copper());
    }

    #[test]
    fn test_segment_hit_test_uses_half_width() {
        let seg = Track::segment(Point::new(0, 0), Point::new(1000, 0), 200, Layer::F_CU, 1);
        assert!(seg.hit_test(Point::new(500, 100), 0));
        assert!(!seg.hit_test(Point::new(500, 101), 0));
        assert!(seg.hit_test(Point::new(500, 150), 50));
    }

    #[test]
    fn test_track_json_shape() {
        let seg = Track::segment(Point::new(0, 0), Point::new(5, 0), 2, Layer::F_CU, 3);
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["type"], "segment");
        assert_eq!(json["layer"], 0);
        let back: Track = serde_json::from_value(json).unwrap();
        assert_eq!(back, seg);
    }

    #[test]
    fn test_out_of_range_layer_is_rejected() {
        let json = r#"{"start":{"x":0,"y":0},"end":{"x":5,"y":0},"width":2,"net":1,"type":"segment","layer":40}"#;
        let err = serde_json::from_str::<Track>(json).unwrap_err();
        assert!(err.to_string().contains("copper layer 40"), "{}", err);

        assert_eq!(Layer::try_from(31), Ok(Layer::B_CU));
        assert_eq!(Layer::try_from(32), Err(InvalidLayer(32)));
    }

    #[test]
    fn test_layer_set_intersection_len() {
        let span = LayerSet::span(Layer(2), Layer(5));
        assert_eq!(span.len(), 4);
        assert_eq!(span.intersection(LayerSet::single(Layer(3))), LayerSet::single(Layer(3)));
        assert!(span.intersection(LayerSet::single(Layer::F_CU)).is_empty());
    }
}
