//! Spatial indexing for track items
//!
//! R-tree over item bounding boxes tagged with their copper layers, used for
//! collision queries during the geometric cleanup pass and by the
//! connectivity service.

use rstar::{RTree, RTreeObject, AABB};

use super::types::{ItemId, ItemRef, Layer, LayerSet, Track};

/// Object wrapper for R-tree spatial indexing
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedItem {
    pub id: ItemId,
    pub layers: LayerSet,
    pub bounds: AABB<[i64; 2]>,
}

impl IndexedItem {
    pub fn new(item: ItemRef<'_>) -> Self {
        let (min, max) = item.bounds();
        Self {
            id: item.id(),
            layers: item.layer_set(),
            bounds: AABB::from_corners(min, max),
        }
    }
}

impl RTreeObject for IndexedItem {
    type Envelope = AABB<[i64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// Collision index over a set of tracks
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedItem>,
}

impl SpatialIndex {
    pub fn build<'t>(tracks: impl IntoIterator<Item = &'t Track>) -> Self {
        let items: Vec<IndexedItem> = tracks
            .into_iter()
            .map(|t| IndexedItem::new(ItemRef::Track(t)))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Visit every indexed item (other than `item` itself) whose bounds touch
    /// `item` on a layer in `layer_from..=layer_to` and which passes `filter`.
    /// Candidates are visited in id order; the visitor returns `false` to stop.
    /// Returns the number of items visited.
    pub fn query_colliding<F, V>(
        &self,
        item: &Track,
        layer_from: Layer,
        layer_to: Layer,
        mut filter: F,
        mut visitor: V,
    ) -> usize
    where
        F: FnMut(ItemId) -> bool,
        V: FnMut(ItemId) -> bool,
    {
        let layers = LayerSet::span(layer_from, layer_to);
        let (min, max) = ItemRef::Track(item).bounds();
        let search = AABB::from_corners(min, max);

        let mut hits: Vec<ItemId> = self
            .tree
            .locate_in_envelope_intersecting(&search)
            .filter(|candidate| candidate.id != item.id && candidate.layers.intersects(layers))
            .map(|candidate| candidate.id)
            .collect();
        hits.sort_unstable();

        let mut visited = 0;
        for id in hits {
            if !filter(id) {
                continue;
            }
            visited += 1;
            if !visitor(id) {
                break;
            }
        }
        visited
    }
}
