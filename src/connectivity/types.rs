//! Connectivity entry types

use crate::board::{ItemId, Point};

/// Items touching one anchor of an item
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnchorEntry {
    pub pos: Point,
    pub items: Vec<ItemId>,
}

/// Everything electrically touching one item.
///
/// `anchors` follows the item's own anchor points (start/end for tracks, the
/// position for vias and pads). `elsewhere` holds items that touch the item
/// away from all of its anchors, such as a track ending mid-span.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectivityEntry {
    pub anchors: Vec<AnchorEntry>,
    pub elsewhere: Vec<ItemId>,
}

impl ConnectivityEntry {
    /// Distinct connected items, anchors first, in first-seen order
    pub fn items(&self) -> Vec<ItemId> {
        let mut out: Vec<ItemId> = Vec::new();
        for id in self
            .anchors
            .iter()
            .flat_map(|a| a.items.iter())
            .chain(self.elsewhere.iter())
        {
            if !out.contains(id) {
                out.push(*id);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.elsewhere.is_empty() && self.anchors.iter().all(|a| a.items.is_empty())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.elsewhere.contains(&id) || self.anchors.iter().any(|a| a.items.contains(&id))
    }
}
