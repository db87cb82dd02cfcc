//! Connectivity graph over live copper items
//!
//! Two items are connected when they share a copper layer and an anchor of
//! one lies on the copper of the other. Nets are not consulted; that is what
//! lets the shorting check see touching items of different nets.

use rayon::prelude::*;
use rstar::{RTree, AABB};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::board::{Board, IndexedItem, ItemId, ItemRef, LayerSet, Pad, Track};
use super::types::{AnchorEntry, ConnectivityEntry};

/// Connectivity service: per-item connection entries kept in sync with the
/// board through [`Connectivity::update`] and [`Connectivity::remove`]
#[derive(Default)]
pub struct Connectivity {
    entries: HashMap<ItemId, ConnectivityEntry>,
    indexed: HashMap<ItemId, IndexedItem>,
    tree: RTree<IndexedItem>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from every pad and every track for which `is_live` holds
    pub fn build<F>(board: &Board, is_live: F) -> Self
    where
        F: Fn(ItemId) -> bool,
    {
        let start = Instant::now();

        let items: Vec<IndexedItem> = board
            .tracks()
            .filter(|t| is_live(t.id))
            .map(|t| IndexedItem::new(ItemRef::Track(t)))
            .chain(board.pads().map(|p| IndexedItem::new(ItemRef::Pad(p))))
            .collect();
        let indexed: HashMap<ItemId, IndexedItem> =
            items.iter().map(|i| (i.id, i.clone())).collect();
        let tree = RTree::bulk_load(items);

        // Each entry only reads the board and the tree
        let ids: Vec<ItemId> = indexed.keys().copied().collect();
        let entries: HashMap<ItemId, ConnectivityEntry> = ids
            .par_iter()
            .map(|id| (*id, compute_entry(board, &tree, *id)))
            .collect();

        debug!(
            "[Connectivity] Built {} entries in {:?}",
            entries.len(),
            start.elapsed()
        );

        Self { entries, indexed, tree }
    }

    /// Rebuild in place from the current board
    pub fn rebuild<F>(&mut self, board: &Board, is_live: F)
    where
        F: Fn(ItemId) -> bool,
    {
        *self = Self::build(board, is_live);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Per-anchor connection entry of an item
    pub fn entry(&self, id: ItemId) -> Option<&ConnectivityEntry> {
        self.entries.get(&id)
    }

    /// Distinct items touching `id`
    pub fn connected_items(&self, id: ItemId) -> Vec<ItemId> {
        self.entries.get(&id).map(|e| e.items()).unwrap_or_default()
    }

    pub fn connected_pads<'b>(&self, board: &'b Board, id: ItemId) -> Vec<&'b Pad> {
        self.connected_items(id)
            .into_iter()
            .filter_map(|n| board.pad(n))
            .collect()
    }

    /// Connected tracks of every kind, vias included
    pub fn connected_tracks<'b>(&self, board: &'b Board, id: ItemId) -> Vec<&'b Track> {
        self.connected_items(id)
            .into_iter()
            .filter_map(|n| board.track(n))
            .collect()
    }

    /// Re-index an item after its geometry changed and refresh every entry
    /// that referenced it before or references it now
    pub fn update(&mut self, board: &Board, id: ItemId) {
        let mut touched = self.connected_items(id);
        if let Some(old) = self.indexed.remove(&id) {
            self.tree.remove(&old);
        }

        match board.item(id) {
            Some(item) => {
                let fresh = IndexedItem::new(item);
                self.tree.insert(fresh.clone());
                self.indexed.insert(id, fresh);
                let entry = compute_entry(board, &self.tree, id);
                for n in entry.items() {
                    if !touched.contains(&n) {
                        touched.push(n);
                    }
                }
                self.entries.insert(id, entry);
            }
            None => {
                self.entries.remove(&id);
            }
        }

        self.refresh(board, &touched);
    }

    /// Drop an item from the graph; its neighbours stop seeing it
    pub fn remove(&mut self, board: &Board, id: ItemId) {
        let touched = self.connected_items(id);
        if let Some(old) = self.indexed.remove(&id) {
            self.tree.remove(&old);
        }
        self.entries.remove(&id);
        self.refresh(board, &touched);
    }

    fn refresh(&mut self, board: &Board, ids: &[ItemId]) {
        for &n in ids {
            if self.indexed.contains_key(&n) {
                let entry = compute_entry(board, &self.tree, n);
                self.entries.insert(n, entry);
            }
        }
    }

    /// Test whether a track or via has a free end.
    ///
    /// A segment or arc needs something at both ends; an item touching both
    /// ends only counts for the nearer one, so a short stub hanging off a
    /// single item is still dangling. With `ignore_tracks_in_pads`, a pad
    /// covering both ends counts for both. A via is dangling unless its
    /// connections reach it on at least two different layers of its span.
    pub fn test_track_endpoint_dangling(
        &self,
        board: &Board,
        track: &Track,
        ignore_tracks_in_pads: bool,
    ) -> bool {
        let Some(entry) = self.entries.get(&track.id) else {
            // Not in the graph: either removed or never built
            warn!("[Connectivity] Dangling test on unindexed item {}", track.id);
            return false;
        };

        if track.is_via() {
            return via_on_single_layer(board, track, &entry.items());
        }

        let accuracy = (track.width + 1) / 2;
        let mut start_count = 0;
        let mut end_count = 0;

        for id in entry.items() {
            let Some(item) = board.item(id) else {
                continue;
            };
            let hit_start = item.hit_test(track.start, accuracy);
            let hit_end = item.hit_test(track.end, accuracy);

            if hit_start && hit_end {
                if ignore_tracks_in_pads && item.as_pad().is_some() {
                    start_count += 1;
                    end_count += 1;
                } else if item.anchor_distance(track.start) < item.anchor_distance(track.end) {
                    start_count += 1;
                } else {
                    end_count += 1;
                }
            } else {
                if hit_start {
                    start_count += 1;
                }
                if hit_end {
                    end_count += 1;
                }
            }

            if start_count > 0 && end_count > 0 {
                return false;
            }
        }

        true
    }
}

/// True when nothing, or only copper of one shared layer, meets the via
fn via_on_single_layer(board: &Board, via: &Track, items: &[ItemId]) -> bool {
    if items.len() < 2 {
        return true;
    }

    let span = via.layer_set();
    let mut first: Option<LayerSet> = None;

    for &id in items {
        let Some(item) = board.item(id) else {
            continue;
        };
        let on = item.layer_set().intersection(span);
        match first {
            None => first = Some(on),
            Some(layers) if layers == on && layers.len() == 1 => {}
            Some(_) => return false,
        }
    }

    true
}

/// Compute the connection entry of one item against the indexed items
fn compute_entry(board: &Board, tree: &RTree<IndexedItem>, id: ItemId) -> ConnectivityEntry {
    let Some(item) = board.item(id) else {
        return ConnectivityEntry::default();
    };

    let mut entry = ConnectivityEntry {
        anchors: item
            .anchors()
            .into_iter()
            .map(|pos| AnchorEntry { pos, items: Vec::new() })
            .collect(),
        elsewhere: Vec::new(),
    };

    let (min, max) = item.bounds();
    let layers = item.layer_set();
    let mut candidates: Vec<ItemId> = tree
        .locate_in_envelope_intersecting(&AABB::from_corners(min, max))
        .filter(|c| c.id != id && c.layers.intersects(layers))
        .map(|c| c.id)
        .collect();
    candidates.sort_unstable();

    for other_id in candidates {
        let Some(other) = board.item(other_id) else {
            continue;
        };
        // Pads only connect through copper routed to them
        if item.as_pad().is_some() && other.as_pad().is_some() {
            continue;
        }

        let mut at_anchor = false;
        for slot in entry.anchors.iter_mut() {
            if other.hit_test(slot.pos, 0) {
                slot.items.push(other_id);
                at_anchor = true;
            }
        }

        if !at_anchor && other.anchors().into_iter().any(|q| item.hit_test(q, 0)) {
            entry.elsewhere.push(other_id);
        }
    }

    entry
}
