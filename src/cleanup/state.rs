//! Per-item transient state for one cleanup invocation
//!
//! Kept beside the board instead of in the items themselves: removal state
//! lives for the whole invocation, the examined set for one geometric pass.

use std::collections::{HashMap, HashSet};

use crate::board::ItemId;

/// Removal state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemState {
    #[default]
    Live,
    /// Marked by the current phase, still attached to the board
    PendingRemoval,
    /// Detached from the board
    Removed,
}

#[derive(Debug, Default)]
pub struct ItemStates {
    states: HashMap<ItemId, ItemState>,
    examined: HashSet<ItemId>,
}

impl ItemStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: ItemId) -> ItemState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    pub fn is_live(&self, id: ItemId) -> bool {
        self.state(id) == ItemState::Live
    }

    /// Mark a live item for removal; false if it was already marked
    pub fn mark_pending(&mut self, id: ItemId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.states.insert(id, ItemState::PendingRemoval);
        true
    }

    pub fn mark_removed(&mut self, id: ItemId) {
        self.states.insert(id, ItemState::Removed);
    }

    pub fn is_examined(&self, id: ItemId) -> bool {
        self.examined.contains(&id)
    }

    pub fn set_examined(&mut self, id: ItemId) {
        self.examined.insert(id);
    }

    pub fn clear_examined(&mut self) {
        self.examined.clear();
    }

    pub fn removed_count(&self) -> usize {
        self.states.values().filter(|s| **s != ItemState::Live).count()
    }
}
