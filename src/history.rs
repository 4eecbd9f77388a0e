use std::collections::HashMap;

use crate::canvas::Placement;
use crate::config::HISTORY_LIMIT;
use crate::layer::LayerId;
use crate::raster::Raster;

/// Full raster of one layer as it stood after a completed operation, plus
/// the movable placement at that moment.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub layer: LayerId,
    pub raster: Raster,
    pub placement: Option<Placement>,
}

/// What an undo or redo puts back. `raster` is `None` when the layer's
/// earlier pixels are unknown; the layer is then left as it is.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub layer: LayerId,
    pub raster: Option<Raster>,
    pub placement: Option<Placement>,
}

/// Bounded undo/redo over whole-layer snapshots.
///
/// `current` indexes the entry on screen. Pushing truncates everything after
/// it; once `limit` is exceeded the oldest entry is evicted. Each entry only
/// touched its own layer, so undoing it rewinds that layer to the closest
/// earlier entry for the same layer, or to the layer's base raster (what it
/// held before any retained entry).
pub struct History {
    states: Vec<HistoryEntry>,
    current: usize,
    limit: usize,
    base: HashMap<LayerId, Raster>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        History { states: Vec::new(), current: 0, limit: limit.max(1), base: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.states.get(self.current)
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.base.clear();
        self.current = 0;
    }

    /// Record the pixels a new layer starts with.
    pub fn track(&mut self, layer: LayerId, raster: Raster) {
        self.base.insert(layer, raster);
    }

    /// Drop every trace of a removed layer.
    pub fn forget(&mut self, layer: LayerId) {
        if self.states.is_empty() {
            self.base.remove(&layer);
            return;
        }
        let upto_cursor = self.states[..=self.current].iter().filter(|e| e.layer == layer).count();
        self.states.retain(|e| e.layer != layer);
        self.base.remove(&layer);
        self.current = (self.current + 1).saturating_sub(upto_cursor).saturating_sub(1);
    }

    pub fn push(&mut self, layer: LayerId, raster: Raster, placement: Option<Placement>) {
        // Drop the redo branch if the user edits after undoing.
        if !self.states.is_empty() {
            self.states.truncate(self.current + 1);
        }
        self.states.push(HistoryEntry { layer, raster, placement });
        if self.states.len() > self.limit {
            let evicted = self.states.remove(0);
            self.base.insert(evicted.layer, evicted.raster);
        }
        self.current = self.states.len() - 1;
    }

    /// Step back over the entry on screen.
    pub fn undo(&mut self) -> Option<Step> {
        if self.current == 0 || self.states.is_empty() {
            return None;
        }
        let layer = self.states[self.current].layer;
        self.current -= 1;
        let raster = self.states[..=self.current]
            .iter()
            .rev()
            .find(|e| e.layer == layer)
            .map(|e| &e.raster)
            .or_else(|| self.base.get(&layer))
            .cloned();
        if raster.is_none() {
            log::warn!("no earlier pixels for layer {layer}; leaving it unchanged");
        }
        let placement = self.states[self.current].placement.clone();
        Some(Step { layer, raster, placement })
    }

    pub fn redo(&mut self) -> Option<Step> {
        if self.current + 1 >= self.states.len() {
            return None;
        }
        self.current += 1;
        let entry = &self.states[self.current];
        Some(Step { layer: entry.layer, raster: Some(entry.raster.clone()), placement: entry.placement.clone() })
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.states.len()
    }
}
