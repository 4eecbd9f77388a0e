use std::fmt;

use rayon::prelude::*;

use crate::error::{CanvasError, CanvasResult};
use crate::raster::{Raster, Rgba, blend_over};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub raster: Raster,
    /// Position in the stack; 0 is painted first.
    pub order: usize,
}

/// Ordered layer stack with exactly one active layer.
///
/// `layers` is kept sorted so that `layers[i].order == i`. Operations that
/// change the active layer take the live surface so its pixels are committed
/// to the outgoing layer before the incoming layer's raster is loaded.
pub struct LayerStore {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    active: LayerId,
    next_id: u64,
}

impl LayerStore {
    /// A store holding a single opaque "Background" layer.
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        let id = LayerId(1);
        Self {
            width,
            height,
            layers: vec![Layer {
                id,
                name: "Background".to_string(),
                visible: true,
                raster: Raster::filled(width, height, background),
                order: 0,
            }],
            active: id,
            next_id: 2,
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn active_id(&self) -> LayerId {
        self.active
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn active(&self) -> &Layer {
        // `active` always names a layer in the stack.
        &self.layers[self.position(self.active).unwrap_or(0)]
    }

    fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn position_or_err(&self, id: LayerId) -> CanvasResult<usize> {
        self.position(id).ok_or(CanvasError::UnknownLayer(id))
    }

    fn reindex(&mut self) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.order = i;
        }
    }

    /// Write the live surface into the active layer.
    pub fn commit_active(&mut self, surface: &Raster) {
        if let Some(idx) = self.position(self.active) {
            self.layers[idx].raster.clone_from(surface);
        }
    }

    /// Overwrite a layer's stored raster. Returns `false` for an unknown id
    /// or a raster of the wrong size.
    pub fn restore(&mut self, id: LayerId, raster: &Raster) -> bool {
        match self.position(id) {
            Some(idx) if raster.size() == (self.width, self.height) => {
                self.layers[idx].raster.clone_from(raster);
                true
            }
            _ => false,
        }
    }

    /// New transparent layer on top; it becomes active.
    pub fn add_layer(&mut self, surface: &mut Raster) -> LayerId {
        self.commit_active(surface);
        let id = LayerId(self.next_id);
        self.next_id += 1;
        let order = self.layers.len();
        self.layers.push(Layer {
            id,
            name: format!("Layer {}", order),
            visible: true,
            raster: Raster::new(self.width, self.height),
            order,
        });
        self.active = id;
        surface.clone_from(&self.layers[order].raster);
        log::info!("added layer {id} at order {order}");
        id
    }

    /// Remove a layer. Deleting the active layer activates the one just
    /// below it (or the new bottom layer when it was the bottom).
    pub fn delete_layer(&mut self, id: LayerId, surface: &mut Raster) -> CanvasResult<()> {
        let idx = self.position_or_err(id)?;
        if self.layers.len() == 1 {
            log::warn!("refusing to delete last layer {id}");
            return Err(CanvasError::LastLayer);
        }
        let was_active = id == self.active;
        if !was_active {
            self.commit_active(surface);
        }
        self.layers.remove(idx);
        self.reindex();
        if was_active {
            let next = idx.saturating_sub(1);
            self.active = self.layers[next].id;
            surface.clone_from(&self.layers[next].raster);
        }
        log::info!("deleted layer {id}; active is {}", self.active);
        Ok(())
    }

    pub fn toggle_visibility(&mut self, id: LayerId) -> CanvasResult<bool> {
        let idx = self.position_or_err(id)?;
        let layer = &mut self.layers[idx];
        layer.visible = !layer.visible;
        Ok(layer.visible)
    }

    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> CanvasResult<()> {
        let idx = self.position_or_err(id)?;
        self.layers[idx].name = name.into();
        Ok(())
    }

    /// Move the layer at `from` to `to` and renumber the stack.
    pub fn reorder(&mut self, from: usize, to: usize) -> CanvasResult<()> {
        let len = self.layers.len();
        if from >= len {
            return Err(CanvasError::LayerIndex(from));
        }
        if to >= len {
            return Err(CanvasError::LayerIndex(to));
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.reindex();
        Ok(())
    }

    pub fn set_active(&mut self, id: LayerId, surface: &mut Raster) -> CanvasResult<()> {
        let idx = self.position_or_err(id)?;
        if id == self.active {
            return Ok(());
        }
        self.commit_active(surface);
        self.active = id;
        surface.clone_from(&self.layers[idx].raster);
        log::debug!("active layer is now {id}");
        Ok(())
    }

    /// Paint every visible layer, lowest order first, over `background`.
    /// `live` stands in for the active layer's stored raster.
    pub fn composite(&self, background: Rgba, live: Option<&Raster>) -> Raster {
        let mut out = Raster::filled(self.width, self.height, background);
        let sources: Vec<&Raster> = self
            .layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| match live {
                Some(surface) if l.id == self.active => surface,
                _ => &l.raster,
            })
            .filter(|r| r.size() == (self.width, self.height))
            .collect();
        let row_bytes = self.width as usize * 4;
        if row_bytes == 0 {
            return out;
        }
        out.pixels.par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
            let start = y * row_bytes;
            for src in &sources {
                let src_row = &src.pixels[start..start + row_bytes];
                for (dst, px) in row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                    blend_over(dst, [px[0], px[1], px[2], px[3]]);
                }
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = [255, 255, 255, 255];
    const RED: Rgba = [255, 0, 0, 255];

    fn store() -> (LayerStore, Raster) {
        let store = LayerStore::new(8, 8, WHITE);
        let surface = store.active().raster.clone();
        (store, surface)
    }

    fn orders_contiguous(store: &LayerStore) -> bool {
        store.layers().iter().enumerate().all(|(i, l)| l.order == i)
    }

    #[test]
    fn test_starts_with_one_background_layer() {
        let (store, _) = store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active().name, "Background");
        assert_eq!(store.active().raster.get_pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_add_layer_is_transparent_on_top_and_active() {
        let (mut store, mut surface) = store();
        let id = store.add_layer(&mut surface);
        assert_eq!(store.active_id(), id);
        assert_eq!(store.active().order, 1);
        assert_eq!(surface.coverage(), 0);
    }

    #[test]
    fn test_deleting_the_last_layer_is_rejected() {
        let (mut store, mut surface) = store();
        let id = store.active_id();
        let before = surface.clone();
        assert!(matches!(store.delete_layer(id, &mut surface), Err(CanvasError::LastLayer)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_id(), id);
        assert_eq!(surface, before);
    }

    #[test]
    fn test_deleting_active_activates_next_lower() {
        let (mut store, mut surface) = store();
        let bottom = store.active_id();
        let middle = store.add_layer(&mut surface);
        let top = store.add_layer(&mut surface);
        store.set_active(middle, &mut surface).unwrap();
        store.delete_layer(middle, &mut surface).unwrap();
        assert_eq!(store.active_id(), bottom);
        assert_eq!(surface, store.get(bottom).unwrap().raster);
        assert!(orders_contiguous(&store));
        assert_eq!(store.get(top).unwrap().order, 1);
    }

    #[test]
    fn test_deleting_bottom_active_activates_new_bottom() {
        let (mut store, mut surface) = store();
        let bottom = store.active_id();
        let upper = store.add_layer(&mut surface);
        store.set_active(bottom, &mut surface).unwrap();
        store.delete_layer(bottom, &mut surface).unwrap();
        assert_eq!(store.active_id(), upper);
        assert_eq!(store.active().order, 0);
    }

    #[test]
    fn test_set_active_commits_then_loads() {
        let (mut store, mut surface) = store();
        let bottom = store.active_id();
        let upper = store.add_layer(&mut surface);
        surface.set_pixel(1, 1, RED);
        store.set_active(bottom, &mut surface).unwrap();
        assert_eq!(store.get(upper).unwrap().raster.get_pixel(1, 1), Some(RED));
        assert_eq!(surface, store.active().raster);
        assert!(store.set_active(LayerId(99), &mut surface).is_err());
    }

    #[test]
    fn test_order_stays_contiguous_under_mixed_operations() {
        let (mut store, mut surface) = store();
        let mut ids = vec![store.active_id()];
        for _ in 0..5 {
            ids.push(store.add_layer(&mut surface));
            assert!(orders_contiguous(&store));
        }
        store.reorder(0, 4).unwrap();
        assert!(orders_contiguous(&store));
        store.delete_layer(ids[2], &mut surface).unwrap();
        assert!(orders_contiguous(&store));
        store.reorder(4, 0).unwrap();
        assert!(orders_contiguous(&store));
        assert!(matches!(store.reorder(0, 9), Err(CanvasError::LayerIndex(9))));
        let mut seen: Vec<usize> = store.layers().iter().map(|l| l.order).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..store.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_composite_paints_low_to_high() {
        let (mut store, mut surface) = store();
        store.add_layer(&mut surface);
        surface.set_pixel(2, 2, RED);
        let composite = store.composite(WHITE, Some(&surface));
        assert_eq!(composite.get_pixel(2, 2), Some(RED));
        assert_eq!(composite.get_pixel(3, 3), Some(WHITE));
        // Without the live surface the uncommitted pixel is not there yet.
        assert_eq!(store.composite(WHITE, None).get_pixel(2, 2), Some(WHITE));
    }

    #[test]
    fn test_toggling_visibility_twice_restores_composite() {
        let (mut store, mut surface) = store();
        let top = store.add_layer(&mut surface);
        surface.set_pixel(4, 4, RED);
        store.commit_active(&surface);
        let before = store.composite(WHITE, None);
        assert!(!store.toggle_visibility(top).unwrap());
        assert_eq!(store.composite(WHITE, None).get_pixel(4, 4), Some(WHITE));
        assert!(store.toggle_visibility(top).unwrap());
        assert_eq!(store.composite(WHITE, None), before);
    }
}
