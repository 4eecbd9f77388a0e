use std::sync::Arc;

use image::imageops::{self, FilterType};

use crate::brush::{self, Composite, StrokeStyle};
use crate::config::CanvasConfig;
use crate::layer::LayerId;
use crate::raster::{Raster, Rgba, TRANSPARENT};

/// Offset of the placed bitmap relative to the canvas origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePlacement {
    pub x: i64,
    pub y: i64,
}

/// An image blitted onto a layer that the move tool can still drag.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Already resampled to its on-canvas size.
    pub bitmap: Arc<Raster>,
    pub at: ImagePlacement,
    pub layer: LayerId,
}

/// A filled region in raster pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned rectangle, both corners inclusive.
    Rect { min_x: i64, min_y: i64, max_x: i64, max_y: i64 },
    /// Axis-aligned ellipse; a pixel is inside when its centre is.
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
}

impl Shape {
    pub fn contains(&self, x: i64, y: i64) -> bool {
        match *self {
            Shape::Rect { min_x, min_y, max_x, max_y } => x >= min_x && x <= max_x && y >= min_y && y <= max_y,
            Shape::Ellipse { cx, cy, rx, ry } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let nx = (x as f64 + 0.5 - cx) / rx;
                let ny = (y as f64 + 0.5 - cy) / ry;
                nx * nx + ny * ny <= 1.0
            }
        }
    }

    /// Inclusive pixel range that can contain the shape.
    fn scan_range(&self) -> (i64, i64, i64, i64) {
        match *self {
            Shape::Rect { min_x, min_y, max_x, max_y } => (min_x, min_y, max_x, max_y),
            Shape::Ellipse { cx, cy, rx, ry } => (
                (cx - rx).floor() as i64,
                (cy - ry).floor() as i64,
                (cx + rx).ceil() as i64,
                (cy + ry).ceil() as i64,
            ),
        }
    }

    fn on_edge(&self, x: i64, y: i64) -> bool {
        self.contains(x, y)
            && (!self.contains(x - 1, y) || !self.contains(x + 1, y) || !self.contains(x, y - 1) || !self.contains(x, y + 1))
    }
}

/// Visit every pixel of `raster` for which `pred` holds.
fn scan(raster: &mut Raster, shape: &Shape, pred: impl Fn(&Shape, i64, i64) -> bool, mut f: impl FnMut(&mut Raster, u32, u32)) {
    let (x0, y0, x1, y1) = shape.scan_range();
    let max_x = x1.min(i64::from(raster.width) - 1);
    let max_y = y1.min(i64::from(raster.height) - 1);
    for y in y0.max(0)..=max_y {
        for x in x0.max(0)..=max_x {
            if pred(shape, x, y) {
                f(raster, x as u32, y as u32);
            }
        }
    }
}

fn put(raster: &mut Raster, x: u32, y: u32, style: &StrokeStyle) {
    match style.composite {
        Composite::Paint => raster.blend_pixel(x, y, style.color),
        Composite::Erase => raster.set_pixel(x, y, TRANSPARENT),
        Composite::Mask => raster.set_pixel(x, y, style.color),
    }
}

pub fn fill_raster(raster: &mut Raster, shape: &Shape, style: &StrokeStyle) {
    scan(raster, shape, Shape::contains, |r, x, y| put(r, x, y, style));
}

/// One-pixel solid outline along the inner edge of `shape`.
pub fn outline_raster(raster: &mut Raster, shape: &Shape, style: &StrokeStyle) {
    scan(raster, shape, Shape::on_edge, |r, x, y| put(r, x, y, style));
}

/// Resample `bitmap` by `scale`; a unit scale returns a copy.
pub fn scale_bitmap(bitmap: &Raster, scale: f64) -> Raster {
    if (scale - 1.0).abs() < f64::EPSILON || !scale.is_finite() || scale <= 0.0 {
        return bitmap.clone();
    }
    let w = ((f64::from(bitmap.width) * scale).round() as u32).max(1);
    let h = ((f64::from(bitmap.height) * scale).round() as u32).max(1);
    match bitmap.to_image() {
        Some(img) => Raster::from_image(imageops::resize(&img, w, h, FilterType::Triangle)),
        None => bitmap.clone(),
    }
}

/// The live drawing surface of the active layer plus the inpainting mask overlay.
///
/// All raster draw calls in the engine go through here.
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    surface: Raster,
    mask: Raster,
    background: Rgba,
    pub dirty: bool,
}

impl Canvas {
    pub fn new(config: CanvasConfig, background: Rgba) -> Self {
        Self {
            width: config.width,
            height: config.height,
            surface: Raster::filled(config.width, config.height, background),
            mask: Raster::new(config.width, config.height),
            background,
            dirty: true,
        }
    }

    pub fn surface(&self) -> &Raster {
        &self.surface
    }

    /// Mutable access for layer switches; marks the surface dirty.
    pub fn surface_mut(&mut self) -> &mut Raster {
        self.dirty = true;
        &mut self.surface
    }

    pub fn mask(&self) -> &Raster {
        &self.mask
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Replace the surface with `raster`. Ignored when sizes differ.
    pub fn load_surface(&mut self, raster: &Raster) -> bool {
        if raster.size() != (self.width, self.height) {
            log::warn!(
                "refusing to load {}x{} raster into {}x{} surface",
                raster.width,
                raster.height,
                self.width,
                self.height
            );
            return false;
        }
        self.surface.pixels.copy_from_slice(&raster.pixels);
        self.dirty = true;
        true
    }

    pub fn snapshot(&self) -> Raster {
        self.surface.clone()
    }

    fn target(&mut self, composite: Composite) -> &mut Raster {
        match composite {
            Composite::Mask => &mut self.mask,
            Composite::Paint | Composite::Erase => &mut self.surface,
        }
    }

    /// Stroke one path segment. Mask strokes land on the mask overlay.
    pub fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32), style: &StrokeStyle) {
        brush::stroke(self.target(style.composite), style, from, to);
        self.dirty = true;
    }

    pub fn stamp(&mut self, at: (f32, f32), style: &StrokeStyle) {
        brush::stamp(self.target(style.composite), style, at);
        self.dirty = true;
    }

    pub fn fill_shape(&mut self, shape: &Shape, style: &StrokeStyle) {
        fill_raster(self.target(style.composite), shape, style);
        self.dirty = true;
    }

    pub fn outline_shape(&mut self, shape: &Shape, style: &StrokeStyle) {
        outline_raster(self.target(style.composite), shape, style);
        self.dirty = true;
    }

    /// Paint `bitmap` at `(x, y)` after resampling by `scale`. Returns the
    /// resampled bitmap so callers can keep it as a placement.
    pub fn blit_image(&mut self, bitmap: &Raster, x: i64, y: i64, scale: f64) -> Raster {
        let scaled = scale_bitmap(bitmap, scale);
        self.surface.draw_over(&scaled, x, y);
        self.dirty = true;
        scaled
    }

    /// Opaque background fill; nothing transparent survives this.
    pub fn clear_to_background(&mut self) {
        self.surface.fill(self.background);
        self.dirty = true;
    }

    pub fn clear_transparent(&mut self) {
        self.surface.clear();
        self.dirty = true;
    }

    pub fn clear_mask(&mut self) {
        self.mask.clear();
        self.dirty = true;
    }

    pub fn has_mask(&self) -> bool {
        self.mask.coverage() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba = [0, 0, 0, 255];
    const WHITE: Rgba = [255, 255, 255, 255];

    fn canvas() -> Canvas {
        Canvas::new(CanvasConfig { width: 64, height: 64 }, WHITE)
    }

    fn paint(width: f32) -> StrokeStyle {
        StrokeStyle { composite: Composite::Paint, color: BLACK, width }
    }

    #[test]
    fn test_new_surface_is_opaque_background_and_mask_is_empty() {
        let c = canvas();
        assert_eq!(c.surface().get_pixel(10, 10), Some(WHITE));
        assert!(!c.has_mask());
    }

    #[test]
    fn test_clear_to_background_leaves_no_transparent_pixels() {
        let mut c = canvas();
        c.clear_transparent();
        c.stroke_segment((0.0, 0.0), (63.0, 63.0), &StrokeStyle { composite: Composite::Erase, color: TRANSPARENT, width: 8.0 });
        c.clear_to_background();
        assert!(c.surface().pixels.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_mask_strokes_do_not_touch_surface() {
        let mut c = canvas();
        let before = c.snapshot();
        let style = StrokeStyle { composite: Composite::Mask, color: [255, 0, 0, 128], width: 6.0 };
        c.stroke_segment((10.0, 10.0), (30.0, 10.0), &style);
        assert_eq!(c.surface(), &before);
        assert!(c.has_mask());
        c.clear_mask();
        assert!(!c.has_mask());
    }

    #[test]
    fn test_fill_rect_is_inclusive() {
        let mut c = canvas();
        c.clear_transparent();
        c.fill_shape(&Shape::Rect { min_x: 2, min_y: 3, max_x: 5, max_y: 4 }, &paint(1.0));
        assert_eq!(c.surface().coverage(), 4 * 2);
    }

    #[test]
    fn test_outline_is_subset_of_fill() {
        let shape = Shape::Ellipse { cx: 32.0, cy: 32.0, rx: 10.0, ry: 6.0 };
        let mut filled = canvas();
        filled.clear_transparent();
        filled.fill_shape(&shape, &paint(1.0));
        let mut outlined = canvas();
        outlined.clear_transparent();
        outlined.outline_shape(&shape, &paint(1.0));
        let inner = outlined.surface().coverage();
        assert!(inner > 0 && inner < filled.surface().coverage());
        assert_eq!(outlined.surface().get_pixel(32, 32), Some(TRANSPARENT));
    }

    #[test]
    fn test_blit_scales_and_offsets() {
        let mut c = canvas();
        let bitmap = Raster::filled(4, 4, BLACK);
        let placed = c.blit_image(&bitmap, 10, 20, 2.0);
        assert_eq!(placed.size(), (8, 8));
        assert_eq!(c.surface().get_pixel(10, 20), Some(BLACK));
        assert_eq!(c.surface().get_pixel(17, 27), Some(BLACK));
        assert_eq!(c.surface().get_pixel(18, 28), Some(WHITE));
    }

    #[test]
    fn test_load_surface_rejects_wrong_size() {
        let mut c = canvas();
        assert!(!c.load_surface(&Raster::new(8, 8)));
        assert!(c.load_surface(&Raster::new(64, 64)));
        assert_eq!(c.surface().coverage(), 0);
    }
}
