//! Rectangular and elliptical selections and their conversion into the
//! inpainting mask.

use crate::brush::{Composite, StrokeStyle};
use crate::canvas::{Canvas, Shape, outline_raster};
use crate::raster::{PixelBounds, Raster, Rgba};
use crate::transform::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionShape {
    Rect,
    Ellipse,
}

/// Transient drag selection in raster space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub start: Point,
    pub end: Point,
    pub shape: SelectionShape,
}

impl Selection {
    pub fn new(start: Point, shape: SelectionShape) -> Self {
        Self { start, end: start, shape }
    }

    /// Pixel shape covered by the selection, or `None` when it has no area.
    pub fn to_shape(&self) -> Option<Shape> {
        let dx = (self.end.x - self.start.x).abs();
        let dy = (self.end.y - self.start.y).abs();
        if dx < 1.0 || dy < 1.0 {
            return None;
        }
        Some(match self.shape {
            SelectionShape::Rect => Shape::Rect {
                min_x: self.start.x.min(self.end.x).round() as i64,
                min_y: self.start.y.min(self.end.y).round() as i64,
                max_x: self.start.x.max(self.end.x).round() as i64,
                max_y: self.start.y.max(self.end.y).round() as i64,
            },
            SelectionShape::Ellipse => Shape::Ellipse {
                cx: (self.start.x + self.end.x) / 2.0,
                cy: (self.start.y + self.end.y) / 2.0,
                rx: dx / 2.0,
                ry: dy / 2.0,
            },
        })
    }
}

fn solid(color: Rgba) -> Rgba {
    [color[0], color[1], color[2], 255]
}

/// Replace the mask with the selection: translucent fill plus a solid outline.
///
/// Returns the bounds of the new mask region; `None` for a zero-area
/// selection, which leaves the mask empty.
pub fn rasterize(canvas: &mut Canvas, selection: &Selection, mask_color: Rgba) -> Option<PixelBounds> {
    canvas.clear_mask();
    let shape = selection.to_shape()?;
    let fill = StrokeStyle { composite: Composite::Mask, color: mask_color, width: 1.0 };
    let edge = StrokeStyle { color: solid(mask_color), ..fill };
    canvas.fill_shape(&shape, &fill);
    canvas.outline_shape(&shape, &edge);
    canvas.mask().opaque_bounds()
}

/// Draw the in-progress outline onto a display raster without touching the mask.
pub fn draw_preview(display: &mut Raster, selection: &Selection, color: Rgba) {
    let Some(shape) = selection.to_shape() else {
        return;
    };
    let style = StrokeStyle { composite: Composite::Paint, color: solid(color), width: 1.0 };
    outline_raster(display, &shape, &style);
}

/// Black/white rendition of the mask (white marks the edit region), as
/// inpainting back-ends expect. `None` when the mask has no area.
pub fn binary_mask(mask: &Raster) -> Option<Raster> {
    if mask.coverage() == 0 {
        return None;
    }
    let mut out = Raster::filled(mask.width, mask.height, [0, 0, 0, 255]);
    for (dst, src) in out.pixels.chunks_exact_mut(4).zip(mask.pixels.chunks_exact(4)) {
        if src[3] > 0 {
            dst.copy_from_slice(&[255, 255, 255, 255]);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;

    const MASK: Rgba = [255, 0, 0, 128];

    fn canvas() -> Canvas {
        Canvas::new(CanvasConfig { width: 128, height: 128 }, [255, 255, 255, 255])
    }

    fn selection(shape: SelectionShape, a: (f64, f64), b: (f64, f64)) -> Selection {
        let mut sel = Selection::new(Point::new(a.0, a.1), shape);
        sel.end = Point::new(b.0, b.1);
        sel
    }

    #[test]
    fn test_rect_selection_normalizes_corners() {
        let sel = selection(SelectionShape::Rect, (50.0, 40.0), (10.0, 10.0));
        assert_eq!(sel.to_shape(), Some(Shape::Rect { min_x: 10, min_y: 10, max_x: 50, max_y: 40 }));
    }

    #[test]
    fn test_ellipse_selection_uses_midpoint_and_half_deltas() {
        let sel = selection(SelectionShape::Ellipse, (10.0, 10.0), (50.0, 40.0));
        assert_eq!(sel.to_shape(), Some(Shape::Ellipse { cx: 30.0, cy: 25.0, rx: 20.0, ry: 15.0 }));
    }

    #[test]
    fn test_rect_mask_bounds_are_exact() {
        let mut c = canvas();
        let bounds = rasterize(&mut c, &selection(SelectionShape::Rect, (10.0, 10.0), (50.0, 40.0)), MASK);
        assert_eq!(bounds, Some(PixelBounds { min_x: 10, min_y: 10, max_x: 50, max_y: 40 }));
        assert_eq!(c.mask().get_pixel(30, 25), Some(MASK));
        assert_eq!(c.mask().get_pixel(10, 25), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_ellipse_mask_area_matches_formula() {
        let mut c = canvas();
        rasterize(&mut c, &selection(SelectionShape::Ellipse, (10.0, 10.0), (50.0, 40.0)), MASK);
        let expected = std::f64::consts::PI * 20.0 * 15.0;
        let area = c.mask().coverage() as f64;
        assert!((area - expected).abs() / expected < 0.03, "area {area} vs {expected}");
    }

    #[test]
    fn test_rasterize_replaces_previous_mask() {
        let mut c = canvas();
        rasterize(&mut c, &selection(SelectionShape::Rect, (0.0, 0.0), (20.0, 20.0)), MASK);
        let bounds = rasterize(&mut c, &selection(SelectionShape::Rect, (60.0, 60.0), (80.0, 70.0)), MASK);
        assert_eq!(bounds, Some(PixelBounds { min_x: 60, min_y: 60, max_x: 80, max_y: 70 }));
        assert_eq!(c.mask().get_pixel(5, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_degenerate_selection_yields_empty_mask() {
        let mut c = canvas();
        rasterize(&mut c, &selection(SelectionShape::Rect, (0.0, 0.0), (20.0, 20.0)), MASK);
        let bounds = rasterize(&mut c, &selection(SelectionShape::Ellipse, (10.0, 10.0), (10.0, 90.0)), MASK);
        assert_eq!(bounds, None);
        assert!(!c.has_mask());
        assert!(binary_mask(c.mask()).is_none());
    }

    #[test]
    fn test_preview_does_not_touch_mask() {
        let c = canvas();
        let mut display = c.snapshot();
        draw_preview(&mut display, &selection(SelectionShape::Rect, (5.0, 5.0), (30.0, 30.0)), MASK);
        assert_eq!(display.get_pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(display.get_pixel(15, 15), Some([255, 255, 255, 255]));
        assert!(!c.has_mask());
    }

    #[test]
    fn test_binary_mask_is_black_and_white() {
        let mut c = canvas();
        rasterize(&mut c, &selection(SelectionShape::Rect, (10.0, 10.0), (20.0, 20.0)), MASK);
        let bw = binary_mask(c.mask()).unwrap();
        assert_eq!(bw.get_pixel(15, 15), Some([255, 255, 255, 255]));
        assert_eq!(bw.get_pixel(0, 0), Some([0, 0, 0, 255]));
    }
}
