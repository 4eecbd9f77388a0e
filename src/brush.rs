use serde::{Deserialize, Serialize};

use crate::raster::{Raster, Rgba, TRANSPARENT};

pub const BRUSH_RADIUS_MIN: f32 = 1.0;
pub const BRUSH_RADIUS_MAX: f32 = 100.0;

/// How a stroke combines with the pixels underneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composite {
    /// Source-over paint.
    Paint,
    /// Clears covered pixels to transparent.
    Erase,
    /// Writes the translucent mask colour without accumulating.
    Mask,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub composite: Composite,
    pub color: Rgba,
    /// Line width in raster pixels; caps and joins are round.
    pub width: f32,
}

impl StrokeStyle {
    pub fn radius(&self) -> f32 {
        self.width / 2.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub radius: f32,
    pub color: Rgba,
}

impl Brush {
    pub fn new(radius: f32, color: Rgba) -> Self {
        Self { radius: radius.clamp(BRUSH_RADIUS_MIN, BRUSH_RADIUS_MAX), color }
    }

    pub fn set_radius(&mut self, radius: f32) {
        if radius.is_finite() {
            self.radius = radius.clamp(BRUSH_RADIUS_MIN, BRUSH_RADIUS_MAX);
        }
    }

    pub fn adjust_radius(&mut self, delta: f32) {
        self.set_radius(self.radius + delta);
    }

    pub fn style(&self, composite: Composite, mask_color: Rgba) -> StrokeStyle {
        let color = match composite {
            Composite::Paint => self.color,
            Composite::Erase => TRANSPARENT,
            Composite::Mask => mask_color,
        };
        StrokeStyle { composite, color, width: self.radius * 2.0 }
    }
}

pub fn stamp(raster: &mut Raster, style: &StrokeStyle, pos: (f32, f32)) {
    let radius = style.radius();
    if radius <= 0.0 || raster.width == 0 || raster.height == 0 {
        return;
    }
    let (cx, cy) = pos;
    let r2 = radius * radius;
    let min_x = (cx - radius).floor().max(0.0) as i64;
    let max_x = (cx + radius).ceil().min((raster.width - 1) as f32) as i64;
    let min_y = (cy - radius).floor().max(0.0) as i64;
    let max_y = (cy + radius).ceil().min((raster.height - 1) as f32) as i64;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let (px, py) = (x as u32, y as u32);
            match style.composite {
                Composite::Paint => raster.blend_pixel(px, py, style.color),
                Composite::Erase => raster.set_pixel(px, py, TRANSPARENT),
                Composite::Mask => raster.set_pixel(px, py, style.color),
            }
        }
    }
}

/// Stamp along the segment at one-pixel spacing so fast motion leaves no gaps.
pub fn stroke(raster: &mut Raster, style: &StrokeStyle, from: (f32, f32), to: (f32, f32)) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let dist = (dx * dx + dy * dy).sqrt();
    let steps = dist.max(1.0).ceil();
    let step_x = dx / steps;
    let step_y = dy / steps;
    let mut x = from.0;
    let mut y = from.1;
    for _ in 0..=steps as i32 {
        stamp(raster, style, (x, y));
        x += step_x;
        y += step_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba = [0, 0, 0, 255];

    #[test]
    fn test_radius_is_clamped() {
        let mut brush = Brush::new(500.0, BLACK);
        assert_eq!(brush.radius, BRUSH_RADIUS_MAX);
        brush.adjust_radius(-1000.0);
        assert_eq!(brush.radius, BRUSH_RADIUS_MIN);
    }

    #[test]
    fn test_stroke_covers_both_endpoints() {
        let mut raster = Raster::new(64, 64);
        let style = Brush::new(2.0, BLACK).style(Composite::Paint, [255, 0, 0, 128]);
        stroke(&mut raster, &style, (5.0, 5.0), (50.0, 40.0));
        assert_eq!(raster.get_pixel(5, 5), Some(BLACK));
        assert_eq!(raster.get_pixel(50, 40), Some(BLACK));
        assert_eq!(raster.get_pixel(60, 5), Some(TRANSPARENT));
    }

    #[test]
    fn test_erase_clears_to_transparent() {
        let mut raster = Raster::filled(16, 16, BLACK);
        let style = Brush::new(3.0, BLACK).style(Composite::Erase, [255, 0, 0, 128]);
        stamp(&mut raster, &style, (8.0, 8.0));
        assert_eq!(raster.get_pixel(8, 8), Some(TRANSPARENT));
        assert_eq!(raster.get_pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn test_mask_paint_does_not_accumulate() {
        let mask = [255, 0, 0, 128];
        let mut raster = Raster::new(16, 16);
        let style = Brush::new(3.0, BLACK).style(Composite::Mask, mask);
        stroke(&mut raster, &style, (8.0, 8.0), (9.0, 8.0));
        stroke(&mut raster, &style, (8.0, 8.0), (9.0, 8.0));
        assert_eq!(raster.get_pixel(8, 8), Some(mask));
    }

    #[test]
    fn test_stamp_outside_raster_is_clipped() {
        let mut raster = Raster::new(8, 8);
        let style = Brush::new(4.0, BLACK).style(Composite::Paint, BLACK);
        stamp(&mut raster, &style, (-50.0, -50.0));
        assert_eq!(raster.coverage(), 0);
    }
}
