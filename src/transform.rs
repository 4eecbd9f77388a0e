//! Pointer coordinate mapping and the viewport zoom/pan transform.
//!
//! Pointer events arrive in client (CSS) pixels. The on-screen canvas element
//! may be drawn at a different size than its backing raster, and the whole
//! element is additionally scaled/translated by the [`ViewTransform`]. Because
//! pointer positions are measured against the element's post-transform bounding
//! box, a single bounds-relative rescale is enough to land in raster space.

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;

/// A point in client, element or raster space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box of the canvas element in client pixels, as reported by layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementBounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn is_laid_out(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Map a client-space pointer position to raster pixels.
///
/// Returns `None` while the element has no size yet.
pub fn to_raster_space(client: Point, bounds: ElementBounds, raster_size: (u32, u32)) -> Option<Point> {
    if !bounds.is_laid_out() {
        return None;
    }
    let scale_x = f64::from(raster_size.0) / bounds.width;
    let scale_y = f64::from(raster_size.1) / bounds.height;
    Some(Point {
        x: (client.x - bounds.left) * scale_x,
        y: (client.y - bounds.top) * scale_y,
    })
}

/// Viewport zoom and pan applied to the canvas container.
///
/// Scaling is anchored at the container's top-left corner, then `pan` is added,
/// so a content point `p` appears at `p * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f64,
    pub pan: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { zoom: 1.0, pan: Point::default() }
    }
}

impl ViewTransform {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// One wheel notch: scrolling up (negative `dy`) zooms in by `step`,
    /// scrolling down zooms out by the same factor.
    pub fn zoom_by_wheel(&mut self, dy: f64, step: f64) {
        if dy == 0.0 || !dy.is_finite() {
            return;
        }
        let factor = if dy < 0.0 { step } else { 1.0 / step };
        self.set_zoom(self.zoom * factor);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn content_to_screen(&self, content: Point) -> Point {
        Point {
            x: content.x * self.zoom + self.pan.x,
            y: content.y * self.zoom + self.pan.y,
        }
    }

    pub fn screen_to_content(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan.x) / self.zoom,
            y: (screen.y - self.pan.y) / self.zoom,
        }
    }

    /// Bounds of an element laid out at `layout` (relative to the container
    /// origin) after this transform is applied.
    pub fn apply_to_bounds(&self, layout: ElementBounds) -> ElementBounds {
        let origin = self.content_to_screen(Point::new(layout.left, layout.top));
        ElementBounds {
            left: origin.x,
            top: origin.y,
            width: layout.width * self.zoom,
            height: layout.height * self.zoom,
        }
    }
}
