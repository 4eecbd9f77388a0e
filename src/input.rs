//! Input model: tools, pointer events and the per-gesture state machine.
//!
//! A gesture runs from pointer-down to pointer-up. [`Gesture`] carries the
//! context the active tool needs between events; it is `Idle` whenever no
//! gesture is in flight, which is also the only state in which a new one may
//! start.

use serde::{Deserialize, Serialize};

use crate::selection::Selection;
use crate::transform::Point;

/// The active tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    /// Drag the placed image.
    Move,
    /// Paint into the mask overlay.
    MaskBrush,
    SelectRect,
    SelectCircle,
    Pan,
}

impl Tool {
    /// Tools that write the mask overlay and so need a masking edit mode.
    pub fn needs_mask(self) -> bool {
        matches!(self, Self::MaskBrush | Self::SelectRect | Self::SelectCircle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    /// Always pans, whatever the tool.
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Client-space position in CSS pixels.
    pub client: Point,
    pub button: Button,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64) -> Self {
        Self { client: Point::new(x, y), button: Button::Primary }
    }

    pub fn middle(x: f64, y: f64) -> Self {
        Self { client: Point::new(x, y), button: Button::Middle }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive = scroll down.
    pub dy: f64,
}

/// State between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Brush, eraser or mask brush; `last` is the previous raster point.
    Painting { tool: Tool, last: Point },
    /// Dragging the placed image; `grab` is pointer minus placement origin.
    Moving { grab: Point },
    Selecting { selection: Selection },
    /// `last_client` is the previous client position, used for the pan delta.
    Panning { last_client: Point },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
