//! Raster canvas engine for an AI-assisted image editor.
//!
//! The engine is headless: the host forwards pointer and wheel input, reports
//! where the canvas element sits on screen, and reads back rasters to display
//! or export. Image generation runs outside the engine; the engine only builds
//! requests and applies results.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`editor`] | The [`editor::Editor`] façade that owns all state |
//! | [`canvas`] | Live surface and mask overlay; every draw call goes here |
//! | [`raster`] | RGBA8 pixel buffer and source-over blending |
//! | [`brush`] | Brush settings and round-capped stroke stamping |
//! | [`transform`] | Client-to-raster mapping and the pan/zoom view |
//! | [`input`] | Tools, pointer events and the gesture state machine |
//! | [`selection`] | Rectangle/ellipse selections rasterized into the mask |
//! | [`layer`] | Ordered layer stack and compositing |
//! | [`history`] | Bounded undo/redo of whole-layer snapshots |
//! | [`generation`] | Request/response types for the image generator |
//! | [`io`] | Image decode and PNG export |
//! | [`config`] | Canvas presets, engine defaults and persisted settings |
//! | [`error`] | [`error::CanvasError`] |

pub mod brush;
pub mod canvas;
pub mod config;
pub mod editor;
pub mod error;
pub mod generation;
pub mod history;
pub mod input;
pub mod io;
pub mod layer;
pub mod raster;
pub mod selection;
pub mod transform;

pub use editor::{Editor, Response};
pub use error::{CanvasError, CanvasResult};
