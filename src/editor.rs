//! The canvas engine: routes pointer gestures to the surface and keeps the
//! layer stack and undo history in step with it.

use std::mem;
use std::sync::Arc;

use crate::brush::{Brush, Composite};
use crate::canvas::Canvas;
pub use crate::canvas::{ImagePlacement, Placement};
use crate::config::{CanvasConfig, CanvasPreset, EngineConfig, Settings};
use crate::error::{CanvasError, CanvasResult};
use crate::generation::{
    self, EditMode, GenerationError, GenerationOutcome, GenerationResult, ImageGenerator, PendingGeneration,
    RequestEpoch, StaleResultPolicy,
};
use crate::history::{History, Step};
use crate::input::{Button, Gesture, PointerEvent, Tool, WheelDelta};
use crate::io;
use crate::layer::{LayerId, LayerStore};
use crate::raster::{Raster, Rgba};
use crate::selection::{self, Selection, SelectionShape};
use crate::transform::{self, ElementBounds, Point, ViewTransform};

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;

/// What an input handler did, for the host to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Nothing changed (surface not ready, no gesture, unmappable point...).
    Ignored,
    /// On-screen state changed; nothing was committed.
    Redraw,
    /// A discrete edit finished: layer synced and one history entry recorded.
    Committed,
}

/// Everything that only exists once the surface is ready.
struct Document {
    canvas: Canvas,
    layers: LayerStore,
    history: History,
    placement: Option<Placement>,
}

impl Document {
    fn new(config: &EngineConfig) -> Self {
        let size = CanvasConfig::from(config.preset);
        let canvas = Canvas::new(size, config.background);
        let layers = LayerStore::new(size.width, size.height, config.background);
        let mut history = History::new(config.history_limit);
        history.push(layers.active_id(), canvas.snapshot(), None);
        Self { canvas, layers, history, placement: None }
    }

    /// Layer sync plus one history entry.
    fn commit(&mut self) {
        self.layers.commit_active(self.canvas.surface());
        self.history.push(self.layers.active_id(), self.canvas.snapshot(), self.placement.clone());
    }

    /// Put back one undo/redo step: the layer's pixels and the placement.
    fn apply(&mut self, step: Step) {
        if let Some(raster) = &step.raster {
            if step.layer == self.layers.active_id() {
                self.canvas.load_surface(raster);
                self.layers.commit_active(self.canvas.surface());
            } else if !self.layers.restore(step.layer, raster) {
                log::warn!("history step for unknown layer {} skipped", step.layer);
            }
        }
        self.placement = step.placement.filter(|p| self.layers.get(p.layer).is_some());
    }

    fn flatten(&self) -> Raster {
        self.layers.composite(self.canvas.background(), Some(self.canvas.surface()))
    }

    fn active_is_bottom(&self) -> bool {
        self.layers.active().order == 0
    }
}

pub struct Editor {
    config: EngineConfig,
    doc: Option<Document>,
    brush: Brush,
    tool: Tool,
    mode: EditMode,
    view: ViewTransform,
    layout: ElementBounds,
    gesture: Gesture,
    epoch: u64,
}

impl Editor {
    /// The surface is not ready until [`Editor::initialize`] runs.
    pub fn new(config: EngineConfig) -> Self {
        let brush = Brush::new(config.brush_radius, config.brush_color);
        Self {
            config,
            doc: None,
            brush,
            tool: Tool::default(),
            mode: EditMode::default(),
            view: ViewTransform::default(),
            layout: ElementBounds::default(),
            gesture: Gesture::Idle,
            epoch: 0,
        }
    }

    /// Surface-ready signal: allocate the rasters and the background layer.
    pub fn initialize(&mut self) {
        let doc = Document::new(&self.config);
        log::info!(
            "canvas initialised at {}x{} ({})",
            doc.canvas.width,
            doc.canvas.height,
            self.config.preset.label()
        );
        self.doc = Some(doc);
        self.gesture = Gesture::Idle;
        self.view.reset();
    }

    pub fn is_ready(&self) -> bool {
        self.doc.is_some()
    }

    /// Switch preset; a ready surface is rebuilt from scratch.
    pub fn set_canvas_preset(&mut self, preset: CanvasPreset) {
        self.config.preset = preset;
        self.epoch += 1;
        if self.doc.is_some() {
            self.initialize();
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Viewport ---

    /// Untransformed layout box of the canvas element, in client pixels.
    pub fn set_layout(&mut self, layout: ElementBounds) {
        self.layout = layout;
    }

    /// Bounds after zoom/pan; pointer positions are measured against these.
    pub fn element_bounds(&self) -> ElementBounds {
        self.view.apply_to_bounds(self.layout)
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    fn to_raster(&self, client: Point) -> Option<Point> {
        let doc = self.doc.as_ref()?;
        transform::to_raster_space(client, self.element_bounds(), doc.canvas.surface().size())
    }

    // --- Tools ---

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) -> CanvasResult<()> {
        if tool.needs_mask() && !self.mode.uses_mask() {
            log::warn!("{tool:?} needs a masking edit mode, current mode is {:?}", self.mode);
            return Err(CanvasError::ToolUnavailable(tool));
        }
        self.tool = tool;
        Ok(())
    }

    pub fn edit_mode(&self) -> EditMode {
        self.mode
    }

    /// Leaving a masking mode drops the mask, any mask gesture and mask tool.
    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.mode = mode;
        if mode.uses_mask() {
            return;
        }
        if self.tool.needs_mask() {
            self.tool = Tool::Brush;
        }
        if matches!(self.gesture, Gesture::Selecting { .. } | Gesture::Painting { tool: Tool::MaskBrush, .. }) {
            self.gesture = Gesture::Idle;
        }
        if let Some(doc) = self.doc.as_mut() {
            doc.canvas.clear_mask();
        }
    }

    /// The mask overlay is shown only in modes that use it.
    pub fn mask_visible(&self) -> bool {
        self.mode.uses_mask()
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_brush_color(&mut self, color: Rgba) {
        self.brush.color = color;
    }

    pub fn set_brush_radius(&mut self, radius: f32) {
        self.brush.set_radius(radius);
    }

    pub fn adjust_brush_radius(&mut self, delta: f32) {
        self.brush.adjust_radius(delta);
    }

    pub fn settings(&self) -> Settings {
        Settings { brush_size: self.brush.radius, last_tool: self.tool, preset: self.config.preset }
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.brush.set_radius(settings.brush_size);
        if self.set_tool(settings.last_tool).is_err() {
            self.tool = Tool::Brush;
        }
        if settings.preset != self.config.preset {
            self.set_canvas_preset(settings.preset);
        }
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, event: PointerEvent) -> Response {
        if self.doc.is_none() || !self.gesture.is_idle() {
            return Response::Ignored;
        }
        match event.button {
            Button::Secondary => return Response::Ignored,
            Button::Middle => {
                self.gesture = Gesture::Panning { last_client: event.client };
                return Response::Redraw;
            }
            Button::Primary => {}
        }
        if self.tool == Tool::Pan {
            self.gesture = Gesture::Panning { last_client: event.client };
            return Response::Redraw;
        }
        let Some(p) = self.to_raster(event.client) else {
            return Response::Ignored;
        };
        let Some(doc) = self.doc.as_mut() else {
            return Response::Ignored;
        };
        match self.tool {
            Tool::Brush | Tool::Eraser | Tool::MaskBrush => {
                let style = self.brush.style(composite_for(self.tool), self.config.mask_color);
                doc.canvas.stamp(as_f32(p), &style);
                self.gesture = Gesture::Painting { tool: self.tool, last: p };
                log::debug!("{:?} stroke started at ({:.1}, {:.1})", self.tool, p.x, p.y);
                Response::Redraw
            }
            Tool::Move => {
                let active = doc.layers.active_id();
                let inside = doc.canvas.surface().contains(p.x.floor() as i64, p.y.floor() as i64);
                match doc.placement.as_ref() {
                    Some(placement) if placement.layer == active && inside => {
                        let grab = Point::new(p.x - placement.at.x as f64, p.y - placement.at.y as f64);
                        self.gesture = Gesture::Moving { grab };
                        Response::Redraw
                    }
                    _ => Response::Ignored,
                }
            }
            Tool::SelectRect | Tool::SelectCircle => {
                let shape = if self.tool == Tool::SelectRect { SelectionShape::Rect } else { SelectionShape::Ellipse };
                self.gesture = Gesture::Selecting { selection: Selection::new(p, shape) };
                Response::Redraw
            }
            Tool::Pan => Response::Ignored,
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> Response {
        if let Gesture::Panning { last_client } = &mut self.gesture {
            self.view.pan_by(event.client.x - last_client.x, event.client.y - last_client.y);
            *last_client = event.client;
            return Response::Redraw;
        }
        if self.gesture.is_idle() {
            return Response::Ignored;
        }
        let Some(p) = self.to_raster(event.client) else {
            return Response::Ignored;
        };
        let Some(doc) = self.doc.as_mut() else {
            return Response::Ignored;
        };
        match &mut self.gesture {
            Gesture::Painting { tool, last } => {
                let style = self.brush.style(composite_for(*tool), self.config.mask_color);
                doc.canvas.stroke_segment(as_f32(*last), as_f32(p), &style);
                *last = p;
                Response::Redraw
            }
            Gesture::Moving { grab } => {
                let bottom = doc.active_is_bottom();
                let Some(placement) = doc.placement.as_mut() else {
                    return Response::Ignored;
                };
                placement.at = ImagePlacement { x: (p.x - grab.x).round() as i64, y: (p.y - grab.y).round() as i64 };
                // Moving uncovers what was underneath, so redraw everything.
                if bottom {
                    doc.canvas.clear_to_background();
                } else {
                    doc.canvas.clear_transparent();
                }
                doc.canvas.blit_image(&placement.bitmap, placement.at.x, placement.at.y, 1.0);
                Response::Redraw
            }
            Gesture::Selecting { selection } => {
                selection.end = p;
                Response::Redraw
            }
            Gesture::Idle | Gesture::Panning { .. } => Response::Ignored,
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> Response {
        let gesture = mem::take(&mut self.gesture);
        let end = self.to_raster(event.client);
        let Some(doc) = self.doc.as_mut() else {
            return Response::Ignored;
        };
        match gesture {
            Gesture::Idle => Response::Ignored,
            Gesture::Panning { .. } => Response::Redraw,
            // The mask lives outside the undo history.
            Gesture::Painting { tool: Tool::MaskBrush, .. } => Response::Redraw,
            Gesture::Painting { .. } | Gesture::Moving { .. } => {
                doc.commit();
                log::debug!("gesture committed; history cursor {}", doc.history.cursor());
                Response::Committed
            }
            Gesture::Selecting { mut selection } => {
                if let Some(p) = end {
                    selection.end = p;
                }
                match selection::rasterize(&mut doc.canvas, &selection, self.config.mask_color) {
                    Some(b) => log::debug!("mask set to ({}, {})..=({}, {})", b.min_x, b.min_y, b.max_x, b.max_y),
                    None => log::debug!("zero-area selection left the mask empty"),
                }
                Response::Redraw
            }
        }
    }

    /// Wheel zoom; independent of tool and gesture.
    pub fn wheel(&mut self, delta: WheelDelta) -> Response {
        if self.doc.is_none() {
            return Response::Ignored;
        }
        let before = self.view.zoom();
        self.view.zoom_by_wheel(delta.dy, self.config.zoom_step);
        if (self.view.zoom() - before).abs() > f64::EPSILON {
            Response::Redraw
        } else {
            Response::Ignored
        }
    }

    /// In-flight drag selection, if any.
    pub fn selection(&self) -> Option<Selection> {
        match &self.gesture {
            Gesture::Selecting { selection } => Some(*selection),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        !self.gesture.is_idle()
    }

    pub fn clear_mask(&mut self) {
        if let Some(doc) = self.doc.as_mut() {
            doc.canvas.clear_mask();
        }
    }

    // --- History ---

    pub fn undo(&mut self) -> Response {
        if !self.gesture.is_idle() {
            return Response::Ignored;
        }
        let Some(doc) = self.doc.as_mut() else {
            return Response::Ignored;
        };
        let Some(step) = doc.history.undo() else {
            return Response::Ignored;
        };
        doc.apply(step);
        Response::Redraw
    }

    pub fn redo(&mut self) -> Response {
        if !self.gesture.is_idle() {
            return Response::Ignored;
        }
        let Some(doc) = self.doc.as_mut() else {
            return Response::Ignored;
        };
        let Some(step) = doc.history.redo() else {
            return Response::Ignored;
        };
        doc.apply(step);
        Response::Redraw
    }

    pub fn history(&self) -> Option<&History> {
        self.doc.as_ref().map(|d| &d.history)
    }

    // --- Layers ---

    /// Structural edits end any gesture in flight without committing it.
    fn ready_idle(&mut self) -> CanvasResult<&mut Document> {
        let doc = self.doc.as_mut().ok_or(CanvasError::NotReady)?;
        self.gesture = Gesture::Idle;
        Ok(doc)
    }

    pub fn layers(&self) -> Option<&LayerStore> {
        self.doc.as_ref().map(|d| &d.layers)
    }

    pub fn add_layer(&mut self) -> CanvasResult<LayerId> {
        let doc = self.ready_idle()?;
        let id = doc.layers.add_layer(doc.canvas.surface_mut());
        doc.history.track(id, doc.canvas.snapshot());
        Ok(id)
    }

    pub fn delete_layer(&mut self, id: LayerId) -> CanvasResult<()> {
        let doc = self.ready_idle()?;
        doc.layers.delete_layer(id, doc.canvas.surface_mut())?;
        doc.history.forget(id);
        if doc.placement.as_ref().is_some_and(|p| p.layer == id) {
            doc.placement = None;
        }
        Ok(())
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> CanvasResult<()> {
        let doc = self.ready_idle()?;
        doc.layers.set_active(id, doc.canvas.surface_mut())
    }

    pub fn toggle_layer_visibility(&mut self, id: LayerId) -> CanvasResult<bool> {
        let doc = self.ready_idle()?;
        doc.canvas.dirty = true;
        doc.layers.toggle_visibility(id)
    }

    pub fn reorder_layer(&mut self, from: usize, to: usize) -> CanvasResult<()> {
        let doc = self.ready_idle()?;
        doc.canvas.dirty = true;
        doc.layers.reorder(from, to)
    }

    pub fn rename_layer(&mut self, id: LayerId, name: &str) -> CanvasResult<()> {
        let doc = self.ready_idle()?;
        doc.layers.rename(id, name)
    }

    // --- Output ---

    pub fn surface(&self) -> Option<&Raster> {
        self.doc.as_ref().map(|d| d.canvas.surface())
    }

    pub fn mask(&self) -> Option<&Raster> {
        self.doc.as_ref().map(|d| d.canvas.mask())
    }

    pub fn placement(&self) -> Option<ImagePlacement> {
        self.doc.as_ref()?.placement.as_ref().map(|p| p.at)
    }

    /// Composite of visible layers over the opaque background.
    pub fn flatten(&self) -> CanvasResult<Raster> {
        self.doc.as_ref().map(Document::flatten).ok_or(CanvasError::NotReady)
    }

    /// What the panel shows: composite, then the mask overlay, then the
    /// selection preview.
    pub fn render(&self) -> Option<Raster> {
        let doc = self.doc.as_ref()?;
        let mut display = doc.flatten();
        if self.mask_visible() {
            display.draw_over(doc.canvas.mask(), 0, 0);
        }
        if let Some(selection) = self.selection() {
            selection::draw_preview(&mut display, &selection, self.config.mask_color);
        }
        Some(display)
    }

    pub fn encode_png(&self) -> CanvasResult<Vec<u8>> {
        io::encode_png(&self.flatten()?)
    }

    pub fn export_png(&self, path: impl AsRef<std::path::Path>) -> CanvasResult<()> {
        io::export_png(&self.flatten()?, path)
    }

    /// Eyedropper: sample the composite and adopt it as the brush colour.
    pub fn pick_color(&mut self, at: Point) -> Option<Rgba> {
        let doc = self.doc.as_ref()?;
        // Also rejects NaN.
        if !(at.x >= 0.0 && at.y >= 0.0) {
            return None;
        }
        let color = doc.flatten().get_pixel(at.x as u32, at.y as u32)?;
        self.brush.color = color;
        Some(color)
    }

    // --- Images ---

    /// Decode an opened/dropped file and place it aspect-fit and centred on
    /// the active layer. A bad file leaves everything untouched.
    pub fn open_image(&mut self, bytes: &[u8]) -> CanvasResult<Response> {
        if self.doc.is_none() {
            return Ok(Response::Ignored);
        }
        let bitmap = io::decode_image(bytes).inspect_err(|e| log::warn!("open image: {e}"))?;
        let doc = self.ready_idle()?;
        place(doc, &bitmap);
        log::info!("placed {}x{} image", bitmap.width, bitmap.height);
        Ok(Response::Committed)
    }

    // --- Generation ---

    /// Build a request for the current mode. The editor stays interactive
    /// while the host runs it.
    pub fn begin_generation(
        &mut self,
        instruction: &str,
        references: &[Raster],
        style_params: Option<serde_json::Value>,
    ) -> CanvasResult<PendingGeneration> {
        let doc = self.doc.as_ref().ok_or(CanvasError::NotReady)?;
        let request = generation::build_request(
            self.mode,
            &doc.flatten(),
            Some(doc.canvas.mask()),
            references,
            instruction,
            style_params,
        )?;
        self.epoch += 1;
        log::info!("generation request {} issued in {:?} mode", self.epoch, self.mode);
        Ok(PendingGeneration { epoch: RequestEpoch(self.epoch), request })
    }

    /// Make every in-flight request stale.
    pub fn cancel_generation(&mut self) {
        self.epoch += 1;
    }

    pub fn current_epoch(&self) -> RequestEpoch {
        RequestEpoch(self.epoch)
    }

    /// Re-entry point for the collaborator's answer. Failures change nothing.
    pub fn finish_generation(
        &mut self,
        epoch: RequestEpoch,
        outcome: Result<GenerationResult, GenerationError>,
    ) -> CanvasResult<GenerationOutcome> {
        if self.doc.is_none() {
            return Err(CanvasError::NotReady);
        }
        let result = outcome.map_err(|e| {
            log::warn!("generation request {} failed: {e}", epoch.0);
            CanvasError::generation(e.message)
        })?;
        if self.config.stale_results == StaleResultPolicy::DiscardStale && epoch.0 != self.epoch {
            log::info!("discarding stale generation result {} (current {})", epoch.0, self.epoch);
            return Ok(GenerationOutcome::Discarded);
        }
        if !result.mime_type.starts_with("image/") {
            return Err(CanvasError::decode(format!("unexpected result type {}", result.mime_type)));
        }
        let bitmap = io::decode_image(&result.result_raster)?;
        let Some(doc) = self.doc.as_mut() else {
            return Err(CanvasError::NotReady);
        };
        place(doc, &bitmap);
        log::info!("generation result {} applied", epoch.0);
        Ok(GenerationOutcome::Applied)
    }

    /// Synchronous convenience: build, call the collaborator, re-enter.
    pub fn generate_with(
        &mut self,
        generator: &dyn ImageGenerator,
        instruction: &str,
        references: &[Raster],
        style_params: Option<serde_json::Value>,
    ) -> CanvasResult<GenerationOutcome> {
        let pending = self.begin_generation(instruction, references, style_params)?;
        let outcome = generator.generate(&pending.request);
        self.finish_generation(pending.epoch, outcome)
    }
}

fn composite_for(tool: Tool) -> Composite {
    match tool {
        Tool::Eraser => Composite::Erase,
        Tool::MaskBrush => Composite::Mask,
        _ => Composite::Paint,
    }
}

fn as_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Blit aspect-fit and centred, remember it as the movable placement, commit.
fn place(doc: &mut Document, bitmap: &Raster) {
    let (x, y, scale) = generation::fit_centered(bitmap.size(), doc.canvas.surface().size());
    let placed = doc.canvas.blit_image(bitmap, x, y, scale);
    doc.placement =
        Some(Placement { bitmap: Arc::new(placed), at: ImagePlacement { x, y }, layer: doc.layers.active_id() });
    doc.commit();
}
