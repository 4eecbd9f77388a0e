//! Request/response boundary to the external image-generation service.
//!
//! The engine never talks to the network. It assembles a [`GenerationRequest`]
//! from the current canvas, hands it to the host together with a
//! [`RequestEpoch`], and later accepts the host's result back through
//! `Editor::finish_generation`.

use serde::{Deserialize, Serialize};

use crate::error::CanvasResult;
use crate::io;
use crate::raster::Raster;
use crate::selection;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Sketch,
    Inpaint,
    Outpaint,
    StyleTransfer,
}

impl EditMode {
    /// Whether the mask overlay and the mask tools exist in this mode.
    pub fn uses_mask(self) -> bool {
        matches!(self, Self::Inpaint)
    }

    fn directive(self) -> &'static str {
        match self {
            EditMode::Sketch => "Turn the sketch in the base image into a finished illustration.",
            EditMode::Inpaint => "Repaint only the white region of the mask; keep everything else unchanged.",
            EditMode::Outpaint => "Extend the base image beyond its borders, continuing its content seamlessly.",
            EditMode::StyleTransfer => "Redraw the base image in the style of the reference images.",
        }
    }
}

/// What to do with a result that arrives after a newer request was issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResultPolicy {
    /// Apply on top of the current state regardless of age.
    #[default]
    ApplyLate,
    /// Apply only results for the most recently issued request.
    DiscardStale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestEpoch(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: EditMode,
    /// PNG of the flattened canvas.
    pub base_raster: Vec<u8>,
    /// Black/white PNG mask; inpainting with an effective mask only.
    pub mask_raster: Option<Vec<u8>>,
    /// PNG-encoded reference images.
    pub reference_rasters: Vec<Vec<u8>>,
    pub instruction_text: String,
    pub style_params: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub result_raster: Vec<u8>,
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GenerationError {
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// The external collaborator. Retry and backoff are its own business.
pub trait ImageGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError>;
}

/// A request handed to the host, tagged with the epoch it was issued under.
#[derive(Clone, Debug)]
pub struct PendingGeneration {
    pub epoch: RequestEpoch,
    pub request: GenerationRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    Applied,
    Discarded,
}

/// Assemble a request. `mask` is ignored outside inpainting and when it has
/// no area.
pub fn build_request(
    mode: EditMode,
    flattened: &Raster,
    mask: Option<&Raster>,
    references: &[Raster],
    instruction: &str,
    style_params: Option<serde_json::Value>,
) -> CanvasResult<GenerationRequest> {
    let base_raster = io::encode_png(flattened)?;
    let mask_raster = match mask {
        Some(mask) if mode.uses_mask() => selection::binary_mask(mask).map(|bw| io::encode_png(&bw)).transpose()?,
        _ => None,
    };
    let reference_rasters = references.iter().map(io::encode_png).collect::<CanvasResult<Vec<_>>>()?;
    let instruction = instruction.trim();
    let instruction_text = if instruction.is_empty() {
        mode.directive().to_string()
    } else {
        format!("{}\n{}", mode.directive(), instruction)
    };
    Ok(GenerationRequest {
        mode,
        base_raster,
        mask_raster,
        reference_rasters,
        instruction_text,
        style_params,
    })
}

/// Centred aspect-fit placement of a `src` bitmap on a `dst` canvas:
/// returns `(x, y, scale)`.
pub fn fit_centered(src: (u32, u32), dst: (u32, u32)) -> (i64, i64, f64) {
    if src.0 == 0 || src.1 == 0 {
        return (0, 0, 1.0);
    }
    let scale = (f64::from(dst.0) / f64::from(src.0)).min(f64::from(dst.1) / f64::from(src.1));
    let w = (f64::from(src.0) * scale).round();
    let h = (f64::from(src.1) * scale).round();
    let x = ((f64::from(dst.0) - w) / 2.0).round() as i64;
    let y = ((f64::from(dst.1) - h) / 2.0).round() as i64;
    (x, y, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_region() -> Raster {
        let mut mask = Raster::new(8, 8);
        mask.set_pixel(2, 2, [255, 0, 0, 128]);
        mask
    }

    #[test]
    fn test_only_inpainting_uses_mask() {
        assert!(EditMode::Inpaint.uses_mask());
        assert!(!EditMode::Sketch.uses_mask());
        assert!(!EditMode::Outpaint.uses_mask());
        assert!(!EditMode::StyleTransfer.uses_mask());
    }

    #[test]
    fn test_inpaint_request_carries_mask() {
        let base = Raster::filled(8, 8, [255; 4]);
        let mask = mask_with_region();
        let req = build_request(EditMode::Inpaint, &base, Some(&mask), &[], "a red door", None).unwrap();
        let decoded = io::decode_image(req.mask_raster.as_deref().unwrap_or_default()).unwrap();
        assert_eq!(decoded.get_pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(decoded.get_pixel(0, 0), Some([0, 0, 0, 255]));
        assert!(req.instruction_text.ends_with("a red door"));
    }

    #[test]
    fn test_mask_is_dropped_outside_inpainting_or_when_empty() {
        let base = Raster::filled(8, 8, [255; 4]);
        let mask = mask_with_region();
        let sketch = build_request(EditMode::Sketch, &base, Some(&mask), &[], "", None).unwrap();
        assert!(sketch.mask_raster.is_none());
        let empty = Raster::new(8, 8);
        let inpaint = build_request(EditMode::Inpaint, &base, Some(&empty), &[], "", None).unwrap();
        assert!(inpaint.mask_raster.is_none());
    }

    #[test]
    fn test_references_and_style_params_pass_through() {
        let base = Raster::filled(4, 4, [255; 4]);
        let refs = vec![Raster::filled(2, 2, [1, 2, 3, 255]), Raster::filled(3, 3, [4, 5, 6, 255])];
        let style = serde_json::json!({ "strength": 0.7 });
        let req = build_request(EditMode::StyleTransfer, &base, None, &refs, "  ", Some(style.clone())).unwrap();
        assert_eq!(req.reference_rasters.len(), 2);
        assert_eq!(req.style_params, Some(style));
        assert_eq!(req.instruction_text, EditMode::StyleTransfer.directive());
    }

    #[test]
    fn test_fit_centered_letterboxes_wide_images() {
        assert_eq!(fit_centered((200, 100), (100, 100)), (0, 25, 0.5));
        assert_eq!(fit_centered((50, 100), (200, 200)), (50, 0, 2.0));
        assert_eq!(fit_centered((0, 10), (200, 200)), (0, 0, 1.0));
    }
}
