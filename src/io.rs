use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};

use crate::error::{CanvasError, CanvasResult};
use crate::raster::Raster;

#[cfg(test)]
#[path = "io_tests.rs"]
mod io_tests;

/// Decode a PNG/JPEG/WebP/BMP byte buffer (file picker or drag-drop) into RGBA.
pub fn decode_image(bytes: &[u8]) -> CanvasResult<Raster> {
    if bytes.is_empty() {
        return Err(CanvasError::decode("empty image buffer"));
    }
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CanvasError::decode(format!("failed to sniff format: {e}")))?
        .decode()
        .map_err(|e| CanvasError::decode(e.to_string()))?;
    let raster = Raster::from_image(img.to_rgba8());
    if raster.width == 0 || raster.height == 0 {
        return Err(CanvasError::decode("image has no pixels"));
    }
    Ok(raster)
}

pub fn encode_png(raster: &Raster) -> CanvasResult<Vec<u8>> {
    let img = raster.to_image().ok_or_else(|| CanvasError::encode("raster size does not match its pixel buffer"))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CanvasError::encode(e.to_string()))?;
    Ok(out.into_inner())
}

pub fn export_png(raster: &Raster, path: impl AsRef<Path>) -> CanvasResult<()> {
    let bytes = encode_png(raster)?;
    std::fs::write(path.as_ref(), bytes)?;
    log::info!("exported {}x{} PNG to {}", raster.width, raster.height, path.as_ref().display());
    Ok(())
}

pub fn read_image(path: impl AsRef<Path>) -> CanvasResult<Vec<u8>> {
    Ok(std::fs::read(path.as_ref())?)
}
