use image::RgbaImage;

pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Inclusive pixel bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Tight-packed RGBA8 bitmap, row-major, no stride padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self { width, height, pixels }
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    pub fn from_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self { width, height, pixels: img.into_raw() }
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(color)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.pixels[idx..idx + 4].copy_from_slice(&color);
    }

    /// Source-over blend of `color` onto the pixel at `(x, y)`.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        let dst = &mut self.pixels[idx..idx + 4];
        blend_over(dst, color);
    }

    pub fn fill(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Paint `src` over this raster with its top-left at `(x, y)`. Only the
    /// overlapping region is touched.
    pub fn draw_over(&mut self, src: &Raster, x: i64, y: i64) {
        for sy in 0..src.height {
            let dy = y + i64::from(sy);
            if dy < 0 || dy >= i64::from(self.height) {
                continue;
            }
            for sx in 0..src.width {
                let dx = x + i64::from(sx);
                if dx < 0 || dx >= i64::from(self.width) {
                    continue;
                }
                let s = src.index(sx, sy);
                let color = [src.pixels[s], src.pixels[s + 1], src.pixels[s + 2], src.pixels[s + 3]];
                self.blend_pixel(dx as u32, dy as u32, color);
            }
        }
    }

    /// Number of pixels with non-zero alpha.
    pub fn coverage(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] > 0).count()
    }

    /// Bounding box of all pixels with non-zero alpha.
    pub fn opaque_bounds(&self) -> Option<PixelBounds> {
        let mut bounds: Option<PixelBounds> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixels[self.index(x, y) + 3] == 0 {
                    continue;
                }
                bounds = Some(match bounds {
                    None => PixelBounds { min_x: x, min_y: y, max_x: x, max_y: y },
                    Some(b) => PixelBounds {
                        min_x: b.min_x.min(x),
                        min_y: b.min_y.min(y),
                        max_x: b.max_x.max(x),
                        max_y: b.max_y.max(y),
                    },
                });
            }
        }
        bounds
    }
}

pub(crate) fn blend_over(dst: &mut [u8], color: Rgba) {
    let a = f32::from(color[3]) / 255.0;
    if a <= 0.0 {
        return;
    }
    if a >= 1.0 {
        dst.copy_from_slice(&color);
        return;
    }
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = a + dst_a * (1.0 - a);
    for i in 0..3 {
        let src_v = f32::from(color[i]) * a;
        let dst_v = f32::from(dst[i]) * dst_a * (1.0 - a);
        dst[i] = ((src_v + dst_v) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster = Raster::filled(100, 100, [255; 4]);
        assert_eq!(raster.width, 100);
        assert_eq!(raster.height, 100);
        assert_eq!(raster.pixels.len(), 40000);
        assert!(Raster::from_rgba(10, 10, vec![0; 12]).is_none());
    }

    #[test]
    fn test_pixel_access_is_clipped() {
        let mut raster = Raster::new(4, 4);
        raster.set_pixel(1, 2, [1, 2, 3, 4]);
        raster.set_pixel(9, 9, [9, 9, 9, 9]);
        assert_eq!(raster.get_pixel(1, 2), Some([1, 2, 3, 4]));
        assert_eq!(raster.get_pixel(4, 0), None);
    }

    #[test]
    fn test_blend_opaque_replaces_and_transparent_is_noop() {
        let mut raster = Raster::filled(1, 1, [255, 255, 255, 255]);
        raster.blend_pixel(0, 0, [0, 0, 0, 0]);
        assert_eq!(raster.get_pixel(0, 0), Some([255, 255, 255, 255]));
        raster.blend_pixel(0, 0, [10, 20, 30, 255]);
        assert_eq!(raster.get_pixel(0, 0), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_blend_half_alpha_over_white() {
        let mut raster = Raster::filled(1, 1, [255, 255, 255, 255]);
        raster.blend_pixel(0, 0, [0, 0, 0, 128]);
        let px = raster.get_pixel(0, 0).unwrap_or_default();
        assert_eq!(px[3], 255);
        assert!((126..=128).contains(&px[0]));
    }

    #[test]
    fn test_opaque_bounds_and_coverage() {
        let mut raster = Raster::new(20, 20);
        assert_eq!(raster.opaque_bounds(), None);
        raster.set_pixel(3, 4, [0, 0, 0, 255]);
        raster.set_pixel(7, 12, [0, 0, 0, 1]);
        let b = raster.opaque_bounds().unwrap_or(PixelBounds { min_x: 0, min_y: 0, max_x: 0, max_y: 0 });
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (3, 4, 7, 12));
        assert_eq!(raster.coverage(), 2);
    }

    #[test]
    fn test_draw_over_clips_negative_offsets() {
        let mut dst = Raster::new(4, 4);
        let src = Raster::filled(3, 3, [5, 5, 5, 255]);
        dst.draw_over(&src, -2, -2);
        assert_eq!(dst.coverage(), 1);
        assert_eq!(dst.get_pixel(0, 0), Some([5, 5, 5, 255]));
    }
}
