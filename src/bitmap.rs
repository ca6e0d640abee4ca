//! In-memory pixel buffers handed to the image-writing side.
//!
//! Indexed buffers hold one palette index per pixel in a `GrayImage`; the
//! palette travels separately.

use image::{imageops, GrayImage, Luma, RgbaImage};

use crate::{error::DecodeError, palette::Palette};

/// Largest canvas a decoder will allocate (64 Mpx, 256 MiB as RGBA)
pub const MAX_CANVAS_PIXELS: u64 = 1 << 26;

/// Validates canvas dimensions taken from archive headers or options.
pub fn checked_canvas_size(width: u64, height: u64, what: &str) -> Result<(u32, u32), DecodeError> {
    let too_large = || {
        DecodeError::InvalidData(format!(
            "{} canvas of {}x{} exceeds {} pixels",
            what, width, height, MAX_CANVAS_PIXELS
        ))
    };
    let pixels = width.checked_mul(height).ok_or_else(too_large)?;
    if pixels > MAX_CANVAS_PIXELS {
        return Err(too_large());
    }
    Ok((
        u32::try_from(width).map_err(|_| too_large())?,
        u32::try_from(height).map_err(|_| too_large())?,
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bitmap {
    Indexed(GrayImage),
    Rgba(RgbaImage),
}

impl Bitmap {
    pub fn new_indexed(width: u32, height: u32) -> Self {
        Bitmap::Indexed(GrayImage::new(width, height))
    }

    /// Fully transparent RGBA buffer
    pub fn new_rgba(width: u32, height: u32) -> Self {
        Bitmap::Rgba(RgbaImage::new(width, height))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Bitmap::Indexed(img) => img.dimensions(),
            Bitmap::Rgba(img) => img.dimensions(),
        }
    }

    pub fn as_indexed(&self) -> Option<&GrayImage> {
        match self {
            Bitmap::Indexed(img) => Some(img),
            Bitmap::Rgba(_) => None,
        }
    }

    pub fn as_rgba(&self) -> Option<&RgbaImage> {
        match self {
            Bitmap::Rgba(img) => Some(img),
            Bitmap::Indexed(_) => None,
        }
    }

    /// Palette index at (x, y), or `None` for RGBA buffers and out-of-range points.
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        let img = self.as_indexed()?;
        (x < img.width() && y < img.height()).then(|| img.get_pixel(x, y)[0])
    }

    /// Copies `top` over this buffer at (x, y), replacing pixels outright
    /// (no blending). Indexed sources on an RGBA canvas are expanded through
    /// `palette` as opaque colours. Returns false if the pair cannot be combined.
    pub fn paste(&mut self, top: &Bitmap, x: i64, y: i64, palette: &Palette) -> bool {
        match (self, top) {
            (Bitmap::Indexed(bottom), Bitmap::Indexed(top)) => {
                imageops::replace(bottom, top, x, y);
                true
            }
            (Bitmap::Rgba(bottom), Bitmap::Rgba(top)) => {
                imageops::replace(bottom, top, x, y);
                true
            }
            (Bitmap::Rgba(bottom), Bitmap::Indexed(top)) => {
                let expanded = expand_indexed(top, palette, false);
                imageops::replace(bottom, &expanded, x, y);
                true
            }
            (Bitmap::Indexed(_), Bitmap::Rgba(_)) => false,
        }
    }

    /// Converts to RGBA. With `transparent_zero`, index 0 becomes fully transparent.
    pub fn to_rgba(&self, palette: &Palette, transparent_zero: bool) -> RgbaImage {
        match self {
            Bitmap::Indexed(img) => expand_indexed(img, palette, transparent_zero),
            Bitmap::Rgba(img) => img.clone(),
        }
    }
}

pub fn expand_indexed(img: &GrayImage, palette: &Palette, transparent_zero: bool) -> RgbaImage {
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let Luma([index]) = *img.get_pixel(x, y);
        palette.rgba(index, transparent_zero)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn canvas_size_is_capped() {
        assert_eq!(checked_canvas_size(512, 256, "map").unwrap(), (512, 256));
        assert!(checked_canvas_size(600 * 256, 600 * 256, "map").is_err());
        assert!(checked_canvas_size(u64::MAX, 2, "map").is_err());
        assert!(checked_canvas_size(1 << 33, 0, "map").is_err());
    }

    #[test]
    fn paste_clips_at_edges() {
        let mut canvas = Bitmap::new_indexed(4, 4);
        let top = Bitmap::Indexed(GrayImage::from_pixel(2, 2, Luma([7])));
        assert!(canvas.paste(&top, 3, -1, &Palette::grayscale()));
        assert_eq!(canvas.index_at(3, 0), Some(7));
        assert_eq!(canvas.index_at(2, 0), Some(0));
        assert_eq!(canvas.index_at(3, 1), Some(0));
    }

    #[test]
    fn paste_replaces_rather_than_blends() {
        let mut canvas = Bitmap::Indexed(GrayImage::from_pixel(2, 2, Luma([9])));
        let top = Bitmap::new_indexed(1, 1);
        canvas.paste(&top, 0, 0, &Palette::grayscale());
        assert_eq!(canvas.index_at(0, 0), Some(0));
    }

    #[test]
    fn indexed_on_rgba_is_expanded_opaque() {
        let mut canvas = Bitmap::new_rgba(2, 1);
        let top = Bitmap::new_indexed(1, 1);
        canvas.paste(&top, 1, 0, &Palette::grayscale());
        let rgba = canvas.as_rgba().unwrap();
        assert_eq!(*rgba.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*rgba.get_pixel(1, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn rgba_cannot_land_on_indexed() {
        let mut canvas = Bitmap::new_indexed(2, 2);
        assert!(!canvas.paste(&Bitmap::new_rgba(1, 1), 0, 0, &Palette::grayscale()));
    }
}
