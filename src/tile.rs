//! # Tile rasterizer
//!
//! Turns raw 8x8 tile data into pixel blocks. 4bpp and 8bpp tiles become
//! indexed blocks; 16bpp (Leapster ARGB4444) tiles become RGBA blocks.

use image::{imageops, GrayImage, ImageBuffer, Luma, Pixel, Rgba, RgbaImage};
use serde::Serialize;

use crate::{
    bitmap::Bitmap,
    palette::{ChannelScale, COLOURS_PER_BANK},
};

pub const TILE_DIM: u32 = 8;
/// Tile-id unit used when addressing tile data, regardless of depth
pub const TILE_ADDRESS_UNIT: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColorDepth {
    /// Two pixels per byte, low nibble first, indices local to a palette bank
    Bpp4,
    /// One global palette index per byte
    Bpp8,
    /// ARGB4444 words with inverted alpha
    Bpp16,
}

impl ColorDepth {
    pub fn bytes_per_tile(self) -> usize {
        match self {
            ColorDepth::Bpp4 => 32,
            ColorDepth::Bpp8 => 64,
            ColorDepth::Bpp16 => 128,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Flip {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Flip {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Flip::None),
            1 => Some(Flip::Horizontal),
            2 => Some(Flip::Vertical),
            3 => Some(Flip::Both),
            _ => None,
        }
    }

    pub fn apply(self, block: Bitmap) -> Bitmap {
        match block {
            Bitmap::Indexed(img) => Bitmap::Indexed(flip_buffer(img, self)),
            Bitmap::Rgba(img) => Bitmap::Rgba(flip_buffer(img, self)),
        }
    }
}

fn flip_buffer<P>(img: ImageBuffer<P, Vec<P::Subpixel>>, flip: Flip) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    match flip {
        Flip::None => img,
        Flip::Horizontal => imageops::flip_horizontal(&img),
        Flip::Vertical => imageops::flip_vertical(&img),
        Flip::Both => imageops::flip_vertical(&imageops::flip_horizontal(&img)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub offset: usize,
    pub needed: usize,
    pub available: usize,
}

/// Byte offset of tile `tile_index` in a block of tiles of the given depth.
pub fn tile_offset(base: usize, tile_index: usize, depth: ColorDepth) -> usize {
    base + tile_index * depth.bytes_per_tile()
}

/// Rasterizes one tile starting `offset` bytes into `source`.
///
/// `palette_bank` only affects 4bpp tiles. Nibble 0 is forced to the global
/// transparent index 0 instead of the bank's own transparent slot.
pub fn rasterize(
    source: &[u8],
    offset: usize,
    depth: ColorDepth,
    palette_bank: u8,
    flip: Flip,
    scale: ChannelScale,
) -> Result<Bitmap, OutOfBounds> {
    let needed = depth.bytes_per_tile();
    let data = source
        .get(offset..offset.saturating_add(needed))
        .ok_or(OutOfBounds {
            offset,
            needed,
            available: source.len(),
        })?;

    let block = match depth {
        ColorDepth::Bpp4 => Bitmap::Indexed(decode_4bpp(data, palette_bank)),
        ColorDepth::Bpp8 => Bitmap::Indexed(decode_8bpp(data)),
        ColorDepth::Bpp16 => Bitmap::Rgba(decode_argb4444(data, scale)),
    };
    Ok(flip.apply(block))
}

fn decode_4bpp(data: &[u8], palette_bank: u8) -> GrayImage {
    let bank_base = (palette_bank & 0x0F) * COLOURS_PER_BANK as u8;
    let to_index = |nibble: u8| if nibble == 0 { 0 } else { nibble + bank_base };

    let mut pixels = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        pixels.push(to_index(byte & 0x0F));
        pixels.push(to_index(byte >> 4));
    }
    GrayImage::from_raw(TILE_DIM, TILE_DIM, pixels)
        .unwrap_or_else(|| GrayImage::new(TILE_DIM, TILE_DIM))
}

fn decode_8bpp(data: &[u8]) -> GrayImage {
    GrayImage::from_fn(TILE_DIM, TILE_DIM, |x, y| {
        Luma([data[(y * TILE_DIM + x) as usize]])
    })
}

fn decode_argb4444(data: &[u8], scale: ChannelScale) -> RgbaImage {
    RgbaImage::from_fn(TILE_DIM, TILE_DIM, |x, y| {
        let i = ((y * TILE_DIM + x) * 2) as usize;
        let word = u16::from_le_bytes([data[i], data[i + 1]]);
        let alpha = ((word >> 12) & 0x0F) as u8;
        Rgba([
            scale.expand4((word >> 8) as u8),
            scale.expand4((word >> 4) as u8),
            scale.expand4(word as u8),
            255 - alpha * 17,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_8bpp() -> Vec<u8> {
        (0..64u8).collect()
    }

    fn raster(data: &[u8], depth: ColorDepth, bank: u8, flip: Flip) -> Bitmap {
        rasterize(data, 0, depth, bank, flip, ChannelScale::Raw).unwrap()
    }

    #[test]
    fn nibbles_low_first() {
        let mut data = vec![0u8; 32];
        data[0] = 0x1F;
        let block = raster(&data, ColorDepth::Bpp4, 0, Flip::None);
        assert_eq!(block.index_at(0, 0), Some(15));
        assert_eq!(block.index_at(1, 0), Some(1));
    }

    #[test]
    fn zero_nibble_is_global_transparent() {
        let mut data = vec![0u8; 32];
        data[0] = 0xF0;
        for bank in [0, 3, 15] {
            let block = raster(&data, ColorDepth::Bpp4, bank, Flip::None);
            assert_eq!(block.index_at(0, 0), Some(0));
            assert_eq!(block.index_at(1, 0), Some(15 + bank * 16));
        }
    }

    #[test]
    fn eight_bpp_is_used_as_is() {
        let block = raster(&numbered_8bpp(), ColorDepth::Bpp8, 7, Flip::None);
        assert_eq!(block.index_at(0, 0), Some(0));
        assert_eq!(block.index_at(7, 0), Some(7));
        assert_eq!(block.index_at(0, 1), Some(8));
        assert_eq!(block.index_at(7, 7), Some(63));
    }

    #[test]
    fn argb4444_alpha_is_inverted() {
        let mut data = vec![0u8; 128];
        // a=0 (opaque), r=0xF, g=0x8, b=0x1
        data[0..2].copy_from_slice(&0x0F81u16.to_le_bytes());
        // a=0xF (transparent)
        data[2..4].copy_from_slice(&0xF000u16.to_le_bytes());
        let block = raster(&data, ColorDepth::Bpp16, 0, Flip::None);
        let img = block.as_rgba().unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgba([240, 128, 16, 255]));
        assert_eq!(img.get_pixel(1, 0)[3], 0);

        let normalized =
            rasterize(&data, 0, ColorDepth::Bpp16, 0, Flip::None, ChannelScale::Normalized).unwrap();
        let img = normalized.as_rgba().unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 136, 17, 255]));
    }

    #[test]
    fn flip_both_is_horizontal_then_vertical() {
        let data = numbered_8bpp();
        let both = raster(&data, ColorDepth::Bpp8, 0, Flip::Both);
        let composed = Flip::Vertical.apply(raster(&data, ColorDepth::Bpp8, 0, Flip::Horizontal));
        assert_eq!(both, composed);
        assert_eq!(both.index_at(0, 0), Some(63));
    }

    #[test]
    fn flips_are_involutions() {
        let original = raster(&numbered_8bpp(), ColorDepth::Bpp8, 0, Flip::None);
        for flip in [Flip::None, Flip::Horizontal, Flip::Vertical, Flip::Both] {
            assert_eq!(flip.apply(flip.apply(original.clone())), original);
        }
        let h = Flip::Horizontal.apply(original.clone());
        assert_eq!(h.index_at(0, 0), Some(7));
        let v = Flip::Vertical.apply(original);
        assert_eq!(v.index_at(0, 0), Some(56));
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(Flip::from_code(3), Some(Flip::Both));
        assert_eq!(Flip::from_code(4), None);
    }

    #[test]
    fn short_source_is_reported() {
        let data = vec![0u8; 40];
        let err = rasterize(&data, 32, ColorDepth::Bpp4, 0, Flip::None, ChannelScale::Raw)
            .unwrap_err();
        assert_eq!(err.available, 40);
        assert_eq!(tile_offset(0x100, 3, ColorDepth::Bpp8), 0x100 + 192);
    }
}
