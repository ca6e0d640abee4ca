//! # Palettes
//!
//! WayForward archives store colours as 256 little-endian RGB555 words: red in
//! bits 0-4, green in bits 5-9 and blue in bits 10-14. Each run of 16 entries
//! is one palette bank whose first colour is the transparent slot.

use std::io::{self, Cursor};

use image::Rgba;
use serde::Serialize;

use crate::{
    binary_utils::read_u16_le,
    error::{DecodeWarning, Diagnostics},
};

pub const PALETTE_COLOURS: usize = 256;
pub const COLOURS_PER_BANK: usize = 16;
/// Size of a full RGB555 palette block
pub const PALETTE_BYTES: usize = PALETTE_COLOURS * 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// How 5-bit and 4-bit hardware channels are widened to 8 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ChannelScale {
    /// Plain shift: 5-bit channels top out at 248, 4-bit ones at 240
    #[default]
    Raw,
    /// Stretched to reach 255, as most emulators display them
    Normalized,
}

impl ChannelScale {
    pub fn expand5(self, channel: u8) -> u8 {
        let raw = (channel & 0x1F) as u16 * 8;
        match self {
            ChannelScale::Raw => raw as u8,
            ChannelScale::Normalized => (raw + (raw + 1) / 32) as u8,
        }
    }

    pub fn expand4(self, nibble: u8) -> u8 {
        let nibble = nibble & 0x0F;
        match self {
            ChannelScale::Raw => nibble * 16,
            ChannelScale::Normalized => nibble * 17,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub colours: [Rgb; PALETTE_COLOURS],
}

impl Default for Palette {
    fn default() -> Self {
        Palette::grayscale()
    }
}

impl Palette {
    /// Identity ramp used when no palette source is available.
    pub fn grayscale() -> Self {
        let mut colours = [Rgb::default(); PALETTE_COLOURS];
        for (i, colour) in colours.iter_mut().enumerate() {
            let v = i as u8;
            *colour = Rgb { r: v, g: v, b: v };
        }
        Palette { colours }
    }

    pub fn from_rgb555(data: &[u8], scale: ChannelScale) -> io::Result<Self> {
        if data.len() < PALETTE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Palette data too short: {} < {}", data.len(), PALETTE_BYTES),
            ));
        }

        let mut cursor = Cursor::new(data);
        let mut colours = [Rgb::default(); PALETTE_COLOURS];
        for colour in &mut colours {
            *colour = decode_rgb555(read_u16_le(&mut cursor)?, scale);
        }

        Ok(Palette { colours })
    }

    pub fn rgba(&self, index: u8, transparent_zero: bool) -> Rgba<u8> {
        if transparent_zero && index == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let c = self.colours[index as usize];
        Rgba([c.r, c.g, c.b, 255])
    }
}

pub fn decode_rgb555(word: u16, scale: ChannelScale) -> Rgb {
    Rgb {
        r: scale.expand5((word & 0x001F) as u8),
        g: scale.expand5(((word & 0x03E0) >> 5) as u8),
        b: scale.expand5(((word & 0x7C00) >> 10) as u8),
    }
}

/// Where a decoder should take its colours from.
#[derive(Clone, Copy, Debug)]
pub enum PaletteSource<'a> {
    /// Block at the very start of the archive itself (Didj)
    Embedded(&'a [u8]),
    /// Companion `.pal` / `.scn` file, starting `offset` bytes in
    Companion { data: &'a [u8], offset: usize },
    None,
}

/// Builds the palette for one run. Never fails: unusable sources degrade to
/// [`Palette::grayscale`] with a warning.
pub fn resolve_palette(
    source: PaletteSource<'_>,
    scale: ChannelScale,
    diagnostics: &mut Diagnostics,
) -> Palette {
    let block = match source {
        PaletteSource::Embedded(data) => Ok(data),
        PaletteSource::Companion { data, offset } => data.get(offset..).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Palette offset {:#x} past end of file ({:#x})", offset, data.len()),
            )
        }),
        PaletteSource::None => {
            tracing::info!("No palette source, defaulting to grayscale");
            return Palette::grayscale();
        }
    };

    match block.and_then(|data| Palette::from_rgb555(data, scale)) {
        Ok(palette) => palette,
        Err(e) => {
            diagnostics.warn(DecodeWarning::PaletteFallback {
                reason: e.to_string(),
            });
            Palette::grayscale()
        }
    }
}
