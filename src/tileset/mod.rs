//! Tileset handling (`.ts4`, `.ts8`)
//!
//! A tileset is a list of 16x16 metatiles, each built from four 8x8 tiles
//! with a flip and a palette bank, followed by the raw tile data. Decoding
//! produces the metatile sheet that layers crop their blocks from.

use std::io::Cursor;

pub mod parser;
pub mod render;

pub use parser::{MetatileRecord, Quadrant, TsHeader};
pub use render::{TileSheets, TileSource, SHEET_WIDTH};

use crate::{
    binary_utils::seek_to,
    bitmap::Bitmap,
    error::{DecodeError, DecodeWarning, Diagnostics},
    palette::{resolve_palette, ChannelScale, Palette, PaletteSource, PALETTE_BYTES},
    tile::ColorDepth,
    variant::{TsFormat, TsVariant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilesetOptions {
    pub format: TsFormat,
    /// Position of the archive inside a ROM image. `None` for a standalone
    /// file, which also enables the Didj embedded palette.
    pub base_offset: Option<u64>,
    pub scale: ChannelScale,
    /// Switch to the wide tile id layout after the first delimiter word
    pub tile_delimiter: bool,
}

impl Default for TilesetOptions {
    fn default() -> Self {
        TilesetOptions {
            format: TsFormat::Gba,
            base_offset: None,
            scale: ChannelScale::Raw,
            tile_delimiter: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetatileSheet {
    pub format: TsFormat,
    pub header: TsHeader,
    pub depth: ColorDepth,
    pub metatiles: Vec<MetatileRecord>,
    /// The stream hit its end marker before `metatile_count` records
    pub terminated_early: bool,
    /// 256px wide; indexed for paletted tile data, RGBA otherwise
    pub image: Bitmap,
    pub palette: Palette,
    pub diagnostics: Diagnostics,
}

impl MetatileSheet {
    /// Where the next archive in a ROM image most likely starts.
    pub fn next_file_offset(&self) -> u64 {
        self.header.tile_data_start + self.header.tile_count as u64 * self.depth.bytes_per_tile() as u64
    }
}

/// Storage depth of the tile data, from the header flags.
pub fn tile_depth(variant: &TsVariant, header: &TsHeader) -> ColorDepth {
    match (header.is_8bpp(), variant.uses_palette) {
        (false, _) => ColorDepth::Bpp4,
        (true, true) => ColorDepth::Bpp8,
        (true, false) => ColorDepth::Bpp16,
    }
}

fn embeds_palette(variant: &TsVariant, options: &TilesetOptions) -> bool {
    variant.embedded_palette && options.base_offset.is_none()
}

fn header_start(variant: &TsVariant, options: &TilesetOptions) -> u64 {
    if embeds_palette(variant, options) {
        PALETTE_BYTES as u64
    } else {
        options.base_offset.unwrap_or(0)
    }
}

/// Reads only the header, e.g. to learn the depth before choosing tile sheets.
pub fn read_header(data: &[u8], options: &TilesetOptions) -> Result<TsHeader, DecodeError> {
    let variant = options.format.descriptor();
    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, header_start(variant, options))?;
    parser::parse_header(&mut cursor, variant)
}

/// Decodes a tileset into its metatile sheet.
///
/// `palette` is the companion palette/scene data, ignored for Didj archives
/// that carry their own and for Leapster true-colour tiles. With
/// [`TileSource::Sheets`] the archive's own tile data is not read.
pub fn decode_tileset(
    data: &[u8],
    palette: PaletteSource<'_>,
    tiles: TileSource<'_>,
    options: &TilesetOptions,
) -> Result<MetatileSheet, DecodeError> {
    let variant = options.format.descriptor();
    let mut diagnostics = Diagnostics::default();

    let palette_source = if embeds_palette(variant, options) {
        tracing::info!("Didj format tileset, using internal palette");
        PaletteSource::Embedded(data)
    } else if !variant.uses_palette {
        PaletteSource::None
    } else {
        palette
    };
    let palette = resolve_palette(palette_source, options.scale, &mut diagnostics);

    let header = read_header(data, options)?;
    let depth = tile_depth(variant, &header);
    tracing::debug!(
        format = %options.format,
        metatiles = header.metatile_count,
        tiles = header.tile_count,
        ?depth,
        "parsed tileset header"
    );

    if header.is_compressed() {
        diagnostics.warn(DecodeWarning::CompressedData { flags: header.flags });
    }
    if let Some(addressable) = variant.addressable_tiles {
        if header.tile_count as u32 > addressable {
            diagnostics.warn(DecodeWarning::TileRangeExceeded {
                tile_count: header.tile_count,
                addressable,
            });
        }
    }

    let stream = parser::parse_metatiles(data, variant, &header, options.tile_delimiter)?;

    let ctx = render::SheetContext {
        data,
        header: &header,
        tiles,
        depth,
        palette: &palette,
        scale: options.scale,
    };
    let image = render::render_sheet(&ctx, &stream.records, stream.last_record_quadrants, &mut diagnostics);

    Ok(MetatileSheet {
        format: options.format,
        header,
        depth,
        metatiles: stream.records,
        terminated_early: stream.terminated_early,
        image,
        palette,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gba_archive(flags: u16, tile_count: u16, words: &[u16], tile_bytes: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for h in [flags, (words.len() / 4) as u16, tile_count, 0] {
            data.extend_from_slice(&h.to_le_bytes());
        }
        for w in words {
            data.extend_from_slice(&w.to_le_bytes());
        }
        data.extend_from_slice(tile_bytes);
        data
    }

    #[test]
    fn overflowing_gba_tileset_is_flagged() {
        let data = gba_archive(0, 1100, &[0, 0, 0, 0], &[0; 32]);
        let sheet = decode_tileset(&data, PaletteSource::None, TileSource::Archive, &TilesetOptions::default()).unwrap();
        assert!(sheet.diagnostics.tile_range_exceeded);
    }

    #[test]
    fn compressed_flag_warns() {
        let data = gba_archive(0x0004, 1, &[0, 0, 0, 0], &[0; 32]);
        let sheet = decode_tileset(&data, PaletteSource::None, TileSource::Archive, &TilesetOptions::default()).unwrap();
        assert!(sheet
            .diagnostics
            .warnings
            .contains(&DecodeWarning::CompressedData { flags: 0x0004 }));
    }

    #[test]
    fn single_tile_fills_all_quadrants() {
        let data = gba_archive(0, 1, &[0, 0, 0, 0], &[0x11; 32]);
        let sheet = decode_tileset(&data, PaletteSource::None, TileSource::Archive, &TilesetOptions::default()).unwrap();
        assert!(sheet.diagnostics.is_clean());
        assert_eq!(sheet.image.dimensions(), (256, 16));
        assert_eq!(sheet.image.index_at(0, 0), Some(1));
        assert_eq!(sheet.image.index_at(15, 15), Some(1));
        assert_eq!(sheet.image.index_at(16, 0), Some(0));
    }

    #[test]
    fn invalid_leapster_flip_leaves_quadrant_blank() {
        let mut data = Vec::new();
        for h in [0u16, 1, 1, 0] {
            data.extend_from_slice(&h.to_le_bytes());
        }
        for id in [0u16; 4] {
            data.extend_from_slice(&id.to_le_bytes());
        }
        data.extend_from_slice(&[0x00, 0x10, 0x00, 0x00]);
        data.extend_from_slice(&[0x33; 32]);

        let options = TilesetOptions {
            format: TsFormat::Leapster,
            ..TilesetOptions::default()
        };
        let sheet = decode_tileset(&data, PaletteSource::None, TileSource::Archive, &options).unwrap();
        assert_eq!(
            sheet.diagnostics.warnings,
            vec![DecodeWarning::UnknownFlip { metatile: 0, quadrant: 1, code: 4 }]
        );
        assert_eq!(sheet.image.index_at(0, 0), Some(3));
        assert_eq!(sheet.image.index_at(8, 0), Some(0));
    }

    #[test]
    fn missing_tile_data_warns_and_continues() {
        let data = gba_archive(0, 1, &[0, 5, 0, 0], &[0x22; 32]);
        let sheet = decode_tileset(&data, PaletteSource::None, TileSource::Archive, &TilesetOptions::default()).unwrap();
        assert_eq!(sheet.diagnostics.warnings.len(), 1);
        assert_eq!(sheet.image.index_at(0, 8), Some(2));
        assert_eq!(sheet.image.index_at(8, 0), Some(0));
    }

    #[test]
    fn next_file_offset_skips_tile_data() {
        let data = gba_archive(0x0001, 2, &[0, 1, 0, 1], &[0; 128]);
        let sheet = decode_tileset(&data, PaletteSource::None, TileSource::Archive, &TilesetOptions::default()).unwrap();
        assert_eq!(sheet.depth, ColorDepth::Bpp8);
        assert_eq!(sheet.next_file_offset(), 16 + 128);
    }
}
