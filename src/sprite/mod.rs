//! Sprite animation archive handling (`.anm`, `.an4`, `.an8`)
//!
//! An archive is a header, a frame table and, per frame, a set of pieces.
//! Each piece is a small grid of 8x8 tiles placed relative to the centre of
//! the frame canvas.

use std::io::Cursor;

pub mod model;
pub mod parser;
pub mod renderer;

pub use model::*;
pub use renderer::CanvasConfig;

use crate::{
    binary_utils::seek_to,
    bitmap::{checked_canvas_size, Bitmap},
    error::{DecodeError, DecodeWarning, Diagnostics},
    palette::{resolve_palette, Palette, PaletteSource, PALETTE_BYTES},
    variant::AnmFormat,
};

/// Chunk-size codes and the (width, height) in tiles they select
pub const CHUNK_SIZES: [(u16, (u32, u32)); 12] = [
    (0x0000, (1, 1)), // 8x8
    (0x0400, (2, 1)), // 16x8
    (0x0800, (1, 2)), // 8x16
    (0x1000, (2, 2)), // 16x16
    (0x1400, (4, 1)), // 32x8
    (0x1800, (1, 4)), // 8x32
    (0x2000, (4, 4)), // 32x32, the most common
    (0x2400, (4, 2)), // 32x16
    (0x2800, (2, 4)), // 16x32
    (0x3000, (8, 8)), // 64x64
    (0x3400, (8, 4)), // 64x32
    (0x3800, (4, 8)), // 32x64
];

/// Tile grid for a chunk-size code, `None` for codes outside the table.
pub fn resolve_chunk_grid(code: u16) -> Option<(u32, u32)> {
    CHUNK_SIZES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|&(_, grid)| grid)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteOptions {
    pub format: AnmFormat,
    /// Position of the archive inside a ROM image. `None` for a standalone
    /// file, which also enables the Didj embedded palette.
    pub base_offset: Option<u64>,
    pub canvas: CanvasConfig,
}

impl Default for SpriteOptions {
    fn default() -> Self {
        SpriteOptions {
            format: AnmFormat::Standard,
            base_offset: None,
            canvas: CanvasConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpriteFrame {
    pub record: FrameRecord,
    pub pieces: Vec<PieceRecord>,
    /// Indexed unless the canvas was configured for tile bounds
    pub image: Bitmap,
}

#[derive(Debug, Clone)]
pub struct SpriteArchive {
    pub format: AnmFormat,
    pub header: AnmHeader,
    pub frames: Vec<SpriteFrame>,
    pub palette: Palette,
    pub diagnostics: Diagnostics,
}

/// Decodes every frame of a sprite archive.
///
/// `palette` is the companion scene/palette data, ignored for Didj archives
/// that carry their own. Truncated headers or frame tables are errors; bad
/// pieces and tiles are skipped with a warning.
pub fn decode_sprite_archive(
    data: &[u8],
    palette: PaletteSource<'_>,
    options: &SpriteOptions,
) -> Result<SpriteArchive, DecodeError> {
    let variant = options.format.descriptor();
    let mut diagnostics = Diagnostics::default();
    checked_canvas_size(
        options.canvas.width as u64,
        options.canvas.height as u64,
        "Sprite frame",
    )?;
    let base = options.base_offset.unwrap_or(0);
    let standalone = options.base_offset.is_none();

    // Didj archives open with a palette that counts towards their offsets
    let (palette_source, header_start) = if variant.embedded_palette && standalone {
        tracing::info!("Didj format sprites, using internal palette");
        (PaletteSource::Embedded(data), PALETTE_BYTES as u64)
    } else {
        (palette, base)
    };
    let palette = resolve_palette(palette_source, options.canvas.scale, &mut diagnostics);

    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, header_start)?;
    let header = parser::parse_header(&mut cursor, variant, base)?;
    let records = parser::parse_frame_table(&mut cursor, variant, &header, base)?;
    tracing::debug!(
        format = %options.format,
        frames = records.len(),
        tile_data = header.tile_data_start,
        "parsed sprite archive header"
    );

    let mut frames = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let pieces = match parser::parse_piece_table(&mut cursor, variant, record) {
            Ok(table) => table.records(variant, &header),
            Err(e) => {
                diagnostics.warn(DecodeWarning::FrameUnreadable {
                    frame: idx,
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };

        let image = renderer::render_frame(
            data,
            idx,
            record,
            &pieces,
            &options.canvas,
            &palette,
            &mut diagnostics,
        );
        frames.push(SpriteFrame {
            record: *record,
            pieces,
            image,
        });
    }

    Ok(SpriteArchive {
        format: options.format,
        header,
        frames,
        palette,
        diagnostics,
    })
}
