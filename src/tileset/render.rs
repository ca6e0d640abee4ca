//! Metatile sheet assembly
//!
//! Metatiles are laid out 16 per row on a 256px-wide sheet, each quadrant
//! pasted at its (x, y) within the 16x16 block.

use image::{imageops, RgbaImage};

use crate::{
    bitmap::Bitmap,
    error::{DecodeWarning, Diagnostics},
    palette::{ChannelScale, Palette},
    tile::{rasterize, tile_offset, ColorDepth, Flip, TILE_DIM},
    tileset::parser::{MetatileRecord, Quadrant, TsHeader, METATILES_PER_ROW, METATILE_DIM},
};

pub const SHEET_WIDTH: u32 = METATILE_DIM * METATILES_PER_ROW;
pub const PALETTE_BANKS: usize = 16;
/// Tiles per row on a pre-rendered tile sheet (128px)
pub const TILE_SHEET_COLUMNS: u32 = 16;

/// Pre-rendered tile sheets. 256-colour tilesets read `single`, 16-colour
/// ones read the sheet of each quadrant's palette bank.
#[derive(Debug, Clone, Default)]
pub struct TileSheets {
    pub single: Option<RgbaImage>,
    pub banks: [Option<RgbaImage>; PALETTE_BANKS],
}

impl TileSheets {
    pub fn single(sheet: RgbaImage) -> Self {
        TileSheets {
            single: Some(sheet),
            ..TileSheets::default()
        }
    }

    pub fn banked(banks: [Option<RgbaImage>; PALETTE_BANKS]) -> Self {
        TileSheets { single: None, banks }
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_none() && self.banks.iter().all(Option::is_none)
    }

    fn sheet_for(&self, bank: u8, is_8bpp: bool) -> Option<&RgbaImage> {
        if is_8bpp {
            self.single.as_ref()
        } else {
            self.banks[bank as usize & 0x0F].as_ref()
        }
    }
}

/// Where quadrant pixels come from.
#[derive(Debug, Clone, Copy)]
pub enum TileSource<'a> {
    /// Tile data stored in the archive after the records
    Archive,
    /// Tiles cropped from already rendered sheets
    Sheets(&'a TileSheets),
}

pub struct SheetContext<'a> {
    pub data: &'a [u8],
    pub header: &'a TsHeader,
    pub tiles: TileSource<'a>,
    pub depth: ColorDepth,
    pub palette: &'a Palette,
    pub scale: ChannelScale,
}

/// Position of quadrant `q` of metatile `m` on the sheet.
pub fn quadrant_position(metatile: usize, quadrant: usize) -> (u32, u32) {
    let m = metatile as u32;
    let q = quadrant as u32;
    (
        (m % METATILES_PER_ROW) * METATILE_DIM + (q % 2) * TILE_DIM,
        (m / METATILES_PER_ROW) * METATILE_DIM + (q / 2) * TILE_DIM,
    )
}

pub fn render_sheet(
    ctx: &SheetContext<'_>,
    records: &[MetatileRecord],
    quadrants_in_last: usize,
    diagnostics: &mut Diagnostics,
) -> Bitmap {
    let height = ctx.header.sheet_height();
    let mut sheet = match ctx.tiles {
        TileSource::Archive if ctx.depth != ColorDepth::Bpp16 => Bitmap::new_indexed(SHEET_WIDTH, height),
        _ => Bitmap::new_rgba(SHEET_WIDTH, height),
    };

    for (m, record) in records.iter().enumerate() {
        let count = if m + 1 == records.len() {
            quadrants_in_last
        } else {
            record.quadrants.len()
        };

        for (q, quadrant) in record.quadrants.iter().take(count).enumerate() {
            let Some(flip) = Flip::from_code(quadrant.flip_code) else {
                diagnostics.warn(DecodeWarning::UnknownFlip {
                    metatile: m,
                    quadrant: q,
                    code: quadrant.flip_code,
                });
                continue;
            };

            let tile = match ctx.tiles {
                TileSource::Archive => archive_tile(ctx, quadrant, flip, diagnostics),
                TileSource::Sheets(sheets) => sheet_tile(ctx, sheets, quadrant, flip, diagnostics),
            };

            if let Some(tile) = tile {
                let (x, y) = quadrant_position(m, q);
                sheet.paste(&tile, x as i64, y as i64, ctx.palette);
            }
        }
    }

    sheet
}

fn archive_tile(
    ctx: &SheetContext<'_>,
    quadrant: &Quadrant,
    flip: Flip,
    diagnostics: &mut Diagnostics,
) -> Option<Bitmap> {
    let offset = tile_offset(ctx.header.tile_data_start as usize, quadrant.tile_id as usize, ctx.depth);
    match rasterize(ctx.data, offset, ctx.depth, quadrant.palette_bank, flip, ctx.scale) {
        Ok(tile) => Some(tile),
        Err(e) => {
            diagnostics.warn(DecodeWarning::TileOutOfRange {
                offset: e.offset as u64,
            });
            None
        }
    }
}

fn sheet_tile(
    ctx: &SheetContext<'_>,
    sheets: &TileSheets,
    quadrant: &Quadrant,
    flip: Flip,
    diagnostics: &mut Diagnostics,
) -> Option<Bitmap> {
    let Some(sheet) = sheets.sheet_for(quadrant.palette_bank, ctx.header.is_8bpp()) else {
        diagnostics.warn(DecodeWarning::MissingSheet {
            palette_bank: quadrant.palette_bank,
        });
        return None;
    };

    let x = (quadrant.tile_id % TILE_SHEET_COLUMNS) * TILE_DIM;
    let y = (quadrant.tile_id / TILE_SHEET_COLUMNS) * TILE_DIM;
    if x + TILE_DIM > sheet.width() || y + TILE_DIM > sheet.height() {
        diagnostics.warn(DecodeWarning::SheetTileOutOfRange {
            tile_id: quadrant.tile_id,
        });
        return None;
    }

    let tile = imageops::crop_imm(sheet, x, y, TILE_DIM, TILE_DIM).to_image();
    Some(flip.apply(Bitmap::Rgba(tile)))
}
