//! Renderer for sprite animation frames
//!
//! Pieces are assembled tile by tile and pasted onto a fixed-size canvas with
//! their pivot measured from the canvas centre.

use crate::{
    bitmap::Bitmap,
    error::{DecodeWarning, Diagnostics},
    palette::{ChannelScale, Palette},
    sprite::{
        model::{FrameRecord, PieceRecord},
        resolve_chunk_grid,
    },
    tile::{rasterize, tile_offset, ColorDepth, Flip, TILE_ADDRESS_UNIT, TILE_DIM},
};

/// Canvas settings for one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Palette bank (0-15) used by 4bpp pieces
    pub palette_num: u8,
    /// Draw on a transparent RGBA canvas so tile edges stay visible
    pub tile_bounds: bool,
    pub scale: ChannelScale,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            width: 256,
            height: 256,
            palette_num: 0,
            tile_bounds: false,
            scale: ChannelScale::Raw,
        }
    }
}

impl CanvasConfig {
    fn bank_for(&self, piece: &PieceRecord) -> u8 {
        if piece.second_palette {
            ((self.palette_num & 0x0F) + 1) & 0x0F
        } else {
            self.palette_num & 0x0F
        }
    }
}

/// Composites every piece of one frame.
pub fn render_frame(
    data: &[u8],
    frame_idx: usize,
    frame: &FrameRecord,
    pieces: &[PieceRecord],
    config: &CanvasConfig,
    palette: &Palette,
    diagnostics: &mut Diagnostics,
) -> Bitmap {
    let mut canvas = if config.tile_bounds {
        Bitmap::new_rgba(config.width, config.height)
    } else {
        Bitmap::new_indexed(config.width, config.height)
    };

    for (piece_idx, piece) in pieces.iter().enumerate() {
        let Some((grid_w, grid_h)) = resolve_chunk_grid(piece.chunk_code) else {
            diagnostics.warn(DecodeWarning::UnknownChunkSize {
                frame: frame_idx,
                piece: piece_idx,
                code: piece.chunk_code,
            });
            continue;
        };

        let piece_img = render_piece(
            data,
            frame,
            piece,
            (grid_w, grid_h),
            config,
            palette,
            diagnostics,
        );

        let x = piece.pivot_x as i64 + (config.width / 2) as i64;
        let y = piece.pivot_y as i64 + (config.height / 2) as i64;
        canvas.paste(&piece_img, x, y, palette);
    }

    canvas
}

/// Lays a piece's tiles out row-major, reading them back to back.
fn render_piece(
    data: &[u8],
    frame: &FrameRecord,
    piece: &PieceRecord,
    (grid_w, grid_h): (u32, u32),
    config: &CanvasConfig,
    palette: &Palette,
    diagnostics: &mut Diagnostics,
) -> Bitmap {
    let depth = if piece.is_8bpp {
        ColorDepth::Bpp8
    } else {
        ColorDepth::Bpp4
    };
    let bank = config.bank_for(piece);
    let start = frame.tile_data_start as usize + piece.tile_start as usize * TILE_ADDRESS_UNIT;

    let mut piece_img = Bitmap::new_indexed(grid_w * TILE_DIM, grid_h * TILE_DIM);
    for t in 0..grid_w * grid_h {
        let offset = tile_offset(start, t as usize, depth);
        match rasterize(data, offset, depth, bank, Flip::None, config.scale) {
            Ok(tile) => {
                let x = (t % grid_w) * TILE_DIM;
                let y = (t / grid_w) * TILE_DIM;
                piece_img.paste(&tile, x as i64, y as i64, palette);
            }
            Err(e) => {
                // later tiles of the piece sit further along, so stop here
                diagnostics.warn(DecodeWarning::TileOutOfRange {
                    offset: e.offset as u64,
                });
                break;
            }
        }
    }
    piece_img
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(second_palette: bool) -> PieceRecord {
        PieceRecord {
            pivot_x: 0,
            pivot_y: 0,
            tile_start: 0,
            chunk_code: 0,
            is_8bpp: false,
            second_palette,
        }
    }

    #[test]
    fn second_palette_wraps_for_any_bank_number() {
        for (palette_num, first, second) in [(0u8, 0u8, 1u8), (14, 14, 15), (15, 15, 0), (255, 15, 0), (16, 0, 1)] {
            let config = CanvasConfig {
                palette_num,
                ..CanvasConfig::default()
            };
            assert_eq!(config.bank_for(&piece(false)), first, "palette {}", palette_num);
            assert_eq!(config.bank_for(&piece(true)), second, "palette {}", palette_num);
        }
    }
}
