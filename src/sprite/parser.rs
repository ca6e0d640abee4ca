//! Parser for sprite animation archives

use std::io::Cursor;

use crate::{
    binary_utils::{read_i16_le, read_u16_le, read_u32_le, seek_to, skip},
    error::DecodeError,
    sprite::model::{AnmHeader, FrameRecord, PieceTable},
    variant::{AnmVariant, FrameTableLayout},
};

/// Reads the header at the cursor. `base` is the archive's position in the
/// buffer; the tile data pointer is relative to it.
pub fn parse_header(
    cursor: &mut Cursor<&[u8]>,
    variant: &AnmVariant,
    base: u64,
) -> Result<AnmHeader, DecodeError> {
    let flags = read_u16_le(cursor)?;
    let max_pieces = read_u16_le(cursor)?;
    let max_bytes = read_u16_le(cursor)?;
    let frame_total = read_u16_le(cursor)?;

    // The Scorpion King has two extra u32s here
    skip(cursor, variant.header_padding)?;

    let tile_data_start = read_u32_le(cursor)? as u64 + base;
    let tile_data_size = read_u32_le(cursor)?;

    Ok(AnmHeader {
        flags,
        max_pieces,
        max_bytes,
        frame_total,
        tile_data_start,
        tile_data_size,
    })
}

/// Reads the frame table that follows the header.
pub fn parse_frame_table(
    cursor: &mut Cursor<&[u8]>,
    variant: &AnmVariant,
    header: &AnmHeader,
    base: u64,
) -> Result<Vec<FrameRecord>, DecodeError> {
    let count = header.frame_total as usize;
    let mut frames = Vec::with_capacity(count);

    match variant.frame_table {
        FrameTableLayout::Interleaved => {
            for _ in 0..count {
                let offset = read_u32_le(cursor)? as u64 + base;
                let tile_data_start = read_u32_le(cursor)? as u64 + header.tile_data_start;
                let byte_length = read_u32_le(cursor)?;
                frames.push(FrameRecord {
                    offset,
                    tile_data_start,
                    byte_length,
                });
            }
        }
        FrameTableLayout::Separated => {
            let mut offsets = Vec::with_capacity(count);
            for _ in 0..count {
                offsets.push(read_u32_le(cursor)? as u64 + base);
            }
            let mut starts = Vec::with_capacity(count);
            for _ in 0..count {
                starts.push(read_u32_le(cursor)? as u64 + header.tile_data_start);
            }
            for (offset, tile_data_start) in offsets.into_iter().zip(starts) {
                frames.push(FrameRecord {
                    offset,
                    tile_data_start,
                    byte_length: read_u16_le(cursor)? as u32,
                });
            }
        }
    }

    Ok(frames)
}

/// Reads a frame's piece tables: count, all pivot X, all pivot Y, all flags.
pub fn parse_piece_table(
    cursor: &mut Cursor<&[u8]>,
    variant: &AnmVariant,
    frame: &FrameRecord,
) -> Result<PieceTable, DecodeError> {
    seek_to(cursor, frame.offset)?;
    // Bounding boxes, unused for assembly
    skip(cursor, variant.frame_padding)?;

    let count = read_u16_le(cursor)? as usize;
    let mut table = PieceTable {
        pivot_x: Vec::with_capacity(count),
        pivot_y: Vec::with_capacity(count),
        flags: Vec::with_capacity(count),
    };

    for _ in 0..count {
        table.pivot_x.push(read_i16_le(cursor)?);
    }
    for _ in 0..count {
        table.pivot_y.push(read_i16_le(cursor)?);
    }
    for _ in 0..count {
        table.flags.push(read_u16_le(cursor)?);
    }

    Ok(table)
}
