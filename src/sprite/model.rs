//! Data structures for sprite animation archives

use serde::Serialize;

use crate::variant::{
    AnmVariant, ANM_8BPP_FLAGS, PIECE_8BPP, PIECE_CHUNK_MASK, PIECE_SECOND_PALETTE,
};

/// Archive header. Offsets are absolute positions in the decoded buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnmHeader {
    /// 0x0000/0x0F00 for 16-colour sets, 0x8000/0xFF00 for 256-colour sets
    pub flags: u16,
    /// a.k.a. wObjMax, most pieces used by a single frame
    pub max_pieces: u16,
    /// a.k.a. wSizeMax, most tile bytes used by a single frame
    pub max_bytes: u16,
    pub frame_total: u16,
    pub tile_data_start: u64,
    pub tile_data_size: u32,
}

impl AnmHeader {
    pub fn is_8bpp(&self) -> bool {
        ANM_8BPP_FLAGS.contains(&self.flags)
    }

    /// Where the next archive should start when ripping straight from a ROM.
    pub fn next_file_offset(&self) -> u64 {
        self.tile_data_start + self.tile_data_size as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRecord {
    /// Start of the frame's piece tables
    pub offset: u64,
    /// Start of the frame's tiles
    pub tile_data_start: u64,
    /// Bytes of tile data used by the frame; informational only
    pub byte_length: u32,
}

/// Per-frame piece tables, one vector per field. Index = piece number.
///
/// The archive stores every pivot X, then every pivot Y, then every flag
/// word, so each pass fills one vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceTable {
    pub pivot_x: Vec<i16>,
    pub pivot_y: Vec<i16>,
    pub flags: Vec<u16>,
}

impl PieceTable {
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn records(&self, variant: &AnmVariant, header: &AnmHeader) -> Vec<PieceRecord> {
        (0..self.len())
            .map(|i| {
                PieceRecord::decode(
                    self.pivot_x[i],
                    self.pivot_y[i],
                    self.flags[i],
                    variant,
                    header,
                )
            })
            .collect()
    }
}

/// One rectangular tile-grid chunk ("cut") of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PieceRecord {
    /// Offset of the piece's top-left corner from the canvas centre
    pub pivot_x: i16,
    pub pivot_y: i16,
    /// First tile, in 32-byte units from the frame's tile data
    pub tile_start: u16,
    pub chunk_code: u16,
    pub is_8bpp: bool,
    /// Use the bank after the selected one
    pub second_palette: bool,
}

impl PieceRecord {
    pub fn decode(
        pivot_x: i16,
        pivot_y: i16,
        flags: u16,
        variant: &AnmVariant,
        header: &AnmHeader,
    ) -> Self {
        let bits = variant.piece_bits(flags);
        PieceRecord {
            pivot_x,
            pivot_y,
            tile_start: variant.tile_id.extract(flags as u32) as u16,
            chunk_code: bits & PIECE_CHUNK_MASK,
            is_8bpp: bits & PIECE_8BPP != 0 || header.is_8bpp(),
            second_palette: bits & PIECE_SECOND_PALETTE != 0,
        }
    }
}
