//! # Metatile records
//!
//! A metatile is a 16x16 block made of four 8x8 tiles (TL, TR, BL, BR). Each
//! quadrant carries a tile id, a flip code and a palette bank packed into a
//! 16- or 32-bit word, laid out per variant.

use std::io::Cursor;

use serde::Serialize;

use crate::{
    binary_utils::{read_u16_le, read_u8, read_word_le, seek_to},
    error::DecodeError,
    variant::{FlipSource, TsVariant},
};

pub const QUADRANTS: usize = 4;
pub const METATILE_DIM: u32 = 16;
pub const METATILES_PER_ROW: u32 = 16;

pub const TS_FLAG_8BPP: u16 = 0x0001;
pub const TS_FLAG_COMPRESSED: u16 = 0x0004;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TsHeader {
    /// 0x0001 = 256-colour, 0x0004 = LZSS-compressed, 0x0010 = unknown
    pub flags: u16,
    pub metatile_count: u16,
    pub tile_count: u16,
    pub unknown: Option<u16>,
    /// Absolute position of the first metatile record
    pub records_start: u64,
    /// Absolute position of the flip side buffer, for variants that have one
    pub flip_buffer_start: Option<u64>,
    /// Absolute position of the tile data
    pub tile_data_start: u64,
}

impl TsHeader {
    pub fn is_8bpp(&self) -> bool {
        self.flags & TS_FLAG_8BPP != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & TS_FLAG_COMPRESSED != 0
    }

    /// Sheet height in pixels: one 16px row per 16 metatiles, rounded up.
    pub fn sheet_height(&self) -> u32 {
        (self.metatile_count as u32).div_ceil(METATILES_PER_ROW) * METATILE_DIM
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Quadrant {
    pub tile_id: u32,
    /// 0 none, 1 horizontal, 2 vertical, 3 both; anything else is invalid
    pub flip_code: u32,
    pub palette_bank: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetatileRecord {
    pub quadrants: [Quadrant; QUADRANTS],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetatileStream {
    pub records: Vec<MetatileRecord>,
    /// Quadrants decoded in the last record when the stream ended inside it
    pub last_record_quadrants: usize,
    /// The variant's end marker was hit before `metatile_count` records
    pub terminated_early: bool,
    /// Recovery layout switched on at this metatile
    pub delimiter_triggered_at: Option<usize>,
}

pub fn parse_header(
    cursor: &mut Cursor<&[u8]>,
    variant: &TsVariant,
) -> Result<TsHeader, DecodeError> {
    let flags = read_u16_le(cursor)?;
    let metatile_count = read_u16_le(cursor)?;
    let tile_count = read_u16_le(cursor)?;
    let unknown = if variant.has_fourth_field {
        Some(read_u16_le(cursor)?)
    } else {
        None
    };

    let records_start = cursor.position();
    let record_bytes = metatile_count as u64 * QUADRANTS as u64 * variant.word.bytes() as u64;
    let flip_buffer_start = match variant.flip {
        FlipSource::SideBuffer(_) => Some(records_start + record_bytes),
        FlipSource::Record(_) => None,
    };

    Ok(TsHeader {
        flags,
        metatile_count,
        tile_count,
        unknown,
        records_start,
        flip_buffer_start,
        tile_data_start: records_start + variant.record_block_bytes(metatile_count),
    })
}

/// Reads up to `metatile_count` records, stopping at the variant's end marker.
///
/// With `use_delimiter`, the first 16-bit word matching the variant's
/// delimiter switches every later quadrant to the wider id layout with flips
/// ignored. This is a recovery aid for archives holding more than 1024 tiles.
pub fn parse_metatiles(
    data: &[u8],
    variant: &TsVariant,
    header: &TsHeader,
    use_delimiter: bool,
) -> Result<MetatileStream, DecodeError> {
    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, header.records_start)?;

    // Separate position for the side buffer so neither stream loses its place
    let mut flip_cursor = Cursor::new(data);
    if let Some(start) = header.flip_buffer_start {
        seek_to(&mut flip_cursor, start)?;
    }

    let delimiter = variant.delimiter.filter(|_| use_delimiter);
    let mut stream = MetatileStream::default();

    'metatiles: for m in 0..header.metatile_count as usize {
        let mut record = MetatileRecord::default();

        for q in 0..QUADRANTS {
            let word = read_word_le(&mut cursor, variant.word.bytes())?;

            if let Some(d) = delimiter {
                if stream.delimiter_triggered_at.is_none() && word & d.trigger_mask == d.trigger {
                    tracing::info!(metatile = m, "tile delimiter found, ignoring flips from here");
                    stream.delimiter_triggered_at = Some(m);
                }
            }

            let (tile_id, flip_code) = match (delimiter, stream.delimiter_triggered_at) {
                (Some(d), Some(_)) => (d.tile_id.extract(word), 0),
                _ => {
                    let flip_code = match variant.flip {
                        FlipSource::Record(field) => field.extract(word),
                        FlipSource::SideBuffer(field) => field.extract(read_u8(&mut flip_cursor)? as u32),
                    };
                    (variant.tile_id.extract(word), flip_code)
                }
            };

            if variant.end_marker == Some(tile_id) {
                tracing::debug!(metatile = m, quadrant = q, "end of metatile stream");
                if q > 0 {
                    stream.records.push(record);
                    stream.last_record_quadrants = q;
                }
                stream.terminated_early = true;
                break 'metatiles;
            }

            record.quadrants[q] = Quadrant {
                tile_id,
                flip_code,
                palette_bank: variant.palette_bank.extract(word) as u8,
            };
        }

        stream.records.push(record);
        stream.last_record_quadrants = QUADRANTS;
    }

    Ok(stream)
}
