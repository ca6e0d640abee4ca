//! # Layer archive layout
//!
//! Header, then a width*height stream of screen ids (one per map slot), then
//! variant padding and unknown blocks, then 256 metatile ids per unique
//! screen.

use std::io::Cursor;

use serde::Serialize;

use crate::{
    binary_utils::{align_to, read_u16_le, skip},
    error::{DecodeError, DecodeWarning, Diagnostics},
    variant::{metatile_id_mask, LayerField, LyrVariant},
};

/// Metatiles per screen side; a screen is 16x16 metatiles (256x256 px)
pub const SCREEN_METATILES: u32 = 16;
pub const METATILES_PER_SCREEN: usize = (SCREEN_METATILES * SCREEN_METATILES) as usize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerHeader {
    /// Selects the metatile id mask, see [`metatile_id_mask`]
    pub flags: u16,
    pub width: u16,
    pub height: u16,
    pub screen_count: u16,
    pub types_id: u16,
    pub tileset_id: u16,
    /// Record counts of the three unknown blocks (long headers only)
    pub unknown_counts: [u16; 3],
    /// Remaining fields in file order
    pub unknown: Vec<u16>,
}

impl LayerHeader {
    pub fn slot_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn id_mask(&self) -> u16 {
        metatile_id_mask(self.flags)
    }
}

pub fn parse_header(
    cursor: &mut Cursor<&[u8]>,
    variant: &LyrVariant,
) -> Result<LayerHeader, DecodeError> {
    let mut header = LayerHeader {
        flags: read_u16_le(cursor)?,
        width: read_u16_le(cursor)?,
        height: read_u16_le(cursor)?,
        screen_count: read_u16_le(cursor)?,
        ..LayerHeader::default()
    };

    for field in variant.extra_fields {
        let value = read_u16_le(cursor)?;
        match field {
            LayerField::Unknown => header.unknown.push(value),
            LayerField::TypesId => header.types_id = value,
            LayerField::TilesetId => header.tileset_id = value,
            LayerField::UnknownCountA => header.unknown_counts[0] = value,
            LayerField::UnknownCountB => header.unknown_counts[1] = value,
            LayerField::UnknownCountC => header.unknown_counts[2] = value,
        }
    }

    Ok(header)
}

/// Reads the width*height screen id stream at the cursor.
pub fn read_index_stream(
    cursor: &mut Cursor<&[u8]>,
    header: &LayerHeader,
) -> Result<Vec<u16>, DecodeError> {
    (0..header.slot_count())
        .map(|_| read_u16_le(cursor).map_err(DecodeError::from))
        .collect()
}

/// Moves from the end of the primary index stream to the first screen,
/// past alignment padding, discarded id streams and unknown blocks.
pub fn skip_to_screens(
    cursor: &mut Cursor<&[u8]>,
    variant: &LyrVariant,
    header: &LayerHeader,
    diagnostics: &mut Diagnostics,
) -> Result<(), DecodeError> {
    if let Some(alignment) = variant.index_alignment {
        let from = cursor.position();
        let padding = align_to(cursor, alignment)?;
        if padding > 0 {
            diagnostics.warn(DecodeWarning::Realigned {
                from,
                to: cursor.position(),
            });
        }
        debug_assert_eq!(cursor.position() % alignment, 0);
    }

    let stream_bytes = header.slot_count() as u64 * 2;
    skip(cursor, stream_bytes * variant.discard_index_streams as u64)?;

    if let Some(sizes) = variant.unknown_block_sizes {
        let block_bytes: u64 = header
            .unknown_counts
            .iter()
            .zip(sizes)
            .map(|(&count, size)| count as u64 * size)
            .sum();
        skip(cursor, block_bytes)?;
    }
    Ok(())
}

/// Reads `screen_count` screens of 256 metatile ids, masked per the header.
pub fn read_screens(
    cursor: &mut Cursor<&[u8]>,
    header: &LayerHeader,
) -> Result<Vec<Vec<u16>>, DecodeError> {
    let mask = header.id_mask();
    let mut screens = Vec::with_capacity(header.screen_count as usize);
    for _ in 0..header.screen_count {
        let ids = (0..METATILES_PER_SCREEN)
            .map(|_| read_u16_le(cursor).map(|id| id & mask))
            .collect::<Result<Vec<_>, _>>()?;
        screens.push(ids);
    }
    Ok(screens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::LyrFormat;

    fn words(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn short_headers_place_tileset_id_per_variant() {
        let data = words(&[0x20, 2, 1, 1, 9, 10, 11, 12]);

        let h0 = parse_header(&mut Cursor::new(&data[..]), LyrFormat::ScorpionKing.descriptor()).unwrap();
        assert_eq!((h0.types_id, h0.tileset_id), (10, 11));
        assert_eq!(h0.unknown, vec![9, 12]);

        let h1 = parse_header(&mut Cursor::new(&data[..]), LyrFormat::GbaEarly.descriptor()).unwrap();
        assert_eq!((h1.types_id, h1.tileset_id), (10, 12));
    }

    #[test]
    fn long_header_reads_block_counts() {
        let data = words(&[0x10, 3, 2, 4, 1, 2, 3, 40, 41, 42]);
        let header = parse_header(&mut Cursor::new(&data[..]), LyrFormat::Ds.descriptor()).unwrap();
        assert_eq!(header.unknown_counts, [1, 2, 3]);
        assert_eq!(header.types_id, 40);
        assert_eq!(header.tileset_id, 42);
        assert_eq!(header.slot_count(), 6);
        assert_eq!(header.id_mask(), 0x03FF);
    }

    #[test]
    fn scorpion_king_realigns_after_odd_stream() {
        // 16-byte header + 3 ids = 22 bytes, padded to 24
        let mut data = words(&[0, 3, 1, 0, 0, 0, 0, 0, 5, 6, 7]);
        data.extend_from_slice(&[0xEE, 0xEE]);
        let variant = LyrFormat::ScorpionKing.descriptor();
        let mut cursor = Cursor::new(&data[..]);
        let header = parse_header(&mut cursor, variant).unwrap();
        assert_eq!(read_index_stream(&mut cursor, &header).unwrap(), vec![5, 6, 7]);

        let mut diagnostics = Diagnostics::default();
        skip_to_screens(&mut cursor, variant, &header, &mut diagnostics).unwrap();
        assert_eq!(cursor.position(), 24);
        assert_eq!(
            diagnostics.warnings,
            vec![DecodeWarning::Realigned { from: 22, to: 24 }]
        );
    }

    #[test]
    fn ds_skips_extra_streams_and_blocks() {
        let header = LayerHeader {
            width: 2,
            height: 1,
            unknown_counts: [1, 1, 1],
            ..LayerHeader::default()
        };
        let data = vec![0u8; 100];
        let mut cursor = Cursor::new(&data[..]);
        let mut diagnostics = Diagnostics::default();
        skip_to_screens(&mut cursor, LyrFormat::Ds.descriptor(), &header, &mut diagnostics).unwrap();
        // two 4-byte streams + 20 + 8 + 16
        assert_eq!(cursor.position(), 52);
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn screen_ids_are_masked() {
        let header = LayerHeader {
            flags: 0x0010,
            screen_count: 1,
            ..LayerHeader::default()
        };
        let data = words(&[0xFFFF; METATILES_PER_SCREEN]);
        let screens = read_screens(&mut Cursor::new(&data[..]), &header).unwrap();
        assert!(screens[0].iter().all(|&id| id == 0x03FF));
    }
}
