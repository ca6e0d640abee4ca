//! # Format variants
//!
//! Every per-game difference between the archive layouts lives in the const
//! tables below. Decoders take a descriptor reference and never look at the
//! raw format number, so adding a variant means adding one table entry.
//!
//! Numbering follows the order the formats were identified, not release
//! order. Each family (ANM, TS, LYR) has its own numbering.

use std::fmt;

use crate::error::DecodeError;

/// A masked, right-shifted sub-field of a record word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitField {
    pub mask: u32,
    pub shift: u32,
}

impl BitField {
    pub const fn new(mask: u32, shift: u32) -> Self {
        BitField { mask, shift }
    }

    /// A field that is absent from the record; always extracts 0.
    pub const NONE: BitField = BitField::new(0, 0);

    pub fn extract(self, word: u32) -> u32 {
        (word & self.mask) >> self.shift
    }
}

// ANM piece flag bits, after the variant's size bits have been shifted into place
pub const PIECE_CHUNK_MASK: u16 = 0x3C00;
pub const PIECE_SECOND_PALETTE: u16 = 0x4000;
pub const PIECE_8BPP: u16 = 0x8000;
/// Header flag values that mark a whole archive as 256-colour
pub const ANM_8BPP_FLAGS: [u16; 2] = [0x8000, 0xFF00];

/// Sprite animation archive formats (`.anm`, `.an4`, `.an8`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnmFormat {
    /// Most GBA titles and early DS titles (Shantae Advance, SpongeBob, ...)
    Standard = 0,
    /// The Scorpion King: Sword of Osiris
    ScorpionKing = 1,
    /// Rescue Heroes: Billy Blazes, Shantae Advance battle mode
    RescueHeroes = 2,
    /// Later DS titles (Contra 4, Aliens: Infestation, ...)
    DsExtended = 3,
    /// DS titles with larger frame headers (Shantae: Risky's Revenge, Thor, ...)
    DsLarge = 4,
    /// LeapFrog Didj
    Didj = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameTableLayout {
    /// One (offset, tile start, length) u32 triple per frame
    Interleaved,
    /// All u32 offsets, then all u32 tile starts, then all u16 lengths
    Separated,
}

#[derive(Debug, PartialEq, Eq)]
pub struct AnmVariant {
    pub name: &'static str,
    /// Bytes skipped between the frame count and the tile data pointer
    pub header_padding: u64,
    pub frame_table: FrameTableLayout,
    /// Bounding-box bytes skipped at the start of every frame
    pub frame_padding: u64,
    pub tile_id: BitField,
    /// Size/palette/depth bits of the piece flag word...
    pub piece_size_mask: u16,
    /// ...and how far left they move to line up with `PIECE_CHUNK_MASK`
    pub piece_size_shift: u32,
    /// Archive starts with a 0x200-byte RGB555 palette
    pub embedded_palette: bool,
}

const ANM_VARIANTS: [AnmVariant; 6] = [
    AnmVariant {
        name: "standard",
        header_padding: 0,
        frame_table: FrameTableLayout::Interleaved,
        frame_padding: 24,
        tile_id: BitField::new(0x03FF, 0),
        piece_size_mask: 0xFC00,
        piece_size_shift: 0,
        embedded_palette: false,
    },
    AnmVariant {
        name: "scorpion-king",
        header_padding: 8,
        frame_table: FrameTableLayout::Separated,
        frame_padding: 16,
        tile_id: BitField::new(0x00FF, 0),
        piece_size_mask: 0x1F00,
        piece_size_shift: 2,
        embedded_palette: false,
    },
    AnmVariant {
        name: "rescue-heroes",
        header_padding: 0,
        frame_table: FrameTableLayout::Interleaved,
        frame_padding: 24,
        tile_id: BitField::new(0x007F, 0),
        piece_size_mask: 0x0F80,
        piece_size_shift: 3,
        embedded_palette: false,
    },
    AnmVariant {
        name: "ds-extended",
        header_padding: 0,
        frame_table: FrameTableLayout::Interleaved,
        frame_padding: 32,
        tile_id: BitField::new(0x03FF, 0),
        piece_size_mask: 0xFC00,
        piece_size_shift: 0,
        embedded_palette: false,
    },
    AnmVariant {
        name: "ds-large",
        header_padding: 0,
        frame_table: FrameTableLayout::Interleaved,
        frame_padding: 56,
        tile_id: BitField::new(0x03FF, 0),
        piece_size_mask: 0xFC00,
        piece_size_shift: 0,
        embedded_palette: false,
    },
    AnmVariant {
        name: "didj",
        header_padding: 0,
        frame_table: FrameTableLayout::Interleaved,
        frame_padding: 32,
        tile_id: BitField::new(0x03FF, 0),
        piece_size_mask: 0xFC00,
        piece_size_shift: 0,
        embedded_palette: true,
    },
];

impl AnmFormat {
    pub fn descriptor(self) -> &'static AnmVariant {
        &ANM_VARIANTS[self as usize]
    }
}

impl AnmVariant {
    /// Moves the variant's size bits into the common 0xFC00 layout.
    pub fn piece_bits(&self, flags: u16) -> u16 {
        (((flags & self.piece_size_mask) as u32) << self.piece_size_shift) as u16
    }
}

impl TryFrom<u8> for AnmFormat {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => AnmFormat::Standard,
            1 => AnmFormat::ScorpionKing,
            2 => AnmFormat::RescueHeroes,
            3 => AnmFormat::DsExtended,
            4 => AnmFormat::DsLarge,
            5 => AnmFormat::Didj,
            _ => return Err(unknown_format("ANM", value, 5)),
        })
    }
}

/// Tileset formats (`.ts4`, `.ts8`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsFormat {
    /// Early GBA titles without the fourth header field
    GbaEarly = 0,
    Gba = 1,
    /// DS/DSi titles
    Ds = 2,
    /// LeapFrog Didj and Leapster Explorer
    Didj = 3,
    /// LeapFrog Leapster
    Leapster = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordWord {
    U16,
    U32,
}

impl RecordWord {
    pub fn bytes(self) -> usize {
        match self {
            RecordWord::U16 => 2,
            RecordWord::U32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipSource {
    /// Flip bits share the quadrant word
    Record(BitField),
    /// One byte per quadrant in a buffer after the record block
    SideBuffer(BitField),
}

/// Recovery layout for GBA tilesets that overflow the 10-bit tile id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileDelimiter {
    pub trigger_mask: u32,
    pub trigger: u32,
    /// Tile id field used once triggered; flips are ignored from then on
    pub tile_id: BitField,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TsVariant {
    pub name: &'static str,
    /// Header carries a fourth (unknown) u16
    pub has_fourth_field: bool,
    pub word: RecordWord,
    pub tile_id: BitField,
    pub flip: FlipSource,
    pub palette_bank: BitField,
    pub embedded_palette: bool,
    /// False for formats whose 8bpp flag means ARGB4444 true-colour tiles
    pub uses_palette: bool,
    /// Tile id that ends the metatile stream
    pub end_marker: Option<u32>,
    /// Tile count beyond which the archive cannot be addressed correctly
    pub addressable_tiles: Option<u32>,
    pub delimiter: Option<TileDelimiter>,
}

const GBA_DELIMITER: TileDelimiter = TileDelimiter {
    trigger_mask: 0x0FFF,
    trigger: 0x0400,
    tile_id: BitField::new(0x07FF, 0),
};

const TS_VARIANTS: [TsVariant; 5] = [
    TsVariant {
        name: "gba-early",
        has_fourth_field: false,
        word: RecordWord::U16,
        tile_id: BitField::new(0x03FF, 0),
        flip: FlipSource::Record(BitField::new(0x0C00, 10)),
        palette_bank: BitField::new(0xF000, 12),
        embedded_palette: false,
        uses_palette: true,
        end_marker: None,
        addressable_tiles: Some(1024),
        delimiter: Some(GBA_DELIMITER),
    },
    TsVariant {
        name: "gba",
        has_fourth_field: true,
        word: RecordWord::U16,
        tile_id: BitField::new(0x03FF, 0),
        flip: FlipSource::Record(BitField::new(0x0C00, 10)),
        palette_bank: BitField::new(0xF000, 12),
        embedded_palette: false,
        uses_palette: true,
        end_marker: None,
        addressable_tiles: Some(1024),
        delimiter: Some(GBA_DELIMITER),
    },
    TsVariant {
        name: "ds",
        has_fourth_field: true,
        word: RecordWord::U32,
        tile_id: BitField::new(0x0000_FFFF, 0),
        flip: FlipSource::Record(BitField::new(0x0C00_0000, 26)),
        palette_bank: BitField::new(0xF000_0000, 28),
        embedded_palette: false,
        uses_palette: true,
        end_marker: None,
        addressable_tiles: None,
        delimiter: None,
    },
    TsVariant {
        name: "didj",
        has_fourth_field: true,
        word: RecordWord::U32,
        tile_id: BitField::new(0x0000_FFFF, 0),
        flip: FlipSource::Record(BitField::new(0x0C00_0000, 26)),
        palette_bank: BitField::new(0xF000_0000, 28),
        embedded_palette: true,
        uses_palette: true,
        end_marker: Some(0xCCCC),
        addressable_tiles: None,
        delimiter: None,
    },
    TsVariant {
        name: "leapster",
        has_fourth_field: true,
        word: RecordWord::U16,
        tile_id: BitField::new(0xFFFF, 0),
        flip: FlipSource::SideBuffer(BitField::new(0xFF, 2)),
        palette_bank: BitField::NONE,
        embedded_palette: false,
        uses_palette: false,
        end_marker: None,
        addressable_tiles: None,
        delimiter: None,
    },
];

impl TsFormat {
    pub fn descriptor(self) -> &'static TsVariant {
        &TS_VARIANTS[self as usize]
    }
}

impl TsVariant {
    /// Bytes of metatile records (and flip side buffer) preceding the tile data.
    pub fn record_block_bytes(&self, metatile_count: u16) -> u64 {
        let quadrants = metatile_count as u64 * 4;
        let flip_bytes = match self.flip {
            FlipSource::SideBuffer(_) => quadrants,
            FlipSource::Record(_) => 0,
        };
        quadrants * self.word.bytes() as u64 + flip_bytes
    }
}

impl TryFrom<u8> for TsFormat {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => TsFormat::GbaEarly,
            1 => TsFormat::Gba,
            2 => TsFormat::Ds,
            3 => TsFormat::Didj,
            4 => TsFormat::Leapster,
            _ => return Err(unknown_format("TS", value, 4)),
        })
    }
}

/// Layer/screen formats (`.lyr`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LyrFormat {
    /// The Scorpion King: Sword of Osiris
    ScorpionKing = 0,
    /// Early GBA titles
    GbaEarly = 1,
    /// Later GBA titles and Leapster
    Gba = 2,
    /// DS/DSi, Didj and remaining GBA titles
    Ds = 3,
}

/// Header fields that follow flags, width, height and screen count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerField {
    Unknown,
    /// File number of the level's TYPES.TYP
    TypesId,
    /// File number of the tileset whose metatile sheet the layer uses
    TilesetId,
    UnknownCountA,
    UnknownCountB,
    UnknownCountC,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LyrVariant {
    pub name: &'static str,
    pub extra_fields: &'static [LayerField],
    /// Boundary the stream must sit on after the primary index stream
    pub index_alignment: Option<u64>,
    /// Further width*height id streams with no bearing on the map
    pub discard_index_streams: usize,
    /// Record sizes of the three unknown blocks, counted by
    /// `UnknownCountA..C`. `None` when the blocks are absent.
    pub unknown_block_sizes: Option<[u64; 3]>,
}

const LYR_VARIANTS: [LyrVariant; 4] = [
    LyrVariant {
        name: "scorpion-king",
        extra_fields: &[
            LayerField::Unknown,
            LayerField::TypesId,
            LayerField::TilesetId,
            LayerField::Unknown,
        ],
        index_alignment: Some(4),
        discard_index_streams: 0,
        unknown_block_sizes: None,
    },
    LyrVariant {
        name: "gba-early",
        extra_fields: &[
            LayerField::Unknown,
            LayerField::TypesId,
            LayerField::Unknown,
            LayerField::TilesetId,
        ],
        index_alignment: None,
        discard_index_streams: 0,
        unknown_block_sizes: None,
    },
    LyrVariant {
        name: "gba",
        extra_fields: &LONG_LAYER_HEADER,
        index_alignment: None,
        discard_index_streams: 0,
        unknown_block_sizes: None,
    },
    LyrVariant {
        name: "ds",
        extra_fields: &LONG_LAYER_HEADER,
        index_alignment: None,
        discard_index_streams: 2,
        unknown_block_sizes: Some([20, 8, 16]),
    },
];

const LONG_LAYER_HEADER: [LayerField; 6] = [
    LayerField::UnknownCountA,
    LayerField::UnknownCountB,
    LayerField::UnknownCountC,
    LayerField::TypesId,
    LayerField::Unknown,
    LayerField::TilesetId,
];

impl LyrFormat {
    pub fn descriptor(self) -> &'static LyrVariant {
        &LYR_VARIANTS[self as usize]
    }
}

impl TryFrom<u8> for LyrFormat {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => LyrFormat::ScorpionKing,
            1 => LyrFormat::GbaEarly,
            2 => LyrFormat::Gba,
            3 => LyrFormat::Ds,
            _ => return Err(unknown_format("LYR", value, 3)),
        })
    }
}

/// Metatile id mask for a layer, selected by the header flags.
pub fn metatile_id_mask(layer_flags: u16) -> u16 {
    match layer_flags {
        0x0010 => 0x03FF,
        0x0040 => 0x0FFF,
        _ => 0x07FF,
    }
}

fn unknown_format(family: &str, value: u8, max: u8) -> DecodeError {
    DecodeError::InvalidData(format!(
        "Unknown {} format {} (expected 0-{})",
        family, value, max
    ))
}

impl fmt::Display for AnmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ANM {} ({})", *self as u8, self.descriptor().name)
    }
}

impl fmt::Display for TsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TS {} ({})", *self as u8, self.descriptor().name)
    }
}

impl fmt::Display for LyrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LYR {} ({})", *self as u8, self.descriptor().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_bits_line_up_across_variants() {
        // 4x4 chunk code with the second palette bit set
        let standard = AnmFormat::Standard.descriptor();
        assert_eq!(standard.piece_bits(0x6000 | 0x0123), 0x6000);

        // Scorpion King keeps size bits at 8-12
        let scorpion = AnmFormat::ScorpionKing.descriptor();
        assert_eq!(scorpion.piece_bits(0x0800 | 0x0042), 0x2000);
        assert_eq!(scorpion.tile_id.extract(0x0842), 0x42);

        // Rescue Heroes keeps them at 7-11
        let rescue = AnmFormat::RescueHeroes.descriptor();
        assert_eq!(rescue.piece_bits(0x0400 | 0x0005), 0x2000);
        assert_eq!(rescue.tile_id.extract(0x0485), 0x05);
    }

    #[test]
    fn ts_record_fields() {
        let gba = TsFormat::Gba.descriptor();
        let word = 0xA000 | 0x0C00 | 0x0155;
        assert_eq!(gba.tile_id.extract(word), 0x155);
        assert_eq!(gba.palette_bank.extract(word), 0xA);
        assert_eq!(gba.flip, FlipSource::Record(BitField::new(0x0C00, 10)));

        let ds = TsFormat::Ds.descriptor();
        let word = 0x5400_0875;
        assert_eq!(ds.tile_id.extract(word), 0x0875);
        assert_eq!(ds.palette_bank.extract(word), 5);
        if let FlipSource::Record(flip) = ds.flip {
            assert_eq!(flip.extract(word), 1);
        }
    }

    #[test]
    fn ts_record_block_sizes() {
        assert_eq!(TsFormat::Gba.descriptor().record_block_bytes(3), 24);
        assert_eq!(TsFormat::Ds.descriptor().record_block_bytes(3), 48);
        assert_eq!(TsFormat::Leapster.descriptor().record_block_bytes(3), 36);
    }

    #[test]
    fn screen_masks() {
        assert_eq!(metatile_id_mask(0x0010), 1023);
        assert_eq!(metatile_id_mask(0x0040), 4095);
        assert_eq!(metatile_id_mask(0x0020), 2047);
        assert_eq!(metatile_id_mask(0x0000), 2047);
    }

    #[test]
    fn layer_headers_have_expected_field_counts() {
        assert_eq!(LyrFormat::ScorpionKing.descriptor().extra_fields.len(), 4);
        assert_eq!(LyrFormat::GbaEarly.descriptor().extra_fields.len(), 4);
        assert_eq!(LyrFormat::Gba.descriptor().extra_fields.len(), 6);
        assert_eq!(LyrFormat::Ds.descriptor().extra_fields.len(), 6);
    }

    #[test]
    fn format_numbers_round_trip() {
        for n in 0..=5u8 {
            assert_eq!(AnmFormat::try_from(n).unwrap() as u8, n);
        }
        assert!(AnmFormat::try_from(6).is_err());
        assert!(TsFormat::try_from(5).is_err());
        assert!(LyrFormat::try_from(4).is_err());
    }
}
