//! Error and diagnostic types shared by the three decoders.
//!
//! Only a handful of conditions abort a decode: truncated headers or tables
//! (`Io`) and a layer whose metatile sheet cannot be found (`MissingInput`).
//! Everything else is recorded as a [`DecodeWarning`] and the affected piece,
//! tile or screen is left blank.

use std::io;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Stream ended early or a seek went past the end of the archive
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A required companion input (metatile sheet) could not be found
    #[error("Missing input: {0}")]
    MissingInput(String),
    /// Structurally invalid archive or option
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A recoverable problem found while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    UnknownChunkSize { frame: usize, piece: usize, code: u16 },
    FrameUnreadable { frame: usize, reason: String },
    UnknownFlip { metatile: usize, quadrant: usize, code: u32 },
    TileOutOfRange { offset: u64 },
    SheetTileOutOfRange { tile_id: u32 },
    MissingSheet { palette_bank: u8 },
    ScreenOutOfRange { slot: usize, screen: u16 },
    Realigned { from: u64, to: u64 },
    CompressedData { flags: u16 },
    TileRangeExceeded { tile_count: u16, addressable: u32 },
    PaletteFallback { reason: String },
}

/// Warnings collected over one decode, plus flags callers commonly query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub warnings: Vec<DecodeWarning>,
    /// Set when the archive holds more tiles than its record format can address
    pub tile_range_exceeded: bool,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: DecodeWarning) {
        tracing::warn!(?warning, "decode warning");
        if matches!(warning, DecodeWarning::TileRangeExceeded { .. }) {
            self.tile_range_exceeded = true;
        }
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
