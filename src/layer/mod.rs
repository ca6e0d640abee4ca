//! Layer handling (`.lyr`)
//!
//! A layer is a grid of 256x256 screens. Each unique screen is 16x16
//! metatiles cropped from the tileset's metatile sheet, and the map places a
//! screen id at every grid slot.

use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
};

use image::RgbaImage;

pub mod parser;
pub mod render;

pub use parser::LayerHeader;
pub use render::SCREEN_DIM;

use crate::{
    binary_utils::seek_to,
    bitmap::checked_canvas_size,
    error::{DecodeError, Diagnostics},
    variant::LyrFormat,
};

/// Looks up metatile sheets by name (a tileset file number or a caller name).
pub trait MetatileSheetProvider {
    /// `Ok(None)` when no sheet of that name exists.
    fn load_sheet(&self, name: &str) -> Result<Option<RgbaImage>, DecodeError>;
}

/// Reads `<name>_metatile.png` from a directory.
#[derive(Debug, Clone)]
pub struct SheetDirectory {
    root: PathBuf,
}

impl SheetDirectory {
    pub fn new(root: impl AsRef<Path>) -> Self {
        SheetDirectory {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}_metatile.png", name))
    }
}

impl MetatileSheetProvider for SheetDirectory {
    fn load_sheet(&self, name: &str) -> Result<Option<RgbaImage>, DecodeError> {
        let path = self.sheet_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "loading metatile sheet");
        Ok(Some(image::open(&path)?.to_rgba8()))
    }
}

impl MetatileSheetProvider for HashMap<String, RgbaImage> {
    fn load_sheet(&self, name: &str) -> Result<Option<RgbaImage>, DecodeError> {
        Ok(self.get(name).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOptions {
    pub format: LyrFormat,
    /// Position of the archive inside a ROM image
    pub base_offset: Option<u64>,
    /// Sheet name tried when the header's tileset id has no sheet
    pub fallback_sheet: String,
}

impl Default for LayerOptions {
    fn default() -> Self {
        LayerOptions {
            format: LyrFormat::Gba,
            base_offset: None,
            fallback_sheet: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerMap {
    pub format: LyrFormat,
    pub header: LayerHeader,
    /// Name of the sheet that was actually used
    pub sheet_name: String,
    /// Screen id per grid slot, row-major
    pub placement: Vec<u16>,
    /// Masked metatile ids per unique screen
    pub screen_ids: Vec<Vec<u16>>,
    pub screens: Vec<RgbaImage>,
    pub map: RgbaImage,
    pub diagnostics: Diagnostics,
}

fn resolve_sheet(
    provider: &dyn MetatileSheetProvider,
    header: &LayerHeader,
    fallback: &str,
) -> Result<(String, RgbaImage), DecodeError> {
    let linked = header.tileset_id.to_string();
    if let Some(sheet) = provider.load_sheet(&linked)? {
        return Ok((linked, sheet));
    }
    if !fallback.is_empty() {
        if let Some(sheet) = provider.load_sheet(fallback)? {
            tracing::info!(linked = %linked, fallback, "linked metatile sheet not found, using fallback");
            return Ok((fallback.to_string(), sheet));
        }
    }
    Err(DecodeError::MissingInput(format!(
        "Metatile sheet not found for tileset {} or '{}'",
        linked, fallback
    )))
}

/// Decodes a layer into its screens and full map.
///
/// The metatile sheet is required: when neither the tileset the header links
/// to nor `options.fallback_sheet` can be loaded, decoding fails with
/// [`DecodeError::MissingInput`].
pub fn decode_layer(
    data: &[u8],
    sheets: &dyn MetatileSheetProvider,
    options: &LayerOptions,
) -> Result<LayerMap, DecodeError> {
    let variant = options.format.descriptor();
    let mut diagnostics = Diagnostics::default();

    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, options.base_offset.unwrap_or(0))?;
    let header = parser::parse_header(&mut cursor, variant)?;
    tracing::debug!(
        format = %options.format,
        width = header.width,
        height = header.height,
        screens = header.screen_count,
        tileset = header.tileset_id,
        "parsed layer header"
    );

    checked_canvas_size(
        header.width as u64 * SCREEN_DIM as u64,
        header.height as u64 * SCREEN_DIM as u64,
        "Layer map",
    )?;

    let (sheet_name, sheet) = resolve_sheet(sheets, &header, &options.fallback_sheet)?;

    // First pass only walks past the index stream to reach the screens
    let index_start = cursor.position();
    parser::read_index_stream(&mut cursor, &header)?;
    parser::skip_to_screens(&mut cursor, variant, &header, &mut diagnostics)?;

    let screen_ids = parser::read_screens(&mut cursor, &header)?;
    let screens: Vec<RgbaImage> = screen_ids
        .iter()
        .map(|ids| render::render_screen(&sheet, ids, &mut diagnostics))
        .collect();

    seek_to(&mut cursor, index_start)?;
    let placement = parser::read_index_stream(&mut cursor, &header)?;
    let map = render::render_map(header.width, header.height, &placement, &screens, &mut diagnostics);

    Ok(LayerMap {
        format: options.format,
        header,
        sheet_name,
        placement,
        screen_ids,
        screens,
        map,
        diagnostics,
    })
}
