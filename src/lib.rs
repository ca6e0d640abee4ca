//! Decoders for WayForward sprite (`.anm`), tileset (`.ts4`/`.ts8`) and
//! layer (`.lyr`) archives from GBA, DS, LeapFrog Didj and Leapster titles.

pub mod binary_utils;
pub mod bitmap;
pub mod error;
pub mod input;
pub mod layer;
pub mod output;
pub mod palette;
pub mod sprite;
pub mod tile;
pub mod tileset;
pub mod variant;

pub use bitmap::Bitmap;
pub use error::{DecodeError, DecodeWarning, Diagnostics};
pub use layer::{decode_layer, LayerMap, LayerOptions, MetatileSheetProvider, SheetDirectory};
pub use palette::{ChannelScale, Palette, PaletteSource};
pub use sprite::{decode_sprite_archive, CanvasConfig, SpriteArchive, SpriteOptions};
pub use tileset::{decode_tileset, MetatileSheet, TileSheets, TileSource, TilesetOptions};
pub use variant::{AnmFormat, LyrFormat, TsFormat};
