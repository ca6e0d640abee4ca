//! Locating archives and companion palette files on disk.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    error::DecodeError,
    palette::PALETTE_BYTES,
    tileset::TileSheets,
};

pub const ANM_EXTENSIONS: [&str; 3] = ["anm", "an4", "an8"];
pub const TS_EXTENSIONS: [&str; 2] = ["ts4", "ts8"];
pub const LYR_EXTENSIONS: [&str; 1] = ["lyr"];

/// Palette bytes and where the colours start inside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub offset: usize,
}

/// First existing `<name>.<ext>` in extension order.
pub fn find_with_extensions(name: &str, extensions: &[&str]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| PathBuf::from(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
}

/// `<scene>.pal` holds the palette at its start; `<scene>.scn` stores it
/// after a 0x200-byte block.
pub fn load_palette_file(scene: &str) -> io::Result<Option<PaletteFile>> {
    for (ext, offset) in [("pal", 0), ("scn", PALETTE_BYTES)] {
        let path = PathBuf::from(format!("{}.{}", scene, ext));
        if path.is_file() {
            let data = fs::read(&path)?;
            tracing::debug!(path = %path.display(), offset, "palette file found");
            return Ok(Some(PaletteFile { path, data, offset }));
        }
    }
    Ok(None)
}

/// Pre-rendered tile sheets for `name`, picked by the tileset's depth:
/// `<name>.png` for a 256-colour set, `<name>_0.png` through `<name>_15.png`
/// (one per palette bank) for a 16-colour set. Missing bank sheets are left
/// empty; finding none of the required kind is an error.
pub fn load_tile_sheets(name: &str, is_8bpp: bool) -> Result<TileSheets, DecodeError> {
    if is_8bpp {
        let path = PathBuf::from(format!("{}.png", name));
        if !path.is_file() {
            return Err(DecodeError::MissingInput(format!(
                "Can't find tileset image '{}'",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "using single tile sheet");
        return Ok(TileSheets::single(image::open(&path)?.to_rgba8()));
    }

    let mut sheets = TileSheets::default();
    for (bank, slot) in sheets.banks.iter_mut().enumerate() {
        let path = PathBuf::from(format!("{}_{}.png", name, bank));
        if path.is_file() {
            *slot = Some(image::open(&path)?.to_rgba8());
        }
    }
    if sheets.is_empty() {
        return Err(DecodeError::MissingInput(format!(
            "Can't find tileset images ('{0}_0.png'..'{0}_15.png')",
            name
        )));
    }
    tracing::debug!(
        found = sheets.banks.iter().filter(|b| b.is_some()).count(),
        "loaded bank tile sheets"
    );
    Ok(sheets)
}

/// Archive name without directories or extension, used to name outputs.
pub fn output_stem(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Parses a decimal or `0x`-prefixed hexadecimal offset.
pub fn parse_offset(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_accept_hex_and_decimal() {
        assert_eq!(parse_offset("0x200"), Ok(0x200));
        assert_eq!(parse_offset("512"), Ok(512));
        assert_eq!(parse_offset("0XfF"), Ok(255));
        assert!(parse_offset("0xZZ").is_err());
        assert!(parse_offset("").is_err());
    }

    #[test]
    fn scene_prefers_pal_over_scn() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("stage1");
        let scene = scene.to_string_lossy();
        assert!(load_palette_file(&scene).unwrap().is_none());

        fs::write(format!("{}.scn", scene), vec![0u8; 0x400]).unwrap();
        let scn = load_palette_file(&scene).unwrap().unwrap();
        assert_eq!(scn.offset, 0x200);

        fs::write(format!("{}.pal", scene), vec![0u8; 0x200]).unwrap();
        let pal = load_palette_file(&scene).unwrap().unwrap();
        assert_eq!(pal.offset, 0);
    }

    #[test]
    fn extension_order_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("hero");
        let name = name.to_string_lossy();
        assert!(find_with_extensions(&name, &ANM_EXTENSIONS).is_none());

        fs::write(format!("{}.an8", name), b"x").unwrap();
        fs::write(format!("{}.an4", name), b"x").unwrap();
        let found = find_with_extensions(&name, &ANM_EXTENSIONS).unwrap();
        assert_eq!(found.extension().unwrap(), "an4");
    }

    #[test]
    fn bank_sheets_load_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("maze");
        let name = name.to_string_lossy();
        assert!(matches!(load_tile_sheets(&name, false), Err(DecodeError::MissingInput(_))));

        image::RgbaImage::new(128, 8).save(format!("{}_3.png", name)).unwrap();
        let sheets = load_tile_sheets(&name, false).unwrap();
        assert!(sheets.banks[3].is_some());
        assert!(sheets.banks[0].is_none());
        assert!(sheets.single.is_none());

        // bank sheets do not satisfy a 256-colour tileset
        assert!(matches!(load_tile_sheets(&name, true), Err(DecodeError::MissingInput(_))));
    }

    #[test]
    fn depth_decides_between_single_and_bank_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("maze");
        let name = name.to_string_lossy();
        image::RgbaImage::from_pixel(128, 8, image::Rgba([9, 9, 9, 255]))
            .save(format!("{}.png", name))
            .unwrap();
        image::RgbaImage::from_pixel(128, 8, image::Rgba([1, 1, 1, 255]))
            .save(format!("{}_1.png", name))
            .unwrap();

        let banked = load_tile_sheets(&name, false).unwrap();
        assert!(banked.single.is_none());
        assert_eq!(
            banked.banks[1].as_ref().unwrap().get_pixel(0, 0),
            &image::Rgba([1, 1, 1, 255])
        );

        let single = load_tile_sheets(&name, true).unwrap();
        assert!(single.banks.iter().all(Option::is_none));
        assert_eq!(
            single.single.as_ref().unwrap().get_pixel(0, 0),
            &image::Rgba([9, 9, 9, 255])
        );
    }

    #[test]
    fn stems_drop_directories() {
        assert_eq!(output_stem("levels/stage1"), "stage1");
        assert_eq!(output_stem("hero"), "hero");
    }
}
