//! Writing decoded assets to disk: optimised PNGs plus a JSON manifest per
//! archive.

use std::{
    collections::HashMap,
    fs::{self, File},
    hash::{Hash, Hasher},
    io,
    path::Path,
};

use image::RgbaImage;
use serde::Serialize;
use twox_hash::XxHash64;

use crate::{
    error::Diagnostics,
    layer::LayerMap,
    sprite::SpriteArchive,
    tile::ColorDepth,
    tileset::MetatileSheet,
};

/// Saves a PNG, then shrinks it with oxipng. If optimisation fails the
/// unoptimised file is kept.
pub fn save_png(image: &RgbaImage, path: &Path) -> io::Result<()> {
    let temp_path = path.with_extension("temp.png");
    image
        .save(&temp_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;
    options.interlace = None;

    match oxipng::optimize(
        &oxipng::InFile::Path(temp_path.clone()),
        &oxipng::OutFile::Path(Some(path.to_path_buf())),
        &options,
    ) {
        Ok(_) => {
            let _ = fs::remove_file(temp_path);
            Ok(())
        }
        Err(e) => {
            fs::rename(temp_path, path)?;
            tracing::warn!(path = %path.display(), error = %e, "oxipng failed, PNG saved unoptimised");
            Ok(())
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

fn frame_hash(frame: &RgbaImage) -> u64 {
    let mut hasher = XxHash64::default();
    frame.dimensions().hash(&mut hasher);
    frame.as_raw().hash(&mut hasher);
    hasher.finish()
}

/// For each frame, the index of the first earlier frame with identical
/// pixels. Hash hits are confirmed byte for byte.
pub fn find_duplicates(frames: &[RgbaImage]) -> Vec<Option<usize>> {
    let mut seen: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut duplicates = Vec::with_capacity(frames.len());

    for (idx, frame) in frames.iter().enumerate() {
        let candidates = seen.entry(frame_hash(frame)).or_default();
        let original = candidates
            .iter()
            .copied()
            .find(|&c| frames[c].dimensions() == frame.dimensions() && frames[c].as_raw() == frame.as_raw());
        if original.is_none() {
            candidates.push(idx);
        }
        duplicates.push(original);
    }
    duplicates
}

#[derive(Debug, Serialize)]
pub struct FrameEntry {
    pub index: usize,
    /// `None` when the frame was skipped as a duplicate
    pub file: Option<String>,
    pub duplicate_of: Option<usize>,
    pub offset: u64,
    pub pieces: usize,
}

#[derive(Debug, Serialize)]
pub struct SpriteManifest<'a> {
    pub format: String,
    pub frame_count: usize,
    pub canvas: (u32, u32),
    pub next_file_offset: u64,
    pub frames: Vec<FrameEntry>,
    pub diagnostics: &'a Diagnostics,
}

/// Writes `<out>/<name>/<i>.png` per frame plus `frames.json`.
pub fn export_sprite_archive(
    archive: &SpriteArchive,
    out_dir: &Path,
    name: &str,
    skip_duplicates: bool,
) -> io::Result<()> {
    let frame_dir = out_dir.join(name);
    fs::create_dir_all(&frame_dir)?;

    let images: Vec<RgbaImage> = archive
        .frames
        .iter()
        .map(|f| f.image.to_rgba(&archive.palette, true))
        .collect();
    let duplicates = if skip_duplicates {
        find_duplicates(&images)
    } else {
        vec![None; images.len()]
    };

    let mut entries = Vec::with_capacity(images.len());
    for (idx, (image, duplicate_of)) in images.iter().zip(duplicates).enumerate() {
        let file = if duplicate_of.is_some() {
            tracing::debug!(frame = idx, ?duplicate_of, "skipping duplicate frame");
            None
        } else {
            let file = format!("{}.png", idx);
            save_png(image, &frame_dir.join(&file))?;
            Some(file)
        };
        entries.push(FrameEntry {
            index: idx,
            file,
            duplicate_of,
            offset: archive.frames[idx].record.offset,
            pieces: archive.frames[idx].pieces.len(),
        });
    }

    let canvas = images.first().map(|i| i.dimensions()).unwrap_or_default();
    let manifest = SpriteManifest {
        format: archive.format.to_string(),
        frame_count: archive.frames.len(),
        canvas,
        next_file_offset: archive.header.next_file_offset(),
        frames: entries,
        diagnostics: &archive.diagnostics,
    };
    write_json(&manifest, &frame_dir.join("frames.json"))?;
    tracing::info!(frames = archive.frames.len(), dir = %frame_dir.display(), "sprite frames written");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TilesetManifest<'a> {
    pub format: String,
    pub flags: u16,
    pub metatile_count: u16,
    pub tile_count: u16,
    pub depth: ColorDepth,
    pub metatiles_decoded: usize,
    pub terminated_early: bool,
    pub sheet: String,
    pub next_file_offset: u64,
    pub diagnostics: &'a Diagnostics,
}

/// Writes `<out>/<name>_metatile.png` plus `<out>/<name>_tileset.json`.
pub fn export_tileset(sheet: &MetatileSheet, out_dir: &Path, name: &str) -> io::Result<()> {
    fs::create_dir_all(out_dir)?;
    let file = format!("{}_metatile.png", name);
    save_png(&sheet.image.to_rgba(&sheet.palette, true), &out_dir.join(&file))?;

    let manifest = TilesetManifest {
        format: sheet.format.to_string(),
        flags: sheet.header.flags,
        metatile_count: sheet.header.metatile_count,
        tile_count: sheet.header.tile_count,
        depth: sheet.depth,
        metatiles_decoded: sheet.metatiles.len(),
        terminated_early: sheet.terminated_early,
        sheet: file,
        next_file_offset: sheet.next_file_offset(),
        diagnostics: &sheet.diagnostics,
    };
    write_json(&manifest, &out_dir.join(format!("{}_tileset.json", name)))?;
    if sheet.diagnostics.tile_range_exceeded {
        tracing::warn!(
            "{} holds more tiles than its records can address; try --tile-delimiter",
            name
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct LayerManifest<'a> {
    pub format: String,
    pub width: u16,
    pub height: u16,
    pub screen_count: u16,
    pub tileset_id: u16,
    pub types_id: u16,
    pub sheet: &'a str,
    pub placement: &'a [u16],
    pub diagnostics: &'a Diagnostics,
}

/// Writes `<out>/<name>/<i>.png` per screen, `Full.png` and `layer.json`.
pub fn export_layer(layer: &LayerMap, out_dir: &Path, name: &str) -> io::Result<()> {
    let screen_dir = out_dir.join(name);
    fs::create_dir_all(&screen_dir)?;

    for (idx, screen) in layer.screens.iter().enumerate() {
        save_png(screen, &screen_dir.join(format!("{}.png", idx)))?;
    }
    save_png(&layer.map, &screen_dir.join("Full.png"))?;

    let manifest = LayerManifest {
        format: layer.format.to_string(),
        width: layer.header.width,
        height: layer.header.height,
        screen_count: layer.header.screen_count,
        tileset_id: layer.header.tileset_id,
        types_id: layer.header.types_id,
        sheet: &layer.sheet_name,
        placement: &layer.placement,
        diagnostics: &layer.diagnostics,
    };
    write_json(&manifest, &screen_dir.join("layer.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn duplicates_point_at_first_occurrence() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([1, 0, 0, 255]));
        let b = RgbaImage::from_pixel(4, 4, Rgba([2, 0, 0, 255]));
        let frames = vec![a.clone(), b.clone(), a.clone(), b, a];
        assert_eq!(
            find_duplicates(&frames),
            vec![None, None, Some(0), Some(1), Some(0)]
        );
    }

    #[test]
    fn same_bytes_different_shape_are_distinct() {
        let wide = RgbaImage::new(4, 2);
        let tall = RgbaImage::new(2, 4);
        assert_eq!(find_duplicates(&[wide, tall]), vec![None, None]);
    }

    #[test]
    fn png_round_trips_through_optimiser() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut img = RgbaImage::new(8, 8);
        img.put_pixel(3, 4, Rgba([10, 20, 30, 255]));
        save_png(&img, &path).unwrap();

        assert!(!dir.path().join("frame.temp.png").exists());
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(3, 4), &Rgba([10, 20, 30, 255]));
        assert_eq!(back.get_pixel(0, 0)[3], 0);
    }
}
