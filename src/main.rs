use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wf_ripper::{
    decode_layer, decode_sprite_archive, decode_tileset,
    input::{
        find_with_extensions, load_palette_file, load_tile_sheets, output_stem, parse_offset,
        PaletteFile, ANM_EXTENSIONS, LYR_EXTENSIONS, TS_EXTENSIONS,
    },
    output,
    tileset::read_header as read_tileset_header,
    AnmFormat, CanvasConfig, ChannelScale, DecodeError, LayerOptions, LyrFormat,
    PaletteSource, SheetDirectory, SpriteOptions, TileSource, TilesetOptions, TsFormat,
};

#[derive(Parser)]
#[command(name = "wf_ripper")]
#[command(about = "Extracts sprites, tilesets and layers from WayForward archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read the archive out of a ROM image instead of a standalone file
    #[arg(long, requires = "start")]
    rom: Option<PathBuf>,

    /// Archive offset inside the ROM image (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_offset)]
    start: Option<u64>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every frame of a sprite archive (.anm/.an4/.an8)
    Anm {
        /// Archive name without extension
        name: String,

        /// Archive format (0-5)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=5))]
        format: u8,

        /// Scene or palette file name without extension (.pal or .scn)
        #[arg(long)]
        scene: Option<String>,

        /// Palette bank for 16-colour sprites
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=15))]
        palette_num: u8,

        #[arg(long, default_value_t = 256)]
        width: u32,

        #[arg(long, default_value_t = 256)]
        height: u32,

        /// Keep the canvas transparent so tile edges stay visible
        #[arg(long)]
        tile_bounds: bool,

        /// Scale colour channels to the full 0-255 range
        #[arg(long)]
        normalized: bool,

        /// Write identical frames only once
        #[arg(long)]
        skip_duplicates: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Assemble the metatile sheet of a tileset (.ts4/.ts8)
    Ts {
        name: String,

        /// Archive format (0-4)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=4))]
        format: u8,

        #[arg(long)]
        scene: Option<String>,

        #[arg(long)]
        normalized: bool,

        /// Recover GBA tilesets with more than 1024 tiles
        #[arg(long)]
        tile_delimiter: bool,

        /// Take tiles from <name>.png or <name>_0.png..<name>_15.png
        #[arg(long)]
        png_tiles: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Render the screens and full map of a layer (.lyr)
    Lyr {
        name: String,

        /// Archive format (0-3)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=3))]
        format: u8,

        /// Metatile sheet name used when the linked tileset has none
        #[arg(long, default_value = "")]
        metatiles: String,

        /// Directory holding <name>_metatile.png sheets (defaults to --out)
        #[arg(long)]
        sheets: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn scale_for(normalized: bool) -> ChannelScale {
    if normalized {
        ChannelScale::Normalized
    } else {
        ChannelScale::Raw
    }
}

/// Archive bytes plus the archive's base offset (`None` for standalone files).
fn load_archive(
    name: &str,
    extensions: &[&str],
    source: &SourceArgs,
) -> Result<(Vec<u8>, Option<u64>), DecodeError> {
    if let Some(rom) = &source.rom {
        tracing::info!(rom = %rom.display(), start = ?source.start, "reading from ROM image");
        return Ok((fs::read(rom)?, source.start));
    }

    let path = find_with_extensions(name, extensions).ok_or_else(|| {
        DecodeError::MissingInput(format!(
            "Can't find '{}' with any of the extensions {:?}",
            name, extensions
        ))
    })?;
    tracing::info!(path = %path.display(), "reading archive");
    Ok((fs::read(path)?, None))
}

fn load_scene(scene: Option<&str>) -> Result<Option<PaletteFile>, DecodeError> {
    let Some(scene) = scene else {
        return Ok(None);
    };
    let file = load_palette_file(scene)?;
    if file.is_none() {
        tracing::warn!("Can't find '{0}.pal' or '{0}.scn', using grayscale", scene);
    }
    Ok(file)
}

fn palette_source(file: &Option<PaletteFile>) -> PaletteSource<'_> {
    match file {
        Some(f) => PaletteSource::Companion {
            data: &f.data,
            offset: f.offset,
        },
        None => PaletteSource::None,
    }
}

fn run(cli: Cli) -> Result<(), DecodeError> {
    match cli.command {
        Commands::Anm {
            name,
            format,
            scene,
            palette_num,
            width,
            height,
            tile_bounds,
            normalized,
            skip_duplicates,
            source,
        } => {
            let (data, base_offset) = load_archive(&name, &ANM_EXTENSIONS, &source)?;
            let palette = load_scene(scene.as_deref())?;
            let options = SpriteOptions {
                format: AnmFormat::try_from(format)?,
                base_offset,
                canvas: CanvasConfig {
                    width,
                    height,
                    palette_num,
                    tile_bounds,
                    scale: scale_for(normalized),
                },
            };

            let archive = decode_sprite_archive(&data, palette_source(&palette), &options)?;
            output::export_sprite_archive(&archive, &source.out, &output_stem(&name), skip_duplicates)?;
            if base_offset.is_some() {
                tracing::info!("next file likely starts at {:#x}", archive.header.next_file_offset());
            }
        }
        Commands::Ts {
            name,
            format,
            scene,
            normalized,
            tile_delimiter,
            png_tiles,
            source,
        } => {
            let (data, base_offset) = load_archive(&name, &TS_EXTENSIONS, &source)?;
            let palette = load_scene(scene.as_deref())?;
            let options = TilesetOptions {
                format: TsFormat::try_from(format)?,
                base_offset,
                scale: scale_for(normalized),
                tile_delimiter,
            };

            let sheets = if png_tiles {
                let header = read_tileset_header(&data, &options)?;
                Some(load_tile_sheets(&name, header.is_8bpp())?)
            } else {
                None
            };
            let tiles = match &sheets {
                Some(sheets) => TileSource::Sheets(sheets),
                None => TileSource::Archive,
            };

            let sheet = decode_tileset(&data, palette_source(&palette), tiles, &options)?;
            output::export_tileset(&sheet, &source.out, &output_stem(&name))?;
            if base_offset.is_some() {
                tracing::info!("next file likely starts at {:#x}", sheet.next_file_offset());
            }
        }
        Commands::Lyr {
            name,
            format,
            metatiles,
            sheets,
            source,
        } => {
            let (data, base_offset) = load_archive(&name, &LYR_EXTENSIONS, &source)?;
            let provider = SheetDirectory::new(sheets.as_ref().unwrap_or(&source.out));
            let options = LayerOptions {
                format: LyrFormat::try_from(format)?,
                base_offset,
                fallback_sheet: metatiles,
            };

            let layer = decode_layer(&data, &provider, &options)?;
            output::export_layer(&layer, &source.out, &output_stem(&name))?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
