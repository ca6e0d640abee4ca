//! Screen and full-map assembly from a metatile sheet

use image::{imageops, RgbaImage};

use crate::{
    error::{DecodeWarning, Diagnostics},
    layer::parser::SCREEN_METATILES,
    tileset::parser::{METATILES_PER_ROW, METATILE_DIM},
};

pub const SCREEN_DIM: u32 = SCREEN_METATILES * METATILE_DIM;

/// Crops metatile `id` out of a 16-column metatile sheet.
pub fn crop_metatile(sheet: &RgbaImage, id: u16) -> Option<RgbaImage> {
    let x = (id as u32 % METATILES_PER_ROW) * METATILE_DIM;
    let y = (id as u32 / METATILES_PER_ROW) * METATILE_DIM;
    if x + METATILE_DIM > sheet.width() || y + METATILE_DIM > sheet.height() {
        return None;
    }
    Some(imageops::crop_imm(sheet, x, y, METATILE_DIM, METATILE_DIM).to_image())
}

pub fn render_screen(sheet: &RgbaImage, ids: &[u16], diagnostics: &mut Diagnostics) -> RgbaImage {
    let mut screen = RgbaImage::new(SCREEN_DIM, SCREEN_DIM);
    for (i, &id) in ids.iter().enumerate() {
        let Some(block) = crop_metatile(sheet, id) else {
            diagnostics.warn(DecodeWarning::SheetTileOutOfRange { tile_id: id as u32 });
            continue;
        };
        let x = (i as u32 % SCREEN_METATILES) * METATILE_DIM;
        let y = (i as u32 / SCREEN_METATILES) * METATILE_DIM;
        imageops::replace(&mut screen, &block, x as i64, y as i64);
    }
    screen
}

/// Places every screen at its slot. Ids past the rendered screens leave
/// the slot transparent.
pub fn render_map(
    width: u16,
    height: u16,
    placement: &[u16],
    screens: &[RgbaImage],
    diagnostics: &mut Diagnostics,
) -> RgbaImage {
    let mut map = RgbaImage::new(width as u32 * SCREEN_DIM, height as u32 * SCREEN_DIM);
    let columns = width.max(1) as usize;

    for (slot, &screen_id) in placement.iter().enumerate() {
        let Some(screen) = screens.get(screen_id as usize) else {
            diagnostics.warn(DecodeWarning::ScreenOutOfRange {
                slot,
                screen: screen_id,
            });
            continue;
        };
        let x = (slot % columns) as i64 * SCREEN_DIM as i64;
        let y = (slot / columns) as i64 * SCREEN_DIM as i64;
        imageops::replace(&mut map, screen, x, y);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn metatile_crop_position() {
        let mut sheet = RgbaImage::new(256, 32);
        sheet.put_pixel(3 * 16, 16, Rgba([9, 9, 9, 255]));
        let block = crop_metatile(&sheet, 0x13).unwrap();
        assert_eq!(block.get_pixel(0, 0), &Rgba([9, 9, 9, 255]));
        assert!(crop_metatile(&sheet, 0x20).is_none());
    }

    #[test]
    fn out_of_range_screen_leaves_slot_blank() {
        let screen = RgbaImage::from_pixel(SCREEN_DIM, SCREEN_DIM, Rgba([1, 2, 3, 255]));
        let mut diagnostics = Diagnostics::default();
        let map = render_map(2, 1, &[0, 4], &[screen], &mut diagnostics);
        assert_eq!(map.dimensions(), (512, 256));
        assert_eq!(map.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(map.get_pixel(300, 10), &Rgba([0, 0, 0, 0]));
        assert_eq!(
            diagnostics.warnings,
            vec![DecodeWarning::ScreenOutOfRange { slot: 1, screen: 4 }]
        );
    }
}
