//! Shared test utilities for image-based unit tests.

use image::{GrayImage, Luma};

/// Render one position pattern: a dark 7×7-module square holding a light
/// 5×5 ring and a dark 3×3 stone, on a white background.
///
/// `x0`, `y0` is the top-left pixel of the outer dark square; `module` is
/// the module size in pixels.
pub(crate) fn draw_finder_pattern(w: u32, h: u32, x0: u32, y0: u32, module: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([255]));
    fill_rect(&mut img, x0, y0, 7 * module, 7 * module, 0);
    fill_rect(&mut img, x0 + module, y0 + module, 5 * module, 5 * module, 255);
    fill_rect(&mut img, x0 + 2 * module, y0 + 2 * module, 3 * module, 3 * module, 0);
    img
}

fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
    let (iw, ih) = img.dimensions();
    for y in y0..(y0 + h).min(ih) {
        for x in x0..(x0 + w).min(iw) {
            img.put_pixel(x, y, Luma([value]));
        }
    }
}
