//! Synthetic scene rendering shared by the finder integration tests.

use image::{GrayImage, Luma};
use qrpose_core::QuadInfo;

/// Module size in pixels for rendered position patterns.
pub const MODULE: u32 = 6;

/// Pattern side length in pixels (7 modules).
pub const PATTERN: u32 = 7 * MODULE;

fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
    let (iw, ih) = img.dimensions();
    for y in y0..(y0 + h).min(ih) {
        for x in x0..(x0 + w).min(iw) {
            img.put_pixel(x, y, Luma([value]));
        }
    }
}

/// Stamp a position pattern (dark 7×7, light 5×5, dark 3×3 modules) with
/// its top-left pixel at (x0, y0).
pub fn stamp_pattern(img: &mut GrayImage, x0: u32, y0: u32) {
    fill_rect(img, x0, y0, PATTERN, PATTERN, 0);
    fill_rect(img, x0 + MODULE, y0 + MODULE, 5 * MODULE, 5 * MODULE, 255);
    fill_rect(img, x0 + 2 * MODULE, y0 + 2 * MODULE, 3 * MODULE, 3 * MODULE, 0);
}

/// White canvas of the given size.
pub fn blank_image(w: u32, h: u32) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([255]))
}

/// The quadrilateral a contour stage would report for a pattern stamped at
/// (x0, y0): corner pixel centers of the outer dark square, with edge
/// statistics matching the rendered intensities.
pub fn pattern_quad(x0: u32, y0: u32) -> QuadInfo {
    let x = x0 as f64;
    let y = y0 as f64;
    let s = (PATTERN - 1) as f64;
    QuadInfo {
        polygon: vec![[x, y], [x + s, y], [x + s, y + s], [x, y + s]],
        has_internal: true,
        edge_inside: 0.0,
        edge_outside: 255.0,
    }
}
