//! Render three position patterns, run the detector, and print the graph.
//!
//! ```sh
//! cargo run --example synthetic_graph
//! ```

use image::{GrayImage, Luma};
use qrpose_core::{FinderConfig, FinderPatternDetector, QuadDetector, QuadInfo};

struct StaticQuads(Vec<QuadInfo>);

impl QuadDetector for StaticQuads {
    fn detect(&mut self, _gray: &GrayImage, _mask: &GrayImage) -> Vec<QuadInfo> {
        self.0.clone()
    }
}

fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, Luma([value]));
        }
    }
}

fn main() {
    let module = 6u32;
    let pattern = 7 * module;
    let side = (pattern - 1) as f64;

    let mut img = GrayImage::from_pixel(160, 160, Luma([255]));
    let mut quads = Vec::new();
    for &(x0, y0) in &[(20u32, 20u32), (80, 20), (20, 80)] {
        fill_rect(&mut img, x0, y0, pattern, pattern, 0);
        fill_rect(&mut img, x0 + module, y0 + module, 5 * module, 5 * module, 255);
        fill_rect(&mut img, x0 + 2 * module, y0 + 2 * module, 3 * module, 3 * module, 0);
        quads.push(QuadInfo {
            polygon: vec![
                [x0 as f64, y0 as f64],
                [x0 as f64 + side, y0 as f64],
                [x0 as f64 + side, y0 as f64 + side],
                [x0 as f64, y0 as f64 + side],
            ],
            has_internal: true,
            edge_inside: 0.0,
            edge_outside: 255.0,
        });
    }
    let mask = GrayImage::from_pixel(160, 160, Luma([255]));

    let mut detector =
        FinderPatternDetector::new(Box::new(StaticQuads(quads)), FinderConfig::with_max_version(2));
    let graph = detector.detect(&img, &mask).expect("detection");

    println!("{} position patterns:", graph.nodes().len());
    for (i, node) in graph.nodes().iter().enumerate() {
        println!(
            "  [{}] center = ({:.1}, {:.1}), largest side = {:.1}",
            i, node.node.center[0], node.node.center[1], node.node.largest_side
        );
    }
    println!("{} connections:", graph.n_connections());
    for c in graph.connections() {
        println!(
            "  {} (side {}) ↔ {} (side {}), distance = {:.1}",
            c.a,
            c.side_a,
            c.b,
            c.side_b,
            c.distance_sq.sqrt()
        );
    }
}
