//! Position-pattern detection: appearance check and graph construction.

use image::GrayImage;
use log::{debug, trace};

use crate::geometry;
use crate::homography;
use crate::sampling::{Bilinear, PixelSampler};

use super::graph::{NodeId, PatternGraph, PositionSquare, SquareNode};
use super::nn::NeighborIndex;
use super::{DetectError, FinderConfig, QuadDetector, QuadInfo};

/// Side length of the canonical rectified patch the appearance check
/// samples in. A position pattern is 7 modules across, so one module maps
/// to 10 canonical units.
const CANONICAL: f64 = 70.0;

/// Detects QR-style position patterns and connects neighboring ones into a
/// graph.
///
/// One instance owns its candidate pool, spatial index and query buffers;
/// all are cleared at the start of every [`detect`](Self::detect) call, so
/// references into the returned graph must not outlive the cycle.
pub struct FinderPatternDetector {
    config: FinderConfig,
    quads: Box<dyn QuadDetector>,
    sampler: Box<dyn PixelSampler>,
    graph: PatternGraph,
    index: NeighborIndex,
    // Reused across cycles: per-node squared search radii and the neighbor
    // query scratch buffer.
    radii: Vec<f64>,
    neighbors: Vec<(usize, f64)>,
}

impl FinderPatternDetector {
    pub fn new(quads: Box<dyn QuadDetector>, config: FinderConfig) -> Self {
        Self::with_sampler(quads, Box::new(Bilinear), config)
    }

    pub fn with_sampler(
        quads: Box<dyn QuadDetector>,
        sampler: Box<dyn PixelSampler>,
        config: FinderConfig,
    ) -> Self {
        Self {
            config,
            quads,
            sampler,
            graph: PatternGraph::default(),
            index: NeighborIndex::new(),
            radii: Vec::new(),
            neighbors: Vec::new(),
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Run detection on a grayscale image and its co-registered binary
    /// mask.
    ///
    /// The mask feeds the upstream polygon stage; intensity sampling always
    /// reads the grayscale image. The returned graph borrows pooled storage
    /// and is valid until the next call.
    pub fn detect(
        &mut self,
        gray: &GrayImage,
        mask: &GrayImage,
    ) -> Result<&PatternGraph, DetectError> {
        self.graph.reset();

        let infos = self.quads.detect(gray, mask);
        let n_quads = infos.len();
        self.extract_candidates(gray, &infos)?;
        debug!(
            "finder: {} of {} quads passed the appearance check",
            self.graph.nodes().len(),
            n_quads
        );

        self.build_graph();
        debug!(
            "finder: {} connections among {} candidates",
            self.graph.n_connections(),
            self.graph.nodes().len()
        );
        Ok(&self.graph)
    }

    // ── Candidate extraction ─────────────────────────────────────────────

    fn extract_candidates(
        &mut self,
        gray: &GrayImage,
        infos: &[QuadInfo],
    ) -> Result<(), DetectError> {
        for info in infos {
            // No internal contour means no concentric structure.
            if !info.has_internal {
                continue;
            }
            if info.polygon.len() != 4 {
                return Err(DetectError::BadPolygon {
                    expected: 4,
                    got: info.polygon.len(),
                });
            }
            let square: [[f64; 2]; 4] = std::array::from_fn(|i| info.polygon[i]);

            let gray_threshold = (info.edge_inside + info.edge_outside) / 2.0;
            if !self.check_appearance(gray, &square, gray_threshold) {
                trace!("finder: quad rejected by appearance check");
                continue;
            }

            // Under perspective distortion the geometric center is the
            // intersection of the diagonals. Valid quadrilaterals always
            // have intersecting diagonal lines; anything else is an
            // upstream logic bug.
            let center = geometry::line_intersection(square[0], square[2], square[1], square[3])
                .ok_or_else(|| {
                    DetectError::Internal("diagonals of a quadrilateral do not intersect".into())
                })?;
            if !geometry::point_in_convex_polygon(center, &square) {
                trace!("finder: center outside quad, skipping degenerate candidate");
                continue;
            }

            self.graph.add_node(PositionSquare {
                node: SquareNode::from_square(square, center),
                gray_threshold,
            });
        }
        Ok(())
    }

    /// Sample the rectified mid-lines and test both against the expected
    /// intensity signature.
    ///
    /// Corner correspondence order is irrelevant as long as the winding is
    /// consistent: the signature is symmetric under rotation and mirroring
    /// of the canonical square.
    fn check_appearance(&self, gray: &GrayImage, square: &[[f64; 2]; 4], threshold: f64) -> bool {
        let canon = [
            [0.0, 0.0],
            [CANONICAL - 1.0, 0.0],
            [CANONICAL - 1.0, CANONICAL - 1.0],
            [0.0, CANONICAL - 1.0],
        ];
        // Homography failure here means a degenerate quad, not a caller
        // error: reject the candidate.
        let Ok(h) = homography::estimate_dlt(&canon, square) else {
            return false;
        };

        let mut horizontal = [0.0; 7];
        let mut vertical = [0.0; 7];
        for i in 0..7 {
            let loc = 10.0 * i as f64;
            let p = homography::project(&h, loc, 35.0);
            horizontal[i] = self.sampler.sample(gray, p[0], p[1]);
            let p = homography::project(&h, 35.0, loc);
            vertical[i] = self.sampler.sample(gray, p[0], p[1]);
        }

        intensity_check(&horizontal, threshold) && intensity_check(&vertical, threshold)
    }

    // ── Graph construction ───────────────────────────────────────────────

    fn build_graph(&mut self) {
        let n = self.graph.nodes().len();
        if n < 2 {
            return;
        }

        let centers: Vec<[f64; 2]> = self.graph.nodes().iter().map(|s| s.node.center).collect();

        // Search out to half the widest marker this square could belong to:
        // a version-v code is 21 + 4·(v − 1) modules across and the pattern
        // itself covers 7, so the span from the pattern center scales by
        // (modules − 7) / 7.
        self.radii.clear();
        let modules = (21 + 4 * (self.config.max_version.max(1) - 1) - 7) as f64;
        let mut mean_radius = 0.0;
        for square in self.graph.nodes() {
            let width = square.node.largest_side * modules / 7.0;
            let radius = self.config.search_fudge * width / 2.0;
            mean_radius += radius;
            self.radii.push(radius * radius);
        }
        mean_radius /= n as f64;

        self.index.build(&centers, mean_radius.max(1.0));

        let mut neighbors = std::mem::take(&mut self.neighbors);
        for i in 0..n {
            self.index.query_within(centers[i], self.radii[i], &mut neighbors);
            // Each candidate walks its own query results.
            for &(j, _) in &neighbors {
                if j == i {
                    continue;
                }
                self.consider_connect(i, j);
            }
        }
        self.neighbors = neighbors;
    }

    /// Try to connect two candidates; every filter rejection is a normal,
    /// silent outcome.
    fn consider_connect(&mut self, a: NodeId, b: NodeId) {
        let ca = self.graph.nodes()[a].node.center;
        let cb = self.graph.nodes()[b].node.center;

        // The line between the centers must leave each square through one
        // of its sides.
        let Some((side_a, pa)) = self.graph.find_side_intersect(a, ca, cb) else {
            return;
        };
        let Some((side_b, pb)) = self.graph.find_side_intersect(b, ca, cb) else {
            return;
        };

        let node_a = &self.graph.nodes()[a].node;
        let node_b = &self.graph.nodes()[b].node;
        let len_a = node_a.side_lengths[side_a];
        let len_b = node_b.side_lengths[side_b];

        // It should cross close to the middle of both sides.
        let frac_a = geometry::distance(pa, node_a.square[side_a]) / len_a;
        let frac_b = geometry::distance(pb, node_b.square[side_b]) / len_b;
        if (frac_a - 0.5).abs() > self.config.midpoint_tol
            || (frac_b - 0.5).abs() > self.config.midpoint_tol
        {
            return;
        }

        // Facing sides of neighboring patterns have similar lengths.
        if (len_a - len_b).abs() / len_a.max(len_b) > self.config.side_length_tol {
            return;
        }

        if !self.graph.mutually_most_parallel(a, side_a, b, side_b) {
            return;
        }

        // Overall size consistency, taken as the worse of both directions.
        let ratio = (node_a.smallest_side / node_b.largest_side)
            .max(node_b.smallest_side / node_a.largest_side);
        if ratio > self.config.size_ratio_max {
            return;
        }

        self.graph
            .check_connect(a, side_a, b, side_b, geometry::distance_sq(ca, cb));
    }
}

/// Whether seven intensity samples follow the position-pattern signature
/// "X.XXX.X" (X = below threshold, . = above).
pub fn intensity_check(values: &[f64; 7], threshold: f64) -> bool {
    if values[0] > threshold || values[1] < threshold {
        return false;
    }
    if values[2] > threshold || values[3] > threshold || values[4] > threshold {
        return false;
    }
    if values[5] < threshold || values[6] > threshold {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_finder_pattern;

    struct StaticQuads(Vec<QuadInfo>);

    impl QuadDetector for StaticQuads {
        fn detect(&mut self, _gray: &GrayImage, _mask: &GrayImage) -> Vec<QuadInfo> {
            self.0.clone()
        }
    }

    fn quad_for_pattern(x0: f64, y0: f64, side_px: f64) -> QuadInfo {
        QuadInfo {
            polygon: vec![
                [x0, y0],
                [x0 + side_px - 1.0, y0],
                [x0 + side_px - 1.0, y0 + side_px - 1.0],
                [x0, y0 + side_px - 1.0],
            ],
            has_internal: true,
            edge_inside: 0.0,
            edge_outside: 255.0,
        }
    }

    fn detector_for(quads: Vec<QuadInfo>, max_version: u32) -> FinderPatternDetector {
        FinderPatternDetector::new(
            Box::new(StaticQuads(quads)),
            FinderConfig::with_max_version(max_version),
        )
    }

    #[test]
    fn intensity_check_truth_table() {
        let t = 5.0;
        assert!(intensity_check(&[0.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0], t));
        // First sample must be dark.
        assert!(!intensity_check(&[10.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0], t));
        // Second and sixth must be light.
        assert!(!intensity_check(&[0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0], t));
        assert!(!intensity_check(&[0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0], t));
        // Middle stone must be dark throughout.
        assert!(!intensity_check(&[0.0, 10.0, 10.0, 0.0, 0.0, 10.0, 0.0], t));
        assert!(!intensity_check(&[0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0], t));
        assert!(!intensity_check(&[0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 0.0], t));
        // Last must be dark.
        assert!(!intensity_check(&[0.0, 10.0, 0.0, 0.0, 0.0, 10.0, 10.0], t));
    }

    #[test]
    fn appearance_accepts_rendered_pattern() {
        let module = 6u32;
        let img = draw_finder_pattern(80, 80, 10, 10, module);
        let det = detector_for(Vec::new(), 2);
        let side = (7 * module) as f64;
        let square = [
            [10.0, 10.0],
            [10.0 + side - 1.0, 10.0],
            [10.0 + side - 1.0, 10.0 + side - 1.0],
            [10.0, 10.0 + side - 1.0],
        ];
        assert!(det.check_appearance(&img, &square, 127.0));
    }

    #[test]
    fn appearance_rejects_solid_square() {
        let img = GrayImage::from_pixel(80, 80, image::Luma([20]));
        let det = detector_for(Vec::new(), 2);
        let square = [[10.0, 10.0], [51.0, 10.0], [51.0, 51.0], [10.0, 51.0]];
        assert!(!det.check_appearance(&img, &square, 127.0));
    }

    #[test]
    fn quads_without_internal_contour_are_skipped() {
        let module = 6u32;
        let img = draw_finder_pattern(80, 80, 10, 10, module);
        let mask = GrayImage::from_pixel(80, 80, image::Luma([255]));
        let mut quad = quad_for_pattern(10.0, 10.0, (7 * module) as f64);
        quad.has_internal = false;
        let mut det = detector_for(vec![quad], 2);
        let graph = det.detect(&img, &mask).unwrap();
        assert!(graph.nodes().is_empty());
    }

    #[test]
    fn malformed_polygon_is_an_input_error() {
        let img = GrayImage::new(20, 20);
        let mask = GrayImage::new(20, 20);
        let quad = QuadInfo {
            polygon: vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]],
            has_internal: true,
            edge_inside: 0.0,
            edge_outside: 255.0,
        };
        let mut det = detector_for(vec![quad], 2);
        assert!(matches!(
            det.detect(&img, &mask),
            Err(DetectError::BadPolygon { expected: 4, got: 3 })
        ));
    }

    // ── Connection test ──────────────────────────────────────────────────

    /// Build a detector whose graph already holds the given squares, then
    /// run the pairwise connection test directly.
    fn detector_with_squares(squares: &[[[f64; 2]; 4]]) -> FinderPatternDetector {
        let mut det = detector_for(Vec::new(), 2);
        for &square in squares {
            let center = geometry::line_intersection(square[0], square[2], square[1], square[3])
                .expect("test square diagonals");
            det.graph.add_node(PositionSquare {
                node: SquareNode::from_square(square, center),
                gray_threshold: 128.0,
            });
        }
        det
    }

    fn axis_square(x0: f64, y0: f64, side: f64) -> [[f64; 2]; 4] {
        [
            [x0, y0],
            [x0 + side, y0],
            [x0 + side, y0 + side],
            [x0, y0 + side],
        ]
    }

    #[test]
    fn perfect_neighbors_connect() {
        let mut det =
            detector_with_squares(&[axis_square(0.0, 0.0, 10.0), axis_square(20.0, 0.0, 10.0)]);
        det.consider_connect(0, 1);
        assert_eq!(det.graph.n_connections(), 1);
        let conn = det.graph.connections().next().unwrap();
        assert_eq!((conn.side_a, conn.side_b), (1, 3));
        assert!((conn.distance_sq - 400.0).abs() < 1e-9);
    }

    #[test]
    fn off_midpoint_intersection_rejects() {
        // Second square dropped so the center line crosses the facing side
        // at fraction 0.1 — outside the ±0.35 midpoint window.
        let mut det =
            detector_with_squares(&[axis_square(0.0, 0.0, 10.0), axis_square(20.0, -16.0, 10.0)]);
        det.consider_connect(0, 1);
        assert_eq!(det.graph.n_connections(), 0);

        // At fraction 0.2 the deviation (0.3) is still inside the window.
        let mut det =
            detector_with_squares(&[axis_square(0.0, 0.0, 10.0), axis_square(20.0, -12.0, 10.0)]);
        det.consider_connect(0, 1);
        assert_eq!(det.graph.n_connections(), 1);
    }

    #[test]
    fn mismatched_side_lengths_reject() {
        // 10 vs 14: relative difference 0.286 > 0.25.
        let mut det =
            detector_with_squares(&[axis_square(0.0, 0.0, 10.0), axis_square(20.0, -2.0, 14.0)]);
        det.consider_connect(0, 1);
        assert_eq!(det.graph.n_connections(), 0);
    }

    #[test]
    fn size_ratio_filter_rejects() {
        // Facing sides 20 vs 15 sit exactly at the side-length tolerance,
        // but the overall size ratio 20/15 exceeds the 1.3 limit.
        let mut det =
            detector_with_squares(&[axis_square(0.0, 0.0, 20.0), axis_square(30.0, 2.5, 15.0)]);
        det.consider_connect(0, 1);
        assert_eq!(det.graph.n_connections(), 0);
    }
}
