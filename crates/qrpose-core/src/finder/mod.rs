//! Finder-pattern detection: appearance filtering of quadrilateral
//! candidates and proximity-graph construction.
//!
//! The pipeline stages are:
//!
//! 1. **Quads** – an upstream polygon stage ([`QuadDetector`]) supplies
//!    4-sided candidates with inside/outside edge intensity statistics.
//! 2. **Appearance** – each quad is rectified to a canonical square and its
//!    mid-lines sampled for the dark-light-dark-dark-dark-light-dark
//!    signature of a position pattern.
//! 3. **Graph** – surviving squares become graph nodes; neighbor queries
//!    within a version-bounded radius propose connections, filtered by
//!    midpoint, side-length, parallelism and size-ratio tests.

pub mod detector;
pub mod graph;
pub mod nn;

pub use detector::FinderPatternDetector;

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// One quadrilateral candidate reported by the upstream polygon stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadInfo {
    /// Polygon vertices with consistent winding. Must be exactly 4.
    pub polygon: Vec<[f64; 2]>,
    /// Whether an internal contour (hole) was found inside the polygon.
    /// Position patterns are concentric, so candidates without one are
    /// discarded immediately.
    pub has_internal: bool,
    /// Mean intensity sampled just inside the polygon edges.
    pub edge_inside: f64,
    /// Mean intensity sampled just outside the polygon edges.
    pub edge_outside: f64,
}

/// Upstream polygon-detection collaborator.
///
/// Consumes the grayscale image and its co-registered binary mask and
/// yields quadrilateral candidates. Kept as a trait so the detector can be
/// driven by a real contour-based detector or by precomputed candidates.
pub trait QuadDetector {
    fn detect(&mut self, gray: &GrayImage, mask: &GrayImage) -> Vec<QuadInfo>;
}

/// Tuning knobs for finder-pattern detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Largest marker version considered when bounding the neighbor search
    /// radius. A version-v code spans 21 + 4·(v − 1) modules; a position
    /// pattern spans 7.
    pub max_version: u32,
    /// Maximum deviation of the connection point from a side's midpoint,
    /// as a fraction of the side length.
    pub midpoint_tol: f64,
    /// Maximum relative difference between the two connected side lengths.
    pub side_length_tol: f64,
    /// Maximum smallest-side/largest-side ratio between connected squares.
    pub size_ratio_max: f64,
    /// Fudge factor widening the neighbor search radius.
    pub search_fudge: f64,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            max_version: 40,
            midpoint_tol: 0.35,
            side_length_tol: 0.25,
            size_ratio_max: 1.3,
            search_fudge: 1.2,
        }
    }
}

impl FinderConfig {
    /// Config bounded to a given maximum version.
    pub fn with_max_version(max_version: u32) -> Self {
        Self {
            max_version,
            ..Self::default()
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// The polygon stage handed over a candidate that is not a
    /// quadrilateral. Caller's fault, propagated immediately.
    BadPolygon { expected: usize, got: usize },
    /// An invariant that valid inputs cannot violate did (e.g. the
    /// diagonals of a quadrilateral failing to intersect). Indicates a
    /// logic bug upstream, never silently swallowed.
    Internal(String),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadPolygon { expected, got } => {
                write!(f, "polygon must have {} vertices, got {}", expected, got)
            }
            Self::Internal(msg) => write!(f, "internal invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for DetectError {}
