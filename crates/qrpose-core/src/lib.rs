//! qrpose-core — minimal-solver relative pose and QR position-pattern
//! detection.
//!
//! Two independent, self-contained algorithm families share this crate:
//!
//! 1. **Epipolar** – [`FivePointSolver`] recovers up to ten essential
//!    matrix candidates from five or more normalized point correspondences
//!    via null-space expansion, a ten-equation cubic constraint system and
//!    companion-matrix root extraction.
//! 2. **Finder** – [`FinderPatternDetector`] filters quadrilateral
//!    candidates by their rectified intensity signature and links
//!    neighboring position patterns into a [`PatternGraph`].
//!
//! Both are synchronous call-and-return algorithms with per-instance
//! workspaces: no I/O, no global state, no internal parallelism. Wrap an
//! instance in a mutex or keep one per thread for concurrent use.

pub mod epipolar;
pub mod finder;
pub mod geometry;
pub mod homography;
pub mod sampling;

#[cfg(test)]
mod test_utils;

pub use epipolar::{epipolar_residual, Correspondence, EpipolarError, FivePointSolver};
pub use finder::graph::{Connection, GraphExport, PatternGraph, PositionSquare, SquareNode};
pub use finder::{DetectError, FinderConfig, FinderPatternDetector, QuadDetector, QuadInfo};
pub use homography::HomographyError;
pub use sampling::{Bilinear, PixelSampler};
