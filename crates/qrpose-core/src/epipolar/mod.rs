//! Minimal-solver epipolar geometry.
//!
//! [`FivePointSolver`] estimates essential matrix candidates from five or
//! more point correspondences in normalized (z = 1) camera coordinates by
//! linearizing the problem and extracting the roots of a degree-10
//! polynomial. The approach follows Nistér's relative-pose solver:
//!
//! 1. **Span** – SVD null space of the epipolar design matrix gives a
//!    4-vector basis E = x·X + y·Y + z·Z + W.
//! 2. **Constraints** – det(E) = 0 and the trace identity produce ten cubic
//!    equations in (x, y, z).
//! 3. **Elimination** – a direct linear solve reduces the system to a 3×3
//!    polynomial matrix in z whose determinant has degree 10.
//! 4. **Roots** – companion-matrix eigenvalues; each real root
//!    back-substitutes into a 2×2 system for (x, y).

mod essential;
pub(crate) mod polynomial;
pub(crate) mod roots;

pub use essential::FivePointSolver;

use serde::{Deserialize, Serialize};

/// A point correspondence between two views.
///
/// Both points are in normalized image coordinates: pixel coordinates with
/// the camera intrinsics removed, homogeneous z = 1 implied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Observation in the first view.
    pub p1: [f64; 2],
    /// Observation of the same feature in the second view.
    pub p2: [f64; 2],
}

impl Correspondence {
    pub fn new(p1: [f64; 2], p2: [f64; 2]) -> Self {
        Self { p1, p2 }
    }
}

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EpipolarError {
    /// Fewer correspondences than the minimal problem requires.
    TooFewPairs { needed: usize, got: usize },
    /// A decomposition or linear solve failed; the geometry is degenerate
    /// (e.g. collinear or coplanar points). Not retried.
    NumericalFailure(String),
}

impl std::fmt::Display for EpipolarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPairs { needed, got } => {
                write!(f, "too few correspondences: need {}, got {}", needed, got)
            }
            Self::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
        }
    }
}

impl std::error::Error for EpipolarError {}

/// Worst epipolar residual max |p2ᵀ·E·p1| of a candidate over a pair set.
pub fn epipolar_residual(e: &nalgebra::Matrix3<f64>, pairs: &[Correspondence]) -> f64 {
    let mut worst = 0.0f64;
    for pair in pairs {
        let p1 = nalgebra::Vector3::new(pair.p1[0], pair.p1[1], 1.0);
        let p2 = nalgebra::Vector3::new(pair.p2[0], pair.p2[1], 1.0);
        let r = (p2.transpose() * e * p1)[0].abs();
        worst = worst.max(r);
    }
    worst
}
