//! Five-point essential matrix solver.

use nalgebra::{DMatrix, Matrix3};

use super::polynomial::constraint_system;
use super::roots::real_roots;
use super::{Correspondence, EpipolarError};

/// Relative pivot-ratio threshold below which the eliminated constraint
/// system counts as singular (degenerate point configuration).
const PIVOT_EPS: f64 = 1e-12;

/// One row of the 3×3 polynomial matrix B(z) with B·[x, y, 1]ᵀ = 0.
///
/// Coefficients are stored constant-first; the x and y entries are cubic in
/// z, the constant entry quartic.
struct BRow {
    x: [f64; 4],
    y: [f64; 4],
    c: [f64; 5],
}

/// Finds essential matrices from five or more point correspondences.
///
/// Returns up to ten candidates; selecting the physically valid one (by
/// cheirality or reprojection against extra correspondences) is left to the
/// caller. Inputs must be in normalized camera coordinates.
///
/// The solver owns its matrix workspace, so a single instance can process
/// many correspondence sets without reallocating. Calls take `&mut self`;
/// share across threads via per-thread instances or external locking.
#[derive(Debug)]
pub struct FivePointSolver {
    q: DMatrix<f64>,
    a1: DMatrix<f64>,
    a2: DMatrix<f64>,
}

impl Default for FivePointSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FivePointSolver {
    pub fn new() -> Self {
        Self {
            q: DMatrix::zeros(9, 9),
            a1: DMatrix::zeros(10, 10),
            a2: DMatrix::zeros(10, 10),
        }
    }

    /// Estimate essential matrix candidates from `pairs`.
    ///
    /// Each candidate satisfies p2ᵀ·E·p1 ≈ 0 over the inputs. Zero
    /// candidates (all roots complex) is a valid outcome; degenerate
    /// geometry raises [`EpipolarError::NumericalFailure`] instead of
    /// producing spurious solutions.
    pub fn solve(&mut self, pairs: &[Correspondence]) -> Result<Vec<Matrix3<f64>>, EpipolarError> {
        if pairs.len() < 5 {
            return Err(EpipolarError::TooFewPairs {
                needed: 5,
                got: pairs.len(),
            });
        }

        let [xm, ym, zm, wm] = self.solution_span(pairs)?;

        // Ten cubic constraints over twenty monomials; the left block holds
        // the eliminated monomials, the (negated) right block the carried
        // x/y/z tail.
        let eqs = constraint_system(&xm, &ym, &zm, &wm);
        for r in 0..10 {
            for c in 0..10 {
                self.a1[(r, c)] = eqs[r][c];
                self.a2[(r, c)] = -eqs[r][c + 10];
            }
        }

        // Direct LU solve of A1·C = A2 in place of Gauss-Jordan elimination.
        let lu = self.a1.clone().lu();
        let u = lu.u();
        let mut pivot_min = f64::INFINITY;
        let mut pivot_max = 0.0f64;
        for i in 0..10 {
            let d = u[(i, i)].abs();
            pivot_min = pivot_min.min(d);
            pivot_max = pivot_max.max(d);
        }
        if pivot_max == 0.0 || pivot_min < PIVOT_EPS * pivot_max {
            return Err(EpipolarError::NumericalFailure(
                "constraint system is singular (degenerate correspondences)".into(),
            ));
        }
        let c = lu.solve(&self.a2).ok_or_else(|| {
            EpipolarError::NumericalFailure("constraint system solve failed".into())
        })?;

        let row = |i: usize| -> [f64; 10] { std::array::from_fn(|j| c[(i, j)]) };

        // Eliminate the quadratic monomials: z·row(x²) − row(x²z) and the
        // y²/xy analogues leave equations linear in x and y with polynomial
        // coefficients in z.
        let bk = eliminate(&row(5), &row(4));
        let bl = eliminate(&row(7), &row(6));
        let bm = eliminate(&row(9), &row(8));

        let poly = determinant_poly(&bk, &bl, &bm);
        let zs = real_roots(&poly).ok_or_else(|| {
            EpipolarError::NumericalFailure("companion-matrix root extraction failed".into())
        })?;

        let mut candidates = Vec::with_capacity(zs.len());
        for z in zs {
            // Near-singular back-substitution means this root does not
            // correspond to a usable solution; skip it silently.
            let Some((x, y)) = solve_xy(&bk, &bl, z) else {
                continue;
            };
            candidates.push(xm * x + ym * y + zm * z + wm);
        }
        Ok(candidates)
    }

    /// The 4-vector span [X, Y, Z, W] containing E, from the right null
    /// space of the epipolar design matrix.
    fn solution_span(
        &mut self,
        pairs: &[Correspondence],
    ) -> Result<[Matrix3<f64>; 4], EpipolarError> {
        // Pad with zero rows up to 9×9 so the full right-singular basis is
        // available even for the minimal five-row case.
        let rows = pairs.len().max(9);
        self.q.resize_mut(rows, 9, 0.0);
        self.q.fill(0.0);

        for (i, pair) in pairs.iter().enumerate() {
            let [bx, by] = pair.p1;
            let [ax, ay] = pair.p2;
            self.q[(i, 0)] = ax * bx;
            self.q[(i, 1)] = ax * by;
            self.q[(i, 2)] = ax;
            self.q[(i, 3)] = ay * bx;
            self.q[(i, 4)] = ay * by;
            self.q[(i, 5)] = ay;
            self.q[(i, 6)] = bx;
            self.q[(i, 7)] = by;
            self.q[(i, 8)] = 1.0;
        }

        let svd = self.q.clone().svd(true, true);
        let v_t = svd.v_t.ok_or_else(|| {
            EpipolarError::NumericalFailure("SVD of the epipolar design matrix failed".into())
        })?;

        // Order singular values ascending explicitly; nalgebra makes no
        // ordering promise and the over-determined case depends on it.
        let sv = &svd.singular_values;
        let mut order: Vec<usize> = (0..sv.len()).collect();
        order.sort_by(|&a, &b| sv[a].partial_cmp(&sv[b]).unwrap_or(std::cmp::Ordering::Equal));

        // The solution span is 4-dimensional only when the constraints fill
        // the remaining 5 dimensions. A wider null space (collinear or
        // repeated points) would smuggle arbitrary matrices into the span
        // and must fail instead.
        let largest = sv[order[order.len() - 1]];
        let guard = sv[order[4]];
        if largest <= 0.0 || guard < 1e-10 * largest {
            return Err(EpipolarError::NumericalFailure(
                "rank-deficient design matrix (degenerate correspondences)".into(),
            ));
        }

        let mat = |i: usize| -> Matrix3<f64> {
            Matrix3::from_fn(|r, c| v_t[(order[i], 3 * r + c)])
        };
        // W takes the smallest singular value, X the fourth-smallest.
        Ok([mat(3), mat(2), mat(1), mat(0)])
    }
}

/// Combine the C-rows of a z·quadratic and its plain quadratic partner into
/// one B(z) row: z·u − v over the carried monomial tail
/// [xz², xz, x, yz², yz, y, z³, z², z, 1].
fn eliminate(u: &[f64; 10], v: &[f64; 10]) -> BRow {
    BRow {
        x: [-v[2], u[2] - v[1], u[1] - v[0], u[0]],
        y: [-v[5], u[5] - v[4], u[4] - v[3], u[3]],
        c: [-v[9], u[9] - v[8], u[8] - v[7], u[7] - v[6], u[6]],
    }
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

fn poly_sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len().max(b.len())];
    for (i, &ai) in a.iter().enumerate() {
        out[i] += ai;
    }
    for (i, &bi) in b.iter().enumerate() {
        out[i] -= bi;
    }
    out
}

fn poly_add(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len().max(b.len())];
    for (i, &ai) in a.iter().enumerate() {
        out[i] += ai;
    }
    for (i, &bi) in b.iter().enumerate() {
        out[i] += bi;
    }
    out
}

fn poly_eval(coeffs: &[f64], z: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * z + c)
}

/// det B(z): the degree-10 polynomial whose real roots give z.
fn determinant_poly(k: &BRow, l: &BRow, m: &BRow) -> [f64; 11] {
    let minor_x = poly_sub(&poly_mul(&l.y, &m.c), &poly_mul(&l.c, &m.y));
    let minor_y = poly_sub(&poly_mul(&l.x, &m.c), &poly_mul(&l.c, &m.x));
    let minor_c = poly_sub(&poly_mul(&l.x, &m.y), &poly_mul(&l.y, &m.x));

    let det = poly_add(
        &poly_sub(&poly_mul(&k.x, &minor_x), &poly_mul(&k.y, &minor_y)),
        &poly_mul(&k.c, &minor_c),
    );

    let mut out = [0.0; 11];
    for (i, &c) in det.iter().take(11).enumerate() {
        out[i] = c;
    }
    out
}

/// Solve the 2×2 system from the first two B(z) rows at a fixed z.
fn solve_xy(k: &BRow, l: &BRow, z: f64) -> Option<(f64, f64)> {
    let b11 = poly_eval(&k.x, z);
    let b12 = poly_eval(&k.y, z);
    let b13 = poly_eval(&k.c, z);
    let b21 = poly_eval(&l.x, z);
    let b22 = poly_eval(&l.y, z);
    let b23 = poly_eval(&l.c, z);

    let denom = b11 * b22 - b12 * b21;
    let scale = b11.abs().max(b12.abs()).max(b21.abs()).max(b22.abs());
    if scale == 0.0 || denom.abs() <= 1e-12 * scale * scale {
        return None;
    }
    let x = (b12 * b23 - b22 * b13) / denom;
    let y = (b21 * b13 - b11 * b23) / denom;
    Some((x, y))
}
