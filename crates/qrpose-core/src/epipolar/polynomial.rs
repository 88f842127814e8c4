//! Trivariate polynomial machinery for the five-point constraint system.
//!
//! Symbolic manipulation of polynomials in (x, y, z) up to total degree 3,
//! used to expand the essential-matrix constraints over the null-space span
//! E = x·X + y·Y + z·Z + W into ten equations over twenty monomials.

use nalgebra::Matrix3;

/// Monomial ordering for the constraint system.
///
/// Each entry is (x_degree, y_degree, z_degree). The first ten monomials
/// form the eliminated block (coefficients land in A1), the last ten the
/// carried block (A2): grouping by powers of z on the right makes the
/// reduction to a polynomial matrix in z a pure re-indexing step.
pub(crate) const MONOMIALS: [(u8, u8, u8); 20] = [
    (3, 0, 0), // x^3
    (0, 3, 0), // y^3
    (2, 1, 0), // x^2 y
    (1, 2, 0), // x y^2
    (2, 0, 1), // x^2 z
    (2, 0, 0), // x^2
    (0, 2, 1), // y^2 z
    (0, 2, 0), // y^2
    (1, 1, 1), // x y z
    (1, 1, 0), // x y
    (1, 0, 2), // x z^2
    (1, 0, 1), // x z
    (1, 0, 0), // x
    (0, 1, 2), // y z^2
    (0, 1, 1), // y z
    (0, 1, 0), // y
    (0, 0, 3), // z^3
    (0, 0, 2), // z^2
    (0, 0, 1), // z
    (0, 0, 0), // 1
];

/// Index of the (x^dx · y^dy · z^dz) monomial in [`MONOMIALS`].
fn monomial_index(x: u8, y: u8, z: u8) -> Option<usize> {
    MONOMIALS
        .iter()
        .position(|&(mx, my, mz)| mx == x && my == y && mz == z)
}

/// Polynomial in (x, y, z) with total degree ≤ 3, coefficients in
/// [`MONOMIALS`] order.
#[derive(Clone, Copy)]
pub(crate) struct Poly3 {
    pub coeffs: [f64; 20],
}

impl Poly3 {
    pub fn zero() -> Self {
        Self { coeffs: [0.0; 20] }
    }

    /// Linear polynomial c0 + cx·x + cy·y + cz·z.
    pub fn linear(c0: f64, cx: f64, cy: f64, cz: f64) -> Self {
        let mut p = Self::zero();
        p.coeffs[19] = c0;
        p.coeffs[12] = cx;
        p.coeffs[15] = cy;
        p.coeffs[18] = cz;
        p
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        for i in 0..20 {
            out.coeffs[i] = self.coeffs[i] + other.coeffs[i];
        }
        out
    }

    pub fn sub(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        for i in 0..20 {
            out.coeffs[i] = self.coeffs[i] - other.coeffs[i];
        }
        out
    }

    pub fn scale(&self, s: f64) -> Self {
        let mut out = Self::zero();
        for i in 0..20 {
            out.coeffs[i] = self.coeffs[i] * s;
        }
        out
    }

    /// Product truncated to total degree 3. All products formed by the
    /// constraint expansion stay within degree 3, so nothing is lost.
    pub fn mul(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        for (i, &ai) in self.coeffs.iter().enumerate() {
            if ai == 0.0 {
                continue;
            }
            let (ix, iy, iz) = MONOMIALS[i];
            for (j, &bj) in other.coeffs.iter().enumerate() {
                if bj == 0.0 {
                    continue;
                }
                let (jx, jy, jz) = MONOMIALS[j];
                let (dx, dy, dz) = (ix + jx, iy + jy, iz + jz);
                if dx + dy + dz > 3 {
                    continue;
                }
                if let Some(idx) = monomial_index(dx, dy, dz) {
                    out.coeffs[idx] += ai * bj;
                }
            }
        }
        out
    }

    #[cfg(test)]
    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        self.coeffs
            .iter()
            .zip(MONOMIALS.iter())
            .map(|(&c, &(dx, dy, dz))| {
                c * x.powi(dx as i32) * y.powi(dy as i32) * z.powi(dz as i32)
            })
            .sum()
    }
}

type PolyMat3 = [[Poly3; 3]; 3];

fn poly_mat_mul(a: &PolyMat3, b: &PolyMat3) -> PolyMat3 {
    let mut out = [[Poly3::zero(); 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            let mut sum = Poly3::zero();
            for k in 0..3 {
                sum = sum.add(&a[r][k].mul(&b[k][c]));
            }
            out[r][c] = sum;
        }
    }
    out
}

fn poly_transpose(a: &PolyMat3) -> PolyMat3 {
    let mut out = [[Poly3::zero(); 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            out[r][c] = a[c][r];
        }
    }
    out
}

fn poly_det3(a: &PolyMat3) -> Poly3 {
    let term1 = a[0][0].mul(&a[1][1].mul(&a[2][2]).sub(&a[1][2].mul(&a[2][1])));
    let term2 = a[0][1].mul(&a[1][0].mul(&a[2][2]).sub(&a[1][2].mul(&a[2][0])));
    let term3 = a[0][2].mul(&a[1][0].mul(&a[2][1]).sub(&a[1][1].mul(&a[2][0])));
    term1.sub(&term2).add(&term3)
}

/// The ten constraint equations over the twenty monomials.
///
/// Row 0 is det(E) = 0; rows 1–9 are the entries of the trace identity
/// 2·E·Eᵀ·E − trace(E·Eᵀ)·E = 0, with E = x·X + y·Y + z·Z + W.
pub(crate) fn constraint_system(
    xm: &Matrix3<f64>,
    ym: &Matrix3<f64>,
    zm: &Matrix3<f64>,
    wm: &Matrix3<f64>,
) -> [[f64; 20]; 10] {
    let mut e = [[Poly3::zero(); 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            e[r][c] = Poly3::linear(wm[(r, c)], xm[(r, c)], ym[(r, c)], zm[(r, c)]);
        }
    }

    let det = poly_det3(&e);

    let e_t = poly_transpose(&e);
    let eet = poly_mat_mul(&e, &e_t);
    let eet_e = poly_mat_mul(&eet, &e);
    let trace = eet[0][0].add(&eet[1][1]).add(&eet[2][2]);

    let mut eqs = [[0.0; 20]; 10];
    eqs[0] = det.coeffs;

    let mut row = 1;
    for r in 0..3 {
        for c in 0..3 {
            let term = eet_e[r][c].scale(2.0).sub(&trace.mul(&e[r][c]));
            eqs[row] = term.coeffs;
            row += 1;
        }
    }

    eqs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basis() -> [Matrix3<f64>; 4] {
        [
            Matrix3::new(0.3, -0.1, 0.7, 0.2, 0.5, -0.4, -0.6, 0.1, 0.2),
            Matrix3::new(-0.2, 0.4, 0.1, 0.9, -0.3, 0.2, 0.05, 0.6, -0.1),
            Matrix3::new(0.1, 0.2, -0.5, -0.3, 0.4, 0.6, 0.2, -0.7, 0.3),
            Matrix3::new(0.6, 0.1, 0.2, -0.1, 0.3, 0.5, 0.4, -0.2, -0.3),
        ]
    }

    /// The symbolic expansion evaluated at a point must equal the same
    /// constraint computed numerically on the assembled matrix.
    #[test]
    fn expansion_matches_numeric_constraints() {
        let [xm, ym, zm, wm] = basis();
        let (x, y, z) = (0.37, -1.21, 0.84);
        let e = xm * x + ym * y + zm * z + wm;

        let eqs = constraint_system(&xm, &ym, &zm, &wm);
        let at = |row: &[f64; 20]| {
            row.iter()
                .zip(MONOMIALS.iter())
                .map(|(&c, &(dx, dy, dz))| {
                    c * x.powi(dx as i32) * y.powi(dy as i32) * z.powi(dz as i32)
                })
                .sum::<f64>()
        };

        let det_num = e.determinant();
        assert!((at(&eqs[0]) - det_num).abs() < 1e-10);

        let eet = e * e.transpose();
        let numeric = e * e.transpose() * e * 2.0 - e * eet.trace();
        let mut row = 1;
        for r in 0..3 {
            for c in 0..3 {
                assert!(
                    (at(&eqs[row]) - numeric[(r, c)]).abs() < 1e-10,
                    "trace identity row {} mismatch",
                    row
                );
                row += 1;
            }
        }
    }

    #[test]
    fn linear_and_mul_agree_with_eval() {
        let p = Poly3::linear(1.0, 2.0, 3.0, 4.0);
        let q = p.mul(&p);
        let (x, y, z) = (0.5, -0.25, 2.0);
        let pv = 1.0 + 2.0 * x + 3.0 * y + 4.0 * z;
        assert!((p.eval(x, y, z) - pv).abs() < 1e-12);
        assert!((q.eval(x, y, z) - pv * pv).abs() < 1e-12);
    }
}
