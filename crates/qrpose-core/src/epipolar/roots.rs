//! Real roots of univariate polynomials via the companion-matrix method.

use nalgebra::linalg::Schur;
use nalgebra::DMatrix;

/// Imaginary-part tolerance below which an eigenvalue counts as a real root.
const IM_EPS: f64 = 1e-8;

/// Relative tolerance for trimming vanishing leading coefficients.
const LEAD_EPS: f64 = 1e-12;

/// All real roots of `c[0] + c[1]·z + … + c[n]·zⁿ`.
///
/// Leading coefficients that vanish relative to the largest coefficient are
/// trimmed first (the corresponding roots escape to infinity). Complex
/// eigenvalue pairs are discarded silently. Returns `None` when the
/// polynomial is identically zero or the eigendecomposition does not
/// converge — both indicate degenerate input upstream.
pub(crate) fn real_roots(coeffs: &[f64]) -> Option<Vec<f64>> {
    let max_mag = coeffs.iter().fold(0.0f64, |m, &c| m.max(c.abs()));
    if max_mag == 0.0 {
        return None;
    }

    let degree = coeffs
        .iter()
        .rposition(|&c| c.abs() > LEAD_EPS * max_mag)?;
    if degree == 0 {
        // Non-zero constant: no roots, but nothing failed either.
        return Some(Vec::new());
    }

    // Companion matrix of the monic polynomial: ones on the subdiagonal,
    // negated normalized coefficients in the last column.
    let lead = coeffs[degree];
    let mut companion = DMatrix::<f64>::zeros(degree, degree);
    for i in 0..degree {
        companion[(i, degree - 1)] = -coeffs[i] / lead;
        if i + 1 < degree {
            companion[(i + 1, i)] = 1.0;
        }
    }

    let schur = Schur::try_new(companion, 1e-12, 1000)?;
    let eigvals = schur.complex_eigenvalues();

    let mut roots: Vec<f64> = eigvals
        .iter()
        .filter(|v| v.im.abs() <= IM_EPS)
        .map(|v| v.re)
        .collect();
    roots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(roots: &[f64], expected: &[f64]) {
        assert_eq!(roots.len(), expected.len(), "roots: {:?}", roots);
        for (r, e) in roots.iter().zip(expected) {
            assert!((r - e).abs() < 1e-8, "root {} vs expected {}", r, e);
        }
    }

    #[test]
    fn cubic_with_known_roots() {
        // (z - 1)(z - 2)(z + 3) = z^3 - 7z + 6
        let roots = real_roots(&[6.0, -7.0, 0.0, 1.0]).unwrap();
        assert_close(&roots, &[-3.0, 1.0, 2.0]);
    }

    #[test]
    fn complex_pair_is_discarded() {
        // (z^2 + 1)(z - 2) = z^3 - 2z^2 + z - 2
        let roots = real_roots(&[-2.0, 1.0, -2.0, 1.0]).unwrap();
        assert_close(&roots, &[2.0]);
    }

    #[test]
    fn vanishing_leading_coefficients_are_trimmed() {
        // Degree-10 storage holding a quadratic: z^2 - 4.
        let mut coeffs = [0.0; 11];
        coeffs[0] = -4.0;
        coeffs[2] = 1.0;
        let roots = real_roots(&coeffs).unwrap();
        assert_close(&roots, &[-2.0, 2.0]);
    }

    #[test]
    fn zero_polynomial_fails() {
        assert!(real_roots(&[0.0; 11]).is_none());
    }

    #[test]
    fn constant_polynomial_has_no_roots() {
        let roots = real_roots(&[5.0, 0.0, 0.0]).unwrap();
        assert!(roots.is_empty());
    }
}
