//! Uniform-grid 2D index for neighbor queries over candidate centers.
//!
//! Rebuilt from scratch each detection cycle. Candidate counts are small
//! (tens per frame), so a hash-grid keeps queries cheap without the
//! bookkeeping of a k-d tree.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct NeighborIndex {
    cell: f64,
    points: Vec<[f64; 2]>,
    bins: HashMap<(i64, i64), Vec<u32>>,
}

impl NeighborIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn key(&self, p: [f64; 2]) -> (i64, i64) {
        ((p[0] / self.cell).floor() as i64, (p[1] / self.cell).floor() as i64)
    }

    /// Rebuild the index over `points` with the given bin size.
    ///
    /// `cell` should be on the order of the typical query radius; any
    /// positive value is correct. Previously allocated storage is reused.
    pub fn build(&mut self, points: &[[f64; 2]], cell: f64) {
        self.cell = if cell.is_finite() && cell > 0.0 { cell } else { 1.0 };
        self.points.clear();
        self.points.extend_from_slice(points);
        self.bins.clear();
        for (i, &p) in points.iter().enumerate() {
            let key = self.key(p);
            self.bins.entry(key).or_default().push(i as u32);
        }
    }

    /// Collect `(index, squared distance)` of all points within
    /// `radius_sq` of `center` into `out` (cleared first). Includes the
    /// query point itself when it is one of the indexed points.
    pub fn query_within(&self, center: [f64; 2], radius_sq: f64, out: &mut Vec<(usize, f64)>) {
        out.clear();
        if self.points.is_empty() || radius_sq.is_nan() || radius_sq < 0.0 {
            return;
        }
        let r = radius_sq.sqrt();
        let (kx0, ky0) = self.key([center[0] - r, center[1] - r]);
        let (kx1, ky1) = self.key([center[0] + r, center[1] + r]);
        for kx in kx0..=kx1 {
            for ky in ky0..=ky1 {
                let Some(bin) = self.bins.get(&(kx, ky)) else {
                    continue;
                };
                for &i in bin {
                    let p = self.points[i as usize];
                    let dx = p[0] - center[0];
                    let dy = p[1] - center[1];
                    let d2 = dx * dx + dy * dy;
                    if d2 <= radius_sq {
                        out.push((i as usize, d2));
                    }
                }
            }
        }
    }
}
