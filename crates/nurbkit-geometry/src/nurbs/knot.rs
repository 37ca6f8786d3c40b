//! Knot vectors and B-spline basis functions.

use nurbkit_core::traits::Validate;
use nurbkit_core::{KernelError, Result};
use serde::{Deserialize, Serialize};

/// Find the knot span index for parameter `t` in the knot vector.
///
/// Returns the index `i` such that `knots[i] <= t < knots[i+1]`,
/// with the upper domain boundary mapped to the last non-empty span.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `n` - Number of control points minus 1
/// * `t` - Parameter value, assumed to lie in the domain
pub fn find_span(degree: usize, knots: &[f64], n: usize, t: f64) -> usize {
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;

    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }

    mid
}

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns `degree + 1` values N_{span-degree,degree}(t) through N_{span,degree}(t).
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `span` - The knot span index (from `find_span`)
/// * `t` - Parameter value
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute the non-vanishing basis functions and their derivatives up to `order`.
///
/// Returns `ders` where `ders[k][j]` is the k-th derivative of N_{span-degree+j,degree}
/// at `t`. Rows for `k > degree` are identically zero.
pub fn basis_derivatives(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;

    // ndu holds basis values in the upper triangle and knot differences in the lower one
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; order + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = order.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0usize;
        let mut s2 = 1usize;
        a[0][0] = 1.0;

        for k in 1..=top {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if r >= k {
                a[s2][0] = a[s1][0] / ndu[pk + 1][r - k];
                d = a[s2][0] * ndu[r - k][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Multiply through by p! / (p-k)!
    let mut factor = p as f64;
    for k in 1..=top {
        for val in &mut ders[k] {
            *val *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Build a clamped uniform knot vector on `[0, 1]`.
///
/// The result has `degree + 1` zeros, `n_control_points - degree - 1` uniformly
/// spaced interior knots, and `degree + 1` ones.
pub fn build_open_knot_vector(n_control_points: usize, degree: usize) -> Result<KnotVector> {
    if degree < 1 || n_control_points <= degree {
        return Err(KernelError::InvalidDegree {
            degree,
            count: n_control_points,
        });
    }

    let segments = n_control_points - degree;
    let mut knots = Vec::with_capacity(n_control_points + degree + 1);
    knots.extend(std::iter::repeat(0.0).take(degree + 1));
    knots.extend((1..segments).map(|k| k as f64 / segments as f64));
    knots.extend(std::iter::repeat(1.0).take(degree + 1));

    Ok(KnotVector { knots })
}

/// Non-decreasing sequence of knot values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotVector {
    knots: Vec<f64>,
}

impl KnotVector {
    /// Wrap an explicit knot sequence, rejecting non-finite or decreasing values.
    pub fn new(knots: Vec<f64>) -> Result<Self> {
        let kv = Self { knots };
        kv.validate()?;
        Ok(kv)
    }

    /// Build a knot vector from distinct values and their multiplicities.
    pub fn from_multiplicities(values: &[f64], multiplicities: &[usize]) -> Result<Self> {
        if values.len() != multiplicities.len() {
            return Err(KernelError::InvalidKnotVector(format!(
                "{} knot values but {} multiplicities",
                values.len(),
                multiplicities.len()
            )));
        }
        if let Some(pos) = multiplicities.iter().position(|&m| m == 0) {
            return Err(KernelError::InvalidKnotVector(format!(
                "zero multiplicity at knot {pos}"
            )));
        }
        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(KernelError::InvalidKnotVector(
                "distinct knot values must be strictly increasing".into(),
            ));
        }

        let knots = values
            .iter()
            .zip(multiplicities)
            .flat_map(|(&value, &mult)| std::iter::repeat(value).take(mult))
            .collect();
        Self::new(knots)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.knots
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.knots[0]
    }

    pub fn last(&self) -> f64 {
        self.knots[self.knots.len() - 1]
    }

    /// Number of control points this knot vector supports at `degree`.
    pub fn control_point_count(&self, degree: usize) -> usize {
        self.knots.len().saturating_sub(degree + 1)
    }

    /// Valid parameter range `(knots[p], knots[m - p - 1])`.
    pub fn domain(&self, degree: usize) -> (f64, f64) {
        (self.knots[degree], self.knots[self.knots.len() - degree - 1])
    }

    /// Whether the first and last knots each appear `degree + 1` times.
    pub fn is_clamped(&self, degree: usize) -> bool {
        let m = self.knots.len();
        if m < 2 * (degree + 1) {
            return false;
        }
        let (first, last) = (self.first(), self.last());
        self.knots[..=degree].iter().all(|&k| k == first)
            && self.knots[m - degree - 1..].iter().all(|&k| k == last)
    }

    /// Knot span containing `t`. Fails when the vector is too short to carry
    /// more than `degree` control points.
    pub fn find_span(&self, degree: usize, t: f64) -> Result<usize> {
        let count = self.control_point_count(degree);
        if degree < 1 || count <= degree {
            return Err(KernelError::InvalidDegree { degree, count });
        }
        Ok(find_span(degree, &self.knots, count - 1, t))
    }

    pub fn basis_functions(&self, degree: usize, span: usize, t: f64) -> Vec<f64> {
        basis_functions(degree, &self.knots, span, t)
    }

    pub fn basis_derivatives(
        &self,
        degree: usize,
        span: usize,
        t: f64,
        order: usize,
    ) -> Vec<Vec<f64>> {
        basis_derivatives(degree, &self.knots, span, t, order)
    }

    /// Check that this knot vector can carry `n_control_points` at `degree`.
    pub fn check_sizing(&self, n_control_points: usize, degree: usize) -> Result<()> {
        if degree < 1 || n_control_points <= degree {
            return Err(KernelError::InvalidDegree {
                degree,
                count: n_control_points,
            });
        }
        let expected = n_control_points + degree + 1;
        if self.knots.len() != expected {
            return Err(KernelError::InvalidKnotVector(format!(
                "expected {expected} knots for {n_control_points} control points \
                 of degree {degree}, got {}",
                self.knots.len()
            )));
        }
        if !self.is_clamped(degree) {
            return Err(KernelError::InvalidKnotVector(format!(
                "end knots must have multiplicity {}",
                degree + 1
            )));
        }
        Ok(())
    }
}

impl Validate for KnotVector {
    fn validate(&self) -> Result<()> {
        if self.knots.len() < 2 {
            return Err(KernelError::InvalidKnotVector(format!(
                "need at least 2 knots, got {}",
                self.knots.len()
            )));
        }
        if let Some(pos) = self.knots.iter().position(|k| !k.is_finite()) {
            return Err(KernelError::InvalidKnotVector(format!(
                "non-finite knot at index {pos}"
            )));
        }
        if let Some(pos) = self.knots.windows(2).position(|w| w[0] > w[1]) {
            return Err(KernelError::InvalidKnotVector(format!(
                "knots decrease at index {}",
                pos + 1
            )));
        }
        if self.first() == self.last() {
            return Err(KernelError::InvalidKnotVector("empty parameter range".into()));
        }
        Ok(())
    }
}
