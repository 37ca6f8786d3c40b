//! Building surfaces from point grids.

use nurbkit_core::{KernelError, Result};
use nurbkit_math::Point3;

use super::NurbsSurface;
use crate::nurbs::{build_open_knot_vector, ControlPoint};

impl NurbsSurface {
    /// Build a surface whose control net is the given grid of points.
    ///
    /// `points` is row-major by u then v: `points[i * nv + j]` is control point
    /// `(i, j)`. Both knot vectors are clamped and uniform on `[0, 1]`, so the
    /// four corner points are interpolated.
    pub fn from_point_grid(
        points: &[Point3],
        nu: usize,
        nv: usize,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        let expected = nu.checked_mul(nv).ok_or(KernelError::DimensionMismatch {
            expected: usize::MAX,
            actual: points.len(),
        })?;
        if points.len() != expected {
            return Err(KernelError::DimensionMismatch {
                expected,
                actual: points.len(),
            });
        }

        let knots_u = build_open_knot_vector(nu, degree_u)?;
        let knots_v = build_open_knot_vector(nv, degree_v)?;

        let grid = points
            .chunks_exact(nv)
            .map(|row| row.iter().copied().map(ControlPoint::new).collect())
            .collect();

        Self::new(degree_u, degree_v, knots_u, knots_v, grid)
    }

    /// Control point positions flattened row-major by u then v.
    pub fn control_points(&self) -> Vec<Point3> {
        self.control_grid()
            .iter()
            .flat_map(|row| row.iter().map(|cp| cp.position))
            .collect()
    }
}
