use nurbkit_core::{KernelError, Result};
use nurbkit_math::{to_homogeneous, Point3, Point4};
use serde::{Deserialize, Serialize};

/// A control point with a rational weight. Weight 1.0 means non-rational.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub position: Point3,
    pub weight: f64,
}

impl ControlPoint {
    pub fn new(position: Point3) -> Self {
        Self {
            position,
            weight: 1.0,
        }
    }

    pub fn weighted(position: Point3, weight: f64) -> Self {
        Self { position, weight }
    }

    /// The point in homogeneous coordinates `(w*x, w*y, w*z, w)`.
    #[inline]
    pub fn homogeneous(&self) -> Point4 {
        to_homogeneous(self.position, self.weight)
    }
}

impl From<Point3> for ControlPoint {
    fn from(position: Point3) -> Self {
        Self::new(position)
    }
}

/// Reject non-finite positions and non-positive or non-finite weights.
/// `index` in the error is the position in iteration order.
pub(crate) fn check_control_points<'a>(
    points: impl IntoIterator<Item = &'a ControlPoint>,
) -> Result<()> {
    for (index, cp) in points.into_iter().enumerate() {
        if !cp.position.is_finite() {
            return Err(KernelError::NonFinitePoint { index });
        }
        if !(cp.weight.is_finite() && cp.weight > 0.0) {
            return Err(KernelError::InvalidWeight {
                index,
                weight: cp.weight,
            });
        }
    }
    Ok(())
}

/// Whether any weight differs from 1.0.
pub(crate) fn any_rational<'a>(points: impl IntoIterator<Item = &'a ControlPoint>) -> bool {
    points.into_iter().any(|cp| cp.weight != 1.0)
}
