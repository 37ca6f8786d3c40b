//! NURBS curve model.

use log::debug;
use nurbkit_core::traits::{BoundingBox, Validate};
use nurbkit_core::{KernelError, Result, Tolerance};
use nurbkit_math::{Aabb3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::nurbs::control_point::{any_rational, check_control_points};
use crate::nurbs::{build_open_knot_vector, deboor, ControlPoint, KnotVector};
use crate::sampling::uniform_parameters;

/// A NURBS (Non-Uniform Rational B-Spline) curve with a clamped knot vector.
///
/// Immutable once built; every constructor checks
/// `control_points.len() == knots.len() - degree - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    degree: usize,
    knots: KnotVector,
    control_points: Vec<ControlPoint>,
}

impl NurbsCurve {
    pub fn new(
        degree: usize,
        knots: KnotVector,
        control_points: Vec<ControlPoint>,
    ) -> Result<Self> {
        let curve = Self {
            degree,
            knots,
            control_points,
        };
        curve.validate()?;
        debug!(
            "NURBS curve: degree {}, {} control points, rational={}",
            curve.degree,
            curve.control_points.len(),
            curve.is_rational()
        );
        Ok(curve)
    }

    /// Use `points` directly as control points over a clamped uniform knot vector.
    pub fn from_points(points: &[Point3], degree: usize) -> Result<Self> {
        let knots = build_open_knot_vector(points.len(), degree)?;
        Self::new(
            degree,
            knots,
            points.iter().copied().map(ControlPoint::new).collect(),
        )
    }

    /// Like [`NurbsCurve::from_points`] with one weight per point.
    pub fn from_weighted_points(points: &[Point3], weights: &[f64], degree: usize) -> Result<Self> {
        let control_points = zip_weights(points, weights)?;
        let knots = build_open_knot_vector(points.len(), degree)?;
        Self::new(degree, knots, control_points)
    }

    /// Build from distinct knot values and multiplicities.
    pub fn from_knots_and_multiplicities(
        points: &[Point3],
        weights: &[f64],
        knot_values: &[f64],
        multiplicities: &[usize],
        degree: usize,
    ) -> Result<Self> {
        let control_points = zip_weights(points, weights)?;
        let knots = KnotVector::from_multiplicities(knot_values, multiplicities)?;
        Self::new(degree, knots, control_points)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    pub fn is_rational(&self) -> bool {
        any_rational(&self.control_points)
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn domain(&self) -> (f64, f64) {
        self.knots.domain(self.degree)
    }

    fn check_parameter(&self, t: f64) -> Result<f64> {
        let (min, max) = self.domain();
        Tolerance::default()
            .snap_parameter(t, min, max)
            .ok_or(KernelError::ParameterOutOfRange { param: t, min, max })
    }

    /// Evaluate the curve at `t`.
    pub fn evaluate(&self, t: f64) -> Result<Point3> {
        let t = self.check_parameter(t)?;
        Ok(deboor::curve_point(
            self.degree,
            self.knots.as_slice(),
            &self.control_points,
            t,
        ))
    }

    /// First derivative `dC/dt` at `t`.
    pub fn derivative(&self, t: f64) -> Result<Vector3> {
        let t = self.check_parameter(t)?;
        Ok(deboor::curve_derivative(
            self.degree,
            self.knots.as_slice(),
            &self.control_points,
            t,
        ))
    }

    /// Evaluate at `count` uniformly spaced parameters, endpoints included.
    pub fn sample(&self, count: usize) -> Result<Vec<Point3>> {
        if count < 2 {
            return Err(KernelError::InvalidSampleCount { count, min: 2 });
        }
        let (min, max) = self.domain();
        Ok(uniform_parameters(min, max, count)
            .into_iter()
            .map(|t| {
                deboor::curve_point(self.degree, self.knots.as_slice(), &self.control_points, t)
            })
            .collect())
    }
}

fn zip_weights(points: &[Point3], weights: &[f64]) -> Result<Vec<ControlPoint>> {
    if points.len() != weights.len() {
        return Err(KernelError::DimensionMismatch {
            expected: points.len(),
            actual: weights.len(),
        });
    }
    Ok(points
        .iter()
        .zip(weights)
        .map(|(&p, &w)| ControlPoint::weighted(p, w))
        .collect())
}

impl Validate for NurbsCurve {
    fn validate(&self) -> Result<()> {
        self.knots.validate()?;
        self.knots.check_sizing(self.control_points.len(), self.degree)?;
        check_control_points(&self.control_points)
    }
}

impl BoundingBox for NurbsCurve {
    type Point = Point3;

    /// Bounding box of the control polygon, which contains the curve.
    fn bounding_box(&self) -> (Point3, Point3) {
        let aabb = Aabb3::from_points(self.control_points.iter().map(|cp| &cp.position))
            .unwrap_or(Aabb3::new(Point3::ZERO, Point3::ZERO));
        (aabb.min, aabb.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nurbkit_math::dvec3;

    fn wave_points() -> Vec<Point3> {
        vec![
            dvec3(0.0, 0.0, 0.0),
            dvec3(10.0, 20.0, 0.0),
            dvec3(20.0, -10.0, 0.0),
            dvec3(30.0, 20.0, 0.0),
            dvec3(40.0, -10.0, 0.0),
            dvec3(50.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_quadratic_bezier() {
        let curve = NurbsCurve::from_points(
            &[dvec3(0.0, 0.0, 0.0), dvec3(0.5, 1.0, 0.0), dvec3(1.0, 0.0, 0.0)],
            2,
        )
        .unwrap();

        // At t=0.5: 0.25*P0 + 0.5*P1 + 0.25*P2 = (0.5, 0.5, 0)
        let pm = curve.evaluate(0.5).unwrap();
        assert!((pm - dvec3(0.5, 0.5, 0.0)).length() < 1e-10);
    }

    #[test]
    fn test_endpoint_interpolation() {
        let weights = [1.0, 2.0, 0.8, 2.0, 0.8, 1.0];
        let curve = NurbsCurve::from_knots_and_multiplicities(
            &wave_points(),
            &weights,
            &[0.0, 0.25, 0.75, 1.0],
            &[4, 1, 1, 4],
            3,
        )
        .unwrap();
        assert!(curve.is_rational());

        let (t0, t1) = curve.domain();
        let pts = wave_points();
        assert!((curve.evaluate(t0).unwrap() - pts[0]).length() < 1e-12);
        assert!((curve.evaluate(t1).unwrap() - pts[5]).length() < 1e-12);
    }

    #[test]
    fn test_evaluate_out_of_range() {
        let curve = NurbsCurve::from_points(&wave_points(), 3).unwrap();
        assert!(matches!(
            curve.evaluate(1.5),
            Err(KernelError::ParameterOutOfRange { param, .. }) if param == 1.5
        ));
        assert!(curve.evaluate(-0.01).is_err());
        assert!(curve.evaluate(f64::NAN).is_err());
    }

    #[test]
    fn test_sample_count_and_endpoints() {
        let curve = NurbsCurve::from_points(&wave_points(), 3).unwrap();
        let samples = curve.sample(50).unwrap();
        assert_eq!(samples.len(), 50);
        assert!((samples[0] - wave_points()[0]).length() < 1e-12);
        assert!((samples[49] - wave_points()[5]).length() < 1e-12);

        assert_eq!(
            curve.sample(1),
            Err(KernelError::InvalidSampleCount { count: 1, min: 2 })
        );
    }

    #[test]
    fn test_nurbs_circle() {
        // Unit circle as a degree-2 NURBS with 9 control points
        let w = 1.0_f64 / 2.0_f64.sqrt();
        let curve = NurbsCurve::from_knots_and_multiplicities(
            &[
                dvec3(1.0, 0.0, 0.0),
                dvec3(1.0, 1.0, 0.0),
                dvec3(0.0, 1.0, 0.0),
                dvec3(-1.0, 1.0, 0.0),
                dvec3(-1.0, 0.0, 0.0),
                dvec3(-1.0, -1.0, 0.0),
                dvec3(0.0, -1.0, 0.0),
                dvec3(1.0, -1.0, 0.0),
                dvec3(1.0, 0.0, 0.0),
            ],
            &[1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0],
            &[0.0, 0.25, 0.5, 0.75, 1.0],
            &[3, 2, 2, 2, 3],
            2,
        )
        .unwrap();

        for p in curve.sample(41).unwrap() {
            assert_relative_eq!(p.truncate().length(), 1.0, epsilon = 1e-10);
            assert!(p.z.abs() < 1e-12);
        }

        // Tangent at t=0 points along +Y with the circle's orientation
        let d = curve.derivative(0.0).unwrap();
        assert!(d.y > 0.0 && d.x.abs() < 1e-10);
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            NurbsCurve::from_points(&wave_points(), 6),
            Err(KernelError::InvalidDegree { degree: 6, count: 6 })
        );
        assert_eq!(
            NurbsCurve::from_weighted_points(&wave_points(), &[1.0; 5], 3),
            Err(KernelError::DimensionMismatch { expected: 6, actual: 5 })
        );
        assert_eq!(
            NurbsCurve::from_weighted_points(&wave_points(), &[1.0, 1.0, -1.0, 1.0, 1.0, 1.0], 3),
            Err(KernelError::InvalidWeight { index: 2, weight: -1.0 })
        );
        // 6 points need 10 knots at degree 3
        assert!(matches!(
            NurbsCurve::from_knots_and_multiplicities(
                &wave_points(),
                &[1.0; 6],
                &[0.0, 1.0],
                &[4, 4],
                3
            ),
            Err(KernelError::InvalidKnotVector(_))
        ));
    }

    #[test]
    fn test_non_finite_points_are_rejected() {
        let mut pts = wave_points();
        pts[3].y = f64::NAN;
        assert_eq!(
            NurbsCurve::from_points(&pts, 3),
            Err(KernelError::NonFinitePoint { index: 3 })
        );

        let control_points = vec![
            ControlPoint::new(dvec3(0.0, 0.0, 0.0)),
            ControlPoint::new(dvec3(f64::INFINITY, 1.0, 0.0)),
        ];
        let knots = build_open_knot_vector(2, 1).unwrap();
        assert_eq!(
            NurbsCurve::new(1, knots, control_points),
            Err(KernelError::NonFinitePoint { index: 1 })
        );
    }

    #[test]
    fn test_bounding_box_contains_samples() {
        let curve = NurbsCurve::from_points(&wave_points(), 3).unwrap();
        let (min, max) = curve.bounding_box();
        let aabb = Aabb3::new(min, max);
        for p in curve.sample(100).unwrap() {
            assert!(aabb.contains_point(p));
        }
    }
}
