//! Tensor-product NURBS surface.

use log::debug;
use nurbkit_core::traits::{BoundingBox, Validate};
use nurbkit_core::{KernelError, Result, Tolerance};
use nurbkit_math::{Aabb3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::Surface;
use crate::curve::NurbsCurve;
use crate::isocurve::IsoDirection;
use crate::nurbs::control_point::{any_rational, check_control_points};
use crate::nurbs::{deboor, ControlPoint, KnotVector};

/// A NURBS surface defined by degrees, knot vectors, and a 2D grid of control points.
///
/// `control_points[i][j]` is the control point at row `i` (u-direction) and
/// column `j` (v-direction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: KnotVector,
    knots_v: KnotVector,
    control_points: Vec<Vec<ControlPoint>>,
}

impl NurbsSurface {
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: KnotVector,
        knots_v: KnotVector,
        control_points: Vec<Vec<ControlPoint>>,
    ) -> Result<Self> {
        let surface = Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
        };
        surface.validate()?;
        let (nu, nv) = surface.control_counts();
        debug!(
            "NURBS surface: degrees ({}, {}), {}x{} control points, rational={}",
            degree_u,
            degree_v,
            nu,
            nv,
            surface.is_rational()
        );
        Ok(surface)
    }

    pub fn degree_u(&self) -> usize {
        self.degree_u
    }

    pub fn degree_v(&self) -> usize {
        self.degree_v
    }

    pub fn knots_u(&self) -> &KnotVector {
        &self.knots_u
    }

    pub fn knots_v(&self) -> &KnotVector {
        &self.knots_v
    }

    /// The control point grid, rows along u.
    pub fn control_grid(&self) -> &[Vec<ControlPoint>] {
        &self.control_points
    }

    pub fn is_rational(&self) -> bool {
        any_rational(self.control_points.iter().flatten())
    }

    fn check_parameters(&self, u: f64, v: f64) -> Result<(f64, f64)> {
        let tol = Tolerance::default();
        let (u_min, u_max) = self.domain_u();
        let (v_min, v_max) = self.domain_v();
        let u = tol
            .snap_parameter(u, u_min, u_max)
            .ok_or(KernelError::ParameterOutOfRange {
                param: u,
                min: u_min,
                max: u_max,
            })?;
        let v = tol
            .snap_parameter(v, v_min, v_max)
            .ok_or(KernelError::ParameterOutOfRange {
                param: v,
                min: v_min,
                max: v_max,
            })?;
        Ok((u, v))
    }

    fn point_unchecked(&self, u: f64, v: f64) -> Point3 {
        deboor::surface_point(
            self.degree_u,
            self.degree_v,
            self.knots_u.as_slice(),
            self.knots_v.as_slice(),
            &self.control_points,
            u,
            v,
        )
    }

    fn derivs_unchecked(&self, u: f64, v: f64) -> (Point3, Vector3, Vector3) {
        deboor::surface_derivs(
            self.degree_u,
            self.degree_v,
            self.knots_u.as_slice(),
            self.knots_v.as_slice(),
            &self.control_points,
            u,
            v,
        )
    }

    /// Evaluate the surface at `(u, v)`.
    pub fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let (u, v) = self.check_parameters(u, v)?;
        Ok(self.point_unchecked(u, v))
    }

    /// First partial derivatives `(dS/du, dS/dv)` at `(u, v)`.
    pub fn partial_derivatives(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)> {
        let (u, v) = self.check_parameters(u, v)?;
        let (_, du, dv) = self.derivs_unchecked(u, v);
        Ok((du, dv))
    }

    /// Unit normal `dS/du x dS/dv` at `(u, v)`.
    pub fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        self.normal_with_tolerance(u, v, Tolerance::default())
    }

    /// Unit normal, treating cross products shorter than `tol.angular` as degenerate.
    pub fn normal_with_tolerance(&self, u: f64, v: f64, tol: Tolerance) -> Result<Vector3> {
        let (du, dv) = self.partial_derivatives(u, v)?;
        let n = du.cross(dv);
        let len = n.length();
        if tol.is_degenerate(len) {
            Err(KernelError::DegenerateNormal { u, v })
        } else {
            Ok(n / len)
        }
    }

    /// Extract the exact isoparametric curve at a fixed parameter.
    ///
    /// `IsoDirection::U` fixes `u = param` and returns the curve running along v;
    /// `IsoDirection::V` fixes `v = param` and returns the curve running along u.
    pub fn isoparametric_curve(&self, direction: IsoDirection, param: f64) -> Result<NurbsCurve> {
        match direction {
            IsoDirection::U => {
                let (u, _) = self.check_parameters(param, self.domain_v().0)?;
                let cps = deboor::collapse_u(
                    self.degree_u,
                    self.knots_u.as_slice(),
                    &self.control_points,
                    u,
                );
                NurbsCurve::new(self.degree_v, self.knots_v.clone(), cps)
            }
            IsoDirection::V => {
                let (_, v) = self.check_parameters(self.domain_u().0, param)?;
                let cps = deboor::collapse_v(
                    self.degree_v,
                    self.knots_v.as_slice(),
                    &self.control_points,
                    v,
                );
                NurbsCurve::new(self.degree_u, self.knots_u.clone(), cps)
            }
        }
    }
}

impl Surface for NurbsSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        let (u_min, u_max) = self.domain_u();
        let (v_min, v_max) = self.domain_v();
        self.point_unchecked(u.clamp(u_min, u_max), v.clamp(v_min, v_max))
    }

    fn normal_at(&self, u: f64, v: f64) -> Option<Vector3> {
        let (u_min, u_max) = self.domain_u();
        let (v_min, v_max) = self.domain_v();
        let (_, du, dv) = self.derivs_unchecked(u.clamp(u_min, u_max), v.clamp(v_min, v_max));
        let n = du.cross(dv);
        let len = n.length();
        (!Tolerance::default().is_degenerate(len)).then(|| n / len)
    }

    fn domain_u(&self) -> (f64, f64) {
        self.knots_u.domain(self.degree_u)
    }

    fn domain_v(&self) -> (f64, f64) {
        self.knots_v.domain(self.degree_v)
    }

    fn control_counts(&self) -> (usize, usize) {
        let nu = self.control_points.len();
        let nv = self.control_points.first().map_or(0, Vec::len);
        (nu, nv)
    }
}

impl Validate for NurbsSurface {
    fn validate(&self) -> Result<()> {
        let (nu, nv) = self.control_counts();
        if let Some(row) = self.control_points.iter().find(|row| row.len() != nv) {
            return Err(KernelError::DimensionMismatch {
                expected: nv,
                actual: row.len(),
            });
        }
        self.knots_u.validate()?;
        self.knots_v.validate()?;
        self.knots_u.check_sizing(nu, self.degree_u)?;
        self.knots_v.check_sizing(nv, self.degree_v)?;
        check_control_points(self.control_points.iter().flatten())
    }
}

impl BoundingBox for NurbsSurface {
    type Point = Point3;

    /// Bounding box of the control net, which contains the surface.
    fn bounding_box(&self) -> (Point3, Point3) {
        let aabb = Aabb3::from_points(self.control_points.iter().flatten().map(|cp| &cp.position))
            .unwrap_or(Aabb3::new(Point3::ZERO, Point3::ZERO));
        (aabb.min, aabb.max)
    }
}
