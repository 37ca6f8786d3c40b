//! Surface trait and the NURBS surface model.

mod construct;
mod nurbs;

use nurbkit_math::{Point3, Vector3};

pub use nurbs::NurbsSurface;

/// Trait for parametric surfaces in 3D space.
///
/// Parameters outside the domain are clamped onto it, so these methods never
/// fail; use the inherent checked methods of a concrete surface when the
/// caller needs domain errors.
pub trait Surface: Send + Sync {
    /// Evaluate the surface at parameters `(u, v)`.
    fn point_at(&self, u: f64, v: f64) -> Point3;

    /// Unit normal at `(u, v)`, or `None` where the parametrization degenerates.
    fn normal_at(&self, u: f64, v: f64) -> Option<Vector3>;

    /// Return the u-parameter domain `(u_min, u_max)`.
    fn domain_u(&self) -> (f64, f64);

    /// Return the v-parameter domain `(v_min, v_max)`.
    fn domain_v(&self) -> (f64, f64);

    /// Control point counts `(nu, nv)`, used to size the base tessellation grid.
    /// Analytic surfaces report `(2, 2)`.
    fn control_counts(&self) -> (usize, usize) {
        (2, 2)
    }
}
