pub mod aabb;

pub use glam::{dvec3, dvec4, DVec3, DVec4};
pub use aabb::Aabb3;

pub type Point3 = DVec3;
pub type Vector3 = DVec3;
/// Homogeneous point `(w*x, w*y, w*z, w)`.
pub type Point4 = DVec4;

/// Lift a weighted point into homogeneous space.
#[inline]
pub fn to_homogeneous(p: Point3, w: f64) -> Point4 {
    (p * w).extend(w)
}

/// Project a homogeneous point back to 3D. Returns `None` when the weight vanishes.
#[inline]
pub fn from_homogeneous(h: Point4) -> Option<Point3> {
    if h.w.abs() < 1e-15 {
        None
    } else {
        Some(h.truncate() / h.w)
    }
}
