//! Curve models.

mod nurbs;

pub use nurbs::NurbsCurve;
