//! nurbkit geometry: knot vectors, NURBS curves and surfaces, and isocurves.

pub mod curve;
pub mod isocurve;
pub mod nurbs;
pub mod sampling;
pub mod surface;

pub use curve::NurbsCurve;
pub use isocurve::{isocurves, IsoDirection, Isocurve};
pub use nurbs::{build_open_knot_vector, ControlPoint, KnotVector};
pub use surface::{NurbsSurface, Surface};
