//! NURBS core algorithms: knot vectors, basis functions, and De Boor evaluation.

pub mod control_point;
pub mod deboor;
pub mod knot;

pub use control_point::ControlPoint;
pub use knot::{
    basis_derivatives, basis_functions, build_open_knot_vector, find_span, KnotVector,
};
