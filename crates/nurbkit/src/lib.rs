//! nurbkit: a small NURBS kernel.
//!
//! Build surfaces from control point grids, tessellate them adaptively,
//! extract isocurves and sample curves through the handle-based [`Kernel`].
//! The geometry and meshing layers are re-exported for direct use.

pub mod kernel;

pub use kernel::{
    CurveHandle, Kernel, MeshData, SurfaceHandle, Triple, DEFAULT_DEFLECTION, DEFAULT_DEGREE,
    DEFAULT_POINTS_PER_CURVE, DEFAULT_SAMPLE_COUNT,
};
pub use nurbkit_core::{KernelError, Result, Tolerance, KERNEL_VERSION};
pub use nurbkit_geometry::{IsoDirection, Isocurve, NurbsCurve, NurbsSurface, Surface};
pub use nurbkit_mesh::{Mesh, TessellationOptions};

pub use nurbkit_geometry as geometry;
pub use nurbkit_math as math;
pub use nurbkit_mesh as mesh;
