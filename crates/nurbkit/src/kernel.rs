//! Handle-based kernel API.
//!
//! A [`Kernel`] owns every surface and curve it creates; callers hold
//! copyable handles and query through them. All coordinates cross this
//! boundary as plain `[f64; 3]` triples.

use log::debug;
use nurbkit_core::traits::Validate;
use nurbkit_core::{KernelError, Result};
use nurbkit_geometry::{isocurves, NurbsCurve, NurbsSurface};
use nurbkit_math::Point3;
use nurbkit_mesh::{tessellate_with, TessellationOptions};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct SurfaceHandle;
    pub struct CurveHandle;
}

/// Deflection used when the caller has no preference.
pub const DEFAULT_DEFLECTION: f64 = 0.01;
/// Points per isocurve used when the caller has no preference.
pub const DEFAULT_POINTS_PER_CURVE: usize = 50;
/// Curve sample count used when the caller has no preference.
pub const DEFAULT_SAMPLE_COUNT: usize = 50;
pub const DEFAULT_DEGREE: usize = 3;

/// A plain `(x, y, z)` coordinate.
pub type Triple = [f64; 3];

/// Vertex coordinates and triangle index triples.
pub type MeshData = (Vec<Triple>, Vec<[usize; 3]>);

fn to_points(triples: &[Triple]) -> Vec<Point3> {
    triples.iter().map(|&t| Point3::from_array(t)).collect()
}

fn to_triples(points: &[Point3]) -> Vec<Triple> {
    points.iter().map(|p| p.to_array()).collect()
}

/// Arena of surfaces and curves addressed by handle.
#[derive(Debug, Default)]
pub struct Kernel {
    surfaces: SlotMap<SurfaceHandle, NurbsSurface>,
    curves: SlotMap<CurveHandle, NurbsCurve>,
    options: TessellationOptions,
}

impl Kernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A kernel that tessellates with `options`.
    pub fn with_options(options: TessellationOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::default()
        })
    }

    pub fn options(&self) -> &TessellationOptions {
        &self.options
    }

    pub fn version() -> &'static str {
        nurbkit_core::KERNEL_VERSION
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// Create a surface whose control net is `points`, row-major by u then v.
    pub fn create_surface(
        &mut self,
        points: &[Triple],
        nu: usize,
        nv: usize,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<SurfaceHandle> {
        let surface =
            NurbsSurface::from_point_grid(&to_points(points), nu, nv, degree_u, degree_v)?;
        let handle = self.surfaces.insert(surface);
        debug!("Created surface {:?} ({}x{})", handle, nu, nv);
        Ok(handle)
    }

    pub fn surface(&self, handle: SurfaceHandle) -> Result<&NurbsSurface> {
        self.surfaces
            .get(handle)
            .ok_or_else(|| KernelError::UnknownHandle(format!("surface {handle:?}")))
    }

    pub fn remove_surface(&mut self, handle: SurfaceHandle) -> Result<NurbsSurface> {
        self.surfaces
            .remove(handle)
            .ok_or_else(|| KernelError::UnknownHandle(format!("surface {handle:?}")))
    }

    /// Control points flattened row-major by u then v.
    pub fn get_control_points(&self, handle: SurfaceHandle) -> Result<Vec<Triple>> {
        Ok(to_triples(&self.surface(handle)?.control_points()))
    }

    /// Tessellate a surface, refining until each cell is within `deflection`
    /// or the kernel's depth limit is reached.
    pub fn get_mesh(&self, handle: SurfaceHandle, deflection: f64) -> Result<MeshData> {
        let mesh = tessellate_with(self.surface(handle)?, deflection, &self.options)?;
        let faces = mesh
            .faces
            .iter()
            .map(|f| f.map(|i| i as usize))
            .collect();
        Ok((mesh.vertex_triples(), faces))
    }

    /// Sample `curve_count` isocurves with `samples_per_curve` points each.
    pub fn get_isocurves(
        &self,
        handle: SurfaceHandle,
        fixed_is_u: bool,
        curve_count: usize,
        samples_per_curve: usize,
    ) -> Result<Vec<Vec<Triple>>> {
        let curves = isocurves(self.surface(handle)?, fixed_is_u, curve_count, samples_per_curve)?;
        Ok(curves.iter().map(|c| to_triples(&c.points)).collect())
    }

    /// Create a curve over a clamped uniform knot vector. `weights` defaults to all 1.0.
    pub fn create_curve(
        &mut self,
        points: &[Triple],
        weights: Option<&[f64]>,
        degree: usize,
    ) -> Result<CurveHandle> {
        let points = to_points(points);
        let curve = match weights {
            Some(weights) => NurbsCurve::from_weighted_points(&points, weights, degree)?,
            None => NurbsCurve::from_points(&points, degree)?,
        };
        Ok(self.insert_curve(curve))
    }

    /// Create a curve from distinct knot values and their multiplicities.
    pub fn create_curve_with_knots(
        &mut self,
        points: &[Triple],
        weights: &[f64],
        knot_values: &[f64],
        multiplicities: &[usize],
        degree: usize,
    ) -> Result<CurveHandle> {
        let curve = NurbsCurve::from_knots_and_multiplicities(
            &to_points(points),
            weights,
            knot_values,
            multiplicities,
            degree,
        )?;
        Ok(self.insert_curve(curve))
    }

    fn insert_curve(&mut self, curve: NurbsCurve) -> CurveHandle {
        let degree = curve.degree();
        let count = curve.control_points().len();
        let handle = self.curves.insert(curve);
        debug!(
            "Created curve {:?} (degree {}, {} control points)",
            handle, degree, count
        );
        handle
    }

    pub fn curve(&self, handle: CurveHandle) -> Result<&NurbsCurve> {
        self.curves
            .get(handle)
            .ok_or_else(|| KernelError::UnknownHandle(format!("curve {handle:?}")))
    }

    pub fn remove_curve(&mut self, handle: CurveHandle) -> Result<NurbsCurve> {
        self.curves
            .remove(handle)
            .ok_or_else(|| KernelError::UnknownHandle(format!("curve {handle:?}")))
    }

    /// Evaluate a curve at `count` uniformly spaced parameters.
    pub fn sample_curve(&self, handle: CurveHandle, count: usize) -> Result<Vec<Triple>> {
        Ok(to_triples(&self.curve(handle)?.sample(count)?))
    }
}
