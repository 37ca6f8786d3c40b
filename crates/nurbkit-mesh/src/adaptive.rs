//! Adaptive tessellation of parametric surfaces.
//!
//! A coarse UV grid sized from the control net is refined cell by cell: a
//! cell is split into four while the surface strays from the bilinear patch
//! through its corners by more than the deflection. Each base cell is
//! refined independently (in parallel with the `parallel` feature) and the
//! results are welded in one serial pass in base-cell order, so output does
//! not depend on scheduling.
//!
//! Cells live on an integer lattice `2^max_depth` times finer than the base
//! grid. Where a leaf borders smaller leaves, the corners of those leaves
//! that fall on its edges are threaded into its boundary and the leaf is
//! fanned from its centre, so neighbouring leaves always share edges.

use std::collections::HashMap;

use log::{debug, trace, warn};
use nurbkit_core::traits::Validate;
use nurbkit_core::{KernelError, Result};
use nurbkit_geometry::Surface;
use nurbkit_math::Point3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::options::TessellationOptions;
use crate::weld::VertexWelder;
use crate::Mesh;

/// A lattice point `(i, j)`.
type LatticeKey = (u64, u64);

/// Maps lattice points to surface parameters.
#[derive(Debug, Clone, Copy)]
struct Lattice {
    u_range: (f64, f64),
    v_range: (f64, f64),
    steps_u: u64,
    steps_v: u64,
}

impl Lattice {
    fn uv(&self, (i, j): LatticeKey) -> (f64, f64) {
        (
            grid_param(self.u_range, i, self.steps_u),
            grid_param(self.v_range, j, self.steps_v),
        )
    }

    fn point(&self, surface: &dyn Surface, key: LatticeKey) -> Point3 {
        let (u, v) = self.uv(key);
        surface.point_at(u, v)
    }
}

/// A square of `size x size` lattice steps with its lower corner at `(i0, j0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    i0: u64,
    j0: u64,
    size: u64,
    depth: u32,
}

impl Cell {
    /// Corners counter-clockwise in (u, v): `[k00, k10, k11, k01]`.
    fn corners(&self) -> [LatticeKey; 4] {
        let (i1, j1) = (self.i0 + self.size, self.j0 + self.size);
        [(self.i0, self.j0), (i1, self.j0), (i1, j1), (self.i0, j1)]
    }

    fn centre(&self) -> LatticeKey {
        (self.i0 + self.size / 2, self.j0 + self.size / 2)
    }

    /// Boundary counter-clockwise from `(i0, j0)`, through every known vertex
    /// lying on the cell's edges.
    fn ring(&self, known: &HashMap<LatticeKey, Point3>) -> Vec<LatticeKey> {
        let (i0, j0, s) = (self.i0, self.j0, self.size);
        let bottom = (0..s).map(move |k| (i0 + k, j0));
        let right = (0..s).map(move |k| (i0 + s, j0 + k));
        let top = (0..s).map(move |k| (i0 + s - k, j0 + s));
        let left = (0..s).map(move |k| (i0, j0 + s - k));
        bottom
            .chain(right)
            .chain(top)
            .chain(left)
            .filter(|key| known.contains_key(key))
            .collect()
    }
}

/// An accepted cell and its corner positions.
#[derive(Debug, Clone, PartialEq)]
struct Leaf {
    cell: Cell,
    corners: [Point3; 4],
}

/// Accepted cells of one base cell.
#[derive(Debug, Default, PartialEq)]
struct CellPatch {
    leaves: Vec<Leaf>,
    capped: usize,
}

/// Maximum distance between the surface and the bilinear patch through the
/// cell corners, sampled at the centre and the four edge midpoints.
fn cell_deviation(
    surface: &dyn Surface,
    (u0, v0): (f64, f64),
    (u1, v1): (f64, f64),
    corners: &[Point3; 4],
) -> f64 {
    let [p00, p10, p11, p01] = *corners;
    let u_mid = (u0 + u1) * 0.5;
    let v_mid = (v0 + v1) * 0.5;

    let samples = [
        (u_mid, v_mid, (p00 + p10 + p11 + p01) * 0.25),
        (u_mid, v0, (p00 + p10) * 0.5),
        (u_mid, v1, (p01 + p11) * 0.5),
        (u0, v_mid, (p00 + p01) * 0.5),
        (u1, v_mid, (p10 + p11) * 0.5),
    ];

    samples
        .iter()
        .map(|&(u, v, approx)| (surface.point_at(u, v) - approx).length())
        .fold(0.0, f64::max)
}

/// Refine one base cell with an explicit work stack.
fn refine(
    surface: &dyn Surface,
    lattice: &Lattice,
    root: Cell,
    deflection: f64,
    max_depth: u32,
) -> CellPatch {
    let mut patch = CellPatch::default();
    let mut stack = vec![root];

    while let Some(cell) = stack.pop() {
        let keys = cell.corners();
        let corners = keys.map(|key| lattice.point(surface, key));
        let deviation = cell_deviation(
            surface,
            lattice.uv(keys[0]),
            lattice.uv(keys[2]),
            &corners,
        );

        if deviation <= deflection {
            patch.leaves.push(Leaf { cell, corners });
            continue;
        }
        if cell.depth >= max_depth {
            patch.capped += 1;
            patch.leaves.push(Leaf { cell, corners });
            continue;
        }

        let half = cell.size / 2;
        let depth = cell.depth + 1;
        // Pushed in reverse so children pop in (u0,v0), (u1,v0), (u0,v1), (u1,v1) order
        for (di, dj) in [(half, half), (0, half), (half, 0), (0, 0)] {
            stack.push(Cell {
                i0: cell.i0 + di,
                j0: cell.j0 + dj,
                size: half,
                depth,
            });
        }
    }

    trace!(
        "Base cell at lattice ({}, {}): {} leaves",
        root.i0,
        root.j0,
        patch.leaves.len()
    );
    patch
}

fn grid_param((min, max): (f64, f64), i: u64, n: u64) -> f64 {
    if i == n {
        max
    } else {
        min + (max - min) * i as f64 / n as f64
    }
}

/// The refinement lattice and its base cells, in row-major order.
fn base_cells(
    surface: &dyn Surface,
    options: &TessellationOptions,
    max_depth: u32,
) -> (Lattice, Vec<Cell>) {
    let (nu, nv) = surface.control_counts();
    let (cells_u, cells_v) = options.base_grid(nu, nv);
    let size = 1u64 << max_depth;
    let lattice = Lattice {
        u_range: surface.domain_u(),
        v_range: surface.domain_v(),
        steps_u: cells_u as u64 * size,
        steps_v: cells_v as u64 * size,
    };

    let mut cells = Vec::with_capacity(cells_u * cells_v);
    for i in 0..cells_u as u64 {
        for j in 0..cells_v as u64 {
            cells.push(Cell {
                i0: i * size,
                j0: j * size,
                size,
                depth: 0,
            });
        }
    }
    (lattice, cells)
}

#[cfg(feature = "parallel")]
fn refine_all(
    surface: &dyn Surface,
    lattice: &Lattice,
    cells: Vec<Cell>,
    deflection: f64,
    max_depth: u32,
) -> Vec<CellPatch> {
    cells
        .into_par_iter()
        .map(|cell| refine(surface, lattice, cell, deflection, max_depth))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn refine_all(
    surface: &dyn Surface,
    lattice: &Lattice,
    cells: Vec<Cell>,
    deflection: f64,
    max_depth: u32,
) -> Vec<CellPatch> {
    cells
        .into_iter()
        .map(|cell| refine(surface, lattice, cell, deflection, max_depth))
        .collect()
}

/// Weld the leaves of every patch into one mesh, in patch order.
fn assemble(
    surface: &dyn Surface,
    lattice: &Lattice,
    patches: &[CellPatch],
    weld_epsilon: f64,
) -> Mesh {
    let leaves = || patches.iter().flat_map(|patch| &patch.leaves);

    let mut known: HashMap<LatticeKey, Point3> = HashMap::new();
    for leaf in leaves() {
        for (key, p) in leaf.cell.corners().into_iter().zip(leaf.corners) {
            known.entry(key).or_insert(p);
        }
    }

    // Across a closed seam, a boundary vertex on one side hangs on the other
    let mut seam = Vec::new();
    for (&(i, j), &p) in &known {
        let across = [
            (i == 0).then_some((lattice.steps_u, j)),
            (i == lattice.steps_u).then_some((0, j)),
            (j == 0).then_some((i, lattice.steps_v)),
            (j == lattice.steps_v).then_some((i, 0)),
        ];
        for key in across.into_iter().flatten() {
            if known.contains_key(&key) {
                continue;
            }
            let q = lattice.point(surface, key);
            if q.distance(p) <= weld_epsilon {
                seam.push((key, q));
            }
        }
    }
    known.extend(seam);

    let mut welder = VertexWelder::new(weld_epsilon);
    let mut indices: HashMap<LatticeKey, u32> = HashMap::new();
    let mut vertex = |key: LatticeKey| -> u32 {
        *indices.entry(key).or_insert_with(|| {
            let p = match known.get(&key) {
                Some(&p) => p,
                None => lattice.point(surface, key),
            };
            welder.insert(p)
        })
    };

    let mut faces = Vec::new();
    for leaf in leaves() {
        let ring: Vec<u32> = leaf.cell.ring(&known).into_iter().map(&mut vertex).collect();
        let triangles = if ring.len() == 4 {
            vec![[ring[0], ring[1], ring[2]], [ring[0], ring[2], ring[3]]]
        } else {
            let centre = vertex(leaf.cell.centre());
            (0..ring.len())
                .map(|k| [centre, ring[k], ring[(k + 1) % ring.len()]])
                .collect()
        };
        // Collapsed edges weld into repeated indices; drop those slivers
        faces.extend(
            triangles
                .into_iter()
                .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2]),
        );
    }

    Mesh {
        vertices: welder.into_vertices(),
        faces,
    }
}

/// Adaptively tessellate a surface with default options.
///
/// # Arguments
/// * `surface` - The parametric surface to tessellate
/// * `deflection` - Maximum allowed deviation (in model units) from the true surface
pub fn tessellate(surface: &dyn Surface, deflection: f64) -> Result<Mesh> {
    tessellate_with(surface, deflection, &TessellationOptions::default())
}

/// Adaptively tessellate a surface into a welded triangle mesh.
///
/// A smaller `deflection` never yields fewer vertices than a larger one for
/// the same surface and options: the split decision for a cell depends only
/// on that cell, so the refined cell set only grows as `deflection` shrinks.
pub fn tessellate_with(
    surface: &dyn Surface,
    deflection: f64,
    options: &TessellationOptions,
) -> Result<Mesh> {
    if !(deflection.is_finite() && deflection > 0.0) {
        return Err(KernelError::InvalidTolerance(deflection));
    }
    options.validate()?;

    let max_depth = options.effective_depth();
    let (lattice, cells) = base_cells(surface, options, max_depth);
    let base_count = cells.len();
    let patches = refine_all(surface, &lattice, cells, deflection, max_depth);

    let capped: usize = patches.iter().map(|patch| patch.capped).sum();
    if capped > 0 {
        warn!(
            "Depth limit {} reached on {} cells still above deflection {}",
            max_depth, capped, deflection
        );
    }

    let mesh = assemble(surface, &lattice, &patches, options.weld_epsilon);
    debug!(
        "Tessellated {} base cells at deflection {}: {} vertices, {} triangles",
        base_count,
        deflection,
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nurbkit_math::{dvec3, Vector3};

    /// How many faces use each undirected edge.
    fn edge_uses(mesh: &Mesh) -> HashMap<(u32, u32), usize> {
        let mut uses = HashMap::new();
        for f in &mesh.faces {
            for k in 0..3 {
                let (a, b) = (f[k], f[(k + 1) % 3]);
                *uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        uses
    }

    /// Unit sphere over (u, v) in [0, 1]^2, poles at v = 0 and v = 1.
    struct UnitSphere;

    impl Surface for UnitSphere {
        fn point_at(&self, u: f64, v: f64) -> Point3 {
            let theta = std::f64::consts::TAU * u;
            let phi = std::f64::consts::PI * v;
            dvec3(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
        }

        fn normal_at(&self, u: f64, v: f64) -> Option<Vector3> {
            Some(self.point_at(u, v))
        }

        fn domain_u(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn domain_v(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn control_counts(&self) -> (usize, usize) {
            (5, 5)
        }
    }

    /// Flat unit square with a narrow bump near (0.3, 0.6), so refinement
    /// is deep around the bump and shallow elsewhere.
    struct Dimple;

    impl Surface for Dimple {
        fn point_at(&self, u: f64, v: f64) -> Point3 {
            let r2 = (u - 0.3).powi(2) + (v - 0.6).powi(2);
            dvec3(u, v, 0.2 * (-r2 / 0.005).exp())
        }

        fn normal_at(&self, _u: f64, _v: f64) -> Option<Vector3> {
            None
        }

        fn domain_u(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn domain_v(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn control_counts(&self) -> (usize, usize) {
            (3, 3)
        }
    }

    struct Plane;

    impl Surface for Plane {
        fn point_at(&self, u: f64, v: f64) -> Point3 {
            dvec3(u * 3.0, v * 2.0, 0.0)
        }

        fn normal_at(&self, _u: f64, _v: f64) -> Option<Vector3> {
            Some(Vector3::Z)
        }

        fn domain_u(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn domain_v(&self) -> (f64, f64) {
            (0.0, 1.0)
        }
    }

    #[test]
    fn test_plane_needs_no_refinement() {
        let mesh = tessellate(&Plane, 1e-6).unwrap();
        // Default control counts (2, 2) give a single base cell
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_sphere_points_on_surface() {
        let mesh = tessellate(&UnitSphere, 0.01).unwrap();
        for p in &mesh.vertices {
            assert!((p.length() - 1.0).abs() < 1e-10, "Point not on sphere: {:?}", p);
        }
        mesh.validate().unwrap();
    }

    #[test]
    fn test_sphere_poles_and_seam_are_welded() {
        let mesh = tessellate(&UnitSphere, 0.05).unwrap();
        let poles = mesh
            .vertices
            .iter()
            .filter(|p| (p.z.abs() - 1.0).abs() < 1e-12)
            .count();
        assert_eq!(poles, 2);
    }

    #[test]
    fn test_tighter_deflection_gives_more_vertices() {
        let loose = tessellate(&UnitSphere, 0.1).unwrap();
        let tight = tessellate(&UnitSphere, 0.001).unwrap();
        assert!(
            tight.vertex_count() > loose.vertex_count(),
            "Tight ({}) should exceed loose ({})",
            tight.vertex_count(),
            loose.vertex_count()
        );
    }

    #[test]
    fn test_depth_bound_caps_vertices() {
        let opts = TessellationOptions {
            max_depth: 2,
            ..Default::default()
        };
        let mesh = tessellate_with(&UnitSphere, 1e-9, &opts).unwrap();
        assert!(mesh.vertex_count() <= opts.max_vertex_count(5, 5));
    }

    #[test]
    fn test_invalid_deflection() {
        for bad in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                tessellate(&Plane, bad),
                Err(KernelError::InvalidTolerance(_))
            ));
        }
    }

    #[test]
    fn test_invalid_options() {
        let opts = TessellationOptions {
            weld_epsilon: -1.0,
            ..Default::default()
        };
        assert_eq!(
            tessellate_with(&Plane, 0.1, &opts),
            Err(KernelError::InvalidTolerance(-1.0))
        );
    }

    #[test]
    fn test_faces_follow_surface_orientation() {
        // Plane: du = +X, dv = +Y, so du x dv = +Z
        let mesh = tessellate(&Plane, 0.1).unwrap();
        for n in mesh.vertex_normals() {
            assert!((n - Vector3::Z).length() < 1e-10);
        }
    }

    #[test]
    fn test_mixed_depth_leaves_share_edges() {
        let opts = TessellationOptions::default();
        let (lattice, cells) = base_cells(&Dimple, &opts, opts.effective_depth());
        let patches = refine_all(&Dimple, &lattice, cells, 0.001, opts.effective_depth());
        let depths: Vec<u32> = patches
            .iter()
            .flat_map(|p| p.leaves.iter().map(|l| l.cell.depth))
            .collect();
        let shallow = *depths.iter().min().unwrap();
        let deep = *depths.iter().max().unwrap();
        assert!(deep > shallow + 1, "depths {}..{} are not mixed", shallow, deep);

        let mesh = tessellate_with(&Dimple, 0.001, &opts).unwrap();
        mesh.validate().unwrap();
        let on_border = |c: f64| c.abs() < 1e-12 || (c - 1.0).abs() < 1e-12;
        for ((a, b), uses) in edge_uses(&mesh) {
            assert!(uses <= 2, "edge ({}, {}) used {} times", a, b, uses);
            if uses == 1 {
                let (p, q) = (mesh.vertices[a as usize], mesh.vertices[b as usize]);
                let same_border = (on_border(p.x) && on_border(q.x) && p.x == q.x)
                    || (on_border(p.y) && on_border(q.y) && p.y == q.y);
                assert!(same_border, "open interior edge {:?} - {:?}", p, q);
            }
        }
    }

    #[test]
    fn test_sphere_mesh_is_closed() {
        // Seams weld and poles fan, so every edge has a face on each side
        let mesh = tessellate(&UnitSphere, 0.01).unwrap();
        for ((a, b), uses) in edge_uses(&mesh) {
            assert_eq!(uses, 2, "edge ({}, {}) used {} times", a, b, uses);
        }
    }

    #[test]
    fn test_parallel_refinement_matches_serial() {
        let opts = TessellationOptions::default();
        let depth = opts.effective_depth();
        let (lattice, cells) = base_cells(&UnitSphere, &opts, depth);
        let serial: Vec<CellPatch> = cells
            .iter()
            .map(|&cell| refine(&UnitSphere, &lattice, cell, 0.005, depth))
            .collect();
        assert_eq!(refine_all(&UnitSphere, &lattice, cells, 0.005, depth), serial);
    }
}
