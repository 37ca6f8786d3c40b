use nurbkit_core::traits::Validate;
use nurbkit_core::{KernelError, Result};
use serde::{Deserialize, Serialize};

/// Knobs for adaptive surface tessellation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationOptions {
    /// Maximum number of times a base cell may be split.
    pub max_depth: u32,
    /// Base grid cells per control polygon segment, in each direction.
    pub base_density: usize,
    /// Quantization step used to merge coincident vertices.
    pub weld_epsilon: f64,
}

impl TessellationOptions {
    pub const DEFAULT_MAX_DEPTH: u32 = 6;
    /// Hard ceiling on `max_depth`; deeper requests are clamped.
    pub const MAX_DEPTH_LIMIT: u32 = 12;
    pub const DEFAULT_WELD_EPSILON: f64 = 1e-9;

    /// Depth actually used during refinement.
    pub fn effective_depth(&self) -> u32 {
        self.max_depth.min(Self::MAX_DEPTH_LIMIT)
    }

    /// Base grid size `(cells_u, cells_v)` for a control net of `nu x nv` points.
    pub fn base_grid(&self, nu: usize, nv: usize) -> (usize, usize) {
        let cells = |n: usize| (n.saturating_sub(1) * self.base_density).max(1);
        (cells(nu), cells(nv))
    }

    /// Upper bound on the vertex count of a tessellation of an `nu x nv` net:
    /// every leaf corner lies on the finest lattice the depth bound allows.
    pub fn max_vertex_count(&self, nu: usize, nv: usize) -> usize {
        let (cu, cv) = self.base_grid(nu, nv);
        let scale = 1usize << self.effective_depth();
        (cu * scale + 1) * (cv * scale + 1)
    }
}

impl Default for TessellationOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            base_density: 1,
            weld_epsilon: Self::DEFAULT_WELD_EPSILON,
        }
    }
}

impl Validate for TessellationOptions {
    fn validate(&self) -> Result<()> {
        if self.base_density < 1 {
            return Err(KernelError::InvalidSampleCount {
                count: self.base_density,
                min: 1,
            });
        }
        if !(self.weld_epsilon.is_finite() && self.weld_epsilon > 0.0) {
            return Err(KernelError::InvalidTolerance(self.weld_epsilon));
        }
        Ok(())
    }
}
