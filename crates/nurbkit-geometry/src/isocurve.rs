//! Isoparametric curve extraction.
//!
//! An isocurve holds one surface parameter fixed and samples the other one
//! uniformly across its domain.

use log::debug;
use nurbkit_core::{KernelError, Result};
use nurbkit_math::Point3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::sampling::uniform_parameters;
use crate::surface::{NurbsSurface, Surface};

/// Which surface parameter is held fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsoDirection {
    /// `u` is fixed; the curve runs along `v`.
    U,
    /// `v` is fixed; the curve runs along `u`.
    V,
}

impl IsoDirection {
    pub fn from_fixed_is_u(fixed_is_u: bool) -> Self {
        if fixed_is_u {
            Self::U
        } else {
            Self::V
        }
    }
}

/// A sampled isoparametric curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isocurve {
    pub points: Vec<Point3>,
    pub direction: IsoDirection,
    pub parameter: f64,
}

/// Extract `curve_count` isocurves with `samples_per_curve` points each.
///
/// Fixed parameters are spread uniformly over the fixed direction's domain,
/// including both ends; a single curve sits at the start of the domain.
/// Curves are returned in increasing parameter order.
pub fn isocurves(
    surface: &NurbsSurface,
    fixed_is_u: bool,
    curve_count: usize,
    samples_per_curve: usize,
) -> Result<Vec<Isocurve>> {
    if curve_count < 1 {
        return Err(KernelError::InvalidSampleCount {
            count: curve_count,
            min: 1,
        });
    }
    if samples_per_curve < 2 {
        return Err(KernelError::InvalidSampleCount {
            count: samples_per_curve,
            min: 2,
        });
    }

    let direction = IsoDirection::from_fixed_is_u(fixed_is_u);
    let (fixed_domain, free_domain) = match direction {
        IsoDirection::U => (surface.domain_u(), surface.domain_v()),
        IsoDirection::V => (surface.domain_v(), surface.domain_u()),
    };
    let fixed_params = uniform_parameters(fixed_domain.0, fixed_domain.1, curve_count);
    let free_params = uniform_parameters(free_domain.0, free_domain.1, samples_per_curve);

    debug!(
        "Extracting {} isocurves ({:?} fixed), {} samples each",
        curve_count, direction, samples_per_curve
    );

    let extract = |&parameter: &f64| -> Result<Isocurve> {
        let points = free_params
            .iter()
            .map(|&t| match direction {
                IsoDirection::U => surface.evaluate(parameter, t),
                IsoDirection::V => surface.evaluate(t, parameter),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Isocurve {
            points,
            direction,
            parameter,
        })
    };

    collect_curves(&fixed_params, extract)
}

#[cfg(feature = "parallel")]
fn collect_curves<F>(params: &[f64], extract: F) -> Result<Vec<Isocurve>>
where
    F: Fn(&f64) -> Result<Isocurve> + Sync + Send,
{
    params.par_iter().map(extract).collect()
}

#[cfg(not(feature = "parallel"))]
fn collect_curves<F>(params: &[f64], extract: F) -> Result<Vec<Isocurve>>
where
    F: Fn(&f64) -> Result<Isocurve> + Sync + Send,
{
    params.iter().map(extract).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nurbkit_math::dvec3;

    fn bump_surface() -> NurbsSurface {
        let pts: Vec<Point3> = (0..16)
            .map(|k| {
                let (i, j) = (k / 4, k % 4);
                let z = if (1..=2).contains(&i) && (1..=2).contains(&j) { 2.0 } else { 0.0 };
                dvec3(j as f64, i as f64, z)
            })
            .collect();
        NurbsSurface::from_point_grid(&pts, 4, 4, 3, 3).unwrap()
    }

    #[test]
    fn test_counts_and_order() {
        let surf = bump_surface();
        let curves = isocurves(&surf, true, 7, 25).unwrap();
        assert_eq!(curves.len(), 7);
        for (k, curve) in curves.iter().enumerate() {
            assert_eq!(curve.points.len(), 25);
            assert_eq!(curve.direction, IsoDirection::U);
            assert!((curve.parameter - k as f64 / 6.0).abs() < 1e-12);
        }
        assert_eq!(curves.first().unwrap().parameter, 0.0);
        assert_eq!(curves.last().unwrap().parameter, 1.0);
    }

    #[test]
    fn test_points_lie_on_surface() {
        let surf = bump_surface();
        let curves = isocurves(&surf, false, 3, 5).unwrap();
        for curve in &curves {
            for (k, p) in curve.points.iter().enumerate() {
                let u = k as f64 / 4.0;
                let expected = surf.evaluate(u, curve.parameter).unwrap();
                assert!((*p - expected).length() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_curve_at_domain_start_matches_edge_curve() {
        let surf = bump_surface();
        let curves = isocurves(&surf, true, 1, 30).unwrap();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0].parameter, 0.0);

        let edge = surf.isoparametric_curve(IsoDirection::U, 0.0).unwrap();
        let expected = edge.sample(30).unwrap();
        for (p, q) in curves[0].points.iter().zip(&expected) {
            assert!((*p - *q).length() < 1e-9);
        }
    }

    #[test]
    fn test_parallel_collection_matches_serial() {
        let surf = bump_surface();
        let params = uniform_parameters(0.0, 1.0, 9);
        let extract = |&u: &f64| -> Result<Isocurve> {
            Ok(Isocurve {
                points: vec![surf.evaluate(u, 0.25)?, surf.evaluate(u, 0.75)?],
                direction: IsoDirection::U,
                parameter: u,
            })
        };
        let serial: Result<Vec<Isocurve>> = params.iter().map(&extract).collect();
        assert_eq!(collect_curves(&params, extract), serial);
    }

    #[test]
    fn test_invalid_counts() {
        let surf = bump_surface();
        assert_eq!(
            isocurves(&surf, true, 0, 10),
            Err(KernelError::InvalidSampleCount { count: 0, min: 1 })
        );
        assert_eq!(
            isocurves(&surf, false, 3, 1),
            Err(KernelError::InvalidSampleCount { count: 1, min: 2 })
        );
    }
}
