//! De Boor evaluation of rational B-spline curves and surfaces.
//!
//! Every routine works in homogeneous space, so non-rational inputs (all
//! weights 1.0) take the same path and divide by exactly 1.0.
//! Parameters are assumed to lie in the domain; callers validate them.

use nurbkit_math::{from_homogeneous, Point3, Point4, Vector3};

use super::control_point::ControlPoint;
use super::knot::{basis_derivatives, basis_functions, find_span};

/// Points at infinity (zero weight) keep their unscaled coordinates.
#[inline]
fn project(h: Point4) -> Point3 {
    from_homogeneous(h).unwrap_or_else(|| h.truncate())
}

/// Evaluate a NURBS curve point at parameter `t`.
pub fn curve_point(
    degree: usize,
    knots: &[f64],
    control_points: &[ControlPoint],
    t: f64,
) -> Point3 {
    let n = control_points.len() - 1;
    let span = find_span(degree, knots, n, t);
    let basis = basis_functions(degree, knots, span, t);

    let point = basis
        .iter()
        .zip(&control_points[span - degree..=span])
        .fold(Point4::ZERO, |acc, (&b, cp)| acc + b * cp.homogeneous());

    project(point)
}

/// Evaluate the first derivative of a NURBS curve at parameter `t`.
#[allow(clippy::needless_range_loop)]
pub fn curve_derivative(
    degree: usize,
    knots: &[f64],
    control_points: &[ControlPoint],
    t: f64,
) -> Vector3 {
    let n = control_points.len() - 1;
    let span = find_span(degree, knots, n, t);
    let ders = basis_derivatives(degree, knots, span, t, 1);

    let mut a = Point4::ZERO;
    let mut da = Point4::ZERO;
    for i in 0..=degree {
        let h = control_points[span - degree + i].homogeneous();
        a += ders[0][i] * h;
        da += ders[1][i] * h;
    }

    if a.w.abs() < 1e-15 {
        return da.truncate();
    }
    let c = a.truncate() / a.w;
    (da.truncate() - da.w * c) / a.w
}

/// Evaluate a NURBS surface point at parameters `(u, v)`.
///
/// `control_points[i][j]` is row `i` (u-direction), column `j` (v-direction).
#[allow(clippy::needless_range_loop)]
pub fn surface_point(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<ControlPoint>],
    u: f64,
    v: f64,
) -> Point3 {
    let n_u = control_points.len() - 1;
    let span_u = find_span(degree_u, knots_u, n_u, u);
    let basis_u = basis_functions(degree_u, knots_u, span_u, u);

    let n_v = control_points[0].len() - 1;
    let span_v = find_span(degree_v, knots_v, n_v, v);
    let basis_v = basis_functions(degree_v, knots_v, span_v, v);

    let mut point = Point4::ZERO;
    for i in 0..=degree_u {
        let row = &control_points[span_u - degree_u + i];
        let mut temp = Point4::ZERO;
        for j in 0..=degree_v {
            temp += basis_v[j] * row[span_v - degree_v + j].homogeneous();
        }
        point += basis_u[i] * temp;
    }

    project(point)
}

/// Evaluate a NURBS surface point and its first partial derivatives at `(u, v)`.
///
/// Returns `(S, dS/du, dS/dv)`.
#[allow(clippy::needless_range_loop)]
pub fn surface_derivs(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<ControlPoint>],
    u: f64,
    v: f64,
) -> (Point3, Vector3, Vector3) {
    let n_u = control_points.len() - 1;
    let span_u = find_span(degree_u, knots_u, n_u, u);
    let ders_u = basis_derivatives(degree_u, knots_u, span_u, u, 1);

    let n_v = control_points[0].len() - 1;
    let span_v = find_span(degree_v, knots_v, n_v, v);
    let ders_v = basis_derivatives(degree_v, knots_v, span_v, v, 1);

    let mut a = Point4::ZERO;
    let mut a_u = Point4::ZERO;
    let mut a_v = Point4::ZERO;

    for i in 0..=degree_u {
        let row = &control_points[span_u - degree_u + i];
        for j in 0..=degree_v {
            let h = row[span_v - degree_v + j].homogeneous();
            a += ders_u[0][i] * ders_v[0][j] * h;
            a_u += ders_u[1][i] * ders_v[0][j] * h;
            a_v += ders_u[0][i] * ders_v[1][j] * h;
        }
    }

    if a.w.abs() < 1e-15 {
        return (a.truncate(), a_u.truncate(), a_v.truncate());
    }

    // Quotient rule: S' = (A' - w' S) / w
    let s = a.truncate() / a.w;
    let du = (a_u.truncate() - a_u.w * s) / a.w;
    let dv = (a_v.truncate() - a_v.w * s) / a.w;
    (s, du, dv)
}

/// Collapse the u-direction at fixed `u`, giving the control points of the
/// isoparametric curve running along v.
pub fn collapse_u(
    degree_u: usize,
    knots_u: &[f64],
    control_points: &[Vec<ControlPoint>],
    u: f64,
) -> Vec<ControlPoint> {
    let n_u = control_points.len() - 1;
    let span_u = find_span(degree_u, knots_u, n_u, u);
    let basis_u = basis_functions(degree_u, knots_u, span_u, u);
    let n_v = control_points[0].len();

    (0..n_v)
        .map(|j| {
            let h = basis_u
                .iter()
                .enumerate()
                .fold(Point4::ZERO, |acc, (i, &b)| {
                    acc + b * control_points[span_u - degree_u + i][j].homogeneous()
                });
            ControlPoint::weighted(project(h), h.w)
        })
        .collect()
}

/// Collapse the v-direction at fixed `v`, giving the control points of the
/// isoparametric curve running along u.
pub fn collapse_v(
    degree_v: usize,
    knots_v: &[f64],
    control_points: &[Vec<ControlPoint>],
    v: f64,
) -> Vec<ControlPoint> {
    let n_v = control_points[0].len() - 1;
    let span_v = find_span(degree_v, knots_v, n_v, v);
    let basis_v = basis_functions(degree_v, knots_v, span_v, v);

    control_points
        .iter()
        .map(|row| {
            let h = basis_v
                .iter()
                .zip(&row[span_v - degree_v..=span_v])
                .fold(Point4::ZERO, |acc, (&b, cp)| acc + b * cp.homogeneous());
            ControlPoint::weighted(project(h), h.w)
        })
        .collect()
}
