//! Radial interpolation within one profile: bracketing-node search, linear
//! node weights and natural cubic splines.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadialInterpolation
{
    #[default]
    Linear,
    CubicSpline,
}

///
/// Index of the interval `[radii[i], radii[i+1]]` containing `radius`.
/// Returns -1 below the first radius and `n-1` above the last one. A radius
/// equal to the last radius maps to the last interval, `n-2`.
///
pub fn radius_index(radii: &[f32], radius: f64) -> isize
{
    let n = radii.len();
    if n == 0
    {
        return -1;
    }
    let first = radii[0] as f64;
    let last = radii[n - 1] as f64;
    if radius < first
    {
        return -1;
    }
    if n == 1
    {
        return 0;
    }
    if radius == first
    {
        return 0;
    }
    if radius == last
    {
        return n as isize - 2;
    }
    if radius > last
    {
        return n as isize - 1;
    }
    let mut lower = 0;
    let mut upper = n - 1;
    while upper - lower > 1
    {
        let mid = (upper + lower) / 2;
        if radius >= radii[mid] as f64
        {
            lower = mid;
        }
        else
        {
            upper = mid;
        }
    }
    lower as isize
}

#[inline]
fn out_of_range(radii: &[f32], radius: f64) -> bool
{
    radius < radii[0] as f64 || radius > radii[radii.len() - 1] as f64
}

///
/// Appends the linear radial weights of `radius` to `weights`. Outside the
/// profile the weight goes to the nearest end node, or is NaN when
/// `allow_out_of_range` is false.
///
pub fn linear_weights(radii: &[f32], radius: f64, allow_out_of_range: bool, weights: &mut Vec<(usize, f64)>)
{
    let n = radii.len();
    let index = radius_index(radii, radius);
    let clamped = if allow_out_of_range { 1.0 } else { f64::NAN };
    if index < 0
    {
        weights.push((0, clamped));
    }
    else if index as usize >= n - 1
    {
        weights.push((n - 1, clamped));
    }
    else
    {
        let i = index as usize;
        let c = (radii[i + 1] as f64 - radius) / (radii[i + 1] as f64 - radii[i] as f64);
        weights.push((i, c));
        if c < 1.0
        {
            weights.push((i + 1, 1.0 - c));
        }
    }
}

///
/// Piecewise linear value at `radius`. `value(i)` yields the sample at node `i`.
///
pub fn linear_value<F: Fn(usize) -> f64>(radii: &[f32], value: F, radius: f64, allow_out_of_range: bool) -> f64
{
    if !allow_out_of_range && out_of_range(radii, radius)
    {
        return f64::NAN;
    }
    let n = radii.len();
    let index = radius_index(radii, radius);
    if index < 0
    {
        return value(0);
    }
    if index as usize >= n - 1
    {
        return value(n - 1);
    }
    let i = index as usize;
    let r0 = radii[i] as f64;
    let r1 = radii[i + 1] as f64;
    if radius >= r1
    {
        return value(i + 1);
    }
    let a = (r1 - radius) / (r1 - r0);
    a * value(i) + (1.0 - a) * value(i + 1)
}

///
/// Second derivatives of the natural cubic spline through `(x[i], y[i])`,
/// zero at both ends. Solved with a single tridiagonal sweep.
///
pub fn natural_spline_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64>
{
    let n = x.len();
    let mut y2 = vec![0.0; n];
    if n < 3
    {
        return y2;
    }
    let mut u = vec![0.0; n];
    for i in 1..n - 1
    {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }
    y2[n - 1] = 0.0;
    for k in (0..n - 1).rev()
    {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

///
/// Cubic spline value at `radius` given node values `value(i)` and second
/// derivatives `y2`. Outside the profile the end values are returned, or NaN
/// when `allow_out_of_range` is false.
///
pub fn cubic_value<F: Fn(usize) -> f64>(radii: &[f32], value: F, y2: &[f64], radius: f64, allow_out_of_range: bool) -> f64
{
    if !allow_out_of_range && out_of_range(radii, radius)
    {
        return f64::NAN;
    }
    let n = radii.len();
    let index = radius_index(radii, radius);
    if index < 0
    {
        return value(0);
    }
    if index as usize >= n - 1
    {
        return value(n - 1);
    }
    let i = index as usize;
    let r0 = radii[i] as f64;
    let r1 = radii[i + 1] as f64;
    let h = r1 - r0;
    let a = (r1 - radius) / h;
    let b = 1.0 - a;
    a * value(i) + b * value(i + 1) + ((a * a * a - a) * y2[i] + (b * b * b - b) * y2[i + 1]) * (h * h) / 6.0
}
