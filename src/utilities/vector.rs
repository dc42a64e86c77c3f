//! Small fixed-size vector helpers for unit vectors on the sphere.

pub type Vector3 = [f64; 3];

#[inline(always)]
pub fn dot(a: &Vector3, b: &Vector3) -> f64
{
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline(always)]
pub fn cross(a: &Vector3, b: &Vector3) -> Vector3
{
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline(always)]
pub fn length(a: &Vector3) -> f64
{
    dot(a, a).sqrt()
}

#[inline(always)]
pub fn add(a: &Vector3, b: &Vector3) -> Vector3
{
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline(always)]
pub fn sub(a: &Vector3, b: &Vector3) -> Vector3
{
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
pub fn scale(a: &Vector3, s: f64) -> Vector3
{
    [a[0] * s, a[1] * s, a[2] * s]
}

///
/// Normalizes `a` in place and returns its original length. A zero vector is
/// left untouched.
///
#[inline]
pub fn normalize(a: &mut Vector3) -> f64
{
    let len = length(a);
    if len > 0.0
    {
        a[0] /= len;
        a[1] /= len;
        a[2] /= len;
    }
    len
}

#[inline]
pub fn normalized(a: &Vector3) -> Vector3
{
    let mut out = *a;
    normalize(&mut out);
    out
}

/// a . (b x c). Negative for a clockwise triangle viewed from outside the sphere.
#[inline]
pub fn scalar_triple_product(a: &Vector3, b: &Vector3, c: &Vector3) -> f64
{
    dot(a, &cross(b, c))
}

/// Angle in radians between two unit vectors.
pub fn angle(a: &Vector3, b: &Vector3) -> f64
{
    let d = dot(a, b);
    if d >= 1.0
    {
        0.0
    }
    else if d <= -1.0
    {
        std::f64::consts::PI
    }
    else
    {
        d.acos()
    }
}

///
/// Unit vector from the center of the sphere to the center of the circle that
/// passes through the three unit vectors. For a clockwise triangle the result
/// lies on the same side of the sphere as the triangle.
///
pub fn circumcenter(v0: &Vector3, v1: &Vector3, v2: &Vector3) -> Vector3
{
    let mut cc = [
        v0[1] * (v2[2] - v1[2]) + v2[1] * (v1[2] - v0[2]) + v1[1] * (v0[2] - v2[2]),
        v0[2] * (v2[0] - v1[0]) + v2[2] * (v1[0] - v0[0]) + v1[2] * (v0[0] - v2[0]),
        v0[0] * (v2[1] - v1[1]) + v2[0] * (v1[1] - v0[1]) + v1[0] * (v0[1] - v2[1]),
    ];
    normalize(&mut cc);
    cc
}

///
/// Circumcenter plus the cosine of the circumcircle's angular radius in the
/// fourth element.
///
pub fn circumcenter_plus(v0: &Vector3, v1: &Vector3, v2: &Vector3) -> [f64; 4]
{
    let cc = circumcenter(v0, v1, v2);
    [cc[0], cc[1], cc[2], dot(&cc, v0)]
}

/// Planar area of the triangle spanned by three points.
#[inline]
pub fn triangle_area(v0: &Vector3, v1: &Vector3, v2: &Vector3) -> f64
{
    0.5 * length(&cross(&sub(v1, v0), &sub(v2, v0)))
}

/// Normalized sum of the three corners.
pub fn centroid(v0: &Vector3, v1: &Vector3, v2: &Vector3) -> Vector3
{
    let mut c = add(&add(v0, v1), v2);
    normalize(&mut c);
    c
}

/// Normalized midpoint of the great circle arc between two unit vectors.
pub fn midpoint(a: &Vector3, b: &Vector3) -> Vector3
{
    let mut m = add(a, b);
    normalize(&mut m);
    m
}

#[inline]
pub fn is_unit(a: &Vector3, tolerance: f64) -> bool
{
    (length(a) - 1.0).abs() <= tolerance
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn check_cross_and_triple_product()
    {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        let z = [0.0, 0.0, 1.0];
        assert_eq!(cross(&x, &y), z);
        assert!((scalar_triple_product(&x, &y, &z) - 1.0).abs() < 1e-15);
        // x, z, y is clockwise seen from outside
        assert!(scalar_triple_product(&x, &z, &y) < 0.0);
    }

    #[test]
    fn check_circumcenter_is_equidistant()
    {
        let v0 = normalized(&[1.0, 0.1, 0.2]);
        let v1 = normalized(&[0.9, 0.4, 0.1]);
        let v2 = normalized(&[0.8, 0.0, 0.5]);
        let cc = circumcenter_plus(&v0, &v2, &v1);
        let c = [cc[0], cc[1], cc[2]];
        assert!((dot(&c, &v0) - dot(&c, &v1)).abs() < 1e-12);
        assert!((dot(&c, &v0) - dot(&c, &v2)).abs() < 1e-12);
        assert!((cc[3] - dot(&c, &v1)).abs() < 1e-12);
        // on the same hemisphere as the triangle
        assert!(dot(&c, &v0) > 0.0);
    }

    #[test]
    fn check_planar_area()
    {
        let area = triangle_area(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 2.0, 0.0]);
        assert!((area - 1.0).abs() < 1e-15);
    }
}
