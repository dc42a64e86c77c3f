use crate::algorithms::horizontal::HorizontalInterpolation;
use crate::algorithms::radial::RadialInterpolation;
use crate::errors::GeoTessError;
use crate::grids::builder::BaseSolid;
use crate::model::Model;
use crate::position::Position;
use crate::utilities::lu::lu_solve;
use crate::utilities::vector::{add, length, normalized, scale, Vector3};

///
/// Estimates attribute gradients by fitting a plane `g . x + c` to values
/// interpolated at the four corners of a small tetrahedron centered on the
/// point of interest. Corners are kept inside the layer being evaluated, so
/// gradients never mix values across a discontinuity.
///
pub struct GradientEstimator<'a>
{
    position: Position<'a>,
    corners: [Vector3; 4],
}

impl<'a> GradientEstimator<'a>
{
    /// Estimator using the model's configured tetrahedron size.
    pub fn new(model: &'a Model) -> Self
    {
        Self::with_tet_size(model, model.metadata().gradient_tet_size)
    }

    /// Estimator whose tetrahedron corners lie `size` km from its center.
    pub fn with_tet_size(model: &'a Model, size: f64) -> Self
    {
        let mut corners = [[0.0; 3]; 4];
        for (corner, v) in corners.iter_mut().zip(BaseSolid::Tetrahedron.vertices().iter())
        {
            *corner = scale(v, size);
        }
        Self { position: Position::new(model, HorizontalInterpolation::Linear, RadialInterpolation::Linear), corners }
    }

    ///
    /// Gradient of `attribute`, or of its reciprocal, at unit vector `u` and
    /// `radius` in `layer`. Unit: attribute per km.
    ///
    pub fn gradient(&mut self, u: &Vector3, radius: f64, layer: usize, attribute: usize, reciprocal: bool) -> Result<Vector3, GeoTessError>
    {
        let center = scale(u, radius);
        let mut a = [[0.0; 4]; 4];
        let mut b = [0.0; 4];
        for (i, corner) in self.corners.iter().enumerate()
        {
            let p = add(&center, corner);
            let v = normalized(&p);
            self.position.set_in_layer(layer, &v, Some(length(&p)))?;
            let r = self.position.set_radius_constrained(layer)?;
            let value = self.position.value(attribute)?;
            a[i] = [v[0] * r, v[1] * r, v[2] * r, 1.0];
            b[i] = if reciprocal { 1.0 / value } else { value };
        }
        match lu_solve(a, b)
        {
            Some(x) => Ok([x[0], x[1], x[2]]),
            None =>
            {
                tracing::warn!(layer, radius, "degenerate gradient tetrahedron");
                Ok([f64::NAN; 3])
            },
        }
    }
}
