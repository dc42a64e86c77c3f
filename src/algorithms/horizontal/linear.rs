use crate::errors::GeoTessError;
use crate::grids::grid::Grid;
use crate::utilities::vector::Vector3;

use super::super::point_locator::Located;
use super::{coincident_vertex, HorizontalInterpolation, HorizontalInterpolator};

///
/// Barycentric weights of the three corners of the containing triangle.
///
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearInterpolator;

impl HorizontalInterpolator for LinearInterpolator
{
    fn interpolation(&self) -> HorizontalInterpolation
    {
        HorizontalInterpolation::Linear
    }

    fn weights(&mut self, grid: &Grid, _tessellation: usize, located: &Located, u: &Vector3,
        weights: &mut Vec<(usize, f64)>) -> Result<(), GeoTessError>
    {
        weights.clear();
        if let Some(vertex) = coincident_vertex(grid, located.triangle, u)
        {
            weights.push((vertex, 1.0));
            return Ok(());
        }
        let triangle = grid.triangle(located.triangle);
        for (corner, coefficient) in triangle.iter().zip(located.coefficients.iter())
        {
            weights.push((*corner, *coefficient));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::algorithms::point_locator::PointLocator;
    use crate::grids::builder::GridBuilder;
    use crate::utilities::vector::{centroid, normalized};

    #[test]
    fn check_linear_weights()
    {
        let grid = GridBuilder::octahedron().levels(3).build().unwrap();
        let mut locator = PointLocator::new(&grid);
        let mut interpolator = LinearInterpolator;
        let mut weights = Vec::new();

        let u = normalized(&[0.31, 0.45, 0.8]);
        let located = locator.locate(&grid, 0, &u, false).unwrap();
        interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
        assert_eq!(weights.len(), 3);
        assert!((weights.iter().map(|w| w.1).sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(weights.iter().all(|w| w.1 >= 0.0));

        // vertex 0 is the north pole
        let located = locator.locate(&grid, 0, &[0.0, 0.0, 1.0], false).unwrap();
        interpolator.weights(&grid, 0, &located, &[0.0, 0.0, 1.0], &mut weights).unwrap();
        assert_eq!(weights, vec![(0, 1.0)]);

        // the centroid of a base face is the centroid of its nested middle children
        let [a, b, c] = grid.triangle_vertices(0);
        let u = centroid(a, b, c);
        let located = locator.locate(&grid, 0, &u, true).unwrap();
        interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
        assert!(weights.iter().all(|w| (w.1 - 1.0 / 3.0).abs() < 1e-9));
    }
}
