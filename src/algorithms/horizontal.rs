//! Geographic interpolation weights among grid vertices.
//!
//! Both strategies start from the triangle found by the
//! [`PointLocator`](super::point_locator::PointLocator) and produce
//! `(vertex, weight)` pairs that are non-negative and sum to one.

pub mod linear;
pub mod natural_neighbor;

use serde::{Deserialize, Serialize};

use crate::errors::GeoTessError;
use crate::grids::grid::Grid;
use crate::utilities::vector::Vector3;

use super::point_locator::Located;

pub use linear::LinearInterpolator;
pub use natural_neighbor::NaturalNeighborInterpolator;

/// Cosine of 1e-7 radians. Queries closer than this to a vertex take all of its weight.
pub const COINCIDENT_COSINE: f64 = 0.999_999_999_999_995;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorizontalInterpolation
{
    #[default]
    Linear,
    NaturalNeighbor,
}

impl HorizontalInterpolation
{
    pub fn interpolator(&self) -> Box<dyn HorizontalInterpolator>
    {
        match self
        {
            HorizontalInterpolation::Linear => Box::new(LinearInterpolator),
            HorizontalInterpolation::NaturalNeighbor => Box::new(NaturalNeighborInterpolator::default()),
        }
    }

    pub fn name(&self) -> &'static str
    {
        match self
        {
            HorizontalInterpolation::Linear => "LINEAR",
            HorizontalInterpolation::NaturalNeighbor => "NATURAL_NEIGHBOR",
        }
    }
}

///
/// Turns a located triangle into vertex weights. Implementations may keep
/// scratch state between calls, so one instance must not serve two threads.
///
pub trait HorizontalInterpolator: Send
{
    fn interpolation(&self) -> HorizontalInterpolation;

    ///
    /// Replaces the contents of `weights` with the vertex weights of `u`,
    /// which lies in `located.triangle` of `tessellation`.
    ///
    fn weights(&mut self, grid: &Grid, tessellation: usize, located: &Located, u: &Vector3,
        weights: &mut Vec<(usize, f64)>) -> Result<(), GeoTessError>;
}

/// Vertex of `triangle` that coincides with `u`, if any.
#[inline]
pub(crate) fn coincident_vertex(grid: &Grid, triangle: usize, u: &Vector3) -> Option<usize>
{
    grid.triangle(triangle).iter().copied()
        .find(|v| crate::utilities::vector::dot(grid.vertex(*v), u) > COINCIDENT_COSINE)
}
