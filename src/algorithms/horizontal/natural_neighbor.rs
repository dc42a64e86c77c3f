use crate::errors::GeoTessError;
use crate::grids::grid::Grid;
use crate::utilities::vector::{circumcenter, triangle_area, Vector3};

use super::super::point_locator::Located;
use super::{coincident_vertex, HorizontalInterpolation, HorizontalInterpolator};

///
/// Sibson natural neighbor weights. The triangles whose circumcircle
/// contains the query point are the ones that would disappear if the point
/// were inserted into the triangulation; the boundary of their union is the
/// ring of natural neighbors, and each neighbor is weighted by the area its
/// Voronoi cell would lose to the new point.
///
/// The marked triangle set and the boundary edge list are kept between
/// calls, so an instance is cheap to reuse but must stay with one thread.
///
#[derive(Clone, Debug, Default)]
pub struct NaturalNeighborInterpolator
{
    marked: Vec<bool>,
    marked_triangles: Vec<usize>,
    boundary: Vec<usize>,
}

impl NaturalNeighborInterpolator
{
    pub fn new() -> Self
    {
        Self::default()
    }

    #[inline]
    fn mark(&mut self, triangle: usize)
    {
        if !self.marked[triangle]
        {
            self.marked[triangle] = true;
            self.marked_triangles.push(triangle);
        }
    }

    fn reset(&mut self)
    {
        for t in self.marked_triangles.drain(..)
        {
            self.marked[t] = false;
        }
        self.boundary.clear();
    }

    ///
    /// Marks every triangle around the three corners of `triangle` whose
    /// circumcircle contains `u`, and collects the edges that separate
    /// marked from unmarked triangles, clockwise.
    ///
    fn collect_boundary(&mut self, grid: &Grid, level: usize, triangle: usize, u: &Vector3) -> Result<(), GeoTessError>
    {
        let spokes = grid.spoke_list(level)?;
        let circumcenters = grid.circumcenters();
        let in_circle = |t: usize| {
            let c = &circumcenters[t];
            c[0] * u[0] + c[1] * u[1] + c[2] * u[2] > c[3]
        };
        let corners = *grid.triangle(triangle);

        // spoke of each corner whose left triangle is the containing one
        let mut first = [0; 3];
        let mut inside = [false; 3];
        for i in 0..3
        {
            first[i] = spokes.spokes(corners[i]).find(|s| grid.edge(*s).t_left == triangle)
                .ok_or_else(|| out_of_order(triangle))?;
            inside[i] = in_circle(grid.edge(first[i]).t_right);
        }

        self.mark(triangle);
        for i in 0..3
        {
            let mut right_inside = inside[i];
            if right_inside
            {
                self.mark(grid.edge(first[i]).t_right);
            }
            else
            {
                self.boundary.push(3 * triangle + (i + 1) % 3);
            }

            let stop = grid.edges_of(triangle)[(i + 2) % 3].t_left;
            let mut closed = false;
            for s in spokes.cycle_from(first[i]).skip(1)
            {
                let edge = grid.edge(s);
                let left_inside = right_inside;
                let last = edge.t_right == stop;
                right_inside = if last { inside[(i + 1) % 3] } else { in_circle(edge.t_right) };

                if left_inside && !right_inside
                {
                    self.boundary.push(3 * edge.t_left + (edge.cornerj + 1) % 3);
                }
                else if !left_inside && right_inside
                {
                    self.boundary.push(3 * edge.t_right + (grid.edge(spokes.next(s)).cornerj + 2) % 3);
                }
                if last
                {
                    closed = true;
                    break;
                }
                if right_inside
                {
                    self.mark(edge.t_right);
                    self.boundary.push(3 * edge.t_right + grid.edge(spokes.next(s)).cornerj);
                }
            }
            if !closed
            {
                return Err(out_of_order(triangle));
            }
        }

        // consecutive boundary edges share a vertex, walking backwards
        let Some(&head) = self.boundary.first() else { return Err(out_of_order(triangle)) };
        let mut previous = grid.edge(head).vj;
        for id in self.boundary.iter().rev()
        {
            let edge = grid.edge(*id);
            if edge.vk != previous
            {
                return Err(out_of_order(triangle));
            }
            previous = edge.vj;
        }
        Ok(())
    }

    ///
    /// Area stolen from the Voronoi cell of every boundary vertex: a fan from
    /// the circumcenter of (u, vertex, next boundary vertex) across the
    /// circumcenters of the marked triangles around the vertex.
    ///
    fn stolen_areas(&self, grid: &Grid, level: usize, triangle: usize, u: &Vector3, weights: &mut Vec<(usize, f64)>) -> Result<(), GeoTessError>
    {
        let spokes = grid.spoke_list(level)?;
        let circumcenters = grid.circumcenters();
        let center = |t: usize| -> Vector3 {
            let c = &circumcenters[t];
            [c[0], c[1], c[2]]
        };

        let mut total = 0.0;
        let mut previous = grid.edge(self.boundary[0]);
        for id in self.boundary.iter().rev()
        {
            let vertex = previous.vj;
            let apex = circumcenter(u, grid.vertex(vertex), grid.vertex(previous.vk));
            let start = spokes.spokes(vertex).find(|s| grid.edge(*s).vk == previous.vk)
                .ok_or_else(|| out_of_order(triangle))?;
            let mut p2 = center(grid.edge(start).t_right);

            let mut area = 0.0;
            let mut closed = false;
            for s in spokes.cycle_from(start).skip(1)
            {
                let edge = grid.edge(s);
                if self.marked[edge.t_right]
                {
                    let p3 = center(edge.t_right);
                    area += triangle_area(&apex, &p2, &p3);
                    p2 = p3;
                }
                else
                {
                    let p3 = circumcenter(u, grid.vertex(edge.vk), grid.vertex(vertex));
                    area += triangle_area(&apex, &p2, &p3);
                    closed = true;
                    break;
                }
            }
            if !closed
            {
                return Err(out_of_order(triangle));
            }

            total += area;
            match weights.iter_mut().find(|w| w.0 == vertex)
            {
                Some(w) => w.1 += area,
                None => weights.push((vertex, area)),
            }
            previous = grid.edge(*id);
        }

        for w in weights.iter_mut()
        {
            w.1 /= total;
        }
        Ok(())
    }
}

fn out_of_order(triangle: usize) -> GeoTessError
{
    tracing::warn!(triangle, "natural neighbor boundary edges are out of order");
    GeoTessError::TopologyInconsistency(format!("natural neighbor edges around triangle {} are out of order", triangle))
}

impl HorizontalInterpolator for NaturalNeighborInterpolator
{
    fn interpolation(&self) -> HorizontalInterpolation
    {
        HorizontalInterpolation::NaturalNeighbor
    }

    fn weights(&mut self, grid: &Grid, tessellation: usize, located: &Located, u: &Vector3,
        weights: &mut Vec<(usize, f64)>) -> Result<(), GeoTessError>
    {
        weights.clear();
        if let Some(vertex) = coincident_vertex(grid, located.triangle, u)
        {
            weights.push((vertex, 1.0));
            return Ok(());
        }
        if self.marked.len() != grid.n_triangles()
        {
            self.marked = vec![false; grid.n_triangles()];
            self.marked_triangles.clear();
        }
        let level = grid.level(tessellation, located.tess_level);
        let result = self.collect_boundary(grid, level, located.triangle, u)
            .and_then(|_| self.stolen_areas(grid, level, located.triangle, u, weights));
        self.reset();
        if result.is_err()
        {
            weights.clear();
        }
        result
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::algorithms::horizontal::LinearInterpolator;
    use crate::algorithms::point_locator::PointLocator;
    use crate::grids::builder::GridBuilder;
    use crate::utilities::vector::{centroid, dot, normalized};

    fn queries() -> Vec<Vector3>
    {
        let mut q = Vec::new();
        for i in 0..40
        {
            let t = i as f64;
            q.push(normalized(&[(0.7 * t).sin() + 0.05, (1.3 * t).cos() - 0.02, (0.37 * t).sin() * 1.7 + 0.01]));
        }
        q
    }

    #[test]
    fn check_weights_are_a_partition_of_unity()
    {
        for builder in [GridBuilder::octahedron().levels(3), GridBuilder::icosahedron().levels(3), GridBuilder::tetrahedron().levels(3)]
        {
            let grid = builder.build().unwrap();
            let mut locator = PointLocator::new(&grid);
            let mut interpolator = NaturalNeighborInterpolator::new();
            let mut weights = Vec::new();
            for u in queries()
            {
                let located = locator.locate(&grid, 0, &u, false).unwrap();
                interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
                assert!(weights.len() >= 3);
                assert!((weights.iter().map(|w| w.1).sum::<f64>() - 1.0).abs() < 1e-9);
                assert!(weights.iter().all(|w| w.1 >= -1e-12));
                // the corners of the containing triangle are always natural neighbors
                for corner in grid.triangle(located.triangle)
                {
                    assert!(weights.iter().any(|w| w.0 == *corner));
                }
                assert!(interpolator.marked_triangles.is_empty());
                assert!(interpolator.boundary.is_empty());
            }
            assert!(interpolator.marked.iter().all(|m| !m));
        }
    }

    #[test]
    fn check_coincident_vertex()
    {
        let grid = GridBuilder::icosahedron().levels(2).build().unwrap();
        let mut locator = PointLocator::new(&grid);
        let mut nn = NaturalNeighborInterpolator::new();
        let mut linear = LinearInterpolator;
        let u = *grid.vertex(7);
        let located = locator.locate(&grid, 0, &u, false).unwrap();
        let mut a = Vec::new();
        let mut b = Vec::new();
        nn.weights(&grid, 0, &located, &u, &mut a).unwrap();
        linear.weights(&grid, 0, &located, &u, &mut b).unwrap();
        assert_eq!(a, vec![(7, 1.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn check_symmetric_face()
    {
        let grid = GridBuilder::octahedron().build().unwrap();
        let mut locator = PointLocator::new(&grid);
        let mut interpolator = NaturalNeighborInterpolator::new();
        let [a, b, c] = grid.triangle_vertices(0);
        let u = centroid(a, b, c);
        let located = locator.locate(&grid, 0, &u, false).unwrap();
        assert_eq!(located.triangle, 0);
        let mut weights = Vec::new();
        interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
        weights.sort_by_key(|w| w.0);
        assert_eq!(weights.iter().map(|w| w.0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(weights.iter().all(|w| (w.1 - 1.0 / 3.0).abs() < 1e-12));
    }

    #[test]
    fn check_weights_favor_the_nearest_vertex()
    {
        let grid = GridBuilder::icosahedron().levels(3).build().unwrap();
        let mut locator = PointLocator::new(&grid);
        let mut interpolator = NaturalNeighborInterpolator::new();
        let mut weights = Vec::new();
        let target = *grid.vertex(3);
        let u = normalized(&[target[0] + 0.01, target[1] - 0.005, target[2]]);
        let located = locator.locate(&grid, 0, &u, false).unwrap();
        interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
        let best = weights.iter().fold((0, f64::MIN), |best, w| if w.1 > best.1 { *w } else { best });
        assert_eq!(best.0, 3);
        assert!(dot(grid.vertex(best.0), &u) > 0.999);
    }

    #[test]
    fn check_mismatched_level_is_rejected()
    {
        let grid = GridBuilder::octahedron().levels(3).build().unwrap();
        let mut locator = PointLocator::new(&grid);
        let mut interpolator = NaturalNeighborInterpolator::new();
        let mut weights = Vec::new();
        let triangle = grid.first_triangle(0, 2) + 5;
        let [a, b, c] = grid.triangle_vertices(triangle);
        let u = centroid(a, b, c);
        let located = locator.locate(&grid, 0, &u, false).unwrap();
        assert_eq!(located.triangle, triangle);
        interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
        assert!(!weights.is_empty());

        // a finest-level triangle walked with the spokes of the coarsest level
        let wrong = Located { triangle, tess_level: 0, coefficients: located.coefficients };
        let result = interpolator.weights(&grid, 0, &wrong, &u, &mut weights);
        assert!(matches!(result, Err(GeoTessError::TopologyInconsistency(_))));
        assert!(weights.is_empty());
        assert!(interpolator.marked.iter().all(|m| !m));
        assert!(interpolator.marked_triangles.is_empty());
        assert!(interpolator.boundary.is_empty());

        interpolator.weights(&grid, 0, &located, &u, &mut weights).unwrap();
        assert!((weights.iter().map(|w| w.1).sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
