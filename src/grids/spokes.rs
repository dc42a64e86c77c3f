use crate::errors::GeoTessError;

use super::grid::Edge;

///
/// Circular, clockwise lists of the edges ("spokes") that emanate from each
/// vertex on one tessellation level. Spokes are addressed by edge id
/// (`3 * triangle + side`) and linked by index, so following
/// [`SpokeList::next`] from [`SpokeList::head`] visits every triangle around
/// a vertex once before returning to the head.
///
#[derive(Clone, Debug)]
pub struct SpokeList
{
    first_edge: usize,
    head: Vec<Option<usize>>,
    next: Vec<usize>,
}

impl SpokeList
{
    ///
    /// Chains the edges of triangles `[first, last)` around their start
    /// vertex. Consecutive spokes satisfy `next.t_left == spoke.t_right`.
    ///
    pub(crate) fn build(edges: &[[Edge; 3]], n_vertices: usize, first: usize, last: usize) -> Result<Self, GeoTessError>
    {
        let first_edge = 3 * first;
        let mut per_vertex: Vec<Vec<usize>> = vec![Vec::new(); n_vertices];
        for t in first..last
        {
            for (side, edge) in edges[t].iter().enumerate()
            {
                per_vertex[edge.vj].push(3 * t + side);
            }
        }
        let edge = |id: usize| &edges[id / 3][id % 3];

        let mut head = vec![None; n_vertices];
        let mut next = vec![usize::MAX; 3 * (last - first)];
        for (vertex, spokes) in per_vertex.iter().enumerate()
        {
            let Some(&start) = spokes.first() else { continue };
            let mut current = start;
            for _ in 1..spokes.len()
            {
                let t_right = edge(current).t_right;
                let following = spokes.iter().copied().find(|s| edge(*s).t_left == t_right)
                    .ok_or_else(|| GeoTessError::InvalidGrid(format!("spokes around vertex {} do not form a closed fan", vertex)))?;
                next[current - first_edge] = following;
                current = following;
            }
            if edge(start).t_left != edge(current).t_right
            {
                return Err(GeoTessError::InvalidGrid(format!("spokes around vertex {} do not close", vertex)));
            }
            next[current - first_edge] = start;
            head[vertex] = Some(start);
        }
        Ok(Self { first_edge, head, next })
    }

    /// Some spoke of `vertex`, `None` if the vertex is not on this level.
    #[inline]
    pub fn head(&self, vertex: usize) -> Option<usize>
    {
        self.head.get(vertex).copied().flatten()
    }

    /// Clockwise successor of spoke `edge`.
    #[inline]
    pub fn next(&self, edge: usize) -> usize
    {
        self.next[edge - self.first_edge]
    }

    /// Spokes of `vertex` in clockwise order, starting at its head.
    pub fn spokes(&self, vertex: usize) -> Spokes<'_>
    {
        let head = self.head(vertex);
        Spokes { list: self, head, current: head }
    }

    /// One clockwise turn around the start vertex of `edge`, beginning with `edge`.
    pub fn cycle_from(&self, edge: usize) -> Spokes<'_>
    {
        Spokes { list: self, head: Some(edge), current: Some(edge) }
    }
}

pub struct Spokes<'a>
{
    list: &'a SpokeList,
    head: Option<usize>,
    current: Option<usize>,
}

impl Iterator for Spokes<'_>
{
    type Item = usize;

    fn next(&mut self) -> Option<usize>
    {
        let current = self.current?;
        let following = self.list.next(current);
        self.current = if Some(following) == self.head { None } else { Some(following) };
        Some(current)
    }
}
