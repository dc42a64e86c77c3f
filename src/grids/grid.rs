use std::hash::Hasher;
use std::sync::OnceLock;

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::algorithms::point_locator::{walk, DEFAULT_ITERATIONS_PER_LEVEL};
use crate::errors::GeoTessError;
use crate::serialization::{self, SerializationFormat};
use crate::utilities::vector::{centroid, circumcenter_plus, cross, dot, is_unit, scalar_triple_product, Vector3};

use super::spokes::SpokeList;

///
/// Directed edge of a triangle. Side `i` of triangle `t` runs from corner
/// `(i + 1) % 3` to corner `(i + 2) % 3`, so it lies opposite corner `i`.
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge
{
    /// Start vertex.
    pub vj: usize,
    /// End vertex.
    pub vk: usize,
    /// Triangle that owns this edge.
    pub t_right: usize,
    /// Triangle across the edge.
    pub t_left: usize,
    /// Corner of `t_left` occupied by `vj`.
    pub cornerj: usize,
    /// `vk x vj`; positive dot product with points on the inside of `t_right`.
    pub normal: Vector3,
}

///
/// Plain topology arrays from which a [`Grid`] is rebuilt. This is the
/// persisted form; edges, descendants, spokes and circumcenters are derived.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot
{
    pub software: String,
    pub vertices: Vec<Vector3>,
    pub triangles: Vec<[usize; 3]>,
    /// Triangle range `[first, last)` of every level.
    pub levels: Vec<[usize; 2]>,
    /// Level range `[first, last)` of every tessellation.
    pub tessellations: Vec<[usize; 2]>,
}

///
/// Multi-level triangulation of the unit sphere, shared read-only by every
/// query cursor. Triangles are clockwise seen from outside the sphere.
///
#[derive(Debug)]
pub struct Grid
{
    grid_id: String,
    software: String,
    vertices: Vec<Vector3>,
    triangles: Vec<[usize; 3]>,
    levels: Vec<[usize; 2]>,
    tessellations: Vec<[usize; 2]>,
    edges: Vec<[Edge; 3]>,
    descendants: Vec<Option<usize>>,
    spokes: Vec<OnceLock<SpokeList>>,
    circumcenters: OnceLock<Vec<[f64; 4]>>,
}

impl Grid
{
    ///
    /// Validates the topology and derives the per-triangle edge records and
    /// the descendant of every triangle on the next finer level.
    ///
    pub fn new(vertices: Vec<Vector3>, triangles: Vec<[usize; 3]>, levels: Vec<[usize; 2]>,
        tessellations: Vec<[usize; 2]>, software: &str) -> Result<Grid, GeoTessError>
    {
        validate(&vertices, &triangles, &levels, &tessellations)?;

        let mut neighbors = vec![[0usize; 3]; triangles.len()];
        for level in levels.iter()
        {
            let mut owner: FxHashMap<(usize, usize), usize> = FxHashMap::default();
            for t in level[0]..level[1]
            {
                for i in 0..3
                {
                    let key = (triangles[t][(i + 1) % 3], triangles[t][(i + 2) % 3]);
                    if owner.insert(key, t).is_some()
                    {
                        return Err(GeoTessError::InvalidGrid(format!("edge {:?} is shared by more than two triangles", key)));
                    }
                }
            }
            for t in level[0]..level[1]
            {
                for i in 0..3
                {
                    let (vj, vk) = (triangles[t][(i + 1) % 3], triangles[t][(i + 2) % 3]);
                    neighbors[t][i] = *owner.get(&(vk, vj))
                        .ok_or_else(|| GeoTessError::InvalidGrid(format!("edge ({}, {}) of triangle {} has no neighbor", vj, vk, t)))?;
                }
            }
        }

        let edges: Vec<[Edge; 3]> = (0..triangles.len()).map(|t| {
            let corners = &triangles[t];
            std::array::from_fn(|i| {
                let vj = corners[(i + 1) % 3];
                let vk = corners[(i + 2) % 3];
                let t_left = neighbors[t][i];
                let cornerj = triangles[t_left].iter().position(|v| *v == vj).unwrap_or(0);
                Edge { vj, vk, t_right: t, t_left, cornerj, normal: cross(&vertices[vk], &vertices[vj]) }
            })
        }).collect();

        // the child of a triangle is the triangle on the next level that holds its center
        let mut descendants = vec![None; triangles.len()];
        let flat = vec![None; triangles.len()];
        for tessellation in tessellations.iter()
        {
            for level in tessellation[0]..tessellation[1] - 1
            {
                let start = levels[level + 1][0];
                for t in levels[level][0]..levels[level][1]
                {
                    let c = centroid(&vertices[triangles[t][0]], &vertices[triangles[t][1]], &vertices[triangles[t][2]]);
                    let located = walk(&edges, &flat, &c, start, 0, 0, DEFAULT_ITERATIONS_PER_LEVEL)
                        .ok_or_else(|| GeoTessError::InvalidGrid(format!("no descendant found for triangle {}", t)))?;
                    descendants[t] = Some(located.triangle);
                }
            }
        }

        let grid_id = content_id(&vertices, &triangles, &levels, &tessellations);
        tracing::debug!(grid_id = %grid_id, vertices = vertices.len(), triangles = triangles.len(),
            levels = levels.len(), tessellations = tessellations.len(), "grid built");
        Ok(Grid
        {
            grid_id,
            software: software.to_string(),
            spokes: (0..levels.len()).map(|_| OnceLock::new()).collect(),
            vertices,
            triangles,
            levels,
            tessellations,
            edges,
            descendants,
            circumcenters: OnceLock::new(),
        })
    }

    pub fn from_snapshot(snapshot: GridSnapshot) -> Result<Grid, GeoTessError>
    {
        Grid::new(snapshot.vertices, snapshot.triangles, snapshot.levels, snapshot.tessellations, &snapshot.software)
    }

    pub fn snapshot(&self) -> GridSnapshot
    {
        GridSnapshot
        {
            software: self.software.clone(),
            vertices: self.vertices.clone(),
            triangles: self.triangles.clone(),
            levels: self.levels.clone(),
            tessellations: self.tessellations.clone(),
        }
    }

    pub fn save(&self, path: &str, format: SerializationFormat) -> Result<(), GeoTessError>
    {
        serialization::save(&self.snapshot(), path, format)
    }

    pub fn read<Reader: std::io::Read>(reader: Reader, format: SerializationFormat) -> Result<Grid, GeoTessError>
    {
        Grid::from_snapshot(serialization::read(reader, format)?)
    }

    pub fn read_buffer(buffer: &[u8], format: SerializationFormat) -> Result<Grid, GeoTessError>
    {
        Grid::from_snapshot(serialization::deserialize(buffer, format)?)
    }

    /// Hex digest of the topology; equal grids have equal ids.
    pub fn grid_id(&self) -> &str
    {
        &self.grid_id
    }

    pub fn software(&self) -> &str
    {
        &self.software
    }

    #[inline]
    pub fn n_vertices(&self) -> usize
    {
        self.vertices.len()
    }

    #[inline]
    pub fn n_triangles(&self) -> usize
    {
        self.triangles.len()
    }

    #[inline]
    pub fn n_levels(&self) -> usize
    {
        self.levels.len()
    }

    #[inline]
    pub fn n_tessellations(&self) -> usize
    {
        self.tessellations.len()
    }

    #[inline]
    pub fn vertex(&self, vertex: usize) -> &Vector3
    {
        &self.vertices[vertex]
    }

    pub fn vertices(&self) -> &[Vector3]
    {
        &self.vertices
    }

    #[inline]
    pub fn triangle(&self, triangle: usize) -> &[usize; 3]
    {
        &self.triangles[triangle]
    }

    pub fn triangles(&self) -> &[[usize; 3]]
    {
        &self.triangles
    }

    pub fn triangle_vertices(&self, triangle: usize) -> [&Vector3; 3]
    {
        let t = &self.triangles[triangle];
        [&self.vertices[t[0]], &self.vertices[t[1]], &self.vertices[t[2]]]
    }

    /// Unit vector at the center of `triangle`.
    pub fn center(&self, triangle: usize) -> Vector3
    {
        let [v0, v1, v2] = self.triangle_vertices(triangle);
        centroid(v0, v1, v2)
    }

    #[inline]
    pub fn edges(&self) -> &[[Edge; 3]]
    {
        &self.edges
    }

    #[inline]
    pub fn edges_of(&self, triangle: usize) -> &[Edge; 3]
    {
        &self.edges[triangle]
    }

    /// Edge with id `3 * triangle + side`.
    #[inline]
    pub fn edge(&self, id: usize) -> &Edge
    {
        &self.edges[id / 3][id % 3]
    }

    /// Triangle across the side opposite corner `side`.
    #[inline]
    pub fn neighbor(&self, triangle: usize, side: usize) -> usize
    {
        self.edges[triangle][side].t_left
    }

    #[inline]
    pub fn descendant(&self, triangle: usize) -> Option<usize>
    {
        self.descendants[triangle]
    }

    pub(crate) fn descendants(&self) -> &[Option<usize>]
    {
        &self.descendants
    }

    pub fn levels(&self) -> &[[usize; 2]]
    {
        &self.levels
    }

    pub fn tessellations(&self) -> &[[usize; 2]]
    {
        &self.tessellations
    }

    /// Number of levels in `tessellation`.
    #[inline]
    pub fn n_levels_in(&self, tessellation: usize) -> usize
    {
        self.tessellations[tessellation][1] - self.tessellations[tessellation][0]
    }

    /// Grid-wide level index of level `tess_level` of `tessellation`.
    #[inline]
    pub fn level(&self, tessellation: usize, tess_level: usize) -> usize
    {
        self.tessellations[tessellation][0] + tess_level
    }

    /// Grid-wide index of the finest level of `tessellation`.
    #[inline]
    pub fn top_level(&self, tessellation: usize) -> usize
    {
        self.tessellations[tessellation][1] - 1
    }

    #[inline]
    pub fn first_triangle(&self, tessellation: usize, tess_level: usize) -> usize
    {
        self.levels[self.level(tessellation, tess_level)][0]
    }

    /// Number of triangles on grid-wide `level`.
    pub fn n_triangles_on(&self, level: usize) -> usize
    {
        self.levels[level][1] - self.levels[level][0]
    }

    ///
    /// Spoke lists of grid-wide `level`, built on first use.
    ///
    pub fn spoke_list(&self, level: usize) -> Result<&SpokeList, GeoTessError>
    {
        GeoTessError::check_index(level, self.levels.len())?;
        if let Some(list) = self.spokes[level].get()
        {
            return Ok(list);
        }
        let list = SpokeList::build(&self.edges, self.vertices.len(), self.levels[level][0], self.levels[level][1])?;
        tracing::debug!(level, "spoke lists computed");
        Ok(self.spokes[level].get_or_init(|| list))
    }

    ///
    /// Circumcenter of every triangle with the cosine of its angular radius
    /// in the fourth element, computed on first use.
    ///
    pub fn circumcenters(&self) -> &[[f64; 4]]
    {
        self.circumcenters.get_or_init(|| {
            tracing::debug!(triangles = self.triangles.len(), "circumcenters computed");
            self.triangles.iter()
                .map(|t| circumcenter_plus(&self.vertices[t[0]], &self.vertices[t[1]], &self.vertices[t[2]]))
                .collect()
        })
    }

    #[inline]
    pub fn circumcenter(&self, triangle: usize) -> &[f64; 4]
    {
        &self.circumcenters()[triangle]
    }

    ///
    /// Vertices connected to `vertex` on level `tess_level` of
    /// `tessellation`, in clockwise order.
    ///
    pub fn vertex_neighbors(&self, tessellation: usize, tess_level: usize, vertex: usize) -> Result<Vec<usize>, GeoTessError>
    {
        let spokes = self.spoke_list(self.level(tessellation, tess_level))?;
        Ok(spokes.spokes(vertex).map(|id| self.edge(id).vk).collect())
    }

    ///
    /// Vertices used by the finest level of `tessellation`.
    ///
    pub fn connected_vertices(&self, tessellation: usize) -> Vec<bool>
    {
        let mut connected = vec![false; self.vertices.len()];
        let level = self.levels[self.top_level(tessellation)];
        for t in level[0]..level[1]
        {
            for v in self.triangles[t]
            {
                connected[v] = true;
            }
        }
        connected
    }
}

fn validate(vertices: &[Vector3], triangles: &[[usize; 3]], levels: &[[usize; 2]], tessellations: &[[usize; 2]]) -> Result<(), GeoTessError>
{
    if let Some(v) = vertices.iter().position(|v| !is_unit(v, 1e-9))
    {
        return Err(GeoTessError::InvalidGrid(format!("vertex {} is not a unit vector", v)));
    }
    if tessellations.is_empty()
    {
        return Err(GeoTessError::InvalidGrid("grid has no tessellation".to_string()));
    }
    let mut expected = 0;
    for (i, level) in levels.iter().enumerate()
    {
        if level[0] != expected || level[1] <= level[0]
        {
            return Err(GeoTessError::InvalidGrid(format!("level {} has triangle range {:?}", i, level)));
        }
        expected = level[1];
    }
    if expected != triangles.len()
    {
        return Err(GeoTessError::InvalidGrid(format!("levels cover {} of {} triangles", expected, triangles.len())));
    }
    let mut expected = 0;
    for (i, tessellation) in tessellations.iter().enumerate()
    {
        if tessellation[0] != expected || tessellation[1] <= tessellation[0]
        {
            return Err(GeoTessError::InvalidGrid(format!("tessellation {} has level range {:?}", i, tessellation)));
        }
        expected = tessellation[1];
    }
    if expected != levels.len()
    {
        return Err(GeoTessError::InvalidGrid(format!("tessellations cover {} of {} levels", expected, levels.len())));
    }
    for (t, corners) in triangles.iter().enumerate()
    {
        if corners.iter().any(|v| *v >= vertices.len())
        {
            return Err(GeoTessError::InvalidGrid(format!("triangle {} references a missing vertex", t)));
        }
        if !(scalar_triple_product(&vertices[corners[0]], &vertices[corners[1]], &vertices[corners[2]]) < 0.0)
        {
            return Err(GeoTessError::InvalidGrid(format!("triangle {} is not clockwise", t)));
        }
    }
    Ok(())
}

fn content_id(vertices: &[Vector3], triangles: &[[usize; 3]], levels: &[[usize; 2]], tessellations: &[[usize; 2]]) -> String
{
    let mut hasher = FxHasher::default();
    for v in vertices
    {
        for x in v
        {
            hasher.write_u64(x.to_bits());
        }
    }
    for idx in triangles.iter().flatten().chain(levels.iter().flatten()).chain(tessellations.iter().flatten())
    {
        hasher.write_usize(*idx);
    }
    format!("{:016X}", hasher.finish())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::grids::builder::GridBuilder;

    #[test]
    fn check_octahedron_topology()
    {
        let grid = GridBuilder::octahedron().build().unwrap();
        assert_eq!(grid.n_vertices(), 6);
        assert_eq!(grid.n_triangles(), 8);
        assert_eq!(grid.n_levels(), 1);
        for t in 0..grid.n_triangles()
        {
            for (i, e) in grid.edges_of(t).iter().enumerate()
            {
                assert_eq!(e.t_right, t);
                assert_eq!(grid.triangle(e.t_left)[e.cornerj], e.vj);
                // the neighbor's edge runs the other way and points back
                let back = grid.edges_of(e.t_left).iter().find(|b| b.vj == e.vk && b.vk == e.vj).unwrap();
                assert_eq!(back.t_left, t);
                // the corner opposite the edge is on the inside
                assert!(dot(&e.normal, grid.vertex(grid.triangle(t)[i])) > 0.0);
            }
            assert_eq!(grid.descendant(t), None);
        }
        // every octahedron vertex has four neighbors
        for v in 0..6
        {
            let mut n = grid.vertex_neighbors(0, 0, v).unwrap();
            assert_eq!(n.len(), 4);
            n.sort();
            n.dedup();
            assert_eq!(n.len(), 4);
            assert!(!n.contains(&v));
        }
    }

    #[test]
    fn check_spoke_order()
    {
        let grid = GridBuilder::icosahedron().levels(2).build().unwrap();
        let spokes = grid.spoke_list(1).unwrap();
        for v in 0..grid.n_vertices()
        {
            let ids: Vec<usize> = spokes.spokes(v).collect();
            assert!(ids.len() == 5 || ids.len() == 6);
            for (k, id) in ids.iter().enumerate()
            {
                let following = grid.edge(ids[(k + 1) % ids.len()]);
                assert_eq!(grid.edge(*id).vj, v);
                assert_eq!(following.t_left, grid.edge(*id).t_right);
            }
        }
        // level 0 only touches the 12 original vertices
        let coarse = grid.spoke_list(0).unwrap();
        assert_eq!(coarse.head(12), None);
        assert!(grid.spoke_list(2).is_err());
    }

    #[test]
    fn check_descendants_and_circumcenters()
    {
        let grid = GridBuilder::octahedron().levels(3).build().unwrap();
        assert_eq!(grid.n_triangles(), 8 + 32 + 128);
        for t in 0..grid.first_triangle(0, 2)
        {
            let child = grid.descendant(t).unwrap();
            let c = grid.center(t);
            assert!(grid.edges_of(child).iter().all(|e| dot(&e.normal, &c) > -1e-12));
        }
        for t in grid.first_triangle(0, 2)..grid.n_triangles()
        {
            assert_eq!(grid.descendant(t), None);
            let cc = grid.circumcenter(t);
            for v in grid.triangle_vertices(t)
            {
                assert!((dot(&[cc[0], cc[1], cc[2]], v) - cc[3]).abs() < 1e-12);
            }
            assert!(dot(&[cc[0], cc[1], cc[2]], &grid.center(t)) > 0.0);
        }
    }

    #[test]
    fn check_validation()
    {
        let grid = GridBuilder::octahedron().build().unwrap();
        let mut snapshot = grid.snapshot();
        snapshot.triangles[0].swap(1, 2);
        assert!(matches!(Grid::from_snapshot(snapshot), Err(GeoTessError::InvalidGrid(_))));

        let mut snapshot = grid.snapshot();
        snapshot.vertices[0] = [0.0, 0.0, 2.0];
        assert!(Grid::from_snapshot(snapshot).is_err());

        let mut snapshot = grid.snapshot();
        snapshot.triangles.pop();
        snapshot.levels[0][1] -= 1;
        assert!(matches!(Grid::from_snapshot(snapshot), Err(GeoTessError::InvalidGrid(_))));

        let mut snapshot = grid.snapshot();
        snapshot.tessellations.clear();
        assert!(Grid::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn check_snapshot_round_trip()
    {
        let grid = GridBuilder::icosahedron().levels(2).build().unwrap();
        for format in [SerializationFormat::Json, SerializationFormat::BincodeLz4]
        {
            let bytes = serialization::serialize(&grid.snapshot(), format).unwrap();
            let copy = Grid::read_buffer(&bytes, format).unwrap();
            assert_eq!(copy.grid_id(), grid.grid_id());
            assert_eq!(copy.snapshot(), grid.snapshot());
            assert_eq!(copy.edges(), grid.edges());
        }
        let other = GridBuilder::icosahedron().levels(3).build().unwrap();
        assert_ne!(other.grid_id(), grid.grid_id());
    }
}
