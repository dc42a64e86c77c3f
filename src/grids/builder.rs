use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::GeoTessError;
use crate::utilities::vector::{midpoint, normalized, Vector3};

use super::grid::Grid;

///
/// Platonic solids whose faces seed a tessellation. Faces are clockwise
/// seen from outside.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseSolid
{
    Tetrahedron,
    Octahedron,
    #[default]
    Icosahedron,
}

impl BaseSolid
{
    pub fn vertices(&self) -> Vec<Vector3>
    {
        let raw: &[Vector3] = match self
        {
            BaseSolid::Tetrahedron => &[
                [0.0, 0.0, 1.0],
                [0.942809041582063, 0.0, -0.333333333333333],
                [-0.471404520791032, 0.816496580927726, -0.333333333333333],
                [-0.471404520791032, -0.816496580927726, -0.333333333333333],
            ],
            BaseSolid::Octahedron => &[
                [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0],
            ],
            BaseSolid::Icosahedron => &[
                [0.0, 0.0, 1.0],
                [0.8944271909999159, 0.0, 0.4472135954999579],
                [0.2763932022500211, 0.8506508083520400, 0.4472135954999580],
                [-0.7236067977499789, 0.5257311121191338, 0.4472135954999581],
                [-0.7236067977499788, -0.5257311121191338, 0.4472135954999579],
                [0.2763932022500209, -0.8506508083520401, 0.4472135954999580],
                [0.7236067977499790, -0.5257311121191337, -0.4472135954999580],
                [0.7236067977499792, 0.5257311121191336, -0.4472135954999580],
                [-0.2763932022500208, 0.8506508083520401, -0.4472135954999581],
                [-0.8944271909999160, -0.0000000000000002, -0.4472135954999580],
                [-0.2763932022500213, -0.8506508083520400, -0.4472135954999580],
                [0.0, 0.0, -1.0],
            ],
        };
        raw.iter().map(normalized).collect()
    }

    pub fn faces(&self) -> &'static [[usize; 3]]
    {
        match self
        {
            BaseSolid::Tetrahedron => &[[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]],
            BaseSolid::Octahedron => &[[0, 1, 2], [0, 3, 1], [0, 4, 3], [0, 2, 4], [5, 2, 1], [5, 1, 3], [5, 3, 4], [5, 4, 2]],
            BaseSolid::Icosahedron => &[
                [0, 2, 1], [0, 3, 2], [0, 4, 3], [0, 5, 4], [0, 1, 5],
                [2, 7, 1], [3, 8, 2], [4, 9, 3], [5, 10, 4], [1, 6, 5],
                [1, 7, 6], [2, 8, 7], [3, 9, 8], [4, 10, 9], [5, 6, 10],
                [7, 11, 6], [8, 11, 7], [9, 11, 8], [10, 11, 9], [6, 11, 10],
            ],
        }
    }
}

///
/// Builds grids by recursive four-way subdivision of a platonic solid. Every
/// tessellation starts from the same solid and shares vertices with the
/// others, so a coarse tessellation's vertices are a subset of a finer one's.
///
#[derive(Clone, Debug)]
pub struct GridBuilder
{
    solid: BaseSolid,
    tessellation_levels: Vec<usize>,
    software: String,
}

impl GridBuilder
{
    /// Single tessellation with one level.
    pub fn new(solid: BaseSolid) -> Self
    {
        Self { solid, tessellation_levels: vec![1], software: format!("geotess {}", env!("CARGO_PKG_VERSION")) }
    }

    pub fn tetrahedron() -> Self
    {
        Self::new(BaseSolid::Tetrahedron)
    }

    pub fn octahedron() -> Self
    {
        Self::new(BaseSolid::Octahedron)
    }

    pub fn icosahedron() -> Self
    {
        Self::new(BaseSolid::Icosahedron)
    }

    /// Sets the number of levels of the most recently added tessellation.
    pub fn levels(mut self, n_levels: usize) -> Self
    {
        if let Some(last) = self.tessellation_levels.last_mut()
        {
            *last = n_levels;
        }
        self
    }

    /// Appends another tessellation with `n_levels` levels.
    pub fn add_tessellation(mut self, n_levels: usize) -> Self
    {
        self.tessellation_levels.push(n_levels);
        self
    }

    pub fn software(mut self, software: &str) -> Self
    {
        self.software = software.to_string();
        self
    }

    pub fn build(&self) -> Result<Grid, GeoTessError>
    {
        if let Some(i) = self.tessellation_levels.iter().position(|n| *n == 0)
        {
            return Err(GeoTessError::InvalidGrid(format!("tessellation {} has no levels", i)));
        }
        let mut vertices = self.solid.vertices();
        let mut midpoints: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut triangles: Vec<[usize; 3]> = Vec::new();
        let mut levels = Vec::new();
        let mut tessellations = Vec::new();

        for n_levels in self.tessellation_levels.iter()
        {
            let first_level = levels.len();
            let mut current: Vec<[usize; 3]> = self.solid.faces().to_vec();
            for level in 0..*n_levels
            {
                if level > 0
                {
                    current = subdivide(&current, &mut vertices, &mut midpoints);
                }
                levels.push([triangles.len(), triangles.len() + current.len()]);
                triangles.extend_from_slice(&current);
            }
            tessellations.push([first_level, levels.len()]);
        }
        Grid::new(vertices, triangles, levels, tessellations, &self.software)
    }
}

fn subdivide(triangles: &[[usize; 3]], vertices: &mut Vec<Vector3>, midpoints: &mut FxHashMap<(usize, usize), usize>) -> Vec<[usize; 3]>
{
    let mut mid = |a: usize, b: usize| -> usize {
        *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
            let m = midpoint(&vertices[a], &vertices[b]);
            vertices.push(m);
            vertices.len() - 1
        })
    };
    let mut children = Vec::with_capacity(4 * triangles.len());
    for &[a, b, c] in triangles
    {
        let ab = mid(a, b);
        let bc = mid(b, c);
        let ca = mid(c, a);
        children.push([a, ab, ca]);
        children.push([ab, b, bc]);
        children.push([ca, bc, c]);
        children.push([ab, bc, ca]);
    }
    children
}

#[test]
fn check_builder()
{
    for (solid, t) in [(BaseSolid::Tetrahedron, 4), (BaseSolid::Octahedron, 8), (BaseSolid::Icosahedron, 20)]
    {
        let grid = GridBuilder::new(solid).levels(3).build().unwrap();
        // Euler: V - E + F = 2 on every level
        assert_eq!(grid.n_triangles(), t * (1 + 4 + 16));
        assert_eq!(grid.n_vertices(), 2 + 16 * t / 2);
        assert_eq!(grid.n_triangles_on(0), t);
        assert_eq!(grid.vertex(0), &solid.vertices()[0]);
    }

    let grid = GridBuilder::octahedron().levels(2).add_tessellation(3).build().unwrap();
    assert_eq!(grid.n_tessellations(), 2);
    assert_eq!(grid.tessellations(), &[[0, 2], [2, 5]]);
    assert_eq!(grid.n_levels_in(1), 3);
    // the coarse tessellation reuses the vertices of the fine one
    assert_eq!(grid.n_vertices(), 66);
    assert_eq!(grid.first_triangle(1, 0), 40);
    assert!(GridBuilder::octahedron().levels(0).build().is_err());
}
