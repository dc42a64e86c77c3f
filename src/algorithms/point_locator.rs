use crate::errors::GeoTessError;
use crate::grids::grid::{Edge, Grid};
use crate::utilities::vector::{dot, Vector3};

/// Walk steps allowed per level before a search is declared lost.
pub const DEFAULT_ITERATIONS_PER_LEVEL: usize = 100_000;

/// Edge plane tolerance of the inside test.
const INSIDE: f64 = -1e-15;

///
/// Outcome of a walking triangle search.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located
{
    pub triangle: usize,
    /// Level relative to the first level of the tessellation.
    pub tess_level: usize,
    /// Barycentric weights of the three corners, summing to one.
    pub coefficients: [f64; 3],
}

///
/// Walks from `triangle` toward `u`, crossing the first edge whose plane has
/// `u` on its outside, and descends to the child triangle once inside until
/// there is no child or `max_tess_level` is reached. Returns `None` when
/// `max_iterations` steps are exhausted.
///
pub(crate) fn walk(edges: &[[Edge; 3]], descendants: &[Option<usize>], u: &Vector3, mut triangle: usize,
    mut tess_level: usize, max_tess_level: usize, max_iterations: usize) -> Option<Located>
{
    let mut c = [0.0; 3];
    for _ in 0..max_iterations
    {
        let e = &edges[triangle];
        c[0] = dot(&e[0].normal, u);
        if c[0] > INSIDE
        {
            c[1] = dot(&e[1].normal, u);
            if c[1] > INSIDE
            {
                c[2] = dot(&e[2].normal, u);
                if c[2] > INSIDE
                {
                    match descendants[triangle]
                    {
                        Some(child) if tess_level < max_tess_level =>
                        {
                            tess_level += 1;
                            triangle = child;
                        },
                        _ =>
                        {
                            let sum = c[0] + c[1] + c[2];
                            return Some(Located { triangle, tess_level, coefficients: [c[0] / sum, c[1] / sum, c[2] / sum] });
                        },
                    }
                }
                else
                {
                    triangle = e[2].t_left;
                }
            }
            else
            {
                triangle = e[1].t_left;
            }
        }
        else
        {
            triangle = e[0].t_left;
        }
    }
    None
}

#[derive(Clone, Debug, Default)]
struct WalkState
{
    triangle: Option<usize>,
    tess_level: usize,
    coefficients: [f64; 3],
}

///
/// Per-tessellation walking triangle cursor. Each tessellation keeps the
/// triangle found by the last search so that nearby queries resume from it
/// instead of from the root.
///
#[derive(Clone, Debug)]
pub struct PointLocator
{
    states: Vec<WalkState>,
    max_tess_levels: Vec<usize>,
    iterations_per_level: usize,
}

impl PointLocator
{
    pub fn new(grid: &Grid) -> Self
    {
        let n = grid.n_tessellations();
        Self
        {
            states: vec![WalkState::default(); n],
            max_tess_levels: vec![usize::MAX; n],
            iterations_per_level: DEFAULT_ITERATIONS_PER_LEVEL,
        }
    }

    #[inline]
    pub fn n_tessellations(&self) -> usize
    {
        self.states.len()
    }

    pub fn max_tess_level(&self, tessellation: usize) -> usize
    {
        self.max_tess_levels[tessellation]
    }

    ///
    /// Caps the level on which searches in `tessellation` stop. The cached
    /// triangle of that tessellation is discarded.
    ///
    pub fn set_max_tess_level(&mut self, tessellation: usize, level: usize)
    {
        self.max_tess_levels[tessellation] = level;
        self.invalidate(tessellation);
    }

    pub fn set_iterations_per_level(&mut self, iterations: usize)
    {
        self.iterations_per_level = iterations.max(1);
    }

    pub fn iterations_per_level(&self) -> usize
    {
        self.iterations_per_level
    }

    /// Forgets the cached triangle of `tessellation`.
    #[inline]
    pub fn invalidate(&mut self, tessellation: usize)
    {
        self.states[tessellation].triangle = None;
    }

    pub fn invalidate_all(&mut self)
    {
        for state in self.states.iter_mut()
        {
            state.triangle = None;
        }
    }

    /// Cached triangle of `tessellation`, `None` until a search has run.
    #[inline]
    pub fn triangle(&self, tessellation: usize) -> Option<usize>
    {
        self.states[tessellation].triangle
    }

    #[inline]
    pub fn tess_level(&self, tessellation: usize) -> usize
    {
        self.states[tessellation].tess_level
    }

    #[inline]
    pub fn coefficients(&self, tessellation: usize) -> &[f64; 3]
    {
        &self.states[tessellation].coefficients
    }

    ///
    /// Locates `u` in `tessellation`. The walk resumes from the cached
    /// triangle unless `restart` is set or nothing is cached, in which case
    /// it starts at the first triangle of level zero.
    ///
    pub fn locate(&mut self, grid: &Grid, tessellation: usize, u: &Vector3, restart: bool) -> Result<Located, GeoTessError>
    {
        let state = &mut self.states[tessellation];
        let (start, start_level) = match state.triangle
        {
            Some(t) if !restart => (t, state.tess_level),
            _ =>
            {
                tracing::debug!(tessellation, "walk restarted from the root triangle");
                (grid.first_triangle(tessellation, 0), 0)
            },
        };
        let max_tess_level = self.max_tess_levels[tessellation];
        let max_iterations = self.iterations_per_level.saturating_mul(grid.n_levels_in(tessellation));
        match walk(grid.edges(), grid.descendants(), u, start, start_level, max_tess_level, max_iterations)
        {
            Some(located) =>
            {
                tracing::trace!(tessellation, triangle = located.triangle, level = located.tess_level, "point located");
                state.triangle = Some(located.triangle);
                state.tess_level = located.tess_level;
                state.coefficients = located.coefficients;
                Ok(located)
            },
            None =>
            {
                tracing::warn!(tessellation, max_iterations, "walking triangle search did not converge");
                state.triangle = None;
                Err(GeoTessError::SpatialSearchFailure { tessellation, iterations: max_iterations })
            },
        }
    }
}
