use serde::{Deserialize, Serialize};

use crate::algorithms::radial::{self, RadialInterpolation};
use crate::errors::GeoTessError;
use crate::storage::value_cell::ValueCell;
use crate::utilities::vector::Vector3;

use super::constant::ProfileConstant;
use super::npoint::{check_increasing, ProfileNPoint};
use super::simple::{ProfileEmpty, ProfileSurface, ProfileThin};

///
/// Variant tag of a [`Profile`]. The ordinals are part of the persistence format.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileType
{
    Empty = 0,
    Thin = 1,
    Constant = 2,
    NPoint = 3,
    Surface = 4,
    SurfaceEmpty = 5,
}

impl ProfileType
{
    pub fn ordinal(&self) -> u8
    {
        *self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self, GeoTessError>
    {
        Ok(match ordinal
        {
            0 => ProfileType::Empty,
            1 => ProfileType::Thin,
            2 => ProfileType::Constant,
            3 => ProfileType::NPoint,
            4 => ProfileType::Surface,
            5 => ProfileType::SurfaceEmpty,
            _ => return Err(GeoTessError::UnknownProfileType(ordinal)),
        })
    }
}

///
/// Radial arrangement of attribute samples for one (vertex, layer) pair.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Profile
{
    Empty(ProfileEmpty),
    Thin(ProfileThin),
    Constant(ProfileConstant),
    NPoint(ProfileNPoint),
    Surface(ProfileSurface),
    SurfaceEmpty,
}

impl From<ProfileEmpty> for Profile
{
    fn from(value: ProfileEmpty) -> Self { Profile::Empty(value) }
}
impl From<ProfileThin> for Profile
{
    fn from(value: ProfileThin) -> Self { Profile::Thin(value) }
}
impl From<ProfileConstant> for Profile
{
    fn from(value: ProfileConstant) -> Self { Profile::Constant(value) }
}
impl From<ProfileNPoint> for Profile
{
    fn from(value: ProfileNPoint) -> Self { Profile::NPoint(value) }
}
impl From<ProfileSurface> for Profile
{
    fn from(value: ProfileSurface) -> Self { Profile::Surface(value) }
}

impl Profile
{
    ///
    /// Picks the variant implied by the number of radii and value cells:
    /// (2, 0) empty, (1, 1) thin, (2, 1) constant, (n, n) n-point,
    /// (0, 1) surface and (0, 0) empty surface.
    ///
    pub fn from_radii_and_cells(radii: Vec<f32>, mut cells: Vec<ValueCell>) -> Result<Profile, GeoTessError>
    {
        match (radii.len(), cells.len())
        {
            (2, 0) => Ok(ProfileEmpty::new(radii[0], radii[1])?.into()),
            (1, 1) => Ok(ProfileThin::new(radii[0], cells.remove(0))?.into()),
            (2, 1) => Ok(ProfileConstant::new(radii[0], radii[1], cells.remove(0))?.into()),
            (0, 1) => Ok(ProfileSurface::new(cells.remove(0)).into()),
            (0, 0) => Ok(Profile::SurfaceEmpty),
            (n, m) if n >= 2 && n == m => Ok(ProfileNPoint::new(radii, cells)?.into()),
            (n, m) => Err(GeoTessError::MalformedProfile(format!("no profile type has {} radii and {} value cells", n, m))),
        }
    }

    pub fn profile_type(&self) -> ProfileType
    {
        match self
        {
            Profile::Empty(_) => ProfileType::Empty,
            Profile::Thin(_) => ProfileType::Thin,
            Profile::Constant(_) => ProfileType::Constant,
            Profile::NPoint(_) => ProfileType::NPoint,
            Profile::Surface(_) => ProfileType::Surface,
            Profile::SurfaceEmpty => ProfileType::SurfaceEmpty,
        }
    }

    pub fn radii(&self) -> &[f32]
    {
        match self
        {
            Profile::Empty(p) => &p.radii,
            Profile::Thin(p) => std::slice::from_ref(&p.radius),
            Profile::Constant(p) => &p.radii,
            Profile::NPoint(p) => &p.radii,
            Profile::Surface(_) | Profile::SurfaceEmpty => &[],
        }
    }

    #[inline]
    pub fn n_radii(&self) -> usize
    {
        self.radii().len()
    }

    /// Number of distinct value cells.
    pub fn n_values(&self) -> usize
    {
        match self
        {
            Profile::Empty(_) | Profile::SurfaceEmpty => 0,
            Profile::Thin(_) | Profile::Constant(_) | Profile::Surface(_) => 1,
            Profile::NPoint(p) => p.cells.len(),
        }
    }

    pub fn radius(&self, node: usize) -> Result<f64, GeoTessError>
    {
        let radii = self.radii();
        GeoTessError::check_index(node, radii.len())?;
        Ok(radii[node] as f64)
    }

    /// Top radius, NaN for surface profiles.
    pub fn radius_top(&self) -> f64
    {
        self.radii().last().map_or(f64::NAN, |r| *r as f64)
    }

    /// Bottom radius, NaN for surface profiles.
    pub fn radius_bottom(&self) -> f64
    {
        self.radii().first().map_or(f64::NAN, |r| *r as f64)
    }

    pub fn thickness(&self) -> f64
    {
        self.radius_top() - self.radius_bottom()
    }

    ///
    /// Value cell at `node`. Both nodes of a constant profile share one cell.
    ///
    pub fn value_cell(&self, node: usize) -> Result<&ValueCell, GeoTessError>
    {
        match self
        {
            Profile::Thin(p) if node == 0 => Ok(&p.cell),
            Profile::Surface(p) if node == 0 => Ok(&p.cell),
            Profile::Constant(p) if node < 2 => Ok(&p.cell),
            Profile::NPoint(p) if node < p.cells.len() => Ok(&p.cells[node]),
            _ => Err(GeoTessError::InvalidIndex { index: node, len: self.n_values() }),
        }
    }

    ///
    /// Mutable access to a value cell. Cached splines and gradients are
    /// discarded.
    ///
    pub fn value_cell_mut(&mut self, node: usize) -> Result<&mut ValueCell, GeoTessError>
    {
        let len = self.n_values();
        self.invalidate();
        match self
        {
            Profile::Thin(p) if node == 0 => Ok(&mut p.cell),
            Profile::Surface(p) if node == 0 => Ok(&mut p.cell),
            Profile::Constant(p) if node < 2 => Ok(&mut p.cell),
            Profile::NPoint(p) if node < p.cells.len() => Ok(&mut p.cells[node]),
            _ => Err(GeoTessError::InvalidIndex { index: node, len }),
        }
    }

    /// Replaces the value cell at `node`; it must match the kind and length of the current one.
    pub fn set_value_cell(&mut self, node: usize, cell: ValueCell) -> Result<(), GeoTessError>
    {
        let current = self.value_cell(node)?;
        if current.kind() != cell.kind() || current.len() != cell.len()
        {
            return Err(GeoTessError::MalformedProfile(format!(
                "value cell {:?}[{}] cannot replace {:?}[{}]", cell.kind(), cell.len(), current.kind(), current.len())));
        }
        *self.value_cell_mut(node)? = cell;
        Ok(())
    }

    ///
    /// Moves node `node` to `radius`, keeping the radii strictly increasing.
    ///
    pub fn set_radius(&mut self, node: usize, radius: f32) -> Result<(), GeoTessError>
    {
        let mut radii = self.radii().to_vec();
        GeoTessError::check_index(node, radii.len())?;
        radii[node] = radius;
        match self
        {
            Profile::Empty(_) =>
            {
                if !(radii[1] >= radii[0])
                {
                    return Err(GeoTessError::MalformedProfile(format!("empty profile needs bottom <= top, found {:?}", radii)));
                }
            },
            Profile::Thin(_) =>
            {
                if !radius.is_finite()
                {
                    return Err(GeoTessError::MalformedProfile(format!("thin profile radius {} is not finite", radius)));
                }
            },
            _ => check_increasing(&radii)?,
        }
        self.invalidate();
        match self
        {
            Profile::Empty(p) => p.radii[node] = radius,
            Profile::Thin(p) => p.radius = radius,
            Profile::Constant(p) => p.radii[node] = radius,
            Profile::NPoint(p) => p.radii[node] = radius,
            Profile::Surface(_) | Profile::SurfaceEmpty => {},
        }
        Ok(())
    }

    fn invalidate(&mut self)
    {
        match self
        {
            Profile::NPoint(p) => p.invalidate(),
            Profile::Constant(p) => p.gradients.clear(),
            _ => {},
        }
    }

    ///
    /// Sample of `attribute` at `node`, NaN if either index is invalid or the
    /// profile holds no data.
    ///
    #[inline]
    pub fn value(&self, attribute: usize, node: usize) -> f64
    {
        match self
        {
            Profile::Thin(p) if node == 0 => p.cell.value(attribute),
            Profile::Surface(p) if node == 0 => p.cell.value(attribute),
            Profile::Constant(p) if node < 2 => p.cell.value(attribute),
            Profile::NPoint(p) => p.value(attribute, node),
            _ => f64::NAN,
        }
    }

    pub fn is_nan(&self, attribute: usize, node: usize) -> bool
    {
        self.value_cell(node).ok().and_then(|c| c.is_nan(attribute).ok()).unwrap_or(true)
    }

    pub fn value_top(&self, attribute: usize) -> f64
    {
        match self
        {
            Profile::NPoint(p) => p.value(attribute, p.cells.len() - 1),
            _ => self.value(attribute, 0),
        }
    }

    pub fn value_bottom(&self, attribute: usize) -> f64
    {
        self.value(attribute, 0)
    }

    /// True when `radius` lies outside `[bottom, top]`. Never true for surface profiles.
    pub fn out_of_range(&self, radius: f64) -> bool
    {
        radius < self.radius_bottom() || radius > self.radius_top()
    }

    ///
    /// Floor node index of `radius`: -1 below the profile, the last index
    /// above it.
    ///
    pub fn radius_index(&self, radius: f64) -> isize
    {
        match self
        {
            Profile::NPoint(p) => radial::radius_index(&p.radii, radius),
            _ =>
            {
                if radius < self.radius_bottom()
                {
                    -1
                }
                else if radius > self.radius_top()
                {
                    self.n_radii() as isize - 1
                }
                else
                {
                    0
                }
            },
        }
    }

    ///
    /// Appends linear radial interpolation weights of `radius` to `weights`
    /// as (node, weight) pairs. Single-node profiles give node 0 full weight,
    /// or NaN when `radius` is outside the profile and `allow_out_of_range`
    /// is false.
    ///
    pub fn interpolation_weights(&self, radius: f64, allow_out_of_range: bool, weights: &mut Vec<(usize, f64)>)
    {
        match self
        {
            Profile::NPoint(p) => radial::linear_weights(&p.radii, radius, allow_out_of_range, weights),
            _ =>
            {
                let w = if !allow_out_of_range && self.out_of_range(radius) { f64::NAN } else { 1.0 };
                weights.push((0, w));
            },
        }
    }

    ///
    /// Interpolated value of `attribute` at `radius`.
    ///
    pub fn value_at(&self, interpolation: RadialInterpolation, attribute: usize, radius: f64, allow_out_of_range: bool) -> f64
    {
        match self
        {
            Profile::NPoint(p) => p.value_at(interpolation, attribute, radius, allow_out_of_range),
            _ =>
            {
                if !allow_out_of_range && self.out_of_range(radius)
                {
                    f64::NAN
                }
                else
                {
                    self.value(attribute, 0)
                }
            },
        }
    }

    /// Weighted sum of node values, NaN when `weights` is empty.
    pub fn weighted_value(&self, attribute: usize, weights: &[(usize, f64)]) -> f64
    {
        if weights.is_empty()
        {
            return f64::NAN;
        }
        weights.iter().map(|(node, w)| w * self.value(attribute, *node)).sum()
    }

    pub fn closest_node(&self, radius: f64) -> usize
    {
        match self
        {
            Profile::NPoint(p) => p.closest_node(radius),
            Profile::Constant(p) => p.closest_node(radius),
            _ => 0,
        }
    }

    ///
    /// Radial integral of `attribute` by the trapezoid rule, or of its
    /// reciprocal (e.g. travel time through a velocity profile).
    ///
    pub fn integrate(&self, attribute: usize, reciprocal: bool) -> f64
    {
        match self
        {
            Profile::NPoint(p) => p.integrate(attribute, reciprocal),
            Profile::Constant(p) => p.integrate(attribute, reciprocal),
            _ => 0.0,
        }
    }

    /// Deep copy including point indices and computed gradients.
    pub fn copy(&self) -> Profile
    {
        self.clone()
    }

    pub fn point_index(&self, node: usize) -> Option<usize>
    {
        match self
        {
            Profile::Thin(p) if node == 0 => p.point_index,
            Profile::Surface(p) if node == 0 => p.point_index,
            Profile::Constant(p) if node < 2 => p.point_index,
            Profile::NPoint(p) => p.point_indices.get(node).copied().flatten(),
            _ => None,
        }
    }

    pub fn set_point_index(&mut self, node: usize, point: Option<usize>) -> Result<(), GeoTessError>
    {
        let len = self.n_values();
        match self
        {
            Profile::Thin(p) if node == 0 => p.point_index = point,
            Profile::Surface(p) if node == 0 => p.point_index = point,
            Profile::Constant(p) if node == 0 => p.point_index = point,
            Profile::NPoint(p) if node < p.point_indices.len() => p.point_indices[node] = point,
            _ => return Err(GeoTessError::InvalidIndex { index: node, len }),
        }
        Ok(())
    }

    pub fn reset_point_indices(&mut self)
    {
        match self
        {
            Profile::Thin(p) => p.point_index = None,
            Profile::Surface(p) => p.point_index = None,
            Profile::Constant(p) => p.point_index = None,
            Profile::NPoint(p) => p.point_indices.fill(None),
            Profile::Empty(_) | Profile::SurfaceEmpty => {},
        }
    }

    pub fn is_gradient_set(&self, attribute: usize) -> bool
    {
        match self
        {
            Profile::Constant(p) => p.gradients.is_set(attribute),
            Profile::NPoint(p) => p.gradients.is_set(attribute),
            _ => false,
        }
    }

    /// Whether the cached gradient of `attribute` is of the reciprocal field, `None` if unset.
    pub fn gradient_reciprocal(&self, attribute: usize) -> Option<bool>
    {
        match self
        {
            Profile::Constant(p) => p.gradients.reciprocal(attribute),
            Profile::NPoint(p) => p.gradients.reciprocal(attribute),
            _ => None,
        }
    }

    ///
    /// Cached gradient of `attribute` at `node`. `None` when not computed or
    /// when the variant carries no gradients.
    ///
    pub fn gradient(&self, node: usize, attribute: usize) -> Option<Vector3>
    {
        match self
        {
            Profile::Constant(p) if node < 2 => p.gradients.node(attribute, 0),
            Profile::NPoint(p) => p.gradients.node(attribute, node),
            _ => None,
        }
    }

    ///
    /// Computes and caches gradients of `attribute` unless they are already
    /// cached with the same reciprocal flag. `estimate(radius)` returns the
    /// gradient at one radius of this profile. Variants without gradient
    /// support are left untouched.
    ///
    pub fn compute_gradients<F>(&self, attribute: usize, reciprocal: bool, estimate: F) -> Result<(), GeoTessError>
        where F: FnMut(f64) -> Result<Vector3, GeoTessError>
    {
        match self
        {
            Profile::Constant(p) => p.gradients.ensure(attribute, reciprocal, &[p.gradient_radius()], estimate),
            Profile::NPoint(p) =>
            {
                let radii: Vec<f64> = p.radii.iter().map(|r| *r as f64).collect();
                p.gradients.ensure(attribute, reciprocal, &radii, estimate)
            },
            _ => Ok(()),
        }
    }

    /// Adds `coefficient` times the gradient at `radius` to `gradient`.
    pub fn add_to_gradient(&self, attribute: usize, radius: f64, coefficient: f64, gradient: &mut Vector3)
    {
        match self
        {
            Profile::Constant(p) => p.add_to_gradient(attribute, coefficient, gradient),
            Profile::NPoint(p) => p.add_to_gradient(attribute, radius, coefficient, gradient),
            _ => {},
        }
    }

    /// Adds `coefficient` times the gradient at `node` to `gradient`.
    pub fn add_node_to_gradient(&self, attribute: usize, node: usize, coefficient: f64, gradient: &mut Vector3)
    {
        if let Some(g) = self.gradient(node, attribute)
        {
            for k in 0..3
            {
                gradient[k] += coefficient * g[k];
            }
        }
    }

    pub fn reset_gradients(&self)
    {
        match self
        {
            Profile::Constant(p) => p.gradients.clear(),
            Profile::NPoint(p) => p.gradients.clear(),
            _ => {},
        }
    }
}
