//! Stateful query cursor over a [`Model`].
//!
//! A [`Position`] remembers where it was last set and what it derived from
//! that: the containing triangle and vertex weights of every tessellation,
//! the interpolated layer boundary radii, and the radial node weights of the
//! current layer. Moving the point horizontally discards all of it; changing
//! only the radius or the layer discards only the radial weights.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::algorithms::gradient::GradientEstimator;
use crate::algorithms::horizontal::{HorizontalInterpolation, HorizontalInterpolator};
use crate::algorithms::point_locator::{PointLocator, DEFAULT_ITERATIONS_PER_LEVEL};
use crate::algorithms::radial::RadialInterpolation;
use crate::errors::GeoTessError;
use crate::grids::grid::Grid;
use crate::model::Model;
use crate::utilities::vector::{dot, scale, Vector3};

/// Cosine of roughly 16 degrees. Moves longer than this restart the walk from the root.
const RESTART_COSINE: f64 = 0.961261696;

/// Layers thinner than this (km) have zero gradients and zero top/bottom values.
const MIN_THICKNESS: f64 = 1e-9;

/// Horizontal weight above which a query is considered to sit on a vertex.
const VERTEX_WEIGHT: f64 = 0.999999999;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionOptions
{
    pub horizontal: HorizontalInterpolation,
    pub radial: RadialInterpolation,
    /// Returned in place of NaN results.
    pub error_value: f64,
    /// Clamp radii outside a profile to its end nodes instead of failing with `error_value`.
    pub radius_out_of_range_allowed: bool,
    pub iterations_per_level: usize,
}

impl Default for PositionOptions
{
    fn default() -> Self
    {
        Self
        {
            horizontal: HorizontalInterpolation::Linear,
            radial: RadialInterpolation::Linear,
            error_value: f64::NAN,
            radius_out_of_range_allowed: true,
            iterations_per_level: DEFAULT_ITERATIONS_PER_LEVEL,
        }
    }
}

///
/// Interpolation cursor bound to one model. A position is cheap to create
/// and must not be shared between threads; create one per worker.
///
pub struct Position<'a>
{
    model: &'a Model,
    grid: &'a Grid,
    interpolator: Box<dyn HorizontalInterpolator>,
    radial_type: RadialInterpolation,
    locator: PointLocator,
    /// Vertex weights of each tessellation, valid while the locator holds a triangle for it.
    horizontal: Vec<Vec<(usize, f64)>>,
    u: Option<Vector3>,
    radius: Option<f64>,
    layer: usize,
    tessellation: usize,
    earth_radius: Option<f64>,
    /// Interface radii: `interfaces[l]` is the bottom of layer `l`, `interfaces[l + 1]` its top.
    interfaces: Vec<Option<f64>>,
    /// Radial node weights, one list per entry of the horizontal weights.
    radial: Vec<Vec<(usize, f64)>>,
    /// Layer the radial weights were computed for, `None` when stale.
    radial_layer: Option<usize>,
    error_value: f64,
    allow_out_of_range: bool,
}

impl std::fmt::Debug for Position<'_>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Position")
            .field("horizontal", &self.interpolator.interpolation())
            .field("radial", &self.radial_type)
            .field("u", &self.u)
            .field("radius", &self.radius)
            .field("layer", &self.layer)
            .field("tessellation", &self.tessellation)
            .finish()
    }
}

impl<'a> Position<'a>
{
    pub fn new(model: &'a Model, horizontal: HorizontalInterpolation, radial: RadialInterpolation) -> Self
    {
        Self::with_options(model, PositionOptions { horizontal, radial, ..Default::default() })
    }

    pub fn with_options(model: &'a Model, options: PositionOptions) -> Self
    {
        let grid: &'a Grid = model.grid();
        let mut locator = PointLocator::new(grid);
        locator.set_iterations_per_level(options.iterations_per_level);
        Self
        {
            model,
            grid,
            interpolator: options.horizontal.interpolator(),
            radial_type: options.radial,
            locator,
            horizontal: vec![Vec::with_capacity(8); grid.n_tessellations()],
            u: None,
            radius: None,
            layer: 0,
            tessellation: 0,
            earth_radius: None,
            interfaces: vec![None; model.n_layers() + 1],
            radial: Vec::new(),
            radial_layer: None,
            error_value: options.error_value,
            allow_out_of_range: options.radius_out_of_range_allowed,
        }
    }

    #[inline]
    pub fn model(&self) -> &'a Model
    {
        self.model
    }

    pub fn horizontal_interpolation(&self) -> HorizontalInterpolation
    {
        self.interpolator.interpolation()
    }

    pub fn radial_interpolation(&self) -> RadialInterpolation
    {
        self.radial_type
    }

    // ---------------------------------------------------------------------
    // setting the position

    ///
    /// Moves to geographic `lat`/`lon` (degrees) at `depth` km below the
    /// surface of the model's earth shape.
    ///
    pub fn set_lat_lon_depth(&mut self, lat: f64, lon: f64, depth: f64) -> Result<(), GeoTessError>
    {
        let shape = self.model.metadata().earth_shape;
        let u = shape.vector(lat, lon);
        self.set(&u, shape.earth_radius(&u) - depth)
    }

    ///
    /// Moves to unit vector `u` at `radius` km. The layer is the one that
    /// contains `radius` at this location.
    ///
    pub fn set(&mut self, u: &Vector3, radius: f64) -> Result<(), GeoTessError>
    {
        let top = self.model.n_layers() - 1;
        self.update_position_2d(top, u)?;
        let layer = self.layer_id_of(radius)?;
        self.switch_layer(layer)?;
        self.update_radius(layer, radius)
    }

    /// Like [`Position::set_lat_lon_depth`] with the layer fixed to `layer`.
    pub fn set_lat_lon_depth_in_layer(&mut self, layer: usize, lat: f64, lon: f64, depth: f64) -> Result<(), GeoTessError>
    {
        let shape = self.model.metadata().earth_shape;
        let u = shape.vector(lat, lon);
        self.update_position_2d(layer, &u)?;
        self.update_radius(layer, shape.earth_radius(&u) - depth)
    }

    ///
    /// Moves to `u` in `layer`. With `radius` of `None` the radius is left
    /// unset and only layer queries are possible until one is given.
    ///
    pub fn set_in_layer(&mut self, layer: usize, u: &Vector3, radius: Option<f64>) -> Result<(), GeoTessError>
    {
        self.update_position_2d(layer, u)?;
        match radius
        {
            Some(r) => self.update_radius(layer, r),
            None => Ok(()),
        }
    }

    /// Moves to the top of `layer` at `u`.
    pub fn set_top(&mut self, layer: usize, u: &Vector3) -> Result<(), GeoTessError>
    {
        self.update_position_2d(layer, u)?;
        let r = self.radius_top(layer)?;
        self.update_radius(layer, r)
    }

    /// Moves to the bottom of `layer` at `u`.
    pub fn set_bottom(&mut self, layer: usize, u: &Vector3) -> Result<(), GeoTessError>
    {
        self.update_position_2d(layer, u)?;
        let r = self.radius_bottom(layer)?;
        self.update_radius(layer, r)
    }

    /// Moves vertically to the top of `layer` at the current location.
    pub fn set_top_of_layer(&mut self, layer: usize) -> Result<(), GeoTessError>
    {
        self.switch_layer(layer)?;
        let r = self.radius_top(layer)?;
        self.update_radius(layer, r)
    }

    /// Moves vertically to the bottom of `layer` at the current location.
    pub fn set_bottom_of_layer(&mut self, layer: usize) -> Result<(), GeoTessError>
    {
        self.switch_layer(layer)?;
        let r = self.radius_bottom(layer)?;
        self.update_radius(layer, r)
    }

    /// Moves vertically to `radius`, in whatever layer contains it.
    pub fn set_radius(&mut self, radius: f64) -> Result<(), GeoTessError>
    {
        self.unit()?;
        let layer = self.layer_id_of(radius)?;
        self.update_radius(layer, radius)
    }

    /// Moves vertically to `radius`, treated as part of `layer` even if outside it.
    pub fn set_radius_in_layer(&mut self, layer: usize, radius: f64) -> Result<(), GeoTessError>
    {
        self.unit()?;
        GeoTessError::check_index(layer, self.model.n_layers())?;
        self.update_radius(layer, radius)
    }

    pub fn set_depth(&mut self, depth: f64) -> Result<(), GeoTessError>
    {
        let r = self.earth_radius()? - depth;
        self.set_radius(r)
    }

    pub fn set_depth_in_layer(&mut self, layer: usize, depth: f64) -> Result<(), GeoTessError>
    {
        let r = self.earth_radius()? - depth;
        self.set_radius_in_layer(layer, r)
    }

    fn switch_layer(&mut self, layer: usize) -> Result<(), GeoTessError>
    {
        self.unit()?;
        GeoTessError::check_index(layer, self.model.n_layers())?;
        self.tessellation = self.model.metadata().tessellation(layer);
        self.check_tessellation(self.tessellation)
    }

    fn update_position_2d(&mut self, layer: usize, u: &Vector3) -> Result<(), GeoTessError>
    {
        GeoTessError::check_index(layer, self.model.n_layers())?;
        let tessellation = self.model.metadata().tessellation(layer);
        self.tessellation = tessellation;
        if self.u.as_ref() == Some(u)
        {
            return self.check_tessellation(tessellation);
        }
        let restart = match self.u
        {
            Some(last) => dot(&last, u) < RESTART_COSINE,
            None => true,
        };
        for t in 0..self.locator.n_tessellations()
        {
            if t != tessellation
            {
                self.locator.invalidate(t);
            }
        }
        self.u = Some(*u);
        self.earth_radius = None;
        self.radius = None;
        self.interfaces.fill(None);
        self.radial_layer = None;
        self.locate(tessellation, restart)
    }

    fn update_radius(&mut self, layer: usize, radius: f64) -> Result<(), GeoTessError>
    {
        if self.radius != Some(radius) || layer != self.layer
        {
            self.radius = Some(radius);
            self.layer = layer;
            self.tessellation = self.model.metadata().tessellation(layer);
            self.check_tessellation(self.tessellation)?;
            self.radial_layer = None;
        }
        Ok(())
    }

    fn locate(&mut self, tessellation: usize, restart: bool) -> Result<(), GeoTessError>
    {
        let u = self.unit()?;
        let located = self.locator.locate(self.grid, tessellation, &u, restart)?;
        self.interpolator.weights(self.grid, tessellation, &located, &u, &mut self.horizontal[tessellation])
    }

    /// Locates the current point in `tessellation` unless a triangle is cached for it.
    fn check_tessellation(&mut self, tessellation: usize) -> Result<(), GeoTessError>
    {
        if self.locator.triangle(tessellation).is_none()
        {
            self.locate(tessellation, true)?;
        }
        Ok(())
    }

    fn update_radial(&mut self, layer: usize, tessellation: usize) -> Result<(), GeoTessError>
    {
        if self.radial_layer == Some(layer)
        {
            return Ok(());
        }
        let radius = self.radius.ok_or(GeoTessError::PositionNotSet)?;
        let vertices = &self.horizontal[tessellation];
        if self.radial.len() < vertices.len()
        {
            self.radial.resize_with(vertices.len(), Vec::new);
        }
        for ((vertex, _), weights) in vertices.iter().zip(self.radial.iter_mut())
        {
            weights.clear();
            self.model.profile_unchecked(*vertex, layer).interpolation_weights(radius, self.allow_out_of_range, weights);
        }
        self.radial_layer = Some(layer);
        Ok(())
    }

    #[inline]
    fn unit(&self) -> Result<Vector3, GeoTessError>
    {
        self.u.ok_or(GeoTessError::PositionNotSet)
    }

    #[inline]
    fn or_error_value(&self, value: f64) -> f64
    {
        if value.is_nan() { self.error_value } else { value }
    }

    // ---------------------------------------------------------------------
    // values and gradients

    /// Interpolated value of `attribute` at the current position.
    pub fn value(&mut self, attribute: usize) -> Result<f64, GeoTessError>
    {
        self.unit()?;
        self.value_in(attribute, self.layer, self.tessellation)
    }

    /// Value of `attribute` from the profiles of `layer`, at the current radius.
    pub fn value_in_layer(&mut self, attribute: usize, layer: usize) -> Result<f64, GeoTessError>
    {
        self.unit()?;
        GeoTessError::check_index(layer, self.model.n_layers())?;
        self.value_in(attribute, layer, self.model.metadata().tessellation(layer))
    }

    fn value_in(&mut self, attribute: usize, layer: usize, tessellation: usize) -> Result<f64, GeoTessError>
    {
        GeoTessError::check_index(attribute, self.model.n_attributes())?;
        self.check_tessellation(tessellation)?;
        let radius = self.radius.ok_or(GeoTessError::PositionNotSet)?;
        let mut value = 0.0;
        match self.radial_type
        {
            RadialInterpolation::CubicSpline =>
            {
                for (vertex, h) in self.horizontal[tessellation].iter()
                {
                    let profile = self.model.profile_unchecked(*vertex, layer);
                    value += h * profile.value_at(self.radial_type, attribute, radius, self.allow_out_of_range);
                }
            },
            RadialInterpolation::Linear =>
            {
                self.update_radial(layer, tessellation)?;
                for ((vertex, h), weights) in self.horizontal[tessellation].iter().zip(self.radial.iter())
                {
                    value += h * self.model.profile_unchecked(*vertex, layer).weighted_value(attribute, weights);
                }
            },
        }
        Ok(self.or_error_value(value))
    }

    /// Value of `attribute` at the top of `layer`, 0 for a layer of no thickness.
    pub fn value_top(&mut self, attribute: usize, layer: usize) -> Result<f64, GeoTessError>
    {
        self.boundary_value(attribute, layer, true)
    }

    /// Value of `attribute` at the bottom of `layer`, 0 for a layer of no thickness.
    pub fn value_bottom(&mut self, attribute: usize, layer: usize) -> Result<f64, GeoTessError>
    {
        self.boundary_value(attribute, layer, false)
    }

    fn boundary_value(&mut self, attribute: usize, layer: usize, top: bool) -> Result<f64, GeoTessError>
    {
        GeoTessError::check_index(attribute, self.model.n_attributes())?;
        if self.layer_thickness(layer)? < MIN_THICKNESS
        {
            return Ok(0.0);
        }
        let tessellation = self.model.metadata().tessellation(layer);
        self.check_tessellation(tessellation)?;
        Ok(self.horizontal[tessellation].iter().map(|(vertex, h)| {
            let profile = self.model.profile_unchecked(*vertex, layer);
            h * if top { profile.value_top(attribute) } else { profile.value_bottom(attribute) }
        }).sum())
    }

    ///
    /// Gradient of `attribute`, or of its reciprocal, at the current
    /// position. Profile gradients are computed on first use. Zero in a
    /// layer of no thickness.
    ///
    pub fn gradient(&mut self, attribute: usize, reciprocal: bool) -> Result<Vector3, GeoTessError>
    {
        self.unit()?;
        self.gradient_in_layer(attribute, self.layer, reciprocal)
    }

    /// Gradient of `attribute` from the profiles of `layer`, at the current radius.
    pub fn gradient_in_layer(&mut self, attribute: usize, layer: usize, reciprocal: bool) -> Result<Vector3, GeoTessError>
    {
        GeoTessError::check_index(attribute, self.model.n_attributes())?;
        self.require_linear("gradients")?;
        let mut gradient = [0.0; 3];
        if self.layer_thickness(layer)? < MIN_THICKNESS
        {
            return Ok(gradient);
        }
        let tessellation = self.model.metadata().tessellation(layer);
        self.check_tessellation(tessellation)?;
        self.update_radial(layer, tessellation)?;

        let model = self.model;
        let mut estimator: Option<GradientEstimator<'a>> = None;
        for ((vertex, h), weights) in self.horizontal[tessellation].iter().zip(self.radial.iter())
        {
            let profile = model.profile_unchecked(*vertex, layer);
            let u = *self.grid.vertex(*vertex);
            profile.compute_gradients(attribute, reciprocal, |radius| {
                estimator.get_or_insert_with(|| GradientEstimator::new(model)).gradient(&u, radius, layer, attribute, reciprocal)
            })?;
            for (node, coefficient) in weights.iter()
            {
                profile.add_node_to_gradient(attribute, *node, h * coefficient, &mut gradient);
            }
        }
        Ok(gradient)
    }

    fn require_linear(&self, what: &'static str) -> Result<(), GeoTessError>
    {
        match self.radial_type
        {
            RadialInterpolation::Linear => Ok(()),
            RadialInterpolation::CubicSpline =>
            {
                tracing::debug!(what, "rejected under cubic spline radial interpolation");
                Err(GeoTessError::UnsupportedInterpolatorCombination("per-node weights are undefined for cubic spline radial interpolation"))
            },
        }
    }

    // ---------------------------------------------------------------------
    // layers

    ///
    /// Radius of the top of `layer`. Where the next layer up uses a finer
    /// tessellation, the interface is interpolated on that one.
    ///
    pub fn radius_top(&mut self, layer: usize) -> Result<f64, GeoTessError>
    {
        GeoTessError::check_index(layer, self.model.n_layers())?;
        self.unit()?;
        if let Some(r) = self.interfaces[layer + 1]
        {
            return Ok(self.or_error_value(r));
        }
        let neighbor = if layer + 1 < self.model.n_layers() { Some(layer + 1) } else { None };
        let tessellation = self.interface_tessellation(layer, neighbor)?;
        let r: f64 = self.horizontal[tessellation].iter()
            .map(|(vertex, h)| h * self.model.profile_unchecked(*vertex, layer).radius_top())
            .sum();
        self.interfaces[layer + 1] = Some(r);
        Ok(self.or_error_value(r))
    }

    /// Radius of the bottom of `layer`, see [`Position::radius_top`].
    pub fn radius_bottom(&mut self, layer: usize) -> Result<f64, GeoTessError>
    {
        GeoTessError::check_index(layer, self.model.n_layers())?;
        self.unit()?;
        if let Some(r) = self.interfaces[layer]
        {
            return Ok(self.or_error_value(r));
        }
        let neighbor = layer.checked_sub(1);
        let tessellation = self.interface_tessellation(layer, neighbor)?;
        let r: f64 = self.horizontal[tessellation].iter()
            .map(|(vertex, h)| h * self.model.profile_unchecked(*vertex, layer).radius_bottom())
            .sum();
        self.interfaces[layer] = Some(r);
        Ok(self.or_error_value(r))
    }

    /// Tessellation of `layer`, or that of `neighbor` when its containing triangle is smaller.
    fn interface_tessellation(&mut self, layer: usize, neighbor: Option<usize>) -> Result<usize, GeoTessError>
    {
        let tessellation = self.model.metadata().tessellation(layer);
        self.check_tessellation(tessellation)?;
        let Some(neighbor) = neighbor else { return Ok(tessellation) };
        let other = self.model.metadata().tessellation(neighbor);
        if other == tessellation
        {
            return Ok(tessellation);
        }
        self.check_tessellation(other)?;
        match (self.locator.triangle(tessellation), self.locator.triangle(other))
        {
            (Some(t1), Some(t2)) if self.bigger_triangle(t1, t2) == t1 => Ok(other),
            _ => Ok(tessellation),
        }
    }

    /// Larger of two triangles, by the sum of the dot products of their corner pairs.
    fn bigger_triangle(&self, t1: usize, t2: usize) -> usize
    {
        let closeness = |t: usize| {
            let [a, b, c] = self.grid.triangle_vertices(t);
            dot(a, b) + dot(b, c) + dot(c, a)
        };
        if closeness(t2) > closeness(t1) { t1 } else { t2 }
    }

    pub fn layer_thickness(&mut self, layer: usize) -> Result<f64, GeoTessError>
    {
        Ok(self.radius_top(layer)? - self.radius_bottom(layer)?)
    }

    pub fn depth_top(&mut self, layer: usize) -> Result<f64, GeoTessError>
    {
        Ok(self.earth_radius()? - self.radius_top(layer)?)
    }

    pub fn depth_bottom(&mut self, layer: usize) -> Result<f64, GeoTessError>
    {
        Ok(self.earth_radius()? - self.radius_bottom(layer)?)
    }

    /// Bottom of layer 0 followed by the top of every layer.
    pub fn layer_radii(&mut self) -> Result<Vec<f64>, GeoTessError>
    {
        let n = self.model.n_layers();
        let mut radii = Vec::with_capacity(n + 1);
        radii.push(self.radius_bottom(0)?);
        for layer in 0..n
        {
            radii.push(self.radius_top(layer)?);
        }
        Ok(radii)
    }

    /// Current layer.
    #[inline]
    pub fn layer_id(&self) -> usize
    {
        self.layer
    }

    /// Tessellation of the current layer.
    #[inline]
    pub fn tessellation_id(&self) -> usize
    {
        self.tessellation
    }

    ///
    /// Lowest layer whose top is at or above `radius`. Above the model this
    /// is the top-most layer of non-zero thickness.
    ///
    pub fn layer_id_of(&mut self, radius: f64) -> Result<usize, GeoTessError>
    {
        let n = self.model.n_layers();
        for layer in 0..n
        {
            if radius <= self.radius_top(layer)?
            {
                return Ok(layer);
            }
        }
        for layer in (0..n).rev()
        {
            if self.layer_thickness(layer)? > 0.0
            {
                return Ok(layer);
            }
        }
        Ok(n - 1)
    }

    ///
    /// Layer whose top interface is closest above `radius`, found by
    /// bisection; at the top of the model, the uppermost layer thicker than
    /// 1e-6 km. `None` when every layer is thinner than that.
    ///
    pub fn interface_index(&mut self, radius: f64) -> Result<Option<usize>, GeoTessError>
    {
        let n = self.model.n_layers() as isize;
        let mut bottom = -1isize;
        let mut top = n - 1;
        while top - bottom > 1
        {
            let i = (top + bottom) / 2;
            if radius > self.radius_top(i as usize)?
            {
                bottom = i;
            }
            else
            {
                top = i;
            }
        }
        if top == n - 1
        {
            return self.previous_layer(top as usize, 1e-6);
        }
        Ok(Some(top as usize))
    }

    /// First layer above `layer` at least `min_thickness` thick.
    pub fn next_layer(&mut self, layer: usize, min_thickness: f64) -> Result<Option<usize>, GeoTessError>
    {
        for l in layer + 1..self.model.n_layers()
        {
            if self.layer_thickness(l)? >= min_thickness
            {
                return Ok(Some(l));
            }
        }
        Ok(None)
    }

    /// `layer` itself or the first layer below it at least `min_thickness` thick.
    pub fn previous_layer(&mut self, layer: usize, min_thickness: f64) -> Result<Option<usize>, GeoTessError>
    {
        for l in (0..=layer.min(self.model.n_layers() - 1)).rev()
        {
            if self.layer_thickness(l)? >= min_thickness
            {
                return Ok(Some(l));
            }
        }
        Ok(None)
    }

    // ---------------------------------------------------------------------
    // location

    pub fn vector(&self) -> Result<Vector3, GeoTessError>
    {
        self.unit()
    }

    /// Earth centered location in km.
    pub fn location(&self) -> Result<Vector3, GeoTessError>
    {
        Ok(scale(&self.unit()?, self.radius()?))
    }

    pub fn latitude(&self) -> Result<f64, GeoTessError>
    {
        Ok(self.model.metadata().earth_shape.latitude(&self.unit()?))
    }

    pub fn longitude(&self) -> Result<f64, GeoTessError>
    {
        Ok(self.model.metadata().earth_shape.longitude(&self.unit()?))
    }

    pub fn radius(&self) -> Result<f64, GeoTessError>
    {
        self.radius.ok_or(GeoTessError::PositionNotSet)
    }

    pub fn depth(&mut self) -> Result<f64, GeoTessError>
    {
        Ok(self.earth_radius()? - self.radius()?)
    }

    /// Radius of the earth shape's surface below the current position.
    pub fn earth_radius(&mut self) -> Result<f64, GeoTessError>
    {
        if let Some(r) = self.earth_radius
        {
            return Ok(r);
        }
        let r = self.model.metadata().earth_shape.earth_radius(&self.unit()?);
        self.earth_radius = Some(r);
        Ok(r)
    }

    pub fn is_above_model(&mut self) -> Result<bool, GeoTessError>
    {
        let surface = self.surface_radius()?;
        Ok(self.radius()? > surface)
    }

    /// Radius of the top of the uppermost layer.
    pub fn surface_radius(&mut self) -> Result<f64, GeoTessError>
    {
        self.radius_top(self.model.n_layers() - 1)
    }

    pub fn surface_depth(&mut self) -> Result<f64, GeoTessError>
    {
        self.depth_top(self.model.n_layers() - 1)
    }

    /// Current radius clamped into the current layer when out of range radii are allowed.
    pub fn radius_constrained(&mut self) -> Result<f64, GeoTessError>
    {
        let radius = self.radius()?;
        if !self.allow_out_of_range
        {
            return Ok(radius);
        }
        let bottom = self.radius_bottom(self.layer)?;
        if radius < bottom
        {
            return Ok(bottom);
        }
        let top = self.radius_top(self.layer)?;
        Ok(if radius > top { top } else { radius })
    }

    pub fn depth_constrained(&mut self) -> Result<f64, GeoTessError>
    {
        Ok(self.earth_radius()? - self.radius_constrained()?)
    }

    ///
    /// Moves the radius into `layer` when out of range radii are allowed,
    /// returning the resulting radius.
    ///
    pub fn set_radius_constrained(&mut self, layer: usize) -> Result<f64, GeoTessError>
    {
        let mut radius = self.radius()?;
        if self.allow_out_of_range
        {
            let bottom = self.radius_bottom(layer)?;
            let top = self.radius_top(layer)?;
            if radius < bottom
            {
                radius = bottom;
            }
            else if radius > top
            {
                radius = top;
            }
        }
        self.set_radius_in_layer(layer, radius)?;
        Ok(radius)
    }

    // ---------------------------------------------------------------------
    // vertices, points and weights

    /// Triangle containing the point in the current tessellation.
    pub fn triangle(&self) -> Option<usize>
    {
        self.locator.triangle(self.tessellation)
    }

    pub fn triangle_in(&mut self, tessellation: usize) -> Result<usize, GeoTessError>
    {
        GeoTessError::check_index(tessellation, self.locator.n_tessellations())?;
        self.unit()?;
        self.check_tessellation(tessellation)?;
        self.locator.triangle(tessellation).ok_or(GeoTessError::PositionNotSet)
    }

    /// Level of the containing triangle, relative to the first level of the current tessellation.
    pub fn tess_level(&self) -> usize
    {
        self.locator.tess_level(self.tessellation)
    }

    /// Vertex weights in the current tessellation.
    pub fn horizontal_coefficients(&self) -> &[(usize, f64)]
    {
        &self.horizontal[self.tessellation]
    }

    /// Vertex the point sits on, if any.
    pub fn vertex_index(&self) -> Option<usize>
    {
        self.horizontal[self.tessellation].iter().find(|(_, h)| *h > VERTEX_WEIGHT).map(|(v, _)| *v)
    }

    /// Vertex with the largest horizontal weight.
    pub fn index_of_closest_vertex(&self) -> Option<usize>
    {
        self.horizontal[self.tessellation].iter()
            .fold(None, |best: Option<(usize, f64)>, (v, h)| match best
            {
                Some((_, w)) if w >= *h => best,
                _ => Some((*v, *h)),
            })
            .map(|(v, _)| v)
    }

    pub fn closest_vertex(&self) -> Option<Vector3>
    {
        self.index_of_closest_vertex().map(|v| *self.grid.vertex(v))
    }

    ///
    /// Visits every (point index, horizontal x radial weight) pair of the
    /// current position. Profiles without data are skipped.
    ///
    fn for_each_point<F: FnMut(usize, f64)>(&mut self, mut f: F) -> Result<(), GeoTessError>
    {
        self.require_linear("point weights")?;
        self.unit()?;
        self.model.point_map()?;
        let (layer, tessellation) = (self.layer, self.tessellation);
        self.update_radial(layer, tessellation)?;
        for ((vertex, h), weights) in self.horizontal[tessellation].iter().zip(self.radial.iter())
        {
            let profile = self.model.profile_unchecked(*vertex, layer);
            if profile.n_values() == 0
            {
                continue;
            }
            for (node, coefficient) in weights.iter()
            {
                let point = profile.point_index(*node)
                    .ok_or(GeoTessError::PointIndexUnassigned { vertex: *vertex, layer, node: *node })?;
                f(point, h * coefficient);
            }
        }
        Ok(())
    }

    /// Point index with the largest interpolation weight.
    pub fn closest_point(&mut self) -> Result<usize, GeoTessError>
    {
        let mut best: Option<(usize, f64)> = None;
        self.for_each_point(|point, c| {
            if best.map_or(true, |(_, max)| c > max)
            {
                best = Some((point, c));
            }
        })?;
        best.map(|(p, _)| p).ok_or(GeoTessError::PositionNotSet)
    }

    /// Interpolation weight of every contributing point.
    pub fn coefficients(&mut self) -> Result<FxHashMap<usize, f64>, GeoTessError>
    {
        let mut coefficients = FxHashMap::default();
        self.for_each_point(|point, c| {
            coefficients.insert(point, c);
        })?;
        Ok(coefficients)
    }

    ///
    /// Adds `dkm` times the interpolation weight of every contributing point
    /// to `weights`. Summed along a ray path with `dkm` the segment length,
    /// this gives the path's sensitivity to each model point.
    ///
    pub fn weights(&mut self, dkm: f64, weights: &mut FxHashMap<usize, f64>) -> Result<(), GeoTessError>
    {
        self.for_each_point(|point, c| {
            *weights.entry(point).or_insert(0.0) += dkm * c;
        })
    }

    ///
    /// Like [`Position::weights`] but at `radius` in `layer` using
    /// `radial` interpolation, leaving the current radius untouched.
    /// Radii outside a profile are clamped to its ends.
    ///
    pub fn weights_at(&mut self, weights: &mut FxHashMap<usize, f64>, dkm: f64, radius: f64, layer: usize,
        radial: RadialInterpolation) -> Result<(), GeoTessError>
    {
        if radial == RadialInterpolation::CubicSpline
        {
            return Err(GeoTessError::UnsupportedInterpolatorCombination("per-node weights are undefined for cubic spline radial interpolation"));
        }
        self.unit()?;
        GeoTessError::check_index(layer, self.model.n_layers())?;
        self.model.point_map()?;
        let tessellation = self.model.metadata().tessellation(layer);
        self.check_tessellation(tessellation)?;
        let mut radial_weights = Vec::with_capacity(2);
        for (vertex, h) in self.horizontal[tessellation].iter()
        {
            let profile = self.model.profile_unchecked(*vertex, layer);
            if profile.n_values() == 0
            {
                continue;
            }
            radial_weights.clear();
            profile.interpolation_weights(radius, true, &mut radial_weights);
            for (node, coefficient) in radial_weights.iter()
            {
                let point = profile.point_index(*node)
                    .ok_or(GeoTessError::PointIndexUnassigned { vertex: *vertex, layer, node: *node })?;
                *weights.entry(point).or_insert(0.0) += dkm * h * coefficient;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // options

    pub fn max_tess_level(&self, layer: usize) -> Result<usize, GeoTessError>
    {
        GeoTessError::check_index(layer, self.model.n_layers())?;
        Ok(self.locator.max_tess_level(self.model.metadata().tessellation(layer)))
    }

    ///
    /// Caps the level at which searches in the tessellation of `layer` stop,
    /// relocating the current point if one is set.
    ///
    pub fn set_max_tess_level(&mut self, layer: usize, level: usize) -> Result<(), GeoTessError>
    {
        GeoTessError::check_index(layer, self.model.n_layers())?;
        let tessellation = self.model.metadata().tessellation(layer);
        self.locator.set_max_tess_level(tessellation, level);
        self.interfaces.fill(None);
        self.radial_layer = None;
        if self.u.is_some()
        {
            self.check_tessellation(tessellation)?;
        }
        Ok(())
    }

    pub fn set_iterations_per_level(&mut self, iterations: usize)
    {
        self.locator.set_iterations_per_level(iterations);
    }

    pub fn error_value(&self) -> f64
    {
        self.error_value
    }

    pub fn set_error_value(&mut self, error_value: f64)
    {
        self.error_value = error_value;
    }

    pub fn radius_out_of_range_allowed(&self) -> bool
    {
        self.allow_out_of_range
    }

    pub fn set_radius_out_of_range_allowed(&mut self, allowed: bool)
    {
        if self.allow_out_of_range != allowed
        {
            self.radial_layer = None;
        }
        self.allow_out_of_range = allowed;
    }
}

#[cfg(test)]
mod tests
{
    use std::sync::Arc;

    use super::*;
    use crate::grids::builder::GridBuilder;
    use crate::model::tests::{constant_model, layered_model};
    use crate::model::ModelMetaData;
    use crate::profiles::profile::Profile;
    use crate::storage::attributes::AttributeDefinitions;
    use crate::storage::numeric_kind::NumericKind;
    use crate::storage::value_cell::ValueCell;
    use crate::utilities::vector::{centroid, normalized};

    fn build_model<F>(grid: Grid, layers: &[&str], tessellations: &[usize], mut f: F) -> Model
        where F: FnMut(&Vector3, usize) -> Profile
    {
        let grid = Arc::new(grid);
        let attributes = AttributeDefinitions::new(&["vp"], &["km/sec"], NumericKind::Float).unwrap();
        let metadata = ModelMetaData::new("test", layers, tessellations, attributes).unwrap();
        let vertices = grid.clone();
        Model::from_fn(metadata, grid, |vertex, layer| Ok(f(vertices.vertex(vertex), layer))).unwrap()
    }

    fn npoint(radii: &[f32], values: &[f32]) -> Profile
    {
        Profile::from_radii_and_cells(radii.to_vec(), values.iter().map(|v| ValueCell::from(vec![*v])).collect()).unwrap()
    }

    fn query() -> Vector3
    {
        normalized(&[0.2, 0.3, 0.9])
    }

    #[test]
    fn check_constant_triangle_centroid()
    {
        let model = constant_model();
        let [a, b, c] = model.grid().triangle_vertices(0);
        let u = centroid(a, b, c);
        for horizontal in [HorizontalInterpolation::Linear, HorizontalInterpolation::NaturalNeighbor]
        {
            for radial in [RadialInterpolation::Linear, RadialInterpolation::CubicSpline]
            {
                let mut position = Position::new(&model, horizontal, radial);
                position.set(&u, 6200.0).unwrap();
                assert_eq!(position.triangle(), Some(0));
                assert_eq!(position.layer_id(), 0);
                assert!((position.value(0).unwrap() - 6.0).abs() < 1e-9);
                assert_eq!(position.vertex_index(), None);
                assert!(position.index_of_closest_vertex().is_some_and(|v| v < 3));
            }
        }
    }

    #[test]
    fn check_position_not_set()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        assert!(matches!(position.value(0), Err(GeoTessError::PositionNotSet)));
        assert!(matches!(position.radius_top(0), Err(GeoTessError::PositionNotSet)));
        assert!(matches!(position.set_radius(4000.0), Err(GeoTessError::PositionNotSet)));
        assert!(position.vector().is_err());
        assert_eq!(position.triangle(), None);
    }

    #[test]
    fn check_layers()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::NaturalNeighbor, RadialInterpolation::Linear);
        let u = query();
        position.set(&u, 3500.0).unwrap();
        assert_eq!(position.layer_id(), 0);
        assert!((position.value(0).unwrap() - 1.5).abs() < 1e-6);

        let radii = position.layer_radii().unwrap();
        for (r, expected) in radii.iter().zip([3000.0, 5000.0, 6000.0])
        {
            assert!((r - expected).abs() < 1e-6);
        }
        assert!((position.layer_thickness(0).unwrap() - 2000.0).abs() < 1e-6);

        position.set_radius(5500.0).unwrap();
        assert_eq!(position.layer_id(), 1);
        assert!((position.value(0).unwrap() - 10.0).abs() < 1e-6);
        assert!((position.value_in_layer(0, 0).unwrap() - 3.0).abs() < 1e-6);

        assert_eq!(position.layer_id_of(7000.0).unwrap(), 1);
        assert_eq!(position.layer_id_of(3100.0).unwrap(), 0);
        assert_eq!(position.interface_index(4900.0).unwrap(), Some(0));
        assert_eq!(position.interface_index(5500.0).unwrap(), Some(1));
        assert_eq!(position.next_layer(0, 0.0).unwrap(), Some(1));
        assert_eq!(position.next_layer(1, 0.0).unwrap(), None);
        assert_eq!(position.previous_layer(1, 0.0).unwrap(), Some(1));

        position.set_top_of_layer(0).unwrap();
        assert!((position.radius().unwrap() - 5000.0).abs() < 1e-6);
        assert!((position.value(0).unwrap() - 3.0).abs() < 1e-6);
        assert!((position.value_top(0, 0).unwrap() - 3.0).abs() < 1e-6);
        assert!((position.value_bottom(0, 0).unwrap() - 1.0).abs() < 1e-6);
        position.set_bottom(0, &u).unwrap();
        assert!((position.radius().unwrap() - 3000.0).abs() < 1e-6);

        let depth = position.depth().unwrap();
        assert!((depth + position.radius().unwrap() - position.earth_radius().unwrap()).abs() < 1e-6);
        assert!(!position.is_above_model().unwrap());
        position.set_radius(6500.0).unwrap();
        assert!(position.is_above_model().unwrap());
        assert!((position.radius_constrained().unwrap() - 6000.0).abs() < 1e-6);
    }

    #[test]
    fn check_out_of_range()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        position.set_in_layer(0, &query(), Some(2500.0)).unwrap();
        assert!((position.value(0).unwrap() - 1.0).abs() < 1e-9);

        position.set_radius_out_of_range_allowed(false);
        assert!(position.value(0).unwrap().is_nan());
        position.set_error_value(-1.0);
        assert_eq!(position.value(0).unwrap(), -1.0);

        position.set_radius_in_layer(0, 4500.0).unwrap();
        assert!((position.value(0).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn check_moving_between_queries()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        let shape = model.metadata().earth_shape;
        for i in 0..50
        {
            let lat = -80.0 + 3.2 * i as f64;
            let lon = -170.0 + 6.9 * i as f64;
            position.set_lat_lon_depth(lat, lon, shape.earth_radius(&shape.vector(lat, lon)) - 4000.0).unwrap();
            assert!((position.radius().unwrap() - 4000.0).abs() < 1e-6);
            assert!((position.latitude().unwrap() - lat).abs() < 1e-9);
            assert!((position.value(0).unwrap() - 2.0).abs() < 1e-6);
            let weights: f64 = position.horizontal_coefficients().iter().map(|w| w.1).sum();
            assert!((weights - 1.0).abs() < 1e-9);
        }
        // sitting on a vertex
        let v = *model.grid().vertex(7);
        position.set(&v, 4000.0).unwrap();
        assert_eq!(position.vertex_index(), Some(7));
        assert_eq!(position.closest_vertex(), Some(v));
    }

    #[test]
    fn check_weights()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        position.set(&query(), 3200.0).unwrap();

        let coefficients = position.coefficients().unwrap();
        assert_eq!(coefficients.len(), 6);
        assert!((coefficients.values().sum::<f64>() - 1.0).abs() < 1e-9);

        let point = position.closest_point().unwrap();
        let vertex = position.index_of_closest_vertex().unwrap();
        assert_eq!(model.point_map().unwrap().point(point).unwrap(), [vertex, 0, 0]);

        let mut weights = FxHashMap::default();
        position.weights(2.0, &mut weights).unwrap();
        position.weights(2.0, &mut weights).unwrap();
        assert!((weights.values().sum::<f64>() - 4.0).abs() < 1e-9);

        let mut crust = FxHashMap::default();
        position.weights_at(&mut crust, 1.0, 5500.0, 1, RadialInterpolation::Linear).unwrap();
        assert_eq!(crust.len(), 3);
        assert!(crust.keys().all(|p| model.point_map().unwrap().layer_index(*p).unwrap() == 1));
        assert!((crust.values().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(matches!(position.weights_at(&mut crust, 1.0, 5500.0, 1, RadialInterpolation::CubicSpline),
            Err(GeoTessError::UnsupportedInterpolatorCombination(_))));

        let mut cubic = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::CubicSpline);
        cubic.set(&query(), 3200.0).unwrap();
        assert!(matches!(cubic.closest_point(), Err(GeoTessError::UnsupportedInterpolatorCombination(_))));
        assert!(matches!(cubic.gradient(0, false), Err(GeoTessError::UnsupportedInterpolatorCombination(_))));
    }

    #[test]
    fn check_gradient()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        position.set(&query(), 4000.0).unwrap();
        let gradient = position.gradient(0, false).unwrap();
        let mut expected = [0.0; 3];
        for (vertex, h) in position.horizontal_coefficients()
        {
            let v = model.grid().vertex(*vertex);
            for k in 0..3
            {
                expected[k] += h * v[k] / 1000.0;
            }
        }
        for k in 0..3
        {
            assert!((gradient[k] - expected[k]).abs() < 1e-5, "{:?} vs {:?}", gradient, expected);
        }
        position.set_radius(5500.0).unwrap();
        assert!(position.gradient(0, false).unwrap().iter().all(|g| g.abs() < 1e-9));
    }

    #[test]
    fn check_max_tess_level()
    {
        let model = layered_model();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        position.set(&query(), 4000.0).unwrap();
        assert_eq!(position.tess_level(), 2);
        position.set_max_tess_level(0, 0).unwrap();
        assert_eq!(position.max_tess_level(0).unwrap(), 0);
        assert_eq!(position.tess_level(), 0);
        assert!(position.triangle().is_some_and(|t| t < 8));
        assert!((position.value(0).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn check_interface_on_finer_tessellation()
    {
        // mantle on a coarse tessellation, crust on a fine one, interface at 5000 + 500 z^2
        let grid = GridBuilder::octahedron().levels(2).add_tessellation(4).build().unwrap();
        let model = build_model(grid, &["mantle", "crust"], &[0, 1], |v, layer| {
            let interface = (5000.0 + 500.0 * v[2] * v[2]) as f32;
            if layer == 0 { npoint(&[3000.0, interface], &[1.0, 2.0]) } else { npoint(&[interface, 6371.0], &[3.0, 4.0]) }
        });
        let u = query();
        let mut position = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        position.set(&u, 4000.0).unwrap();
        assert_eq!(position.layer_id(), 0);
        assert_eq!(position.tessellation_id(), 0);
        // the layer search located both tessellations and its interface survived
        assert!(position.locator.triangle(0).is_some() && position.locator.triangle(1).is_some());
        assert!(position.interfaces[1].is_some());

        let interface = |weights: &[(usize, f64)]| -> f64 {
            weights.iter().map(|(v, h)| h * model.profile(*v, 0).unwrap().radius_top()).sum()
        };
        let fine = interface(&position.horizontal[1]);
        let coarse = interface(&position.horizontal[0]);
        assert!((fine - coarse).abs() > 1e-3);

        let top = position.radius_top(0).unwrap();
        assert!((top - fine).abs() < 1e-9, "{} vs {}", top, fine);
        let mut above = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        above.set_in_layer(1, &u, None).unwrap();
        assert!((above.radius_bottom(1).unwrap() - top).abs() < 1e-9);
    }

    #[test]
    fn check_thin_layer_gradient()
    {
        let grid = GridBuilder::octahedron().levels(2).build().unwrap();
        let model = build_model(grid, &["mantle", "thin"], &[0, 0], |_, layer| {
            if layer == 0
            {
                npoint(&[3000.0, 5000.0], &[1.0, 2.0])
            }
            else
            {
                Profile::from_radii_and_cells(vec![5000.0, 5000.0], Vec::new()).unwrap()
            }
        });
        let u = query();
        let mut linear = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        linear.set_in_layer(1, &u, Some(5000.0)).unwrap();
        assert_eq!(linear.gradient(0, false).unwrap(), [0.0; 3]);

        let mut cubic = Position::new(&model, HorizontalInterpolation::Linear, RadialInterpolation::CubicSpline);
        cubic.set_in_layer(1, &u, Some(5000.0)).unwrap();
        assert!(matches!(cubic.gradient(0, false), Err(GeoTessError::UnsupportedInterpolatorCombination(_))));
    }
}
