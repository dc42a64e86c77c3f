pub mod metadata;
pub mod point_map;

use std::sync::Arc;

use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::algorithms::gradient::GradientEstimator;
use crate::algorithms::horizontal::HorizontalInterpolation;
use crate::algorithms::radial::RadialInterpolation;
use crate::errors::GeoTessError;
use crate::grids::grid::Grid;
use crate::position::Position;
use crate::profiles::profile::Profile;
use crate::utilities::vector::{scale, Vector3};

pub use metadata::ModelMetaData;
pub use point_map::PointMap;

///
/// Layered earth model: a shared grid plus one radial profile per vertex
/// and layer. The model is read-only during queries and may be shared by
/// any number of [`Position`] cursors, one per thread.
///
#[derive(Debug)]
pub struct Model
{
    metadata: ModelMetaData,
    grid: Arc<Grid>,
    /// `profiles[vertex][layer]`.
    profiles: Vec<Vec<Profile>>,
    point_map: Option<PointMap>,
}

impl Model
{
    pub fn new(metadata: ModelMetaData, grid: Arc<Grid>, mut profiles: Vec<Vec<Profile>>) -> Result<Model, GeoTessError>
    {
        if metadata.n_tessellations() > grid.n_tessellations()
        {
            return Err(GeoTessError::InvalidModel(format!("layers reference {} tessellations but the grid has {}",
                metadata.n_tessellations(), grid.n_tessellations())));
        }
        if profiles.len() != grid.n_vertices()
        {
            return Err(GeoTessError::InvalidModel(format!("{} profile rows for {} vertices", profiles.len(), grid.n_vertices())));
        }
        for (vertex, layers) in profiles.iter().enumerate()
        {
            if layers.len() != metadata.n_layers()
            {
                return Err(GeoTessError::InvalidModel(format!("vertex {} has {} profiles for {} layers", vertex, layers.len(), metadata.n_layers())));
            }
            for profile in layers.iter()
            {
                check_profile(&metadata, profile)?;
            }
        }
        let point_map = PointMap::build(&grid, &metadata, &mut profiles)?;
        tracing::debug!(grid_id = grid.grid_id(), layers = metadata.n_layers(), attributes = metadata.n_attributes(),
            points = point_map.len(), "model built");
        Ok(Model { metadata, grid, profiles, point_map: Some(point_map) })
    }

    ///
    /// Builds every profile with `f(vertex, layer)`.
    ///
    pub fn from_fn<F>(metadata: ModelMetaData, grid: Arc<Grid>, mut f: F) -> Result<Model, GeoTessError>
        where F: FnMut(usize, usize) -> Result<Profile, GeoTessError>
    {
        let mut profiles = Vec::with_capacity(grid.n_vertices());
        for vertex in 0..grid.n_vertices()
        {
            let row = (0..metadata.n_layers()).map(|layer| f(vertex, layer)).collect::<Result<Vec<_>, _>>()?;
            profiles.push(row);
        }
        Model::new(metadata, grid, profiles)
    }

    #[inline]
    pub fn metadata(&self) -> &ModelMetaData
    {
        &self.metadata
    }

    #[inline]
    pub fn grid(&self) -> &Arc<Grid>
    {
        &self.grid
    }

    #[inline]
    pub fn n_layers(&self) -> usize
    {
        self.metadata.n_layers()
    }

    #[inline]
    pub fn n_vertices(&self) -> usize
    {
        self.profiles.len()
    }

    #[inline]
    pub fn n_attributes(&self) -> usize
    {
        self.metadata.n_attributes()
    }

    pub fn profile(&self, vertex: usize, layer: usize) -> Result<&Profile, GeoTessError>
    {
        GeoTessError::check_index(vertex, self.profiles.len())?;
        GeoTessError::check_index(layer, self.metadata.n_layers())?;
        Ok(&self.profiles[vertex][layer])
    }

    /// Profile at `vertex` and `layer` without bounds reporting; panics on a bad index.
    #[inline]
    pub(crate) fn profile_unchecked(&self, vertex: usize, layer: usize) -> &Profile
    {
        &self.profiles[vertex][layer]
    }

    ///
    /// Mutable profile access for editing radii and values in place. Use
    /// [`Model::set_profile`] to swap in a profile with a different shape.
    ///
    pub fn profile_mut(&mut self, vertex: usize, layer: usize) -> Result<&mut Profile, GeoTessError>
    {
        GeoTessError::check_index(vertex, self.profiles.len())?;
        GeoTessError::check_index(layer, self.metadata.n_layers())?;
        Ok(&mut self.profiles[vertex][layer])
    }

    ///
    /// Replaces a profile. The point map becomes stale until
    /// [`Model::build_point_map`] is called again.
    ///
    pub fn set_profile(&mut self, vertex: usize, layer: usize, profile: Profile) -> Result<(), GeoTessError>
    {
        check_profile(&self.metadata, &profile)?;
        *self.profile_mut(vertex, layer)? = profile;
        self.point_map = None;
        Ok(())
    }

    pub fn build_point_map(&mut self) -> Result<&PointMap, GeoTessError>
    {
        let map = PointMap::build(&self.grid, &self.metadata, &mut self.profiles)?;
        Ok(self.point_map.insert(map))
    }

    pub fn point_map(&self) -> Result<&PointMap, GeoTessError>
    {
        self.point_map.as_ref().ok_or_else(|| GeoTessError::InvalidModel("point map is stale, rebuild it after replacing profiles".to_string()))
    }

    pub fn n_points(&self) -> Result<usize, GeoTessError>
    {
        Ok(self.point_map()?.len())
    }

    pub fn point_value(&self, point: usize, attribute: usize) -> Result<f64, GeoTessError>
    {
        let [vertex, layer, node] = self.point_map()?.point(point)?;
        Ok(self.profiles[vertex][layer].value(attribute, node))
    }

    pub fn set_point_value(&mut self, point: usize, attribute: usize, value: f64) -> Result<(), GeoTessError>
    {
        let [vertex, layer, node] = self.point_map()?.point(point)?;
        self.profiles[vertex][layer].value_cell_mut(node)?.set(attribute, value)
    }

    pub fn point_radius(&self, point: usize) -> Result<f64, GeoTessError>
    {
        let [vertex, layer, node] = self.point_map()?.point(point)?;
        self.profiles[vertex][layer].radius(node)
    }

    /// Earth centered location of `point` in km.
    pub fn point_location(&self, point: usize) -> Result<Vector3, GeoTessError>
    {
        let vertex = self.point_map()?.vertex_index(point)?;
        Ok(scale(self.grid.vertex(vertex), self.point_radius(point)?))
    }

    pub fn point_depth(&self, point: usize) -> Result<f64, GeoTessError>
    {
        let vertex = self.point_map()?.vertex_index(point)?;
        let u = self.grid.vertex(vertex);
        Ok(self.metadata.earth_shape.depth(u, self.point_radius(point)?))
    }

    ///
    /// Gradient of `attribute` (or of its reciprocal) at `point`, computing
    /// the gradients of the owning profile first if needed.
    ///
    pub fn point_gradient(&self, point: usize, attribute: usize, reciprocal: bool) -> Result<Vector3, GeoTessError>
    {
        GeoTessError::check_index(attribute, self.n_attributes())?;
        let [vertex, layer, node] = self.point_map()?.point(point)?;
        let profile = &self.profiles[vertex][layer];
        let u = *self.grid.vertex(vertex);
        let mut estimator = GradientEstimator::new(self);
        profile.compute_gradients(attribute, reciprocal, |radius| estimator.gradient(&u, radius, layer, attribute, reciprocal))?;
        Ok(profile.gradient(node, attribute).unwrap_or([f64::NAN; 3]))
    }

    ///
    /// Precomputes gradients of `attribute` in `layers` (every layer when
    /// empty) at every vertex, in parallel.
    ///
    pub fn compute_gradients(&self, attribute: usize, reciprocal: bool, layers: &[usize]) -> Result<(), GeoTessError>
    {
        GeoTessError::check_index(attribute, self.n_attributes())?;
        let layers: Vec<usize> = if layers.is_empty() { (0..self.n_layers()).collect() } else { layers.to_vec() };
        for layer in layers.iter()
        {
            GeoTessError::check_index(*layer, self.n_layers())?;
        }
        (0..self.profiles.len()).into_par_iter().try_for_each_init(
            || GradientEstimator::new(self),
            |estimator, vertex| {
                let u = *self.grid.vertex(vertex);
                for layer in layers.iter()
                {
                    self.profiles[vertex][*layer].compute_gradients(attribute, reciprocal,
                        |radius| estimator.gradient(&u, radius, *layer, attribute, reciprocal))?;
                }
                Ok(())
            })?;
        tracing::debug!(attribute, reciprocal, layers = layers.len(), "model gradients computed");
        Ok(())
    }

    /// Discards every cached gradient.
    pub fn reset_gradients(&self)
    {
        self.profiles.par_iter().for_each(|row| row.iter().for_each(Profile::reset_gradients));
    }

    ///
    /// Interpolates `attribute` at every `(unit vector, radius)` in `points`.
    /// Each worker thread owns its own [`Position`].
    ///
    pub fn interpolate_batch(&self, points: &[(Vector3, f64)], attribute: usize, horizontal: HorizontalInterpolation,
        radial: RadialInterpolation) -> Vec<Result<f64, GeoTessError>>
    {
        let mut results = vec![Ok(f64::NAN); points.len()];
        points.par_iter().zip(results.par_iter_mut()).for_each_init(
            || Position::new(self, horizontal, radial),
            |position, ((u, radius), result)| {
                *result = position.set(u, *radius).and_then(|_| position.value(attribute));
            });
        results
    }

    ///
    /// Radial integral of `attribute` (or of its reciprocal) through every
    /// profile of `layer`, indexed by vertex.
    ///
    pub fn integrate_layer(&self, attribute: usize, layer: usize, reciprocal: bool) -> Result<Vec<f64>, GeoTessError>
    {
        GeoTessError::check_index(layer, self.n_layers())?;
        Ok(self.profiles.iter().map(|row| row[layer].integrate(attribute, reciprocal)).collect())
    }
}

fn check_profile(metadata: &ModelMetaData, profile: &Profile) -> Result<(), GeoTessError>
{
    for node in 0..profile.n_values()
    {
        metadata.attributes().check_cell(profile.value_cell(node)?)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests
{
    use super::*;
    use crate::grids::builder::GridBuilder;
    use crate::storage::attributes::AttributeDefinitions;
    use crate::storage::numeric_kind::NumericKind;
    use crate::storage::value_cell::ValueCell;
    use crate::utilities::vector::dot;

    fn cell(value: f64) -> ValueCell
    {
        ValueCell::from(vec![value as f32])
    }

    ///
    /// Octahedron with three levels. Layer 0 (mantle) is an n-point profile
    /// on radii 3000, 4000 and 5000 with values 1, 2 and 3; layer 1 (crust) a
    /// constant 10 between 5000 and 6000. Every vertex carries the same profiles.
    ///
    pub(crate) fn layered_model() -> Model
    {
        let grid = Arc::new(GridBuilder::octahedron().levels(3).build().unwrap());
        let attributes = AttributeDefinitions::new(&["vp"], &["km/sec"], NumericKind::Float).unwrap();
        let metadata = ModelMetaData::new("layered", &["mantle", "crust"], &[0, 0], attributes).unwrap();
        Model::from_fn(metadata, grid, |_, layer| {
            if layer == 0
            {
                Profile::from_radii_and_cells(vec![3000.0, 4000.0, 5000.0], vec![cell(1.0), cell(2.0), cell(3.0)])
            }
            else
            {
                Profile::from_radii_and_cells(vec![5000.0, 6000.0], vec![cell(10.0)])
            }
        }).unwrap()
    }

    /// Single level octahedron, one constant layer with values 5, 6 and 7 on the corners of triangle 0.
    pub(crate) fn constant_model() -> Model
    {
        let grid = Arc::new(GridBuilder::octahedron().build().unwrap());
        let attributes = AttributeDefinitions::new(&["vp"], &["km/sec"], NumericKind::Float).unwrap();
        let metadata = ModelMetaData::new("constant", &["crust"], &[0], attributes).unwrap();
        Model::from_fn(metadata, grid, |vertex, _| {
            let value = [5.0, 6.0, 7.0, 6.0, 6.0, 6.0][vertex];
            Profile::from_radii_and_cells(vec![6000.0, 6371.0], vec![cell(value)])
        }).unwrap()
    }

    #[test]
    fn check_point_map()
    {
        let mut model = layered_model();
        assert_eq!(model.n_vertices(), 66);
        assert_eq!(model.n_points().unwrap(), 66 * 4);
        let map = model.point_map().unwrap();
        for point in 0..map.len()
        {
            let [vertex, layer, node] = map.point(point).unwrap();
            assert_eq!(model.profile(vertex, layer).unwrap().point_index(node), Some(point));
        }
        let [vertex, layer, node] = map.point(5).unwrap();
        let expected = model.profile(vertex, layer).unwrap().value(0, node);
        assert_eq!(model.point_value(5, 0).unwrap(), expected);
        assert_eq!(model.point_radius(5).unwrap(), model.profile(vertex, layer).unwrap().radius(node).unwrap());
        assert!(matches!(model.point_value(10_000, 0), Err(GeoTessError::InvalidIndex { .. })));

        model.set_point_value(5, 0, 42.0).unwrap();
        assert_eq!(model.point_value(5, 0).unwrap(), 42.0);

        let replacement = Profile::from_radii_and_cells(vec![3000.0, 5000.0], vec![cell(1.0)]).unwrap();
        model.set_profile(0, 0, replacement).unwrap();
        assert!(matches!(model.point_map(), Err(GeoTessError::InvalidModel(_))));
        assert_eq!(model.build_point_map().unwrap().len(), 66 * 4 - 2);
    }

    #[test]
    fn check_profile_validation()
    {
        let mut model = layered_model();
        // two attributes where the model defines one
        let wrong = Profile::from_radii_and_cells(vec![3000.0, 5000.0], vec![ValueCell::from(vec![1.0f32, 2.0])]).unwrap();
        assert!(model.set_profile(0, 0, wrong).is_err());
        assert!(model.profile(66, 0).is_err());
        assert!(model.profile(0, 2).is_err());
    }

    #[test]
    fn check_gradients_and_integration()
    {
        let model = layered_model();
        // value grows by 1 per 1000 km of radius in the mantle
        let [vertex, _, _] = model.point_map().unwrap().point(1).unwrap();
        let gradient = model.point_gradient(1, 0, false).unwrap();
        let u = model.grid().vertex(vertex);
        for k in 0..3
        {
            assert!((gradient[k] - u[k] / 1000.0).abs() < 1e-5, "{:?} vs {:?}", gradient, u);
        }
        assert!((dot(&gradient, u) - 1e-3).abs() < 1e-5);

        model.compute_gradients(0, false, &[]).unwrap();
        assert!(model.profile(3, 1).unwrap().gradient(0, 0).is_some_and(|g| g.iter().all(|x| x.abs() < 1e-9)));
        model.reset_gradients();
        assert!(!model.profile(3, 0).unwrap().is_gradient_set(0));

        let integrals = model.integrate_layer(0, 0, false).unwrap();
        assert_eq!(integrals.len(), 66);
        assert!(integrals.iter().all(|x| (x - 4000.0).abs() < 1e-6));
    }

    #[test]
    fn check_interpolate_batch()
    {
        let model = constant_model();
        let grid = model.grid();
        let [a, b, c] = grid.triangle_vertices(0);
        let u = crate::utilities::vector::centroid(a, b, c);
        let points = vec![(u, 6200.0); 64];
        let results = model.interpolate_batch(&points, 0, HorizontalInterpolation::Linear, RadialInterpolation::Linear);
        assert!(results.iter().all(|r| (r.as_ref().unwrap() - 6.0).abs() < 1e-9));
    }
}
