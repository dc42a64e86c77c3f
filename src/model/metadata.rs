use serde::{Deserialize, Serialize};

use crate::errors::GeoTessError;
use crate::serialization::{self, SerializationFormat};
use crate::storage::attributes::AttributeDefinitions;
use crate::storage::custom::CustomTypeRegistry;
use crate::utilities::earth_shape::EarthShape;

/// Edge length in km of the tetrahedron sampled by the gradient estimator.
pub const DEFAULT_GRADIENT_TET_SIZE: f64 = 10.0;

///
/// Passive description of a model: its layers, the tessellation each layer
/// uses, its attributes and the earth shape used for geographic
/// conversions.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelMetaData
{
    pub description: String,
    layer_names: Vec<String>,
    layer_tess_ids: Vec<usize>,
    attributes: AttributeDefinitions,
    pub earth_shape: EarthShape,
    pub gradient_tet_size: f64,
    pub model_software: String,
    pub model_generation_date: String,
}

impl ModelMetaData
{
    ///
    /// Layers are listed from the deepest up. `layer_tess_ids` may be empty,
    /// in which case every layer uses tessellation 0. Tessellation ids must
    /// not decrease from one layer to the next.
    ///
    pub fn new<S: AsRef<str>>(description: &str, layer_names: &[S], layer_tess_ids: &[usize], attributes: AttributeDefinitions) -> Result<Self, GeoTessError>
    {
        if layer_names.is_empty()
        {
            return Err(GeoTessError::InvalidModel("a model needs at least one layer".to_string()));
        }
        let layer_tess_ids = if layer_tess_ids.is_empty() { vec![0; layer_names.len()] } else { layer_tess_ids.to_vec() };
        if layer_tess_ids.len() != layer_names.len()
        {
            return Err(GeoTessError::InvalidModel(format!("{} layers but {} tessellation ids", layer_names.len(), layer_tess_ids.len())));
        }
        if layer_tess_ids.windows(2).any(|w| w[1] < w[0])
        {
            return Err(GeoTessError::InvalidModel(format!("layer tessellation ids {:?} decrease with depth", layer_tess_ids)));
        }
        Ok(Self
        {
            description: description.to_string(),
            layer_names: layer_names.iter().map(|s| s.as_ref().to_string()).collect(),
            layer_tess_ids,
            attributes,
            earth_shape: EarthShape::default(),
            gradient_tet_size: DEFAULT_GRADIENT_TET_SIZE,
            model_software: format!("geotess {}", env!("CARGO_PKG_VERSION")),
            model_generation_date: String::new(),
        })
    }

    pub fn with_earth_shape(mut self, earth_shape: EarthShape) -> Self
    {
        self.earth_shape = earth_shape;
        self
    }

    #[inline]
    pub fn n_layers(&self) -> usize
    {
        self.layer_names.len()
    }

    pub fn layer_names(&self) -> &[String]
    {
        &self.layer_names
    }

    pub fn layer_index(&self, name: &str) -> Option<usize>
    {
        self.layer_names.iter().position(|n| n == name)
    }

    #[inline]
    pub fn layer_tess_ids(&self) -> &[usize]
    {
        &self.layer_tess_ids
    }

    #[inline]
    pub fn tessellation(&self, layer: usize) -> usize
    {
        self.layer_tess_ids[layer]
    }

    /// Highest tessellation id referenced plus one.
    pub fn n_tessellations(&self) -> usize
    {
        self.layer_tess_ids.iter().max().map_or(0, |t| t + 1)
    }

    /// Layers that use `tessellation`.
    pub fn layers_in(&self, tessellation: usize) -> Vec<usize>
    {
        (0..self.layer_tess_ids.len()).filter(|l| self.layer_tess_ids[*l] == tessellation).collect()
    }

    #[inline]
    pub fn attributes(&self) -> &AttributeDefinitions
    {
        &self.attributes
    }

    #[inline]
    pub fn n_attributes(&self) -> usize
    {
        self.attributes.n_attributes()
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize>
    {
        self.attributes.attribute_index(name)
    }

    pub fn save(&self, path: &str, format: SerializationFormat) -> Result<(), GeoTessError>
    {
        serialization::save(self, path, format)
    }

    ///
    /// Reads metadata written by [`ModelMetaData::save`]. Custom attribute
    /// kinds are looked up in `registry`.
    ///
    pub fn read<Reader: std::io::Read>(reader: Reader, format: SerializationFormat, registry: &CustomTypeRegistry) -> Result<Self, GeoTessError>
    {
        let mut metadata: ModelMetaData = serialization::read(reader, format)?;
        metadata.attributes.resolve_custom(registry)?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::numeric_kind::NumericKind;

    fn attributes() -> AttributeDefinitions
    {
        AttributeDefinitions::new(&["vp", "vs"], &["km/sec", "km/sec"], NumericKind::Float).unwrap()
    }

    #[test]
    fn check_layers()
    {
        let md = ModelMetaData::new("test", &["core", "mantle", "crust"], &[0, 0, 1], attributes()).unwrap();
        assert_eq!(md.n_layers(), 3);
        assert_eq!(md.n_tessellations(), 2);
        assert_eq!(md.layers_in(0), vec![0, 1]);
        assert_eq!(md.layer_index("crust"), Some(2));
        assert_eq!(md.tessellation(2), 1);
        assert_eq!(md.gradient_tet_size, 10.0);

        let md = ModelMetaData::new("test", &["a", "b"], &[], attributes()).unwrap();
        assert_eq!(md.layer_tess_ids(), &[0, 0]);

        assert!(ModelMetaData::new::<&str>("test", &[], &[], attributes()).is_err());
        assert!(ModelMetaData::new("test", &["a", "b"], &[0], attributes()).is_err());
        assert!(ModelMetaData::new("test", &["a", "b"], &[1, 0], attributes()).is_err());
    }

    #[test]
    fn check_json_round_trip()
    {
        let md = ModelMetaData::new("round trip", &["mantle"], &[0], attributes()).unwrap().with_earth_shape(EarthShape::Sphere);
        let bytes = serialization::serialize(&md, SerializationFormat::Json).unwrap();
        let copy = ModelMetaData::read(bytes.as_slice(), SerializationFormat::Json, &CustomTypeRegistry::new()).unwrap();
        assert_eq!(copy, md);
    }
}
