use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::GeoTessError;

use super::custom::{CustomKind, CustomTypeRegistry};
use super::numeric_kind::NumericKind;
use super::value_cell::ValueCell;

///
/// Names, units and element kind of the attributes stored in every value
/// cell of a model.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeDefinitions
{
    names: Vec<String>,
    units: Vec<String>,
    kind: NumericKind,
    /// Registered name of the custom kind when `kind` is `Custom`.
    custom_type: Option<String>,
    #[serde(skip)]
    custom: Option<Arc<dyn CustomKind>>,
}

impl PartialEq for AttributeDefinitions
{
    fn eq(&self, other: &Self) -> bool
    {
        self.names == other.names && self.units == other.units && self.kind == other.kind && self.custom_type == other.custom_type
    }
}

impl AttributeDefinitions
{
    pub fn new<S: AsRef<str>>(names: &[S], units: &[S], kind: NumericKind) -> Result<Self, GeoTessError>
    {
        if kind == NumericKind::Custom
        {
            return Err(GeoTessError::UnknownDataType("custom kinds must be created with new_custom".to_string()));
        }
        Self::build(names, units, kind, None)
    }

    ///
    /// Definitions backed by the custom kind `type_name`, looked up in `registry`.
    ///
    pub fn new_custom<S: AsRef<str>>(names: &[S], units: &[S], type_name: &str, registry: &CustomTypeRegistry) -> Result<Self, GeoTessError>
    {
        let custom = registry.resolve(type_name)?;
        Self::build(names, units, NumericKind::Custom, Some(custom))
    }

    ///
    /// Parses `;` separated name and unit lists, e.g. `"vp; vs"`.
    ///
    pub fn from_lists(names: &str, units: &str, kind_name: &str, registry: &CustomTypeRegistry) -> Result<Self, GeoTessError>
    {
        let names: Vec<&str> = names.split(';').map(str::trim).collect();
        let units: Vec<&str> = units.split(';').map(str::trim).collect();
        match NumericKind::from_name(kind_name)
        {
            NumericKind::Custom => Self::new_custom(&names, &units, kind_name.trim(), registry),
            kind => Self::new(&names, &units, kind),
        }
    }

    fn build<S: AsRef<str>>(names: &[S], units: &[S], kind: NumericKind, custom: Option<Arc<dyn CustomKind>>) -> Result<Self, GeoTessError>
    {
        if names.len() != units.len()
        {
            return Err(GeoTessError::InvalidModel(format!("{} attribute names but {} units", names.len(), units.len())));
        }
        if names.is_empty()
        {
            return Err(GeoTessError::InvalidModel("no attributes defined".to_string()));
        }
        Ok(Self
        {
            names: names.iter().map(|s| s.as_ref().to_string()).collect(),
            units: units.iter().map(|s| s.as_ref().to_string()).collect(),
            kind,
            custom_type: custom.as_ref().map(|c| c.type_name().to_string()),
            custom,
        })
    }

    ///
    /// Re-attaches the custom kind after deserialization.
    ///
    pub fn resolve_custom(&mut self, registry: &CustomTypeRegistry) -> Result<(), GeoTessError>
    {
        if let Some(name) = &self.custom_type
        {
            self.custom = Some(registry.resolve(name)?);
        }
        Ok(())
    }

    #[inline]
    pub fn n_attributes(&self) -> usize
    {
        self.names.len()
    }

    pub fn kind(&self) -> NumericKind
    {
        self.kind
    }

    /// Type name written to model headers: the kind name or the custom type name.
    pub fn kind_name(&self) -> &str
    {
        match &self.custom_type
        {
            Some(name) => name,
            None => self.kind.name(),
        }
    }

    pub fn custom_kind(&self) -> Result<&Arc<dyn CustomKind>, GeoTessError>
    {
        self.custom.as_ref().ok_or_else(|| GeoTessError::UnknownDataType(self.kind_name().to_string()))
    }

    pub fn names(&self) -> &[String]
    {
        &self.names
    }

    pub fn units(&self) -> &[String]
    {
        &self.units
    }

    pub fn name(&self, attribute: usize) -> Result<&str, GeoTessError>
    {
        GeoTessError::check_index(attribute, self.names.len())?;
        Ok(&self.names[attribute])
    }

    pub fn unit(&self, attribute: usize) -> Result<&str, GeoTessError>
    {
        GeoTessError::check_index(attribute, self.units.len())?;
        Ok(&self.units[attribute])
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize>
    {
        self.names.iter().position(|n| n == name)
    }

    /// Zero-filled cell sized for these attributes.
    pub fn new_cell(&self) -> Result<ValueCell, GeoTessError>
    {
        match self.kind
        {
            NumericKind::Custom => Ok(ValueCell::Custom(self.custom_kind()?.instantiate(self.n_attributes()))),
            kind => ValueCell::zeros(kind, self.n_attributes()),
        }
    }

    pub(crate) fn check_cell(&self, cell: &ValueCell) -> Result<(), GeoTessError>
    {
        if cell.kind() != self.kind || (self.kind != NumericKind::Custom && cell.len() != self.n_attributes())
        {
            return Err(GeoTessError::MalformedProfile(format!(
                "value cell {:?}[{}] does not match attributes {}[{}]",
                cell.kind(), cell.len(), self.kind_name(), self.n_attributes())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::custom::fixed_point::FixedPointKind;

    #[test]
    fn check_lists()
    {
        let registry = CustomTypeRegistry::new();
        let definitions = AttributeDefinitions::from_lists("vp; vs", "km/sec; km/sec", "float", &registry).unwrap();
        assert_eq!(definitions.n_attributes(), 2);
        assert_eq!(definitions.attribute_index("vs"), Some(1));
        assert_eq!(definitions.name(0).unwrap(), "vp");
        assert!(definitions.unit(2).is_err());
        assert_eq!(definitions.kind(), NumericKind::Float);
        assert_eq!(definitions.new_cell().unwrap(), ValueCell::Float(vec![0.0, 0.0]));
        assert!(AttributeDefinitions::from_lists("vp; vs", "km/sec", "float", &registry).is_err());
        assert!(AttributeDefinitions::from_lists("q", "-", "FIXED2", &registry).is_err());
    }

    #[test]
    fn check_custom_resolution_after_deserialize()
    {
        let mut registry = CustomTypeRegistry::new();
        registry.register(Arc::new(FixedPointKind));
        let definitions = AttributeDefinitions::from_lists("q", "-", "FIXED2", &registry).unwrap();
        assert_eq!(definitions.kind_name(), "FIXED2");

        let json = serde_json::to_string(&definitions).unwrap();
        let mut restored: AttributeDefinitions = serde_json::from_str(&json).unwrap();
        assert!(restored.custom_kind().is_err());
        restored.resolve_custom(&registry).unwrap();
        assert_eq!(restored, definitions);
        assert_eq!(restored.new_cell().unwrap().len(), 1);
    }
}
