use crate::errors::GeoTessError;
use crate::storage::value_cell::ValueCell;
use crate::utilities::vector::Vector3;

use super::gradients::GradientCache;

///
/// Profile spanning `[bottom, top]` with a single value cell that applies at
/// every radius in between.
///
#[derive(Clone, Debug)]
pub struct ProfileConstant
{
    pub(crate) radii: [f32; 2],
    pub(crate) cell: ValueCell,
    pub(crate) point_index: Option<usize>,
    pub(crate) gradients: GradientCache,
}

impl PartialEq for ProfileConstant
{
    fn eq(&self, other: &Self) -> bool
    {
        self.radii == other.radii && self.cell == other.cell
    }
}

impl ProfileConstant
{
    pub fn new(radius_bottom: f32, radius_top: f32, cell: ValueCell) -> Result<Self, GeoTessError>
    {
        if !(radius_top > radius_bottom)
        {
            return Err(GeoTessError::MalformedProfile(format!(
                "constant profile needs bottom < top, found {} and {}", radius_bottom, radius_top)));
        }
        Ok(Self { radii: [radius_bottom, radius_top], cell, point_index: None, gradients: GradientCache::default() })
    }

    pub fn radius_bottom(&self) -> f32
    {
        self.radii[0]
    }

    pub fn radius_top(&self) -> f32
    {
        self.radii[1]
    }

    pub fn cell(&self) -> &ValueCell
    {
        &self.cell
    }

    pub(crate) fn closest_node(&self, radius: f64) -> usize
    {
        if (self.radii[1] as f64 - radius).abs() < (self.radii[0] as f64 - radius).abs() { 1 } else { 0 }
    }

    pub(crate) fn integrate(&self, attribute: usize, reciprocal: bool) -> f64
    {
        let thickness = self.radii[1] as f64 - self.radii[0] as f64;
        let value = self.cell.value(attribute);
        if reciprocal { thickness / value } else { thickness * value }
    }

    /// Radius at which the single gradient of this profile is evaluated.
    pub(crate) fn gradient_radius(&self) -> f64
    {
        0.5 * (self.radii[0] as f64 + self.radii[1] as f64)
    }

    pub(crate) fn add_to_gradient(&self, attribute: usize, coefficient: f64, gradient: &mut Vector3)
    {
        if let Some(g) = self.gradients.node(attribute, 0)
        {
            for k in 0..3
            {
                gradient[k] += coefficient * g[k];
            }
        }
    }
}

#[test]
fn check_constant_profile()
{
    assert!(ProfileConstant::new(10.0, 10.0, ValueCell::Double(vec![1.0])).is_err());
    assert!(ProfileConstant::new(20.0, 10.0, ValueCell::Double(vec![1.0])).is_err());
    let p = ProfileConstant::new(10.0, 30.0, ValueCell::Double(vec![4.0])).unwrap();
    assert_eq!(p.closest_node(12.0), 0);
    assert_eq!(p.closest_node(25.0), 1);
    assert_eq!(p.integrate(0, false), 80.0);
    assert_eq!(p.integrate(0, true), 5.0);
    assert_eq!(p.gradient_radius(), 20.0);
}
