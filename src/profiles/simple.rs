use crate::errors::GeoTessError;
use crate::storage::value_cell::ValueCell;

///
/// Layer extent without data. Every value is NaN.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileEmpty
{
    pub(crate) radii: [f32; 2],
}

impl ProfileEmpty
{
    ///
    /// Zero thickness (`bottom == top`) is allowed, which is how pinched-out
    /// layers are represented.
    ///
    pub fn new(radius_bottom: f32, radius_top: f32) -> Result<Self, GeoTessError>
    {
        if !(radius_top >= radius_bottom)
        {
            return Err(GeoTessError::MalformedProfile(format!(
                "empty profile needs bottom <= top, found {} and {}", radius_bottom, radius_top)));
        }
        Ok(Self { radii: [radius_bottom, radius_top] })
    }

    pub fn radius_bottom(&self) -> f32
    {
        self.radii[0]
    }

    pub fn radius_top(&self) -> f32
    {
        self.radii[1]
    }
}

///
/// Single node of data at one radius, used for layers of negligible thickness.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileThin
{
    pub(crate) radius: f32,
    pub(crate) cell: ValueCell,
    pub(crate) point_index: Option<usize>,
}

impl ProfileThin
{
    pub fn new(radius: f32, cell: ValueCell) -> Result<Self, GeoTessError>
    {
        if !radius.is_finite()
        {
            return Err(GeoTessError::MalformedProfile(format!("thin profile radius {} is not finite", radius)));
        }
        Ok(Self { radius, cell, point_index: None })
    }

    pub fn radius(&self) -> f32
    {
        self.radius
    }

    pub fn cell(&self) -> &ValueCell
    {
        &self.cell
    }
}

///
/// Data without any radius, for two-dimensional surface models.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileSurface
{
    pub(crate) cell: ValueCell,
    pub(crate) point_index: Option<usize>,
}

impl ProfileSurface
{
    pub fn new(cell: ValueCell) -> Self
    {
        Self { cell, point_index: None }
    }

    pub fn cell(&self) -> &ValueCell
    {
        &self.cell
    }
}

#[test]
fn check_simple_profiles()
{
    assert!(ProfileEmpty::new(3480.0, 3480.0).is_ok());
    assert!(ProfileEmpty::new(3480.0, 3000.0).is_err());
    assert!(ProfileThin::new(f32::NAN, ValueCell::Double(vec![1.0])).is_err());
    let s = ProfileSurface::new(ValueCell::Int(vec![3]));
    assert_eq!(s.cell().get_i32(0).unwrap(), 3);
}
