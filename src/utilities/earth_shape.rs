use serde::{Deserialize, Serialize};

use super::vector::Vector3;

///
/// Reference shape used to convert between geographic coordinates, unit
/// vectors and radii. The `*RConst` variants use the ellipsoid for latitude
/// conversion but report a constant earth radius of 6371 km.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarthShape
{
    Sphere,
    Grs80,
    Grs80RConst,
    #[default]
    Wgs84,
    Wgs84RConst,
}

const MEAN_RADIUS: f64 = 6371.0;

impl EarthShape
{
    /// Equatorial radius in km.
    pub fn equatorial_radius(&self) -> f64
    {
        match self
        {
            EarthShape::Sphere => MEAN_RADIUS,
            EarthShape::Grs80 | EarthShape::Grs80RConst | EarthShape::Wgs84 | EarthShape::Wgs84RConst => 6378.137,
        }
    }

    pub fn inverse_flattening(&self) -> Option<f64>
    {
        match self
        {
            EarthShape::Sphere => None,
            EarthShape::Grs80 | EarthShape::Grs80RConst => Some(298.257222101),
            EarthShape::Wgs84 | EarthShape::Wgs84RConst => Some(298.257223563),
        }
    }

    /// Eccentricity squared, `f(2 - f)`.
    pub fn eccentricity_squared(&self) -> f64
    {
        match self.inverse_flattening()
        {
            Some(inv) =>
            {
                let f = 1.0 / inv;
                f * (2.0 - f)
            },
            None => 0.0,
        }
    }

    fn constant_radius(&self) -> bool
    {
        matches!(self, EarthShape::Sphere | EarthShape::Grs80RConst | EarthShape::Wgs84RConst)
    }

    ///
    /// Unit vector for a geodetic latitude and longitude in degrees.
    ///
    pub fn vector(&self, lat_degrees: f64, lon_degrees: f64) -> Vector3
    {
        let e2 = self.eccentricity_squared();
        let lat = lat_degrees.to_radians();
        let lon = lon_degrees.to_radians();
        // geocentric latitude
        let lat = if e2 > 0.0 && lat.abs() < std::f64::consts::FRAC_PI_2
        {
            ((1.0 - e2) * lat.tan()).atan()
        }
        else
        {
            lat
        };
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    /// Geodetic latitude in degrees of a unit vector.
    pub fn latitude(&self, u: &Vector3) -> f64
    {
        let e2 = self.eccentricity_squared();
        let horizontal = (u[0] * u[0] + u[1] * u[1]).sqrt();
        u[2].atan2((1.0 - e2) * horizontal).to_degrees()
    }

    /// Longitude in degrees, in (-180, 180].
    pub fn longitude(&self, u: &Vector3) -> f64
    {
        u[1].atan2(u[0]).to_degrees()
    }

    ///
    /// Radius of the reference surface in km beneath the unit vector `u`.
    ///
    pub fn earth_radius(&self, u: &Vector3) -> f64
    {
        if self.constant_radius()
        {
            return MEAN_RADIUS;
        }
        let e2 = self.eccentricity_squared();
        self.equatorial_radius() * (1.0 - e2).sqrt() / (1.0 - e2 * (1.0 - u[2] * u[2])).sqrt()
    }

    pub fn radius(&self, u: &Vector3, depth: f64) -> f64
    {
        self.earth_radius(u) - depth
    }

    pub fn depth(&self, u: &Vector3, radius: f64) -> f64
    {
        self.earth_radius(u) - radius
    }

    pub fn name(&self) -> &'static str
    {
        match self
        {
            EarthShape::Sphere => "SPHERE",
            EarthShape::Grs80 => "GRS80",
            EarthShape::Grs80RConst => "GRS80_RCONST",
            EarthShape::Wgs84 => "WGS84",
            EarthShape::Wgs84RConst => "WGS84_RCONST",
        }
    }

    pub fn from_name(name: &str) -> Option<EarthShape>
    {
        match name.to_ascii_uppercase().as_str()
        {
            "SPHERE" => Some(EarthShape::Sphere),
            "GRS80" => Some(EarthShape::Grs80),
            "GRS80_RCONST" => Some(EarthShape::Grs80RConst),
            "WGS84" => Some(EarthShape::Wgs84),
            "WGS84_RCONST" => Some(EarthShape::Wgs84RConst),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn check_sphere_round_trip()
    {
        let shape = EarthShape::Sphere;
        let u = shape.vector(30.0, -120.0);
        assert!((shape.latitude(&u) - 30.0).abs() < 1e-12);
        assert!((shape.longitude(&u) + 120.0).abs() < 1e-12);
        assert_eq!(shape.earth_radius(&u), 6371.0);
        assert_eq!(shape.radius(&u, 100.0), 6271.0);
    }

    #[test]
    fn check_wgs84_geodetic_latitude()
    {
        let shape = EarthShape::Wgs84;
        let u = shape.vector(45.0, 10.0);
        assert!((shape.latitude(&u) - 45.0).abs() < 1e-10);
        // geocentric latitude is smaller than geodetic latitude
        assert!(u[2].asin().to_degrees() < 45.0);
        // equatorial and polar radii
        assert!((shape.earth_radius(&[1.0, 0.0, 0.0]) - 6378.137).abs() < 1e-9);
        assert!((shape.earth_radius(&[0.0, 0.0, 1.0]) - 6356.752314245).abs() < 1e-6);
    }

    #[test]
    fn check_names()
    {
        for shape in [EarthShape::Sphere, EarthShape::Grs80, EarthShape::Grs80RConst, EarthShape::Wgs84, EarthShape::Wgs84RConst]
        {
            assert_eq!(EarthShape::from_name(shape.name()), Some(shape));
        }
    }
}
