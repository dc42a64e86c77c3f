use std::sync::OnceLock;

use crate::algorithms::radial::{self, RadialInterpolation};
use crate::errors::GeoTessError;
use crate::storage::value_cell::ValueCell;
use crate::utilities::vector::Vector3;

use super::gradients::GradientCache;

///
/// Profile with `n >= 2` nodes at strictly increasing radii, one value cell
/// per node.
///
#[derive(Clone, Debug)]
pub struct ProfileNPoint
{
    pub(crate) radii: Vec<f32>,
    pub(crate) cells: Vec<ValueCell>,
    pub(crate) point_indices: Vec<Option<usize>>,
    /// Natural spline second derivatives, one entry per attribute.
    splines: Vec<OnceLock<Vec<f64>>>,
    pub(crate) gradients: GradientCache,
}

impl PartialEq for ProfileNPoint
{
    fn eq(&self, other: &Self) -> bool
    {
        self.radii == other.radii && self.cells == other.cells
    }
}

pub(crate) fn check_increasing(radii: &[f32]) -> Result<(), GeoTessError>
{
    for i in 1..radii.len()
    {
        // written so that NaN radii fail as well
        if !(radii[i] > radii[i - 1])
        {
            return Err(GeoTessError::MalformedProfile(format!(
                "radii must be strictly increasing: radius[{}] = {} follows {}", i, radii[i], radii[i - 1])));
        }
    }
    Ok(())
}

impl ProfileNPoint
{
    pub fn new(radii: Vec<f32>, cells: Vec<ValueCell>) -> Result<Self, GeoTessError>
    {
        if radii.len() < 2
        {
            return Err(GeoTessError::MalformedProfile(format!("an n-point profile needs at least 2 radii, found {}", radii.len())));
        }
        if radii.len() != cells.len()
        {
            return Err(GeoTessError::MalformedProfile(format!("{} radii but {} value cells", radii.len(), cells.len())));
        }
        check_increasing(&radii)?;
        let n_attributes = cells[0].len();
        if cells.iter().any(|c| c.len() != n_attributes || c.kind() != cells[0].kind())
        {
            return Err(GeoTessError::MalformedProfile("value cells differ in kind or length".to_string()));
        }
        let n = radii.len();
        Ok(Self
        {
            radii,
            cells,
            point_indices: vec![None; n],
            splines: Self::empty_splines(n_attributes),
            gradients: GradientCache::default(),
        })
    }

    fn empty_splines(n_attributes: usize) -> Vec<OnceLock<Vec<f64>>>
    {
        (0..n_attributes).map(|_| OnceLock::new()).collect()
    }

    pub(crate) fn invalidate(&mut self)
    {
        let n_attributes = self.cells.first().map_or(0, |c| c.len());
        self.splines = Self::empty_splines(n_attributes);
        self.gradients.clear();
    }

    #[inline]
    pub fn radii(&self) -> &[f32]
    {
        &self.radii
    }

    pub fn cells(&self) -> &[ValueCell]
    {
        &self.cells
    }

    #[inline]
    pub(crate) fn value(&self, attribute: usize, node: usize) -> f64
    {
        self.cells.get(node).map_or(f64::NAN, |c| c.value(attribute))
    }

    fn spline(&self, attribute: usize) -> Option<&[f64]>
    {
        let slot = self.splines.get(attribute)?;
        Some(slot.get_or_init(|| {
            let x: Vec<f64> = self.radii.iter().map(|r| *r as f64).collect();
            let y: Vec<f64> = (0..self.cells.len()).map(|i| self.value(attribute, i)).collect();
            tracing::trace!(attribute, nodes = x.len(), "spline second derivatives computed");
            radial::natural_spline_second_derivatives(&x, &y)
        }))
    }

    pub(crate) fn value_at(&self, interpolation: RadialInterpolation, attribute: usize, radius: f64, allow_out_of_range: bool) -> f64
    {
        match interpolation
        {
            RadialInterpolation::Linear => radial::linear_value(&self.radii, |i| self.value(attribute, i), radius, allow_out_of_range),
            RadialInterpolation::CubicSpline =>
            {
                match self.spline(attribute)
                {
                    Some(y2) => radial::cubic_value(&self.radii, |i| self.value(attribute, i), y2, radius, allow_out_of_range),
                    None => f64::NAN,
                }
            },
        }
    }

    pub(crate) fn closest_node(&self, radius: f64) -> usize
    {
        let i = radial::radius_index(&self.radii, radius);
        if i < 0
        {
            return 0;
        }
        let i = i as usize;
        if i >= self.radii.len() - 1
        {
            return i;
        }
        if (self.radii[i + 1] as f64 - radius).abs() < (radius - self.radii[i] as f64).abs() { i + 1 } else { i }
    }

    pub(crate) fn integrate(&self, attribute: usize, reciprocal: bool) -> f64
    {
        let mut sum = 0.0;
        for i in 1..self.radii.len()
        {
            let dr = self.radii[i] as f64 - self.radii[i - 1] as f64;
            let pair = self.value(attribute, i) + self.value(attribute, i - 1);
            if reciprocal
            {
                sum += 2.0 * dr / pair;
            }
            else
            {
                sum += dr * pair / 2.0;
            }
        }
        sum
    }

    ///
    /// Adds `coefficient` times the gradient at `radius`, linearly blended
    /// between the bracketing nodes and clamped at the ends.
    ///
    pub(crate) fn add_to_gradient(&self, attribute: usize, radius: f64, coefficient: f64, gradient: &mut Vector3)
    {
        let radii = &self.radii;
        self.gradients.with_nodes(attribute, |nodes| {
            let n = radii.len();
            let (i, f) = if radius <= radii[0] as f64
            {
                (0, 0.0)
            }
            else if radius >= radii[n - 1] as f64
            {
                (n - 2, 1.0)
            }
            else
            {
                let i = radial::radius_index(radii, radius).max(0) as usize;
                (i, (radius - radii[i] as f64) / (radii[i + 1] as f64 - radii[i] as f64))
            };
            for k in 0..3
            {
                gradient[k] += coefficient * ((1.0 - f) * nodes[i][k] + f * nodes[i + 1][k]);
            }
        });
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn profile() -> ProfileNPoint
    {
        ProfileNPoint::new(vec![0.0, 10.0, 20.0], vec![
            ValueCell::Double(vec![1.0, 4.0]),
            ValueCell::Double(vec![2.0, 5.0]),
            ValueCell::Double(vec![3.0, 7.0])]).unwrap()
    }

    #[test]
    fn check_construction_rules()
    {
        let cell = || ValueCell::Double(vec![1.0]);
        assert!(ProfileNPoint::new(vec![0.0], vec![cell()]).is_err());
        assert!(ProfileNPoint::new(vec![0.0, 1.0], vec![cell()]).is_err());
        assert!(matches!(ProfileNPoint::new(vec![0.0, 0.0], vec![cell(), cell()]), Err(GeoTessError::MalformedProfile(_))));
        assert!(ProfileNPoint::new(vec![1.0, 0.5], vec![cell(), cell()]).is_err());
        assert!(ProfileNPoint::new(vec![0.0, f32::NAN], vec![cell(), cell()]).is_err());
        assert!(ProfileNPoint::new(vec![0.0, 1.0], vec![cell(), ValueCell::Float(vec![1.0])]).is_err());
    }

    #[test]
    fn check_values()
    {
        let p = profile();
        assert_eq!(p.value_at(RadialInterpolation::Linear, 0, 5.0, true), 1.5);
        assert_eq!(p.value_at(RadialInterpolation::Linear, 0, 25.0, true), 3.0);
        assert!(p.value_at(RadialInterpolation::Linear, 0, 25.0, false).is_nan());
        // cubic spline is exact at the nodes
        assert!((p.value_at(RadialInterpolation::CubicSpline, 1, 10.0, true) - 5.0).abs() < 1e-12);
        assert!(p.value_at(RadialInterpolation::CubicSpline, 7, 10.0, true).is_nan());
    }

    #[test]
    fn check_cubic_value_follows_edited_nodes()
    {
        let mut p = crate::profiles::profile::Profile::NPoint(profile());
        // evenly spaced linear data is reproduced exactly
        assert!((p.value_at(RadialInterpolation::CubicSpline, 0, 15.0, true) - 2.5).abs() < 1e-12);
        p.value_cell_mut(2).unwrap().set(0, 5.0f64).unwrap();
        // y2 = [0, 0.03, 0] for values 1, 2, 5
        assert!((p.value_at(RadialInterpolation::CubicSpline, 0, 15.0, true) - 3.3125).abs() < 1e-12);
        assert_eq!(p.value_at(RadialInterpolation::CubicSpline, 0, 20.0, true), 5.0);
        assert!((p.value_at(RadialInterpolation::CubicSpline, 1, 10.0, true) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn check_closest_node_and_integral()
    {
        let p = profile();
        assert_eq!(p.closest_node(-4.0), 0);
        assert_eq!(p.closest_node(4.0), 0);
        assert_eq!(p.closest_node(6.0), 1);
        assert_eq!(p.closest_node(30.0), 2);
        // (10 * 3 + 10 * 5) / 2
        assert!((p.integrate(0, false) - 40.0).abs() < 1e-12);
        assert!((p.integrate(0, true) - (20.0 / 3.0 + 20.0 / 5.0)).abs() < 1e-12);
    }

    #[test]
    fn check_add_to_gradient()
    {
        let p = profile();
        let mut g = [0.0; 3];
        // nothing cached yet
        p.add_to_gradient(0, 5.0, 1.0, &mut g);
        assert_eq!(g, [0.0; 3]);

        p.gradients.ensure(0, false, &[0.0, 10.0, 20.0], |r| Ok([r, 1.0, 0.0])).unwrap();
        p.add_to_gradient(0, 5.0, 2.0, &mut g);
        assert!((g[0] - 10.0).abs() < 1e-12);
        assert!((g[1] - 2.0).abs() < 1e-12);
        let mut g = [0.0; 3];
        p.add_to_gradient(0, 50.0, 1.0, &mut g);
        assert!((g[0] - 20.0).abs() < 1e-12);
    }
}
