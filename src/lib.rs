//!
//! Interpolation over layered earth models whose horizontal structure is a
//! hierarchy of nested triangular tessellations of the unit sphere and whose
//! vertical structure is a radial profile per vertex and layer.
//!
//! A [`Model`] is immutable during queries; each thread moves its own
//! [`Position`] around it.
//!
pub mod algorithms;
pub mod errors;
pub mod grids;
pub mod model;
pub mod position;
pub mod profiles;
pub mod serialization;
pub mod storage;
pub mod utilities;

pub use algorithms::horizontal::HorizontalInterpolation;
pub use algorithms::radial::RadialInterpolation;
pub use errors::GeoTessError;
pub use grids::{BaseSolid, Grid, GridBuilder};
pub use model::{Model, ModelMetaData, PointMap};
pub use position::{Position, PositionOptions};
pub use profiles::{Profile, ProfileType};
pub use utilities::earth_shape::EarthShape;
