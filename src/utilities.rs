pub mod earth_shape;
pub mod lu;
pub mod vector;
