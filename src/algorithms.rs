pub mod gradient;
pub mod horizontal;
pub mod point_locator;
pub mod radial;
