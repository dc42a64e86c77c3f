pub mod builder;
pub mod grid;
pub mod spokes;

pub use builder::{BaseSolid, GridBuilder};
pub use grid::{Edge, Grid, GridSnapshot};
pub use spokes::SpokeList;
