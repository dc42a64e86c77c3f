pub mod constant;
pub(crate) mod gradients;
pub mod io;
pub mod npoint;
pub mod profile;
pub mod simple;

pub use constant::ProfileConstant;
pub use npoint::ProfileNPoint;
pub use profile::{Profile, ProfileType};
pub use simple::{ProfileEmpty, ProfileSurface, ProfileThin};
