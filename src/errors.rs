use std::fmt::Display;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeoTessError
{
    /// Index outside `[0, len)`.
    InvalidIndex { index: usize, len: usize },
    /// Radii not strictly increasing, or radii/value cell count mismatch.
    MalformedProfile(String),
    /// The walking triangle search did not converge within its iteration bound.
    SpatialSearchFailure { tessellation: usize, iterations: usize },
    /// Natural neighbor boundary edges do not chain into a closed polygon.
    TopologyInconsistency(String),
    UnsupportedInterpolatorCombination(&'static str),
    /// A radial or value query was issued before a geographic position was set.
    PositionNotSet,
    /// A weight query touched a node whose point index was never assigned.
    PointIndexUnassigned { vertex: usize, layer: usize, node: usize },
    InvalidGrid(String),
    InvalidModel(String),
    UnknownProfileType(u8),
    UnknownDataType(String),
    ParseFailed(String),
    FileIOError,
    ReadBufferFailed,
    WriteBufferFailed,
    SerializationFailed,
    DeserializationFailed,
    LZ4DecompressionFailed,
}
impl std::error::Error for GeoTessError {}

impl Display for GeoTessError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", *self)
    }
}

impl GeoTessError
{
    #[inline]
    pub(crate) fn check_index(index: usize, len: usize) -> Result<(), GeoTessError>
    {
        if index < len
        {
            Ok(())
        }
        else
        {
            Err(GeoTessError::InvalidIndex { index, len })
        }
    }
}

#[test]
fn check_index_bounds()
{
    assert!(GeoTessError::check_index(2, 3).is_ok());
    assert_eq!(GeoTessError::check_index(3, 3), Err(GeoTessError::InvalidIndex { index: 3, len: 3 }));
}
