use serde::{Deserialize, Serialize};

///
/// Element type shared by every value cell of a model.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericKind
{
    Double,
    Float,
    Long,
    Int,
    Short,
    Byte,
    /// Caller-registered layout, see [`crate::storage::custom::CustomKind`].
    Custom,
}

impl NumericKind
{
    pub fn name(&self) -> &'static str
    {
        match self
        {
            NumericKind::Double => "DOUBLE",
            NumericKind::Float => "FLOAT",
            NumericKind::Long => "LONG",
            NumericKind::Int => "INT",
            NumericKind::Short => "SHORT",
            NumericKind::Byte => "BYTE",
            NumericKind::Custom => "CUSTOM",
        }
    }

    /// Parses a kind name; anything unrecognized is treated as a custom type name.
    pub fn from_name(name: &str) -> NumericKind
    {
        match name.trim().to_ascii_uppercase().as_str()
        {
            "DOUBLE" => NumericKind::Double,
            "FLOAT" => NumericKind::Float,
            "LONG" => NumericKind::Long,
            "INT" => NumericKind::Int,
            "SHORT" => NumericKind::Short,
            "BYTE" => NumericKind::Byte,
            _ => NumericKind::Custom,
        }
    }

    /// Width in bytes of one element in the binary format, `None` for custom kinds.
    pub fn byte_width(&self) -> Option<usize>
    {
        match self
        {
            NumericKind::Double | NumericKind::Long => Some(8),
            NumericKind::Float | NumericKind::Int => Some(4),
            NumericKind::Short => Some(2),
            NumericKind::Byte => Some(1),
            NumericKind::Custom => None,
        }
    }

    pub fn is_floating(&self) -> bool
    {
        matches!(self, NumericKind::Double | NumericKind::Float)
    }
}

#[test]
fn check_kind_names()
{
    for kind in [NumericKind::Double, NumericKind::Float, NumericKind::Long, NumericKind::Int, NumericKind::Short, NumericKind::Byte]
    {
        assert_eq!(NumericKind::from_name(kind.name()), kind);
    }
    assert_eq!(NumericKind::from_name("float"), NumericKind::Float);
    assert_eq!(NumericKind::from_name("Fixed2"), NumericKind::Custom);
    assert_eq!(NumericKind::Short.byte_width(), Some(2));
}
