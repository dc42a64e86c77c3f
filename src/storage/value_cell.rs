use std::fmt::Display;
use std::io::{Read, Write};

use num_traits::AsPrimitive;

use crate::errors::GeoTessError;

use super::attributes::AttributeDefinitions;
use super::codec::*;
use super::custom::CustomValue;
use super::numeric_kind::NumericKind;

///
/// Primitive element types a value cell can be read into or written from.
/// Conversions follow `as` semantics (truncating, saturating).
///
pub trait Element: Copy + Send + Sync + 'static
    + AsPrimitive<f64> + AsPrimitive<f32> + AsPrimitive<i64> + AsPrimitive<i32> + AsPrimitive<i16> + AsPrimitive<i8>
{
}
impl Element for f64 {}
impl Element for f32 {}
impl Element for i64 {}
impl Element for i32 {}
impl Element for i16 {}
impl Element for i8 {}

#[inline(always)]
fn convert<S: AsPrimitive<T>, T: Copy + 'static>(value: S) -> T
{
    value.as_()
}

///
/// Attribute samples stored at one profile node: one element per model
/// attribute, all of the model's [`NumericKind`].
///
#[derive(Debug)]
pub enum ValueCell
{
    Double(Vec<f64>),
    Float(Vec<f32>),
    Long(Vec<i64>),
    Int(Vec<i32>),
    Short(Vec<i16>),
    Byte(Vec<i8>),
    Custom(Box<dyn CustomValue>),
}

impl Clone for ValueCell
{
    fn clone(&self) -> Self
    {
        match self
        {
            ValueCell::Double(v) => ValueCell::Double(v.clone()),
            ValueCell::Float(v) => ValueCell::Float(v.clone()),
            ValueCell::Long(v) => ValueCell::Long(v.clone()),
            ValueCell::Int(v) => ValueCell::Int(v.clone()),
            ValueCell::Short(v) => ValueCell::Short(v.clone()),
            ValueCell::Byte(v) => ValueCell::Byte(v.clone()),
            ValueCell::Custom(v) => ValueCell::Custom(v.clone_box()),
        }
    }
}

#[inline]
fn same_float(a: f64, b: f64) -> bool
{
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for ValueCell
{
    /// Same kind, same length and elementwise equal, with NaN equal to NaN.
    fn eq(&self, other: &Self) -> bool
    {
        match (self, other)
        {
            (ValueCell::Double(a), ValueCell::Double(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_float(*x, *y)),
            (ValueCell::Float(a), ValueCell::Float(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_float(*x as f64, *y as f64)),
            (ValueCell::Long(a), ValueCell::Long(b)) => a == b,
            (ValueCell::Int(a), ValueCell::Int(b)) => a == b,
            (ValueCell::Short(a), ValueCell::Short(b)) => a == b,
            (ValueCell::Byte(a), ValueCell::Byte(b)) => a == b,
            (ValueCell::Custom(a), ValueCell::Custom(b)) =>
            {
                a.type_name() == b.type_name() && a.len() == b.len()
                    && (0..a.len()).all(|i| same_float(a.get_f64(i), b.get_f64(i)))
            },
            _ => false,
        }
    }
}

macro_rules! typed_getter {
    ($name:ident, $t:ty) => {
        #[inline]
        pub fn $name(&self, index: usize) -> Result<$t, GeoTessError>
        {
            self.get::<$t>(index)
        }
    };
}

impl ValueCell
{
    ///
    /// Zero-filled cell of `n` elements. Custom cells must be created through
    /// their registered kind, see [`AttributeDefinitions::new_cell`].
    ///
    pub fn zeros(kind: NumericKind, n: usize) -> Result<Self, GeoTessError>
    {
        Ok(match kind
        {
            NumericKind::Double => ValueCell::Double(vec![0.0; n]),
            NumericKind::Float => ValueCell::Float(vec![0.0; n]),
            NumericKind::Long => ValueCell::Long(vec![0; n]),
            NumericKind::Int => ValueCell::Int(vec![0; n]),
            NumericKind::Short => ValueCell::Short(vec![0; n]),
            NumericKind::Byte => ValueCell::Byte(vec![0; n]),
            NumericKind::Custom => return Err(GeoTessError::UnknownDataType(kind.name().to_string())),
        })
    }

    ///
    /// Cell of the requested kind holding `values` converted element by element.
    ///
    pub fn from_values<T: Element>(kind: NumericKind, values: &[T]) -> Result<Self, GeoTessError>
    {
        let mut cell = Self::zeros(kind, values.len())?;
        for (i, v) in values.iter().enumerate()
        {
            cell.set(i, *v)?;
        }
        Ok(cell)
    }

    pub fn kind(&self) -> NumericKind
    {
        match self
        {
            ValueCell::Double(_) => NumericKind::Double,
            ValueCell::Float(_) => NumericKind::Float,
            ValueCell::Long(_) => NumericKind::Long,
            ValueCell::Int(_) => NumericKind::Int,
            ValueCell::Short(_) => NumericKind::Short,
            ValueCell::Byte(_) => NumericKind::Byte,
            ValueCell::Custom(_) => NumericKind::Custom,
        }
    }

    pub fn len(&self) -> usize
    {
        match self
        {
            ValueCell::Double(v) => v.len(),
            ValueCell::Float(v) => v.len(),
            ValueCell::Long(v) => v.len(),
            ValueCell::Int(v) => v.len(),
            ValueCell::Short(v) => v.len(),
            ValueCell::Byte(v) => v.len(),
            ValueCell::Custom(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    ///
    /// Element `index` converted to `T`.
    ///
    pub fn get<T: Copy + 'static>(&self, index: usize) -> Result<T, GeoTessError>
    where f64: AsPrimitive<T>, f32: AsPrimitive<T>, i64: AsPrimitive<T>, i32: AsPrimitive<T>, i16: AsPrimitive<T>, i8: AsPrimitive<T>
    {
        GeoTessError::check_index(index, self.len())?;
        Ok(match self
        {
            ValueCell::Double(v) => convert(v[index]),
            ValueCell::Float(v) => convert(v[index]),
            ValueCell::Long(v) => convert(v[index]),
            ValueCell::Int(v) => convert(v[index]),
            ValueCell::Short(v) => convert(v[index]),
            ValueCell::Byte(v) => convert(v[index]),
            ValueCell::Custom(v) => convert(v.get_f64(index)),
        })
    }

    typed_getter!(get_f64, f64);
    typed_getter!(get_f32, f32);
    typed_getter!(get_i64, i64);
    typed_getter!(get_i32, i32);
    typed_getter!(get_i16, i16);
    typed_getter!(get_i8, i8);

    ///
    /// Element `index` as `f64`, or NaN when `index` is out of range. Used on
    /// query paths where the attribute index has already been validated.
    ///
    #[inline]
    pub(crate) fn value(&self, index: usize) -> f64
    {
        self.get::<f64>(index).unwrap_or(f64::NAN)
    }

    pub fn set<T: Element>(&mut self, index: usize, value: T) -> Result<(), GeoTessError>
    {
        GeoTessError::check_index(index, self.len())?;
        match self
        {
            ValueCell::Double(v) => v[index] = convert(value),
            ValueCell::Float(v) => v[index] = convert(value),
            ValueCell::Long(v) => v[index] = convert(value),
            ValueCell::Int(v) => v[index] = convert(value),
            ValueCell::Short(v) => v[index] = convert(value),
            ValueCell::Byte(v) => v[index] = convert(value),
            ValueCell::Custom(v) => v.set_f64(index, convert(value)),
        }
        Ok(())
    }

    /// Overwrites every element with `value`.
    pub fn fill<T: Element>(&mut self, value: T)
    {
        match self
        {
            ValueCell::Double(v) => v.fill(convert(value)),
            ValueCell::Float(v) => v.fill(convert(value)),
            ValueCell::Long(v) => v.fill(convert(value)),
            ValueCell::Int(v) => v.fill(convert(value)),
            ValueCell::Short(v) => v.fill(convert(value)),
            ValueCell::Byte(v) => v.fill(convert(value)),
            ValueCell::Custom(v) =>
            {
                for i in 0..v.len()
                {
                    v.set_f64(i, convert(value));
                }
            },
        }
    }

    ///
    /// True when element `index` is not a number. Always false for integer kinds.
    ///
    pub fn is_nan(&self, index: usize) -> Result<bool, GeoTessError>
    {
        GeoTessError::check_index(index, self.len())?;
        Ok(match self
        {
            ValueCell::Double(v) => v[index].is_nan(),
            ValueCell::Float(v) => v[index].is_nan(),
            ValueCell::Custom(v) => v.is_nan(index),
            _ => false,
        })
    }

    /// Deep copy.
    pub fn copy(&self) -> Self
    {
        self.clone()
    }

    ///
    /// Reads one cell of `definitions.n_attributes()` elements in the model's kind.
    ///
    pub fn read_binary<R: Read>(input: &mut R, definitions: &AttributeDefinitions) -> Result<Self, GeoTessError>
    {
        let n = definitions.n_attributes();
        macro_rules! read_all {
            ($variant:ident, $read:ident) => {{
                let mut values = Vec::with_capacity(n);
                for _ in 0..n
                {
                    values.push($read(input)?);
                }
                ValueCell::$variant(values)
            }};
        }
        Ok(match definitions.kind()
        {
            NumericKind::Double => read_all!(Double, read_f64),
            NumericKind::Float => read_all!(Float, read_f32),
            NumericKind::Long => read_all!(Long, read_i64),
            NumericKind::Int => read_all!(Int, read_i32),
            NumericKind::Short => read_all!(Short, read_i16),
            NumericKind::Byte => read_all!(Byte, read_i8),
            NumericKind::Custom => ValueCell::Custom(definitions.custom_kind()?.read_binary(input, n)?),
        })
    }

    pub fn read_text(input: &mut TextTokens<'_>, definitions: &AttributeDefinitions) -> Result<Self, GeoTessError>
    {
        let n = definitions.n_attributes();
        macro_rules! parse_all {
            ($variant:ident, $t:ty) => {{
                let mut values = Vec::with_capacity(n);
                for _ in 0..n
                {
                    values.push(input.parse::<$t>()?);
                }
                ValueCell::$variant(values)
            }};
        }
        Ok(match definitions.kind()
        {
            NumericKind::Double => parse_all!(Double, f64),
            NumericKind::Float => parse_all!(Float, f32),
            NumericKind::Long => parse_all!(Long, i64),
            NumericKind::Int => parse_all!(Int, i32),
            NumericKind::Short => parse_all!(Short, i16),
            NumericKind::Byte => parse_all!(Byte, i8),
            NumericKind::Custom => ValueCell::Custom(definitions.custom_kind()?.read_text(input, n)?),
        })
    }

    pub fn write_binary<W: Write>(&self, output: &mut W) -> Result<(), GeoTessError>
    {
        match self
        {
            ValueCell::Double(v) => v.iter().try_for_each(|x| write_f64(output, *x)),
            ValueCell::Float(v) => v.iter().try_for_each(|x| write_f32(output, *x)),
            ValueCell::Long(v) => v.iter().try_for_each(|x| write_i64(output, *x)),
            ValueCell::Int(v) => v.iter().try_for_each(|x| write_i32(output, *x)),
            ValueCell::Short(v) => v.iter().try_for_each(|x| write_i16(output, *x)),
            ValueCell::Byte(v) => v.iter().try_for_each(|x| write_i8(output, *x)),
            ValueCell::Custom(v) => v.write_binary(output),
        }
    }

    /// Appends the space separated text tokens of this cell.
    pub fn write_text(&self, output: &mut String)
    {
        fn join<T: Display>(values: &[T], output: &mut String)
        {
            for (i, v) in values.iter().enumerate()
            {
                if i > 0
                {
                    output.push(' ');
                }
                output.push_str(&v.to_string());
            }
        }
        match self
        {
            ValueCell::Double(v) => join(v, output),
            ValueCell::Float(v) => join(v, output),
            ValueCell::Long(v) => join(v, output),
            ValueCell::Int(v) => join(v, output),
            ValueCell::Short(v) => join(v, output),
            ValueCell::Byte(v) => join(v, output),
            ValueCell::Custom(v) => v.write_text(output),
        }
    }
}

impl Display for ValueCell
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::new();
        self.write_text(&mut text);
        write!(f, "{}", text)
    }
}

impl From<Vec<f64>> for ValueCell
{
    fn from(value: Vec<f64>) -> Self
    {
        ValueCell::Double(value)
    }
}

impl From<Vec<f32>> for ValueCell
{
    fn from(value: Vec<f32>) -> Self
    {
        ValueCell::Float(value)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::sync::Arc;
    use crate::storage::custom::{fixed_point::FixedPointKind, CustomTypeRegistry};

    #[test]
    fn check_conversions_truncate()
    {
        let cell = ValueCell::Double(vec![3.7, -2.9, 300.0]);
        assert_eq!(cell.get_i32(0).unwrap(), 3);
        assert_eq!(cell.get_i64(1).unwrap(), -2);
        assert_eq!(cell.get_i8(2).unwrap(), 127);
        assert!((cell.get_f32(0).unwrap() - 3.7).abs() < 1e-6);

        let mut cell = ValueCell::Short(vec![0; 2]);
        cell.set(0, 12.9f64).unwrap();
        cell.set(1, -4i64).unwrap();
        assert_eq!(cell.get_f64(0).unwrap(), 12.0);
        assert_eq!(cell.get_i16(1).unwrap(), -4);
    }

    #[test]
    fn check_invalid_index()
    {
        let mut cell = ValueCell::Float(vec![1.0]);
        assert_eq!(cell.get_f64(1), Err(GeoTessError::InvalidIndex { index: 1, len: 1 }));
        assert!(cell.set(5, 1.0).is_err());
        assert!(cell.is_nan(1).is_err());
        assert!(cell.value(3).is_nan());
    }

    #[test]
    fn check_nan_and_equality()
    {
        let a = ValueCell::Double(vec![f64::NAN, 1.0]);
        let b = a.copy();
        assert_eq!(a, b);
        assert!(a.is_nan(0).unwrap());
        assert!(!a.is_nan(1).unwrap());
        assert!(!ValueCell::Int(vec![0]).is_nan(0).unwrap());
        // kind matters
        assert_ne!(ValueCell::Double(vec![1.0]), ValueCell::Float(vec![1.0]));
        assert_ne!(ValueCell::Double(vec![1.0]), ValueCell::Double(vec![1.0, 1.0]));
    }

    #[test]
    fn check_fill()
    {
        let mut cell = ValueCell::zeros(NumericKind::Byte, 4).unwrap();
        cell.fill(7);
        assert_eq!(cell, ValueCell::Byte(vec![7; 4]));
        assert!(ValueCell::zeros(NumericKind::Custom, 1).is_err());
    }

    #[test]
    fn check_binary_and_text_forms()
    {
        let definitions = AttributeDefinitions::new(&["vp", "vs"], &["km/sec", "km/sec"], NumericKind::Float).unwrap();
        let cell = ValueCell::Float(vec![8.04, f32::NAN]);
        let mut buffer = Vec::new();
        cell.write_binary(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 8);
        let read = ValueCell::read_binary(&mut buffer.as_slice(), &definitions).unwrap();
        assert_eq!(read, cell);

        let text = cell.to_string();
        assert_eq!(text, "8.04 NaN");
        let read = ValueCell::read_text(&mut TextTokens::new(&text), &definitions).unwrap();
        assert_eq!(read, cell);
    }

    #[test]
    fn check_custom_cells()
    {
        let mut registry = CustomTypeRegistry::new();
        registry.register(Arc::new(FixedPointKind));
        let definitions = AttributeDefinitions::new_custom(&["q"], &["-"], "FIXED2", &registry).unwrap();
        let mut cell = definitions.new_cell().unwrap();
        assert_eq!(cell.kind(), NumericKind::Custom);
        cell.set(0, 1.25).unwrap();
        assert_eq!(cell.get_f64(0).unwrap(), 1.25);
        assert_eq!(cell.get_i32(0).unwrap(), 1);

        let mut buffer = Vec::new();
        cell.write_binary(&mut buffer).unwrap();
        let read = ValueCell::read_binary(&mut buffer.as_slice(), &definitions).unwrap();
        assert_eq!(read, cell);
        let read = ValueCell::read_text(&mut TextTokens::new(&cell.to_string()), &definitions).unwrap();
        assert_eq!(read, cell);
    }
}
