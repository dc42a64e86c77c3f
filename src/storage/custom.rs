//! Open extension point for value cells whose element layout is defined by
//! the caller rather than by [`NumericKind`](super::numeric_kind::NumericKind).

use std::fmt::Debug;
use std::io::{Read, Write};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::GeoTessError;

use super::codec::TextTokens;

///
/// One custom value cell. Elements are addressed by attribute index and
/// exchanged with the engine as `f64`.
///
pub trait CustomValue: Debug + Send + Sync
{
    /// Name of the registered [`CustomKind`] that produced this value.
    fn type_name(&self) -> &str;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
    /// Caller guarantees `index < len()`.
    fn get_f64(&self, index: usize) -> f64;
    /// Caller guarantees `index < len()`.
    fn set_f64(&mut self, index: usize, value: f64);
    fn is_nan(&self, index: usize) -> bool
    {
        self.get_f64(index).is_nan()
    }
    fn write_binary(&self, output: &mut dyn Write) -> Result<(), GeoTessError>;
    /// Appends the text tokens of this value, space separated, without a trailing separator.
    fn write_text(&self, output: &mut String);
    fn clone_box(&self) -> Box<dyn CustomValue>;
}

///
/// Factory capability registered for a custom element type.
///
pub trait CustomKind: Debug + Send + Sync
{
    fn type_name(&self) -> &str;
    /// New value holding `n` elements.
    fn instantiate(&self, n: usize) -> Box<dyn CustomValue>;
    fn instantiate_one(&self) -> Box<dyn CustomValue>
    {
        self.instantiate(1)
    }
    fn read_binary(&self, input: &mut dyn Read, n: usize) -> Result<Box<dyn CustomValue>, GeoTessError>;
    fn read_text(&self, input: &mut TextTokens<'_>, n: usize) -> Result<Box<dyn CustomValue>, GeoTessError>;
}

///
/// Explicit registry of custom kinds, handed to model construction and
/// loading code. Nothing is registered globally.
///
#[derive(Debug, Default, Clone)]
pub struct CustomTypeRegistry
{
    kinds: FxHashMap<String, Arc<dyn CustomKind>>,
}

impl CustomTypeRegistry
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Registers `kind`, replacing any previous kind with the same name.
    pub fn register(&mut self, kind: Arc<dyn CustomKind>) -> Option<Arc<dyn CustomKind>>
    {
        self.kinds.insert(kind.type_name().to_string(), kind)
    }

    pub fn remove(&mut self, type_name: &str) -> Option<Arc<dyn CustomKind>>
    {
        self.kinds.remove(type_name)
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn CustomKind>>
    {
        self.kinds.get(type_name).cloned()
    }

    pub fn resolve(&self, type_name: &str) -> Result<Arc<dyn CustomKind>, GeoTessError>
    {
        self.get(type_name).ok_or_else(|| GeoTessError::UnknownDataType(type_name.to_string()))
    }

    pub fn len(&self) -> usize
    {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixed_point
{
    //! Two-decimal fixed point values stored as `i32`, used to exercise the
    //! custom extension point in tests.
    use super::*;
    use crate::storage::codec::{read_i32, write_i32};

    #[derive(Debug, Clone, PartialEq)]
    pub struct FixedPoint(pub Vec<i32>);

    impl CustomValue for FixedPoint
    {
        fn type_name(&self) -> &str { "FIXED2" }
        fn len(&self) -> usize { self.0.len() }
        fn get_f64(&self, index: usize) -> f64 { self.0[index] as f64 / 100.0 }
        fn set_f64(&mut self, index: usize, value: f64) { self.0[index] = (value * 100.0).round() as i32; }
        fn write_binary(&self, output: &mut dyn Write) -> Result<(), GeoTessError>
        {
            for v in &self.0
            {
                write_i32(output, *v)?;
            }
            Ok(())
        }
        fn write_text(&self, output: &mut String)
        {
            let tokens: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
            output.push_str(&tokens.join(" "));
        }
        fn clone_box(&self) -> Box<dyn CustomValue> { Box::new(self.clone()) }
    }

    #[derive(Debug)]
    pub struct FixedPointKind;

    impl CustomKind for FixedPointKind
    {
        fn type_name(&self) -> &str { "FIXED2" }
        fn instantiate(&self, n: usize) -> Box<dyn CustomValue> { Box::new(FixedPoint(vec![0; n])) }
        fn read_binary(&self, input: &mut dyn Read, n: usize) -> Result<Box<dyn CustomValue>, GeoTessError>
        {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n
            {
                values.push(read_i32(input)?);
            }
            Ok(Box::new(FixedPoint(values)))
        }
        fn read_text(&self, input: &mut TextTokens<'_>, n: usize) -> Result<Box<dyn CustomValue>, GeoTessError>
        {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n
            {
                values.push(input.parse::<i32>()?);
            }
            Ok(Box::new(FixedPoint(values)))
        }
    }
}

#[test]
fn check_registry()
{
    let mut registry = CustomTypeRegistry::new();
    assert!(registry.resolve("FIXED2").is_err());
    assert!(registry.register(Arc::new(fixed_point::FixedPointKind)).is_none());
    let kind = registry.resolve("FIXED2").unwrap();
    let mut value = kind.instantiate(3);
    value.set_f64(1, 2.5);
    assert_eq!(value.get_f64(1), 2.5);
    assert_eq!(kind.instantiate_one().len(), 1);
    assert!(registry.remove("FIXED2").is_some());
    assert!(registry.is_empty());
}
