//! Big-endian binary fields and whitespace-separated text tokens used by the
//! profile and value cell persistence formats.

use std::io::{Read, Write};
use std::str::{FromStr, SplitWhitespace};

use crate::errors::GeoTessError;

macro_rules! binary_field {
    ($read:ident, $write:ident, $t:ty) => {
        #[inline]
        pub fn $read<R: Read + ?Sized>(input: &mut R) -> Result<$t, GeoTessError>
        {
            let mut buf = [0u8; std::mem::size_of::<$t>()];
            input.read_exact(&mut buf).map_err(|_|GeoTessError::ReadBufferFailed)?;
            Ok(<$t>::from_be_bytes(buf))
        }

        #[inline]
        pub fn $write<W: Write + ?Sized>(output: &mut W, value: $t) -> Result<(), GeoTessError>
        {
            output.write_all(&value.to_be_bytes()).map_err(|_|GeoTessError::WriteBufferFailed)
        }
    };
}

binary_field!(read_u8, write_u8, u8);
binary_field!(read_i8, write_i8, i8);
binary_field!(read_i16, write_i16, i16);
binary_field!(read_i32, write_i32, i32);
binary_field!(read_i64, write_i64, i64);
binary_field!(read_f32, write_f32, f32);
binary_field!(read_f64, write_f64, f64);

///
/// Cursor over whitespace-separated tokens of a text document.
///
pub struct TextTokens<'a>
{
    tokens: SplitWhitespace<'a>,
}

impl<'a> TextTokens<'a>
{
    pub fn new(text: &'a str) -> Self
    {
        Self { tokens: text.split_whitespace() }
    }

    pub fn next_token(&mut self) -> Result<&'a str, GeoTessError>
    {
        self.tokens.next().ok_or_else(|| GeoTessError::ParseFailed("unexpected end of input".to_string()))
    }

    pub fn parse<T: FromStr>(&mut self) -> Result<T, GeoTessError>
    {
        let token = self.next_token()?;
        token.parse::<T>().map_err(|_| GeoTessError::ParseFailed(format!("unable to parse token '{token}'")))
    }

    pub fn is_exhausted(&mut self) -> bool
    {
        self.tokens.clone().next().is_none()
    }
}

#[test]
fn check_binary_fields_are_big_endian()
{
    let mut buffer = Vec::new();
    write_i32(&mut buffer, 3).unwrap();
    write_f32(&mut buffer, 1.5).unwrap();
    assert_eq!(&buffer[..4], &[0, 0, 0, 3]);
    let mut cursor = buffer.as_slice();
    assert_eq!(read_i32(&mut cursor).unwrap(), 3);
    assert_eq!(read_f32(&mut cursor).unwrap(), 1.5);
    assert_eq!(read_u8(&mut cursor), Err(GeoTessError::ReadBufferFailed));
}

#[test]
fn check_text_tokens()
{
    let mut tokens = TextTokens::new("3 2\n 6371.0  NaN");
    assert_eq!(tokens.parse::<u8>().unwrap(), 3);
    assert_eq!(tokens.parse::<i32>().unwrap(), 2);
    assert_eq!(tokens.parse::<f32>().unwrap(), 6371.0);
    assert!(tokens.parse::<f64>().unwrap().is_nan());
    assert!(tokens.is_exhausted());
    assert!(tokens.parse::<f64>().is_err());
}
