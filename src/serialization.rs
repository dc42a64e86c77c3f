/// Serialization format options for grid snapshots and model metadata.
///
/// Each format has both compressed (Lz4) and uncompressed variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SerializationFormat {
    /// JSON format - human readable, larger size
    Json,
    /// JSON format with LZ4 compression
    JsonLz4,
    /// Bincode format - compact binary
    Bincode,
    /// Bincode format with LZ4 compression (default)
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::JsonLz4 | SerializationFormat::BincodeLz4)
    }
}

use std::io::Write;

use crate::errors::GeoTessError;
use serde::{de::DeserializeOwned, Serialize};

fn serialize_serde<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GeoTessError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::to_vec(data).map_err(|_| GeoTessError::SerializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::encode_to_vec(data, bincode::config::standard()).map_err(|_| GeoTessError::SerializationFailed)
        }
    }
}

fn deserialize_serde<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, GeoTessError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::from_slice(data).map_err(|_| GeoTessError::DeserializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::decode_from_slice(data, bincode::config::standard())
                .map(|(value, _)| value)
                .map_err(|_| GeoTessError::DeserializationFailed)
        }
    }
}

/// Serialize data to bytes using the specified format.
/// Applies LZ4 compression if the format variant ends with Lz4.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GeoTessError> {
    let bytes = serialize_serde(data, format)?;
    if format.is_compressed()
    {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    }
    else
    {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
/// Applies LZ4 decompression if the format variant ends with Lz4.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, GeoTessError> {
    if format.is_compressed()
    {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| GeoTessError::LZ4DecompressionFailed)?;
        deserialize_serde(&decompressed, format)
    }
    else
    {
        deserialize_serde(data, format)
    }
}

///
/// Writes `data` to `path` in the requested format.
///
pub fn save<T: Serialize>(data: &T, path: &str, format: SerializationFormat) -> Result<(), GeoTessError>
{
    let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(|_|GeoTessError::FileIOError)?);
    let buffer = serialize(data, format)?;
    file.write_all(&buffer).map_err(|_|GeoTessError::WriteBufferFailed)?;
    Ok(())
}

///
/// Reads a value previously written with [`save`] or [`serialize`].
///
pub fn read<T: DeserializeOwned, Reader: std::io::Read>(mut reader: Reader, format: SerializationFormat) -> Result<T, GeoTessError>
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|_|GeoTessError::ReadBufferFailed)?;
    deserialize(&bytes, format)
}
