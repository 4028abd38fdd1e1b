//! Embedding blob encoding.
//!
//! Layout, version 1:
//!   byte 0        version tag (0x01)
//!   bytes 1..3    dimension, u16 little-endian
//!   bytes 3..     dimension × f32, little-endian
//!
//! The explicit version byte means a future format change can coexist
//! with old rows instead of silently misreading them.

use facelog_core::Embedding;
use thiserror::Error;

pub const ENCODING_VERSION: u8 = 1;

const HEADER_LEN: usize = 3;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("embedding blob is empty")]
    Empty,
    #[error("unsupported embedding encoding version: {0}")]
    UnsupportedVersion(u8),
    #[error("embedding blob truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Serialize an embedding to the version-1 blob layout.
pub fn encode_embedding(embedding: &Embedding) -> Vec<u8> {
    let dim = embedding.values.len() as u16;
    let mut bytes = Vec::with_capacity(HEADER_LEN + embedding.values.len() * 4);
    bytes.push(ENCODING_VERSION);
    bytes.extend_from_slice(&dim.to_le_bytes());
    for v in &embedding.values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Deserialize a version-1 blob back into an embedding.
pub fn decode_embedding(bytes: &[u8]) -> Result<Embedding, DecodeError> {
    let Some(&version) = bytes.first() else {
        return Err(DecodeError::Empty);
    };
    if version != ENCODING_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let dim = u16::from_le_bytes([bytes[1], bytes[2]]) as usize;
    let expected = HEADER_LEN + dim * 4;
    if bytes.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    let values = bytes[HEADER_LEN..expected]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(Embedding::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_exact() {
        let e = Embedding::new(vec![0.25, -1.5, 3.75, f32::MIN_POSITIVE]);
        let decoded = decode_embedding(&encode_embedding(&e)).unwrap();
        assert_eq!(decoded.values, e.values);
    }

    #[test]
    fn test_encoded_layout() {
        let e = Embedding::new(vec![1.0]);
        let bytes = encode_embedding(&e);
        assert_eq!(bytes[0], ENCODING_VERSION);
        assert_eq!(u16::from_le_bytes([bytes[1], bytes[2]]), 1);
        assert_eq!(&bytes[3..7], &1.0f32.to_le_bytes());
        assert_eq!(bytes.len(), 7);
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode_embedding(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_unknown_version() {
        assert!(matches!(
            decode_embedding(&[9, 0, 0]),
            Err(DecodeError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let e = Embedding::new(vec![1.0, 2.0]);
        let mut bytes = encode_embedding(&e);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            decode_embedding(&bytes),
            Err(DecodeError::Truncated { .. })
        ));
    }
}
