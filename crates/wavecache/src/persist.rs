//! Byte encoding of values kept in the durable result table.

use crate::{Error, PositionBuffer, Result};

pub trait Persist: Sized + Clone + Send + Sync + 'static {
    fn encode(&self) -> Vec<u8>;

    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Approximate resident size, used for capacity accounting.
    fn byte_len(&self) -> usize;
}

/// Position buffers are stored as little-endian `f32` values.
impl Persist for PositionBuffer {
    fn encode(&self) -> Vec<u8> {
        self.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::Serialization {
                context: format!("position buffer length {} is not a multiple of 4", bytes.len()),
            });
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn byte_len(&self) -> usize {
        self.len() * size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn rejects_truncated_bytes() {
        let err = PositionBuffer::decode(&[0, 0, 128]).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn encodes_little_endian() {
        let buffer: PositionBuffer = Arc::from(vec![1.0_f32, -2.5]);
        let bytes = buffer.encode();
        assert_eq!(&bytes[..4], &1.0_f32.to_le_bytes());
        assert_eq!(buffer.byte_len(), 8);
        assert_eq!(PositionBuffer::decode(&bytes).unwrap(), buffer);
    }
}
