//! # Bitstream Codec
//!
//! Converts a byte payload into a self-describing bitstream and back.
//!
//! ## Layout
//!
//! ```text
//! [32-bit header: payload length in BITS, big-endian][payload bits, MSB first]
//! ```
//!
//! Each element of a bitstream is a single bit stored as `0` or `1` in a `u8`,
//! so the stream can be laid over carrier samples one bit per sample.

use crate::error::{Result, StegoError};

/// Width of the length header in bits.
pub const HEADER_BITS: usize = 32;

/// What to do with a dangling partial byte when the declared length is not a
/// multiple of 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingBits {
    /// Silently discard the incomplete trailing byte.
    #[default]
    Drop,
    /// Fail with [`StegoError::CorruptedData`].
    Reject,
}

/// A length-prefixed sequence of bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitstream {
    bits: Vec<u8>,
}

impl Bitstream {
    /// Total number of bits, header included.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of payload bits declared by the header.
    pub fn payload_bits(&self) -> usize {
        self.bits.len() - HEADER_BITS
    }

    pub fn as_bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn into_bits(self) -> Vec<u8> {
        self.bits
    }
}

/// Expand bytes into bits, most significant bit first.
fn push_byte_bits(out: &mut Vec<u8>, byte: u8) {
    for shift in (0..8).rev() {
        out.push((byte >> shift) & 1);
    }
}

/// Serialize `payload` into a bitstream with a 32-bit bit-count header.
///
/// # Errors
/// - [`StegoError::PayloadTooLarge`] if the payload has more than `u32::MAX` bits
pub fn serialize(payload: &[u8]) -> Result<Bitstream> {
    let payload_bits = payload.len() as u64 * 8;
    let header = u32::try_from(payload_bits)
        .map_err(|_| StegoError::PayloadTooLarge { bits: payload_bits })?;

    let mut bits = Vec::with_capacity(HEADER_BITS + payload.len() * 8);
    for byte in header.to_be_bytes() {
        push_byte_bits(&mut bits, byte);
    }
    for &byte in payload {
        push_byte_bits(&mut bits, byte);
    }

    Ok(Bitstream { bits })
}

/// Deserialize a bit sequence, dropping any dangling partial byte.
///
/// Only the low bit of each element is read, so a raw sample buffer may be
/// passed directly. Bits beyond the declared length are ignored.
///
/// # Errors
/// - [`StegoError::IncompleteData`] if fewer bits remain than the header declares
pub fn deserialize(bits: &[u8]) -> Result<Vec<u8>> {
    deserialize_with(bits, TrailingBits::Drop)
}

/// Deserialize a bit sequence with an explicit trailing-bit policy.
pub fn deserialize_with(bits: &[u8], trailing: TrailingBits) -> Result<Vec<u8>> {
    if bits.len() < HEADER_BITS {
        return Err(StegoError::IncompleteData {
            declared: HEADER_BITS,
            available: bits.len(),
        });
    }

    let declared = bits[..HEADER_BITS]
        .iter()
        .fold(0u32, |acc, bit| (acc << 1) | u32::from(bit & 1)) as usize;

    let body = &bits[HEADER_BITS..];
    if body.len() < declared {
        return Err(StegoError::IncompleteData {
            declared,
            available: body.len(),
        });
    }

    if trailing == TrailingBits::Reject && declared % 8 != 0 {
        return Err(StegoError::CorruptedData(format!(
            "declared length of {} bits leaves {} dangling bits",
            declared,
            declared % 8
        )));
    }

    Ok(body[..declared]
        .chunks_exact(8)
        .map(|byte| byte.iter().fold(0u8, |acc, bit| (acc << 1) | (bit & 1)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(len: u32) -> Vec<u8> {
        let mut bits = Vec::new();
        for byte in len.to_be_bytes() {
            push_byte_bits(&mut bits, byte);
        }
        bits
    }

    #[test]
    fn test_serialize_layout() {
        let stream = serialize(b"Hi").unwrap();

        assert_eq!(stream.len(), 32 + 16);
        assert_eq!(stream.payload_bits(), 16);
        assert_eq!(&stream.as_bits()[..32], header(16).as_slice());
        // 'H' = 0b01001000, 'i' = 0b01101001
        assert_eq!(
            &stream.as_bits()[32..],
            &[0, 1, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1]
        );
    }

    #[test]
    fn test_serialize_empty_payload() {
        let stream = serialize(&[]).unwrap();
        assert_eq!(stream.len(), 32);
        assert!(stream.as_bits().iter().all(|&b| b == 0));
        assert_eq!(deserialize(stream.as_bits()).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_deserialize_hello_world() {
        let stream = serialize(b"hello world").unwrap();
        assert_eq!(stream.len(), 120);
        assert_eq!(deserialize(stream.as_bits()).unwrap(), b"hello world");
    }

    #[test]
    fn test_deserialize_ignores_bits_past_declared_length() {
        let mut bits = serialize(b"ok").unwrap().into_bits();
        bits.extend_from_slice(&[1, 1, 1, 1, 0, 1, 0, 1, 1]);
        assert_eq!(deserialize(&bits).unwrap(), b"ok");
    }

    #[test]
    fn test_deserialize_reads_only_low_bit() {
        let bits: Vec<u8> = serialize(b"A")
            .unwrap()
            .into_bits()
            .into_iter()
            .map(|b| 0b1010_1110 | b)
            .collect();
        assert_eq!(deserialize(&bits).unwrap(), b"A");
    }

    #[test]
    fn test_deserialize_short_header() {
        let err = deserialize(&[0; 20]).unwrap_err();
        assert!(matches!(
            err,
            StegoError::IncompleteData { declared: 32, available: 20 }
        ));
    }

    #[test]
    fn test_deserialize_truncated_body() {
        let bits = serialize(b"hello").unwrap().into_bits();
        let err = deserialize(&bits[..bits.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            StegoError::IncompleteData { declared: 40, available: 39 }
        ));
    }

    #[test]
    fn test_dangling_bits_are_dropped() {
        // 11 declared bits: one full byte plus three dangling bits
        let mut bits = header(11);
        bits.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(deserialize(&bits).unwrap(), b"A");
    }

    #[test]
    fn test_dangling_bits_rejected_in_strict_mode() {
        let mut bits = header(11);
        bits.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        let err = deserialize_with(&bits, TrailingBits::Reject).unwrap_err();
        assert!(matches!(err, StegoError::CorruptedData(_)));

        let aligned = serialize(b"A").unwrap();
        assert_eq!(
            deserialize_with(aligned.as_bits(), TrailingBits::Reject).unwrap(),
            b"A"
        );
    }
}
