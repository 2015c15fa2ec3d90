//! LEB128 unsigned varints used throughout the segment body.

use std::io::Read;

use crate::error::{Result, SegdexError};

/// Longest encoding of a `u64`.
pub const MAX_LEN: usize = 10;

/// Bytes taken by the encoding of `value`.
pub fn encoded_len(value: u64) -> usize {
    match value {
        0 => 1,
        v => (64 - v.leading_zeros() as usize).div_ceil(7),
    }
}

/// Append the encoding of `value` to `buf`.
pub fn put_u64(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push(value as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Read one varint. A short read surfaces as an I/O error; an encoding that
/// does not fit a `u64` is corrupt data.
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];
    for i in 0..MAX_LEN {
        reader.read_exact(&mut byte)?;
        let payload = (byte[0] & 0x7f) as u64;
        if i == MAX_LEN - 1 && payload > 1 {
            break;
        }
        value |= payload << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(SegdexError::corrupt("varint does not fit in 64 bits"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_lengths_match_encoding() {
        for value in [0, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            put_u64(&mut buf, value);
            assert_eq!(buf.len(), encoded_len(value), "value {value}");
            let mut reader = &buf[..];
            assert_eq!(read_u64(&mut reader).unwrap(), value);
            assert!(reader.is_empty());
        }
        assert_eq!(encoded_len(u64::MAX), MAX_LEN);
    }

    #[test]
    fn test_known_bytes() {
        let mut buf = Vec::new();
        put_u64(&mut buf, 300);
        assert_eq!(buf, vec![0xac, 0x02]);
    }

    #[test]
    fn test_truncated_is_io_error() {
        let err = read_u64(&mut &[0x80u8][..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_overflow_is_corrupt() {
        let err = read_u64(&mut &[0xffu8; 11][..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }
}
