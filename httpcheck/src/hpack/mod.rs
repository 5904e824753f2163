//! HPACK header compression (RFC 7541).
//!
//! The encoder never adds entries to the peer's dynamic table and never
//! Huffman-codes, so header values go on the wire byte for byte. The
//! decoder accepts every representation a peer may use.

pub(crate) use self::decoder::Decoder;
pub(crate) use self::encoder::Encoder;

mod decoder;
mod dynamic_table;
mod encoder;
mod huffman;
mod static_table;

/// Malformed header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecoderError {
    #[error("header block ended in the middle of a field")]
    NotEnoughOctets,
    #[error("integer does not fit in usize")]
    IntegerOverflow,
    #[error("header table index {0} out of bounds")]
    HeaderIndexOutOfBounds(usize),
    #[error("invalid Huffman code")]
    InvalidHuffmanCode,
    #[error("dynamic table size update to {0} exceeds the limit")]
    InvalidMaxDynamicSize(usize),
    #[error("dynamic table size update after the first field")]
    SizeUpdateNotAtStart,
}

/// Decode an integer with an N-bit prefix (RFC 7541, section 5.1).
///
/// Returns the value and the number of octets consumed.
fn decode_integer(buf: &[u8], prefix_size: u8) -> Result<(usize, usize), DecoderError> {
    let first = *buf.first().ok_or(DecoderError::NotEnoughOctets)?;
    let mask = ((1u16 << prefix_size) - 1) as u8;
    let mut value = (first & mask) as usize;
    if value < mask as usize {
        return Ok((value, 1));
    }

    let mut shift = 0u32;
    for (i, &b) in buf[1..].iter().enumerate() {
        let add = ((b & 0x7f) as usize)
            .checked_shl(shift)
            .filter(|a| a >> shift == (b & 0x7f) as usize)
            .ok_or(DecoderError::IntegerOverflow)?;
        value = value.checked_add(add).ok_or(DecoderError::IntegerOverflow)?;
        if b & 0x80 == 0 {
            return Ok((value, i + 2));
        }
        shift += 7;
    }
    Err(DecoderError::NotEnoughOctets)
}

/// Encode an integer with an N-bit prefix; bits of `leading_bits` above the
/// prefix are kept in the first octet.
fn encode_integer_into(mut value: usize, prefix_size: u8, leading_bits: u8, buf: &mut Vec<u8>) {
    let mask = ((1u16 << prefix_size) - 1) as u8;
    let leading_bits = leading_bits & !mask;
    if value < mask as usize {
        buf.push(leading_bits | value as u8);
        return;
    }

    buf.push(leading_bits | mask);
    value -= mask as usize;
    while value >= 128 {
        buf.push((value % 128 + 128) as u8);
        value /= 128;
    }
    buf.push(value as u8);
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode_integer(value: usize, prefix_size: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_integer_into(value, prefix_size, 0, &mut buf);
        buf
    }

    #[test]
    fn integer_fits_prefix() {
        assert_eq!(vec![10], encode_integer(10, 5));
        assert_eq!(Ok((10, 1)), decode_integer(&[10], 5));
        // high bits belong to the representation, not to the integer
        assert_eq!(Ok((10, 1)), decode_integer(&[0xe0 | 10], 5));
    }

    #[test]
    fn integer_continuation() {
        // RFC 7541, C.1.2
        assert_eq!(vec![31, 154, 10], encode_integer(1337, 5));
        assert_eq!(Ok((1337, 3)), decode_integer(&[31, 154, 10], 5));
        // RFC 7541, C.1.3
        assert_eq!(vec![42], encode_integer(42, 8));
        assert_eq!(Ok((42, 1)), decode_integer(&[42], 8));
    }

    #[test]
    fn leading_bits_kept() {
        let mut buf = Vec::new();
        encode_integer_into(3, 7, 0x80, &mut buf);
        assert_eq!(vec![0x83], buf);
    }

    #[test]
    fn truncated_integer() {
        assert_eq!(Err(DecoderError::NotEnoughOctets), decode_integer(&[], 5));
        assert_eq!(Err(DecoderError::NotEnoughOctets), decode_integer(&[31, 154], 5));
    }

    #[test]
    fn huge_integer() {
        let buf = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f];
        assert_eq!(Err(DecoderError::IntegerOverflow), decode_integer(&buf, 8));
    }
}
