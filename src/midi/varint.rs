//! Variable-length quantity (VLQ) codec.
//!
//! VLQ encodes values using 7 bits per byte, most significant group first.
//! The MSB of each byte indicates whether more bytes follow (1 = more bytes,
//! 0 = last byte). Standard MIDI Files use it for delta times and for the
//! lengths of meta and SysEx payloads.

use super::error::{MidiError, Result};

/// Largest value a MIDI VLQ may carry (four bytes of 7 bits each).
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

/// Longest legal encoding in bytes.
const MAX_LENGTH: usize = 4;

/// Decodes a VLQ starting at `offset`.
///
/// # Returns
///
/// The decoded value and the number of bytes it occupied.
///
/// # Errors
///
/// Returns `TruncatedInput` if the buffer ends before the final byte, or if
/// the sequence runs past four bytes without terminating.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;

    for consumed in 0..MAX_LENGTH {
        let byte = *bytes
            .get(offset + consumed)
            .ok_or(MidiError::TruncatedInput("variable-length quantity"))?;
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, consumed + 1));
        }
    }

    Err(MidiError::TruncatedInput(
        "variable-length quantity longer than four bytes",
    ))
}

/// Encodes `value` with the minimal number of bytes.
///
/// # Errors
///
/// Returns `ValueTooLarge` for values above [`MAX_VALUE`].
pub fn encode(value: u32) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(MAX_LENGTH);
    write(value, &mut buffer)?;
    Ok(buffer)
}

/// Appends the encoding of `value` to `buffer`.
///
/// # Errors
///
/// Returns `ValueTooLarge` for values above [`MAX_VALUE`]; nothing is
/// written in that case.
pub fn write(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    if value > MAX_VALUE {
        return Err(MidiError::ValueTooLarge(value as u64));
    }

    if value == 0 {
        buffer.push(0);
        return Ok(());
    }

    let mut temp = value;
    let mut groups = [0u8; MAX_LENGTH];
    let mut count = 0;
    while temp > 0 {
        groups[count] = (temp & 0x7F) as u8;
        temp >>= 7;
        count += 1;
    }

    // Most significant group first, continuation bit on all but the last
    for i in (0..count).rev() {
        if i > 0 {
            buffer.push(groups[i] | 0x80);
        } else {
            buffer.push(groups[i]);
        }
    }

    Ok(())
}

/// Converts a payload length to a VLQ-encodable value.
pub(crate) fn length_to_u32(len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|&v| v <= MAX_VALUE)
        .ok_or(MidiError::ValueTooLarge(len as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding() {
        // Single byte values (0-127)
        assert_eq!(encode(0).unwrap(), vec![0x00]);
        assert_eq!(encode(0x40).unwrap(), vec![0x40]);
        assert_eq!(encode(127).unwrap(), vec![0x7F]);

        // Two byte values (128-16383)
        assert_eq!(encode(128).unwrap(), vec![0x81, 0x00]);
        assert_eq!(encode(0x2000).unwrap(), vec![0xC0, 0x00]);
        assert_eq!(encode(0x3FFF).unwrap(), vec![0xFF, 0x7F]);

        // Three and four byte values
        assert_eq!(encode(0x4000).unwrap(), vec![0x81, 0x80, 0x00]);
        assert_eq!(encode(0x1F_FFFF).unwrap(), vec![0xFF, 0xFF, 0x7F]);
        assert_eq!(encode(0x20_0000).unwrap(), vec![0x81, 0x80, 0x80, 0x00]);
        assert_eq!(encode(MAX_VALUE).unwrap(), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_encode_too_large() {
        assert!(matches!(
            encode(MAX_VALUE + 1),
            Err(MidiError::ValueTooLarge(0x1000_0000))
        ));

        let mut buffer = vec![0xAA];
        assert!(write(u32::MAX, &mut buffer).is_err());
        assert_eq!(buffer, vec![0xAA]);
    }

    #[test]
    fn test_decoding() {
        assert_eq!(decode(&[0x00], 0).unwrap(), (0, 1));
        assert_eq!(decode(&[0x81, 0x00], 0).unwrap(), (128, 2));
        assert_eq!(decode(&[0xFF, 0xFF, 0xFF, 0x7F], 0).unwrap(), (MAX_VALUE, 4));

        // Offset into a larger buffer, trailing bytes untouched
        assert_eq!(decode(&[0x90, 0x83, 0x60, 0x3C], 1).unwrap(), (480, 2));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(decode(&[], 0), Err(MidiError::TruncatedInput(_))));
        assert!(matches!(
            decode(&[0x81, 0x80], 0),
            Err(MidiError::TruncatedInput(_))
        ));
        assert!(matches!(
            decode(&[0x80, 0x80, 0x80, 0x80, 0x00], 0),
            Err(MidiError::TruncatedInput(_))
        ));
    }

    #[test]
    fn test_round_trip_boundaries() {
        let mut values = vec![0u32, 1, MAX_VALUE];
        for shift in [7u32, 14, 21] {
            values.push((1 << shift) - 1);
            values.push(1 << shift);
            values.push((1 << shift) + 1);
        }
        // Spread across the whole 28-bit range
        values.extend((0..MAX_VALUE).step_by(1_000_003));

        for value in values {
            let encoded = encode(value).unwrap();
            assert_eq!(decode(&encoded, 0).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn test_length_to_u32() {
        assert_eq!(length_to_u32(3).unwrap(), 3);
        assert!(length_to_u32(MAX_VALUE as usize + 1).is_err());
    }
}
