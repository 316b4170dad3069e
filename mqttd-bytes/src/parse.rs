//! Parsing utility functions
//!
//! Every reader in this module is built from [`ByteCursor::read_byte`], so the
//! packet budget is enforced one byte at a time.

use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{ByteCursor, Error};

/// Largest value a variable byte integer can hold
pub const VARINT_MAX: usize = 268_435_455;

/// Variable Byte Integer
///
/// An unsigned integer that is encoded in one to four bytes.
/// Each byte carries 7 bits of the value, least significant group first,
/// and the high bit signals that another byte follows.
///
/// See [specification](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901011).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt {
    value: u32,
    length: u8,
}

impl PartialOrd<usize> for VarInt {
    fn partial_cmp(&self, other: &usize) -> Option<std::cmp::Ordering> {
        Some(self.value().cmp(other))
    }
}

impl PartialEq<usize> for VarInt {
    fn eq(&self, other: &usize) -> bool {
        self.value().eq(other)
    }
}

impl From<VarInt> for u32 {
    fn from(val: VarInt) -> Self {
        val.value
    }
}

impl VarInt {
    /// Creates a new variable byte integer
    ///
    /// # Errors
    /// This will return an error if the value is too large to be encoded
    pub fn new(value: usize) -> Result<Self, Error> {
        let length = match value {
            0..=127 => 1,
            128..=16_383 => 2,
            16_384..=2_097_151 => 3,
            2_097_152..=VARINT_MAX => 4,
            _ => return Err(Error::VarIntTooLarge(value)),
        };
        Ok(Self {
            value: value as u32,
            length,
        })
    }

    /// The numeric value of the variable byte integer
    pub const fn value(&self) -> usize {
        self.value as usize
    }

    /// The number of bytes used to encode this variable byte integer
    pub const fn length(&self) -> usize {
        self.length as usize
    }

    /// Read a variable byte integer from the cursor
    ///
    /// The returned value also records how many bytes the encoding occupied.
    /// A fourth byte that still has its continuation bit set is rejected
    /// without reading a fifth one.
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Self, Error> {
        let mut value: u32 = 0;
        let mut length = 0;
        let mut shift = 0;

        // Stream 0b1xxx_xxxx 0b1yyy_yyyy 0b1zzz_zzzz 0b0www_wwww will
        // be framed as number 0bwww_wwww_zzz_zzzz_yyy_yyyy_xxx_xxxx
        loop {
            let byte = cursor.read_byte()?;
            value += ((byte & 0b0111_1111) as u32) << shift;
            length += 1;
            shift += 7;

            if (byte & 0b1000_0000) == 0 {
                break;
            }

            // Only a max of 4 bytes allowed
            if length >= 4 {
                return Err(Error::MalformedVarInt);
            }
        }

        Ok(Self { value, length })
    }

    /// Write a variable byte integer to the stream
    pub fn write(&self, stream: &mut BytesMut) {
        let mut x = self.value;
        let mut done = false;

        while !done {
            let mut byte = (x % 128) as u8;
            x >>= 7;
            if x > 0 {
                byte |= 128;
            } else {
                done = true;
            }

            stream.put_u8(byte);
        }
    }
}

/// Read a [Two Byte Integer][1] in big-endian order.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901008
pub fn read_u16<R: Read>(cursor: &mut ByteCursor<R>) -> Result<u16, Error> {
    let msb = cursor.read_byte()?;
    let lsb = cursor.read_byte()?;
    Ok(u16::from_be_bytes([msb, lsb]))
}

/// Read a [Four Byte Integer][1] in big-endian order.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901009
pub fn read_u32<R: Read>(cursor: &mut ByteCursor<R>) -> Result<u32, Error> {
    let mut buf = [0u8; 4];
    for byte in buf.iter_mut() {
        *byte = cursor.read_byte()?;
    }

    Ok(u32::from_be_bytes(buf))
}

/// Read [Binary Data][1] from the cursor.
///
/// The two byte length prefix is followed by that many bytes, so the encoding
/// occupies `len + 2` bytes of the budget. A zero length gives empty data.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901012
pub fn read_mqtt_bytes<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Bytes, Error> {
    let len = read_u16(cursor)? as usize;
    cursor.read_bytes(len)
}

/// Read a [UTF-8 Encoded String][1] from the cursor.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010
pub fn read_mqtt_string<R: Read>(cursor: &mut ByteCursor<R>) -> Result<String, Error> {
    let s = read_mqtt_bytes(cursor)?;
    let s = std::str::from_utf8(&s)?;
    Ok(s.to_owned())
}

/// Read a [UTF-8 String Pair][1], as used by user properties.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901013
pub fn read_mqtt_string_pair<R: Read>(
    cursor: &mut ByteCursor<R>,
) -> Result<(String, String), Error> {
    let name = read_mqtt_string(cursor)?;
    let value = read_mqtt_string(cursor)?;
    Ok((name, value))
}

/// Write [Binary Data][1] to a byte stream.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901012
pub fn write_mqtt_bytes(stream: &mut BytesMut, bytes: &[u8]) {
    stream.put_u16(bytes.len() as u16);
    stream.extend_from_slice(bytes);
}

/// Write a [UTF-8 Encoded String][1] to a byte stream.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010
pub fn write_mqtt_string(stream: &mut BytesMut, string: &str) {
    write_mqtt_bytes(stream, string.as_bytes());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct TestCase {
        bytes: Vec<u8>,
        value: usize,
        length: usize,
    }

    #[rustfmt::skip]
    fn test_cases() -> Vec<TestCase> {
        vec![
            TestCase { bytes: vec![0x00], value: 0, length: 1 },
            TestCase { bytes: vec![0x7F], value: 127, length: 1 },
            TestCase { bytes: vec![0x80, 0x01], value: 128, length: 2 },
            TestCase { bytes: vec![0xFF, 0x7F], value: 16_383, length: 2 },
            TestCase { bytes: vec![0x80, 0x80, 0x01], value: 16_384, length: 3 },
            TestCase { bytes: vec![0xFF, 0xFF, 0x7F], value: 2_097_151, length: 3 },
            TestCase { bytes: vec![0x80, 0x80, 0x80, 0x01], value: 2_097_152, length: 4 },
            TestCase { bytes: vec![0xFF, 0xFF, 0xFF, 0x7F], value: 268_435_455, length: 4 },
        ]
    }

    fn new_cursor(bytes: &[u8]) -> ByteCursor<&[u8]> {
        ByteCursor::with_remaining_length(bytes, bytes.len())
    }

    #[test]
    fn test_varint_read() {
        for case in test_cases() {
            let mut cursor = new_cursor(&case.bytes);
            let varint = VarInt::read(&mut cursor).unwrap();
            assert_eq!(varint.value(), case.value);
            assert_eq!(varint.length(), case.length);
            assert_eq!(cursor.remaining_length(), 0);
        }
    }

    #[test]
    fn test_varint_read_stops_at_last_byte() {
        let mut cursor = new_cursor(&[0x80, 0x01, 0x55]);
        let varint = VarInt::read(&mut cursor).unwrap();
        assert_eq!(varint.value(), 128);
        assert_eq!(cursor.remaining_length(), 1);
    }

    #[test]
    fn test_varint_read_malformed() {
        let mut cursor = new_cursor(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(
            VarInt::read(&mut cursor),
            Err(Error::MalformedVarInt)
        ));
        // the fifth byte is never consumed
        assert_eq!(cursor.remaining_length(), 1);
    }

    #[test]
    fn test_varint_read_truncated() {
        let mut cursor = ByteCursor::with_remaining_length(&[0x80u8, 0x80][..], 2);
        assert!(matches!(VarInt::read(&mut cursor), Err(Error::Exhausted)));

        let mut cursor = ByteCursor::with_remaining_length(&[0x80u8, 0x80][..], 5);
        assert!(matches!(VarInt::read(&mut cursor), Err(Error::Io(_))));
    }

    #[test]
    fn test_varint_write() {
        for case in test_cases() {
            let mut stream = BytesMut::new();
            let varint = VarInt::new(case.value).unwrap();
            assert_eq!(varint.length(), case.length);
            varint.write(&mut stream);
            assert_eq!(stream, case.bytes);
        }
    }

    #[test]
    fn test_varint_round_trip() {
        for value in [0, 1, 127, 128, 300, 16_383, 16_384, 65_535, 2_097_152, VARINT_MAX] {
            let mut stream = BytesMut::new();
            VarInt::new(value).unwrap().write(&mut stream);
            let mut cursor = new_cursor(&stream);
            assert_eq!(VarInt::read(&mut cursor).unwrap().value(), value);
        }
    }

    #[test]
    fn test_varint_too_large() {
        assert!(matches!(
            VarInt::new(VARINT_MAX + 1),
            Err(Error::VarIntTooLarge(268_435_456))
        ));
    }

    #[test]
    fn integers_are_big_endian() {
        let mut cursor = new_cursor(&[0x00, 0x3C, 0x77, 0x35, 0x93, 0xFF]);
        assert_eq!(read_u16(&mut cursor).unwrap(), 60);
        assert_eq!(read_u32(&mut cursor).unwrap(), 1_999_999_999);
        assert!(matches!(read_u16(&mut cursor), Err(Error::Exhausted)));
    }

    #[test]
    fn mqtt_string() {
        let mut cursor = new_cursor(&[0x00, 0x04, b'M', b'Q', b'T', b'T', 0x00, 0x00]);
        assert_eq!(read_mqtt_string(&mut cursor).unwrap(), "MQTT");
        assert_eq!(cursor.remaining_length(), 2);
        assert_eq!(read_mqtt_string(&mut cursor).unwrap(), "");
        assert_eq!(cursor.remaining_length(), 0);
    }

    #[test]
    fn mqtt_string_truncated() {
        let mut cursor = new_cursor(&[0x00, 0x05, b'M', b'Q', b'T', b'T']);
        assert!(matches!(
            read_mqtt_string(&mut cursor),
            Err(Error::Exhausted)
        ));
    }

    #[test]
    fn mqtt_string_invalid_utf8() {
        let mut cursor = new_cursor(&[0x00, 0x02, 0xC3, 0x28]);
        assert!(matches!(
            read_mqtt_string(&mut cursor),
            Err(Error::Utf8Encoding(_))
        ));
    }

    #[test]
    fn mqtt_string_pair() {
        let mut stream = BytesMut::new();
        write_mqtt_string(&mut stream, "region");
        write_mqtt_string(&mut stream, "eu-west");
        let mut cursor = new_cursor(&stream);
        let (name, value) = read_mqtt_string_pair(&mut cursor).unwrap();
        assert_eq!(name, "region");
        assert_eq!(value, "eu-west");
        assert_eq!(cursor.remaining_length(), 0);
    }
}
