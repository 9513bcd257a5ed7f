//! RDB length and string encodings.
//!
//! The top two bits of the first byte select the encoding: 6-bit and
//! 14-bit lengths inline, a 32-bit big-endian length, or a "special"
//! string encoding (little-endian integers rendered as decimal strings;
//! LZF compression is not supported by this loader).

use tokio::io::{Error, ErrorKind};

#[derive(Debug, PartialEq)]
pub enum Length {
    /// A plain byte length for the string that follows.
    Plain(usize),
    Int8,
    Int16,
    Int32,
    Lzf,
}

pub fn take<'a>(bytes: &'a [u8], cursor: usize, len: usize) -> tokio::io::Result<&'a [u8]> {
    bytes
        .get(cursor..cursor + len)
        .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "not enough data in RDB buffer"))
}

pub fn to_array<const N: usize>(slice: &[u8]) -> tokio::io::Result<[u8; N]> {
    slice
        .try_into()
        .map_err(|_| Error::new(ErrorKind::UnexpectedEof, "not enough data in RDB buffer"))
}

/// Parses a length encoding, returning the encoding and bytes consumed.
pub fn parse_length(bytes: &[u8], cursor: usize) -> tokio::io::Result<(Length, usize)> {
    let first = take(bytes, cursor, 1)?[0];

    match first >> 6 {
        0b00 => Ok((Length::Plain((first & 0x3F) as usize), 1)),
        0b01 => {
            let second = take(bytes, cursor + 1, 1)?[0];
            let length = (((first & 0x3F) as usize) << 8) | second as usize;
            Ok((Length::Plain(length), 2))
        }
        0b10 => {
            let slice = to_array::<4>(take(bytes, cursor + 1, 4)?)?;
            Ok((Length::Plain(u32::from_be_bytes(slice) as usize), 5))
        }
        _ => match first & 0x3F {
            0 => Ok((Length::Int8, 1)),
            1 => Ok((Length::Int16, 1)),
            2 => Ok((Length::Int32, 1)),
            3 => Ok((Length::Lzf, 1)),
            other => Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid special length encoding: {}", other),
            )),
        },
    }
}

/// Parses a plain length where a special encoding is not allowed (database
/// indexes and hash-table sizes).
pub fn parse_plain_length(bytes: &[u8], cursor: usize) -> tokio::io::Result<(usize, usize)> {
    match parse_length(bytes, cursor)? {
        (Length::Plain(length), consumed) => Ok((length, consumed)),
        (other, _) => Err(Error::new(
            ErrorKind::InvalidData,
            format!("expected a plain length, got {:?}", other),
        )),
    }
}

/// Parses a string value: either length-prefixed raw bytes or a special
/// integer encoding rendered as its decimal representation.
pub fn parse_string(bytes: &[u8], cursor: usize) -> tokio::io::Result<(String, usize)> {
    let (encoding, mut consumed) = parse_length(bytes, cursor)?;

    let value = match encoding {
        Length::Plain(length) => {
            let slice = take(bytes, cursor + consumed, length)?;
            consumed += length;

            String::from_utf8(slice.to_vec())
                .map_err(|_| Error::new(ErrorKind::InvalidData, "invalid UTF-8 in RDB string"))?
        }
        Length::Int8 => {
            let value = take(bytes, cursor + consumed, 1)?[0] as i8;
            consumed += 1;
            value.to_string()
        }
        Length::Int16 => {
            let slice = to_array::<2>(take(bytes, cursor + consumed, 2)?)?;
            consumed += 2;
            i16::from_le_bytes(slice).to_string()
        }
        Length::Int32 => {
            let slice = to_array::<4>(take(bytes, cursor + consumed, 4)?)?;
            consumed += 4;
            i32::from_le_bytes(slice).to_string()
        }
        Length::Lzf => {
            return Err(Error::new(
                ErrorKind::Unsupported,
                "LZF-compressed strings are not supported",
            ));
        }
    };

    Ok((value, consumed))
}

#[cfg(test)]
mod tests {
    use super::{parse_length, parse_plain_length, parse_string, Length};

    #[test]
    fn test_parse_length() {
        let test_cases: Vec<(&[u8], Length, usize)> = vec![
            (&[0x00], Length::Plain(0), 1),
            (&[0x3F], Length::Plain(63), 1),
            (&[0x40, 0x00], Length::Plain(0), 2),
            (&[0x41, 0x0A], Length::Plain(266), 2),
            (&[0x80, 0x00, 0x01, 0x00, 0x00], Length::Plain(65536), 5),
            (&[0xC0], Length::Int8, 1),
            (&[0xC1], Length::Int16, 1),
            (&[0xC2], Length::Int32, 1),
            (&[0xC3], Length::Lzf, 1),
        ];

        for (input, expected_length, expected_consumed) in test_cases {
            let (length, consumed) = parse_length(input, 0).unwrap();
            assert_eq!(length, expected_length, "parsing {:?}", input);
            assert_eq!(consumed, expected_consumed, "parsing {:?}", input);
        }

        assert_eq!(parse_length(&[], 0).is_err(), true);
        assert_eq!(parse_length(&[0x40], 0).is_err(), true);
    }

    #[test]
    fn test_parse_string() {
        let test_cases: Vec<(Vec<u8>, &str, usize)> = vec![
            (b"\x05hello".to_vec(), "hello", 6),
            (b"\x00".to_vec(), "", 1),
            (vec![0xC0, 0x7B], "123", 2),
            (vec![0xC0, 0xFF], "-1", 2),
            (vec![0xC1, 0x39, 0x30], "12345", 3),
            (vec![0xC2, 0x40, 0xE2, 0x01, 0x00], "123456", 5),
        ];

        for (input, expected, expected_consumed) in test_cases {
            let (value, consumed) = parse_string(&input, 0).unwrap();
            assert_eq!(value, expected, "parsing {:?}", input);
            assert_eq!(consumed, expected_consumed, "parsing {:?}", input);
        }

        assert_eq!(parse_string(&[0xC3, 0x00], 0).is_err(), true);
        assert_eq!(parse_string(b"\x05hel", 0).is_err(), true);
    }

    #[test]
    fn test_parse_plain_length_rejects_special_encodings() {
        assert_eq!(parse_plain_length(&[0x05], 0).unwrap(), (5, 1));
        assert_eq!(parse_plain_length(&[0xC0, 0x01], 0).is_err(), true);
    }
}
