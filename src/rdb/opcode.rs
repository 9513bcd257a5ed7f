//! RDB opcode dispatch.

use jiff::Timestamp;
use tokio::io::{Error, ErrorKind};

use crate::rdb::encoding::{parse_plain_length, parse_string, take, to_array};

const METADATA: u8 = 0xFA;
const RESIZE_DB: u8 = 0xFB;
const EXPIRE_MILLISECONDS: u8 = 0xFC;
const EXPIRE_SECONDS: u8 = 0xFD;
const SELECT_DB: u8 = 0xFE;
const END_OF_FILE: u8 = 0xFF;
const STRING_TYPE: u8 = 0x00;

#[derive(Debug, PartialEq)]
pub enum Record {
    Metadata {
        key: String,
        value: String,
    },
    ResizeDb {
        hash_table_size: usize,
        expiry_hash_table_size: usize,
    },
    SelectDb {
        index: usize,
    },
    Entry {
        key: String,
        value: String,
        expiration: Option<Timestamp>,
    },
    EndOfFile,
}

/// Parses one record starting at `cursor`, returning it and the number of
/// bytes consumed. An expiration opcode is folded into the string record
/// that follows it.
pub fn parse_record(bytes: &[u8], cursor: usize) -> tokio::io::Result<(Record, usize)> {
    let opcode = take(bytes, cursor, 1)?[0];
    let mut consumed = 1;

    let record = match opcode {
        METADATA => {
            let (key, key_len) = parse_string(bytes, cursor + consumed)?;
            consumed += key_len;
            let (value, value_len) = parse_string(bytes, cursor + consumed)?;
            consumed += value_len;

            Record::Metadata { key, value }
        }
        RESIZE_DB => {
            let (hash_table_size, first_len) = parse_plain_length(bytes, cursor + consumed)?;
            consumed += first_len;
            let (expiry_hash_table_size, second_len) = parse_plain_length(bytes, cursor + consumed)?;
            consumed += second_len;

            Record::ResizeDb {
                hash_table_size,
                expiry_hash_table_size,
            }
        }
        SELECT_DB => {
            let (index, index_len) = parse_plain_length(bytes, cursor + consumed)?;
            consumed += index_len;

            Record::SelectDb { index }
        }
        EXPIRE_MILLISECONDS => {
            let slice = to_array::<8>(take(bytes, cursor + consumed, 8)?)?;
            consumed += 8;
            let expiration = timestamp_from_millis(u64::from_le_bytes(slice) as i64)?;

            let ((key, value), entry_len) = parse_string_entry(bytes, cursor + consumed)?;
            consumed += entry_len;

            Record::Entry {
                key,
                value,
                expiration: Some(expiration),
            }
        }
        EXPIRE_SECONDS => {
            let slice = to_array::<4>(take(bytes, cursor + consumed, 4)?)?;
            consumed += 4;
            let expiration = Timestamp::from_second(u32::from_le_bytes(slice) as i64)
                .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;

            let ((key, value), entry_len) = parse_string_entry(bytes, cursor + consumed)?;
            consumed += entry_len;

            Record::Entry {
                key,
                value,
                expiration: Some(expiration),
            }
        }
        STRING_TYPE => {
            let ((key, value), entry_len) = parse_string_entry(bytes, cursor)?;
            consumed = entry_len;

            Record::Entry {
                key,
                value,
                expiration: None,
            }
        }
        END_OF_FILE => {
            // Trailing 8-byte CRC64 checksum, not verified.
            take(bytes, cursor + consumed, 8)?;
            consumed += 8;

            Record::EndOfFile
        }
        other => {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("unknown RDB opcode: 0x{:02X}", other),
            ));
        }
    };

    Ok((record, consumed))
}

/// A `0x00`-typed record: length-prefixed key then value.
fn parse_string_entry(bytes: &[u8], cursor: usize) -> tokio::io::Result<((String, String), usize)> {
    let type_byte = take(bytes, cursor, 1)?[0];
    if type_byte != STRING_TYPE {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("unsupported RDB value type: 0x{:02X}", type_byte),
        ));
    }

    let mut consumed = 1;
    let (key, key_len) = parse_string(bytes, cursor + consumed)?;
    consumed += key_len;
    let (value, value_len) = parse_string(bytes, cursor + consumed)?;
    consumed += value_len;

    Ok(((key, value), consumed))
}

fn timestamp_from_millis(millis: i64) -> tokio::io::Result<Timestamp> {
    Timestamp::from_millisecond(millis)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))
}
