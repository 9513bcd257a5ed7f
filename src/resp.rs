//! RESP (Redis serialization protocol) values and framing.
//!
//! The codec is split in two: [`RespValue`] models a single protocol value
//! and knows how to encode itself deterministically, while [`RespReader`]
//! turns a byte stream into framed values, buffering partial frames until
//! enough input has arrived. The reader also exposes the RDB bulk variant
//! (`$<len>\r\n<bytes>` with no trailing terminator) used exactly once
//! during the replication handshake.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type tag: {0}")]
    UnknownTypeTag(char),
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
}

/// A single RESP protocol value.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    NullArray,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Builds a command as an array of bulk strings, e.g.
    /// `RespValue::command(&["REPLCONF", "ACK", "154"])`.
    pub fn command(parts: &[&str]) -> RespValue {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.to_string()))
                .collect(),
        )
    }

    /// Encodes the value into its wire representation.
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(s) => format!("-{}\r\n", s),
            RespValue::Integer(i) => format!(":{}\r\n", i),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::NullArray => "*-1\r\n".to_string(),
            RespValue::Array(items) => {
                let mut encoded = format!("*{}\r\n", items.len());
                for item in items {
                    encoded.push_str(&item.encode());
                }
                encoded
            }
        }
    }

    /// Byte length of the encoded representation, used for replication
    /// offset accounting.
    pub fn encoded_len(&self) -> usize {
        self.encode().len()
    }
}

/// Incremental reader producing one framed [`RespValue`] per call.
///
/// Bytes are accumulated in an internal buffer; a call only returns once a
/// complete frame is available, reading more from the underlying stream as
/// needed.
#[derive(Debug)]
pub struct RespReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> RespReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Reads exactly one RESP value, blocking until a full frame arrived.
    pub async fn read_value(&mut self) -> Result<RespValue, RespError> {
        loop {
            if let Some((value, consumed)) = parse_value(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(value);
            }

            self.fill_buffer().await?;
        }
    }

    /// Reads an RDB bulk payload: `$<len>\r\n` followed by exactly `len`
    /// raw bytes and no trailing terminator. Used once per replication
    /// handshake; every other read goes through [`Self::read_value`].
    pub async fn read_rdb_payload(&mut self) -> Result<Vec<u8>, RespError> {
        loop {
            if let Some((payload, consumed)) = parse_rdb_payload(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(payload);
            }

            self.fill_buffer().await?;
        }
    }

    async fn fill_buffer(&mut self) -> Result<(), RespError> {
        let read_bytes = self
            .reader
            .read_buf(&mut self.buffer)
            .await
            .map_err(|e| RespError::Io(e.to_string()))?;

        if read_bytes == 0 {
            return Err(RespError::ConnectionClosed);
        }

        Ok(())
    }
}

/// Attempts to parse one value from the front of `buffer`. Returns
/// `Ok(None)` when the frame is incomplete and more input is needed.
fn parse_value(buffer: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some((line, line_len)) = read_line(buffer) else {
        return Ok(None);
    };

    let Some((&tag, rest)) = line.split_first() else {
        return Err(RespError::UnknownTypeTag('\r'));
    };

    match tag {
        b'+' => Ok(Some((
            RespValue::SimpleString(decode_utf8(rest)?),
            line_len,
        ))),
        b'-' => Ok(Some((RespValue::Error(decode_utf8(rest)?), line_len))),
        b':' => {
            let value = decode_utf8(rest)?
                .parse::<i64>()
                .map_err(|_| RespError::FailedToParseInteger)?;
            Ok(Some((RespValue::Integer(value), line_len)))
        }
        b'$' => parse_bulk_string(buffer, rest, line_len),
        b'*' => parse_array(buffer, rest, line_len),
        other => Err(RespError::UnknownTypeTag(other as char)),
    }
}

fn parse_bulk_string(
    buffer: &[u8],
    length_digits: &[u8],
    line_len: usize,
) -> Result<Option<(RespValue, usize)>, RespError> {
    let declared_length = decode_utf8(length_digits)?
        .parse::<i64>()
        .map_err(|_| RespError::InvalidBulkString)?;

    if declared_length == -1 {
        return Ok(Some((RespValue::NullBulkString, line_len)));
    }

    let length = usize::try_from(declared_length).map_err(|_| RespError::InvalidBulkString)?;
    let frame_len = line_len + length + 2;

    if buffer.len() < frame_len {
        return Ok(None);
    }

    if &buffer[line_len + length..frame_len] != b"\r\n" {
        return Err(RespError::InvalidBulkString);
    }

    let content = decode_utf8(&buffer[line_len..line_len + length])?;
    Ok(Some((RespValue::BulkString(content), frame_len)))
}

fn parse_array(
    buffer: &[u8],
    length_digits: &[u8],
    line_len: usize,
) -> Result<Option<(RespValue, usize)>, RespError> {
    let declared_length = decode_utf8(length_digits)?
        .parse::<i64>()
        .map_err(|_| RespError::InvalidArray)?;

    if declared_length == -1 {
        return Ok(Some((RespValue::NullArray, line_len)));
    }

    let length = usize::try_from(declared_length).map_err(|_| RespError::InvalidArray)?;
    let mut elements = Vec::with_capacity(length);
    let mut consumed = line_len;

    for _ in 0..length {
        match parse_value(&buffer[consumed..])? {
            Some((element, element_len)) => {
                elements.push(element);
                consumed += element_len;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((RespValue::Array(elements), consumed)))
}

fn parse_rdb_payload(buffer: &[u8]) -> Result<Option<(Vec<u8>, usize)>, RespError> {
    let Some((line, line_len)) = read_line(buffer) else {
        return Ok(None);
    };

    let Some((&b'$', length_digits)) = line.split_first() else {
        return Err(RespError::InvalidBulkString);
    };

    let length = decode_utf8(length_digits)?
        .parse::<usize>()
        .map_err(|_| RespError::InvalidBulkString)?;

    if buffer.len() < line_len + length {
        return Ok(None);
    }

    let payload = buffer[line_len..line_len + length].to_vec();
    Ok(Some((payload, line_len + length)))
}

/// Finds the first CRLF-terminated line, returning its content (without
/// the terminator) and total consumed length.
fn read_line(buffer: &[u8]) -> Option<(&[u8], usize)> {
    buffer
        .windows(2)
        .position(|window| window == b"\r\n")
        .map(|pos| (&buffer[..pos], pos + 2))
}

fn decode_utf8(bytes: &[u8]) -> Result<String, RespError> {
    str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| RespError::InvalidUtf8)
}
