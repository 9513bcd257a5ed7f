//! One-shot RDB snapshot parsing.

use std::collections::HashMap;

use tokio::io::{Error, ErrorKind};

use crate::key_value_store::Value;
use crate::rdb::encoding::take;
use crate::rdb::opcode::{parse_record, Record};

/// Walks a complete snapshot held in memory and collects its string
/// entries. Metadata, database selectors and hash-table sizing records are
/// recognized and skipped; `0xFF` ends the walk.
#[derive(Debug)]
pub struct RdbParser<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> RdbParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn parse(mut self) -> tokio::io::Result<HashMap<String, Value>> {
        self.parse_header()?;

        let mut entries = HashMap::new();

        while self.cursor < self.buffer.len() {
            let (record, consumed) = parse_record(self.buffer, self.cursor)?;
            self.cursor += consumed;

            match record {
                Record::Entry {
                    key,
                    value,
                    expiration,
                } => {
                    entries.insert(key, Value::string(value, expiration));
                }
                Record::EndOfFile => break,
                Record::Metadata { .. } | Record::ResizeDb { .. } | Record::SelectDb { .. } => {}
            }
        }

        Ok(entries)
    }

    /// `REDIS00<ver>`: 5 magic bytes and a 4-digit ASCII version.
    fn parse_header(&mut self) -> tokio::io::Result<()> {
        let header = take(self.buffer, 0, 9)?;

        if &header[..5] != b"REDIS" {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "invalid RDB magic string",
            ));
        }

        let version = str::from_utf8(&header[5..])
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "invalid RDB version"))?;

        if version == 0 || version > 12 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("unsupported RDB version: {}", version),
            ));
        }

        self.cursor = 9;
        Ok(())
    }
}
