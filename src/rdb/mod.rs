//! Reading RDB snapshots.
//!
//! The loader parses the minimal dialect produced by the surrounding
//! tooling: a `REDIS00<ver>` header, metadata sections, one database
//! section with optional hash-table sizing, string records with optional
//! absolute expirations, and a terminating checksum that is not verified.

mod encoding;
mod opcode;
mod parser;

use std::collections::HashMap;
use std::path::Path;

pub use parser::RdbParser;

use crate::key_value_store::Value;

/// An empty snapshot (header, metadata and end marker only), served as the
/// PSYNC full-resynchronization payload.
pub const EMPTY_RDB: &[u8] =
    b"REDIS0011\xfa\x09redis-ver\x057.2.0\xfa\x0aredis-bits\xc0@\xfa\x05ctime\xc2m\x08\xbce\xfa\x08used-mem\xc2\xb0\xc4\x10\x00\xfa\x08aof-base\xc0\x00\xff\xf0n;\xfe\xc0\xffZ\xa2";

/// Reads and parses the snapshot at `path` into keyspace entries.
pub async fn load_rdb_file(path: &Path) -> tokio::io::Result<HashMap<String, Value>> {
    let bytes = tokio::fs::read(path).await?;
    RdbParser::new(&bytes).parse()
}

#[cfg(test)]
mod tests {
    use super::{RdbParser, EMPTY_RDB};

    #[test]
    fn test_empty_rdb_fixture_parses_to_no_entries() {
        let entries = RdbParser::new(EMPTY_RDB).parse().unwrap();
        assert_eq!(entries.len(), 0);
    }
}
