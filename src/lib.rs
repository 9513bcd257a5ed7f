//! An in-memory key-value server speaking RESP over TCP.
//!
//! The crate implements the concurrency and correctness core of a
//! Redis-compatible server:
//!
//! - Basic key-value operations with per-key TTLs (GET, SET, INCR, DEL,
//!   KEYS, TYPE)
//! - Append-only streams with blocking reads (XADD, XRANGE, XREAD)
//! - Master-replica replication: command fan-out, per-replica byte
//!   offsets, the GETACK/ACK round trip and acknowledgement-based WAIT
//! - Per-connection transactions (MULTI/EXEC/DISCARD)
//! - An RDB snapshot loader used at startup
//!
//! Concurrency follows one-task-per-connection on Tokio, with the shared
//! keyspace behind an RwLock and the replica registry behind its own
//! locks.

pub mod commands;
pub mod connection;
pub mod handshake;
pub mod key_value_store;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
pub mod stream;
