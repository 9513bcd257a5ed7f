//! The command table: per-verb parsing and semantics.

mod command_error;
mod command_handler;
mod config_get;
mod del;
mod echo;
mod get;
mod incr;
mod info;
mod keys;
mod ping;
mod psync;
mod replconf;
mod set;
mod stream_reply;
mod type_command;
mod wait;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;
pub use command_handler::{CommandHandler, CommandResult};

use crate::server::RedisServer;

/// Lazy expiry: drops the entry if its TTL has passed. Re-checks under the
/// write lock because the read-locked check that led here has been
/// released in between.
pub(crate) async fn remove_if_expired(server: &RedisServer, key: &str) {
    let mut store = server.store.write().await;

    if store.get(key).is_some_and(|value| value.is_expired()) {
        store.remove(key);
    }
}
