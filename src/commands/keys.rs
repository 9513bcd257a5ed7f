use globset::Glob;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// `KEYS pattern`: glob match over the live keyspace. No ordering
/// guarantee; expired entries are invisible.
pub async fn keys(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [pattern] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("keys"));
    };

    let matcher = Glob::new(pattern)
        .map_err(|e| CommandError::InvalidGlobPattern(e.to_string()))?
        .compile_matcher();

    let store = server.store.read().await;
    let mut matching = Vec::new();

    for (key, value) in store.iter() {
        if !value.is_expired() && matcher.is_match(key) {
            matching.push(RespValue::BulkString(key.clone()));
        }
    }

    Ok(CommandResult::Response(RespValue::Array(matching).encode()))
}
