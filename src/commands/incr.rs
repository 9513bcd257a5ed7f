use crate::commands::{CommandError, CommandResult};
use crate::key_value_store::{DataType, Value};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// `INCR key`: an absent (or expired) key is created as `"1"`; an existing
/// value must parse as a signed 64-bit decimal. The TTL of a live entry
/// survives the rewrite.
pub async fn incr(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("incr"));
    };

    let mut store = server.store.write().await;

    let live_entry = store.get(key.as_str()).filter(|value| !value.is_expired());

    let current = match live_entry {
        None => None,
        Some(value) => match &value.data {
            DataType::String(s) => Some(s.clone()),
            DataType::Stream(_) => return Err(CommandError::WrongType),
        },
    };

    let next = match current {
        None => 1,
        Some(current) => current
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or(CommandError::NotAnIntegerOrOutOfRange)?,
    };

    let expiration = live_entry.and_then(|value| value.expiration);
    store.insert(key.clone(), Value::string(next.to_string(), expiration));

    Ok(CommandResult::Response(RespValue::Integer(next).encode()))
}
