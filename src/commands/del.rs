use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

pub async fn del(server: &RedisServer, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("del"));
    }

    let mut store = server.store.write().await;
    let mut removed = 0;

    for key in arguments {
        // An expired entry is already gone as far as clients can tell, so
        // it is dropped without counting.
        if let Some(value) = store.remove(key.as_str()) {
            if !value.is_expired() {
                removed += 1;
            }
        }
    }

    Ok(CommandResult::Response(
        RespValue::Integer(removed).encode(),
    ))
}
