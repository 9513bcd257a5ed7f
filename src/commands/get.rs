use crate::commands::{remove_if_expired, CommandError, CommandResult};
use crate::key_value_store::DataType;
use crate::resp::RespValue;
use crate::server::RedisServer;

pub async fn get(server: &RedisServer, arguments: &[String]) -> Result<CommandResult, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("get"));
    };

    {
        let store = server.store.read().await;

        match store.get(key.as_str()) {
            None => {
                return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
            }
            Some(value) if !value.is_expired() => {
                return match &value.data {
                    DataType::String(s) => Ok(CommandResult::Response(
                        RespValue::BulkString(s.clone()).encode(),
                    )),
                    DataType::Stream(_) => Err(CommandError::WrongType),
                };
            }
            Some(_) => {}
        }
    }

    remove_if_expired(server, key).await;
    Ok(CommandResult::Response(RespValue::NullBulkString.encode()))
}
