use crate::commands::stream_reply::entries_to_resp;
use crate::commands::{CommandError, CommandResult};
use crate::key_value_store::DataType;
use crate::resp::RespValue;
use crate::server::RedisServer;
use crate::stream::{StreamId, StreamError};

/// `XRANGE key start end`, inclusive on both ends. `-` is the smallest
/// possible ID, `+` the largest; a bare `<ms>` bound defaults its sequence
/// to the extreme matching its side.
pub async fn xrange(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [key, start, end] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("xrange"));
    };

    let start_id = parse_range_start(start)?;
    let end_id = parse_range_end(end)?;

    let store = server.store.read().await;

    let Some(value) = store.get(key.as_str()).filter(|value| !value.is_expired()) else {
        return Ok(CommandResult::Response(
            RespValue::Array(Vec::new()).encode(),
        ));
    };

    let DataType::Stream(stream) = &value.data else {
        return Err(CommandError::WrongType);
    };

    let entries = stream.range(start_id, end_id);
    Ok(CommandResult::Response(entries_to_resp(&entries).encode()))
}

fn parse_range_start(bound: &str) -> Result<StreamId, StreamError> {
    if bound == "-" {
        return Ok(StreamId::new(0, 0));
    }

    StreamId::parse(bound, 0)
}

fn parse_range_end(bound: &str) -> Result<StreamId, StreamError> {
    if bound == "+" {
        return Ok(StreamId::MAX);
    }

    StreamId::parse(bound, u64::MAX)
}
