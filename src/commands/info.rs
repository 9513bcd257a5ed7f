use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// `INFO section`: only the replication section is populated; any other
/// section replies nil.
pub async fn info(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [section] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("info"));
    };

    if !section.eq_ignore_ascii_case("replication") {
        return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
    }

    let replication_info = format!(
        "role:{}\nmaster_replid:{}\nmaster_repl_offset:{}",
        server.config.role.as_str(),
        server.repl_id,
        server.repl_offset().await,
    );

    Ok(CommandResult::Response(
        RespValue::BulkString(replication_info).encode(),
    ))
}
