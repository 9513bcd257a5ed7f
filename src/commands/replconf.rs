use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// `REPLCONF …`: capability negotiation is nominal, so everything replies
/// `+OK` — except `GETACK`, which reports the global replication offset as
/// a `REPLCONF ACK <offset>` command array.
pub async fn replconf(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    match arguments.first() {
        Some(option) if option.eq_ignore_ascii_case("GETACK") => {
            let offset = server.repl_offset().await;

            Ok(CommandResult::Response(
                RespValue::command(&["REPLCONF", "ACK", &offset.to_string()]).encode(),
            ))
        }
        _ => Ok(CommandResult::Response(
            RespValue::SimpleString("OK".to_string()).encode(),
        )),
    }
}
