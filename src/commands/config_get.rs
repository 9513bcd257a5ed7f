use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::{RedisServer, ServerRole};

/// `CONFIG GET param`: replies `[param, value]` for recognized parameters
/// and nil for anything else.
pub async fn config(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [subcommand, param] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("config"));
    };

    if !subcommand.eq_ignore_ascii_case("GET") {
        return Err(CommandError::SyntaxError);
    }

    let value = match param.to_lowercase().as_str() {
        "dir" => Some(server.config.dir.clone()),
        "dbfilename" => Some(server.config.dbfilename.clone()),
        "port" => Some(server.config.port.to_string()),
        "replicaof" => Some(match &server.config.role {
            ServerRole::Master => String::new(),
            ServerRole::Replica { host, port } => format!("{} {}", host, port),
        }),
        "master_host" => match &server.config.role {
            ServerRole::Replica { host, .. } => Some(host.clone()),
            ServerRole::Master => None,
        },
        "master_port" => match &server.config.role {
            ServerRole::Replica { port, .. } => Some(port.to_string()),
            ServerRole::Master => None,
        },
        "master_replid" => Some(server.repl_id.clone()),
        "master_repl_offset" => Some(server.repl_offset().await.to_string()),
        _ => None,
    };

    let response = match value {
        Some(value) => RespValue::Array(vec![
            RespValue::BulkString(param.clone()),
            RespValue::BulkString(value),
        ]),
        None => RespValue::NullBulkString,
    };

    Ok(CommandResult::Response(response.encode()))
}
