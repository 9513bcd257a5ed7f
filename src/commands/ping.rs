use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;

pub fn ping(_arguments: &[String]) -> Result<CommandResult, CommandError> {
    Ok(CommandResult::Response(
        RespValue::SimpleString("PONG".to_string()).encode(),
    ))
}
