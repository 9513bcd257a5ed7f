use std::time::Duration;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

pub struct WaitArguments {
    numreplicas: usize,
    timeout: Option<Duration>,
}

impl WaitArguments {
    /// `WAIT numreplicas timeout_ms`; a timeout of 0 waits indefinitely.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [numreplicas, timeout_millis] = arguments else {
            return Err(CommandError::WrongNumberOfArguments("wait"));
        };

        let numreplicas = numreplicas
            .parse::<usize>()
            .map_err(|_| CommandError::NotAnIntegerOrOutOfRange)?;

        let timeout_millis = timeout_millis
            .parse::<u64>()
            .map_err(|_| CommandError::NotAnIntegerOrOutOfRange)?;

        let timeout = match timeout_millis {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        };

        Ok(Self {
            numreplicas,
            timeout,
        })
    }
}

/// Probes every written-to replica with `REPLCONF GETACK *` and replies
/// with the number of replicas that are in sync once enough acks arrived
/// or the timeout passed.
pub async fn wait(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;

    let count = server
        .replicas
        .wait_for_acks(wait_arguments.numreplicas, wait_arguments.timeout)
        .await;

    Ok(CommandResult::Response(
        RespValue::Integer(count as i64).encode(),
    ))
}
