use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// `PSYNC ? -1`: requests a full resynchronization. The reply is the only
/// two-part response in the protocol — a `+FULLRESYNC <replid> 0` simple
/// string followed by an RDB bulk — so the connection loop finishes the
/// exchange and promotes the socket to a replica link.
pub async fn psync(
    server: &RedisServer,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if !server.is_master() {
        return Err(CommandError::PsyncAgainstReplica);
    }

    let [repl_id, offset] = arguments else {
        return Err(CommandError::WrongNumberOfArguments("psync"));
    };

    if repl_id != "?" || offset != "-1" {
        return Err(CommandError::UnrecognizedPsyncRequest);
    }

    Ok(CommandResult::FullResync(
        RespValue::SimpleString(format!("FULLRESYNC {} 0", server.repl_id)).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::psync;
    use crate::commands::test_support::test_server;
    use crate::commands::{CommandError, CommandResult};
    use crate::server::{RedisServer, ServerConfig, ServerRole};

    #[tokio::test]
    async fn test_psync_replies_fullresync_with_the_repl_id() {
        let server = test_server();

        let result = psync(&server, &["?".to_string(), "-1".to_string()])
            .await
            .unwrap();
        assert_eq!(
            result,
            CommandResult::FullResync(format!("+FULLRESYNC {} 0\r\n", server.repl_id))
        );
    }

    #[tokio::test]
    async fn test_psync_rejects_unknown_requests() {
        let server = test_server();

        assert_eq!(
            psync(&server, &["abc".to_string(), "-1".to_string()]).await,
            Err(CommandError::UnrecognizedPsyncRequest)
        );
        assert_eq!(
            psync(&server, &["?".to_string()]).await,
            Err(CommandError::WrongNumberOfArguments("psync"))
        );
    }

    #[tokio::test]
    async fn test_psync_against_a_replica_errors() {
        let server = RedisServer::new(ServerConfig {
            dir: ".".to_string(),
            dbfilename: "dump.rdb".to_string(),
            port: 0,
            role: ServerRole::Replica {
                host: "127.0.0.1".to_string(),
                port: 6379,
            },
        });

        assert_eq!(
            psync(&server, &["?".to_string(), "-1".to_string()]).await,
            Err(CommandError::PsyncAgainstReplica)
        );
    }
}
