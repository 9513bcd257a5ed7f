//! Parsed commands and the dispatch table.

use crate::commands::{
    config_get::config, del::del, echo::echo, get::get, incr::incr, info::info, keys::keys,
    ping::ping, psync::psync, replconf::replconf, set::set, type_command::type_command, wait::wait,
    xadd::xadd, xrange::xrange, xread::xread, CommandError,
};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// What a handler produced.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// A single encoded RESP reply.
    Response(String),
    /// The `+FULLRESYNC` reply of PSYNC; the connection loop follows it
    /// with the RDB payload and promotes the socket to a replica link.
    FullResync(String),
}

/// A client command parsed out of a RESP array of bulk strings.
///
/// The original array is retained so a write verb can be re-marshaled
/// byte-identically when it fans out to replicas.
#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    /// Dispatch key: the first element, uppercased
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    pub fn new(input: &RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = input else {
            return Err(CommandError::InvalidCommandFrame);
        };

        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                RespValue::BulkString(s) => parts.push(s.clone()),
                _ => return Err(CommandError::InvalidCommandFrame),
            }
        }

        let Some((name, arguments)) = parts.split_first() else {
            return Err(CommandError::InvalidCommandFrame);
        };

        Ok(Self {
            name: name.to_uppercase(),
            arguments: arguments.to_vec(),
            input: input.clone(),
        })
    }

    /// Whether the verb mutates the keyspace in a way replicas must see.
    pub fn is_write_command(&self) -> bool {
        matches!(self.name.as_str(), "SET" | "DEL")
    }

    /// Runs the command against the server root and returns its result.
    /// Transaction control verbs never reach this point; the connection
    /// loop intercepts them.
    pub async fn execute(
        &self,
        server: &RedisServer,
        client_address: &str,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "PING" => ping(&self.arguments),
            "ECHO" => echo(&self.arguments),
            "GET" => get(server, &self.arguments).await,
            "SET" => set(server, &self.arguments).await,
            "DEL" => del(server, &self.arguments).await,
            "INCR" => incr(server, &self.arguments).await,
            "KEYS" => keys(server, &self.arguments).await,
            "TYPE" => type_command(server, &self.arguments).await,
            "CONFIG" => config(server, &self.arguments).await,
            "INFO" => info(server, &self.arguments).await,
            "XADD" => xadd(server, &self.arguments).await,
            "XRANGE" => xrange(server, &self.arguments).await,
            "XREAD" => xread(server, client_address, &self.arguments).await,
            "WAIT" => wait(server, &self.arguments).await,
            "REPLCONF" => replconf(server, &self.arguments).await,
            "PSYNC" => psync(server, &self.arguments).await,
            _ => Err(CommandError::UnknownCommand(self.name.clone())),
        }
    }
}
